//! `deconz watch`: print matching stream events as JSON lines.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use deconz_core::{
    ChangeKind, EventPredicate, Gateway, ResourceKind, SessionEvent, SessionEventKind, resource_id,
};

use crate::cli::{WatchArgs, WatchEvent, WatchResource};
use crate::error::CliError;
use crate::output;

impl From<WatchResource> for ResourceKind {
    fn from(resource: WatchResource) -> Self {
        match resource {
            WatchResource::Lights => Self::Lights,
            WatchResource::Sensors => Self::Sensors,
            WatchResource::Groups => Self::Groups,
            WatchResource::Scenes => Self::Scenes,
        }
    }
}

impl From<WatchEvent> for ChangeKind {
    fn from(event: WatchEvent) -> Self {
        match event {
            WatchEvent::Added => Self::Added,
            WatchEvent::Changed => Self::Changed,
            WatchEvent::Deleted => Self::Deleted,
            WatchEvent::SceneCalled => Self::SceneCalled,
        }
    }
}

/// Follow the stream until Ctrl-C, `--count` events, or the session gives up.
pub async fn handle(args: WatchArgs, gateway: &Gateway) -> Result<(), CliError> {
    let predicate = EventPredicate::new(
        args.event.into(),
        args.resource.into(),
        resource_id(&args.id),
    );

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let trigger = gateway.watch(predicate, Arc::new(events_tx))?;

    let (gave_up_tx, mut gave_up_rx) = mpsc::unbounded_channel();
    let session = trigger.session().clone();
    let give_up_listener = session.on(SessionEventKind::MaxRetries, move |event| {
        if let SessionEvent::MaxRetries(reason) = event {
            let _ = gave_up_tx.send(reason.clone());
        }
    });

    info!(url = %session.url(), "Watching event stream (Ctrl-C to stop)");

    let mut seen = 0_usize;
    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            reason = gave_up_rx.recv() => {
                break Err(CliError::StreamUnavailable {
                    reason: reason.unwrap_or_else(|| "event stream closed".into()),
                });
            }
            payload = events_rx.recv() => {
                let Some(payload) = payload else {
                    break Ok(());
                };
                output::print_output(&serde_json::to_string(&payload)?);
                seen += 1;
                if args.count.is_some_and(|limit| seen >= limit) {
                    break Ok(());
                }
            }
        }
    };

    session.off(give_up_listener);
    trigger.close();
    gateway.shutdown();
    result
}
