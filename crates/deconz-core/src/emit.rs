// Output capability handed to triggers and device operations.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

/// Receives JSON payloads produced by the core.
pub trait Emitter: Send + Sync {
    fn emit(&self, payload: Value);
}

impl<F> Emitter for F
where
    F: Fn(Value) + Send + Sync,
{
    fn emit(&self, payload: Value) {
        self(payload);
    }
}

impl Emitter for mpsc::UnboundedSender<Value> {
    fn emit(&self, payload: Value) {
        if self.send(payload).is_err() {
            debug!("emit receiver dropped, discarding payload");
        }
    }
}

/// Emit `value` as one item, or each element separately if it is an array.
pub fn emit_items(emitter: &dyn Emitter, value: Value) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| emitter.emit(item)),
        other => emitter.emit(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;

    #[test]
    fn closures_are_emitters() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let emitter = move |v: Value| sink.lock().unwrap().push(v);

        emit_items(&emitter, json!([{ "a": 1 }, { "b": 2 }]));
        emit_items(&emitter, json!({ "c": 3 }));

        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn channel_senders_are_emitters() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.emit(json!({ "on": true }));
        assert_eq!(rx.recv().await, Some(json!({ "on": true })));

        drop(rx);
        // Must not panic once the receiver is gone.
        tx.emit(json!(null));
    }
}
