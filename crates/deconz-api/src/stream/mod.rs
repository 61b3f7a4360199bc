// Gateway event stream: transports, shared sessions, and subscriptions.

pub mod event;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod registry;
pub mod session;
pub mod subscription;
pub mod transport;

pub use event::{ChangeKind, GatewayEvent};
pub use registry::SessionRegistry;
pub use session::{
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL, ListenerId, ReconnectConfig, Session, SessionEvent,
    SessionEventKind, SessionState,
};
pub use subscription::{CorrelationId, EventPredicate, Subscription, request_detach, subscribe};
pub use transport::{
    ABNORMAL_CLOSURE, ReadyState, Transport, TransportHandle, TransportSignal, TransportSink,
    WsTransport, channel,
};
