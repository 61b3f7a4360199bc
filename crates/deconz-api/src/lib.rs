// deconz-api: Async Rust client for the deCONZ gateway (REST + websocket event stream)

pub mod client;
pub mod error;
pub mod key;
pub mod models;
pub mod resources;
pub mod stream;
pub mod transport;

pub use client::GatewayClient;
pub use error::Error;
pub use key::{DEFAULT_RETRY_DELAY, RetryingKeyFetcher};
pub use resources::{LightStateUpdate, ResourceKind, ResourceOption};
pub use stream::{
    ChangeKind, CorrelationId, EventPredicate, GatewayEvent, ListenerId, ReconnectConfig, Session,
    SessionEvent, SessionEventKind, SessionRegistry, SessionState, Subscription, request_detach,
    subscribe,
};
pub use transport::TransportConfig;
