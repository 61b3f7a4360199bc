// deconz-core: Orchestration between deconz-api and its consumers (CLI, automations).

pub mod config;
pub mod device;
pub mod emit;
pub mod error;
pub mod gateway;
pub mod trigger;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_REST_PORT, DEFAULT_WS_PORT, GatewayConfig, StreamProtocol};
pub use device::DeviceCommand;
pub use emit::{Emitter, emit_items};
pub use error::CoreError;
pub use gateway::{DEVICE_TYPE, Gateway};
pub use trigger::TriggerHandle;

// API types consumers need to drive the core.
pub use deconz_api::resources::resource_id;
pub use deconz_api::{
    ChangeKind, EventPredicate, GatewayEvent, LightStateUpdate, ResourceKind, ResourceOption,
    SessionEvent, SessionEventKind,
};
