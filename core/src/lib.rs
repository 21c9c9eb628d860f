// Framebridge Core Library
// Scripting bridge between sandboxed iframe scripts and their host application

pub mod api;
pub mod bridge;
pub mod config;
pub mod context;
pub mod correlator;
pub mod envelope;
pub mod messages;
pub mod payload;
pub mod publisher;
pub mod registry;
pub mod schema;
pub mod telemetry;
pub mod transport;

// Export core types
pub use api::{CoWebsite, Menu, MenuOptions};
pub use bridge::{Bridge, Inbound};
pub use config::BridgeConfig;
pub use context::{HostContext, InitField};
pub use correlator::{Correlator, Resolution};
pub use envelope::{CorrelationId, Envelope};
pub use payload::{narrow, Payload};
pub use publisher::Publisher;
pub use registry::{CallbackId, CallbackRegistry, DispatchReport, HandlerError, HandlerResult};
pub use schema::{Schema, SchemaRegistry, SchemaViolation};
pub use telemetry::init_tracing;
pub use transport::{ChannelTransport, Transport};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("bridge closed before the response arrived")]
    Closed,

    #[error("{field} not initialized yet. You should call {accessor} within an on_init callback.")]
    Uninitialized {
        field: &'static str,
        accessor: &'static str,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] SchemaViolation),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
