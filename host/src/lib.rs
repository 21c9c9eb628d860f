// Framebridge Host
// Host-side endpoint of the scripting bridge: answers script queries, owns the
// menu registry and the co-website list, and pushes host events to scripts.

pub mod config;
pub mod cowebsite;
pub mod endpoint;
pub mod menu;
pub mod session;

pub use config::HostConfig;
pub use cowebsite::{CoWebsiteEntry, CoWebsiteList};
pub use endpoint::{HostEndpoint, MenuAction, QueryHandler};
pub use menu::{MenuIframe, MenuRegistry, Registration, ReservedMenu, Unregistration};
pub use session::{connect_in_memory, Session};

use framebridge_core::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Query failed: {0}")]
    Query(String),
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        Self::Bridge(BridgeError::from(err))
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
