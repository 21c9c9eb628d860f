use std::sync::Arc;

use framebridge_core::{Bridge, BridgeConfig, ChannelTransport};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::HostConfig;
use crate::endpoint::HostEndpoint;
use crate::Result;

/// A script bridge wired to a host endpoint over in-memory channels, both
/// sides running on their own task.
///
/// Dropping the session closes the bridge (pending queries fail with
/// `Closed`) and stops both tasks.
pub struct Session {
    pub bridge: Bridge,
    pub host: HostEndpoint,
    script_task: JoinHandle<()>,
    host_task: JoinHandle<()>,
}

/// Must be called from within a tokio runtime.
pub fn connect_in_memory(host_config: HostConfig, bridge_config: BridgeConfig) -> Result<Session> {
    let (to_host, host_inbound) = ChannelTransport::pair();
    let (to_script, script_inbound) = ChannelTransport::pair();

    let bridge = Bridge::new(Arc::new(to_host), bridge_config);
    let host = HostEndpoint::new(Arc::new(to_script), host_config)?;

    let script_task = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.run(script_inbound).await }
    });
    let host_task = tokio::spawn({
        let host = host.clone();
        async move { host.run(host_inbound).await }
    });

    debug!(target: "host", "In-memory session connected");
    Ok(Session {
        bridge,
        host,
        script_task,
        host_task,
    })
}

impl Session {
    /// Same as dropping the session.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.bridge.close();
        self.script_task.abort();
        self.host_task.abort();
    }
}
