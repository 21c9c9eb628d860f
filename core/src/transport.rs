use serde_json::Value;
use tokio::sync::mpsc;

use crate::{BridgeError, Result};

/// One direction of the postMessage-style boundary.
///
/// Messages posted on the same transport are delivered in order. Nothing else
/// is guaranteed: no acknowledgement, no shared state with the other side.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn post(&self, message: Value) -> Result<()>;
}

/// In-memory transport backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Value>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<Value>) -> Self {
        Self { tx }
    }

    /// Creates a transport together with the receiving end the other side
    /// reads from.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Transport for ChannelTransport {
    fn post(&self, message: Value) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| BridgeError::Transport("receiving side has been dropped".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn channel_preserves_order() {
        let (transport, mut rx) = ChannelTransport::pair();
        transport.post(json!(1)).unwrap();
        transport.post(json!(2)).unwrap();
        assert_eq!(rx.recv().await, Some(json!(1)));
        assert_eq!(rx.recv().await, Some(json!(2)));
    }

    #[test]
    fn post_after_drop_fails() {
        let (transport, rx) = ChannelTransport::pair();
        drop(rx);
        assert!(transport.is_closed());
        assert!(matches!(
            transport.post(json!({})),
            Err(BridgeError::Transport(_))
        ));
    }
}
