use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::envelope::Envelope;
use crate::transport::Transport;
use crate::Result;

/// Outbound side of the bridge: frames envelopes and posts them.
///
/// `publish` is fire-and-forget; an `Err` only means the local transport is
/// gone, never that the other side refused the message.
#[derive(Clone)]
pub struct Publisher {
    transport: Arc<dyn Transport>,
}

impl Publisher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn send(&self, envelope: &Envelope) -> Result<()> {
        debug!(
            target: "publisher",
            type_tag = %envelope.type_tag,
            id = ?envelope.id,
            "Posting envelope"
        );
        self.transport.post(envelope.to_value())
    }

    pub fn publish(&self, type_tag: &str, data: Value) -> Result<()> {
        self.send(&Envelope::event(type_tag, data))
    }

    pub fn publish_typed<T: Serialize + ?Sized>(&self, type_tag: &str, data: &T) -> Result<()> {
        let data = serde_json::to_value(data)?;
        self.publish(type_tag, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use crate::BridgeError;
    use serde_json::json;

    #[test]
    fn publish_posts_event_without_id() {
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .withf(|m| {
                m["type"] == "openTab"
                    && m["data"]["url"] == "https://workadventu.re/"
                    && m.get("id").is_none()
            })
            .times(1)
            .returning(|_| Ok(()));

        let publisher = Publisher::new(Arc::new(transport));
        publisher
            .publish("openTab", json!({"url": "https://workadventu.re/"}))
            .unwrap();
    }

    #[test]
    fn publish_typed_serializes_unit_as_null() {
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .withf(|m| m["type"] == "onPlayerMove" && m["data"].is_null())
            .times(1)
            .returning(|_| Ok(()));

        let publisher = Publisher::new(Arc::new(transport));
        publisher.publish_typed("onPlayerMove", &()).unwrap();
    }

    #[test]
    fn transport_failure_is_reported() {
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .returning(|_| Err(BridgeError::Transport("gone".into())));

        let publisher = Publisher::new(Arc::new(transport));
        assert!(publisher.publish("openTab", Value::Null).is_err());
    }
}
