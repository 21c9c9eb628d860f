use crate::bridge::Bridge;
use crate::messages::{types, ZoneEvent};
use crate::registry::{CallbackId, HandlerResult};
use crate::Result;

pub struct RoomCommands<'a> {
    bridge: &'a Bridge,
}

impl<'a> RoomCommands<'a> {
    pub(crate) fn new(bridge: &'a Bridge) -> Self {
        Self { bridge }
    }

    pub fn id(&self) -> Result<&'a str> {
        self.bridge.context().room_id()
    }

    pub fn map_url(&self) -> Result<&'a str> {
        self.bridge.context().map_url()
    }

    /// Runs `callback` each time the player walks into the zone `name`.
    pub fn on_enter_zone<F>(&self, name: &str, callback: F) -> CallbackId
    where
        F: Fn() -> HandlerResult + Send + Sync + 'static,
    {
        self.on_zone(types::ENTER_EVENT, name, callback)
    }

    pub fn on_leave_zone<F>(&self, name: &str, callback: F) -> CallbackId
    where
        F: Fn() -> HandlerResult + Send + Sync + 'static,
    {
        self.on_zone(types::LEAVE_EVENT, name, callback)
    }

    fn on_zone<F>(&self, type_tag: &str, name: &str, callback: F) -> CallbackId
    where
        F: Fn() -> HandlerResult + Send + Sync + 'static,
    {
        let zone = name.to_string();
        self.bridge.on::<ZoneEvent, _>(type_tag, move |event| {
            if event.name == zone {
                callback()
            } else {
                Ok(())
            }
        })
    }
}
