use crate::bridge::Bridge;
use crate::messages::{types, PlayerMovedEvent, PlayerOutline};
use crate::registry::{CallbackId, HandlerResult};
use crate::Result;

/// Identity of the current player and commands acting on their avatar.
pub struct PlayerCommands<'a> {
    bridge: &'a Bridge,
}

impl<'a> PlayerCommands<'a> {
    pub(crate) fn new(bridge: &'a Bridge) -> Self {
        Self { bridge }
    }

    pub fn name(&self) -> Result<&'a str> {
        self.bridge.context().player_name()
    }

    pub fn tags(&self) -> Result<&'a [String]> {
        self.bridge.context().tags()
    }

    /// `Ok(None)` for anonymous players.
    pub fn id(&self) -> Result<Option<&'a str>> {
        self.bridge.context().uuid()
    }

    pub fn user_room_token(&self) -> Result<Option<&'a str>> {
        self.bridge.context().user_room_token()
    }

    /// Subscribes to player movement and asks the host to start streaming it.
    pub fn on_player_move<F>(&self, callback: F) -> Result<CallbackId>
    where
        F: Fn(PlayerMovedEvent) -> HandlerResult + Send + Sync + 'static,
    {
        let id = self.bridge.on::<PlayerMovedEvent, _>(types::HAS_PLAYER_MOVED, callback);
        if let Err(err) = self.bridge.publish(types::ON_PLAYER_MOVE, &()) {
            self.bridge.off(&id);
            return Err(err);
        }
        Ok(id)
    }

    /// Draws a colored outline around the player's avatar. Resolves once the
    /// host has applied it.
    pub async fn set_outline_color(&self, red: u8, green: u8, blue: u8) -> Result<()> {
        self.bridge
            .query(types::SET_PLAYER_OUTLINE, &PlayerOutline { red, green, blue })
            .await
    }

    pub async fn remove_outline_color(&self) -> Result<()> {
        self.bridge.query(types::REMOVE_PLAYER_OUTLINE, &()).await
    }
}
