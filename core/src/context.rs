use std::fmt;
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::messages::GameState;
use crate::{BridgeError, Result};

/// A host-owned value that goes `Unset → Set` exactly once.
///
/// Reading an unset field is an integration bug in the calling script and
/// returns [`BridgeError::Uninitialized`] naming the accessor and the callback
/// it must be called from. Once set, the value never changes for the session.
pub struct InitField<T> {
    field: &'static str,
    accessor: &'static str,
    cell: OnceLock<T>,
}

impl<T> InitField<T> {
    pub const fn new(field: &'static str, accessor: &'static str) -> Self {
        Self {
            field,
            accessor,
            cell: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Result<&T> {
        self.cell.get().ok_or(BridgeError::Uninitialized {
            field: self.field,
            accessor: self.accessor,
        })
    }

    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Performs the single transition. A second call is ignored.
    pub(crate) fn set(&self, value: T) -> bool {
        if self.cell.set(value).is_err() {
            warn!(target: "host_context", field = self.field, "Ignoring second initialization");
            return false;
        }
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for InitField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(v) => f.debug_tuple("Set").field(v).finish(),
            None => f.write_str("Unset"),
        }
    }
}

/// Session-scoped identity and room data, owned by one bridge instance.
///
/// Populated from the host's answer to the initialization handshake; there is
/// no public setter.
#[derive(Debug)]
pub struct HostContext {
    player_name: InitField<String>,
    tags: InitField<Vec<String>>,
    uuid: InitField<Option<String>>,
    user_room_token: InitField<Option<String>>,
    room_id: InitField<String>,
    map_url: InitField<String>,
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HostContext {
    pub fn new() -> Self {
        Self {
            player_name: InitField::new("Player name", "player.name()"),
            tags: InitField::new("Tags", "player.tags()"),
            uuid: InitField::new("Player id", "player.id()"),
            user_room_token: InitField::new("User-room token", "player.user_room_token()"),
            room_id: InitField::new("Room id", "room.id()"),
            map_url: InitField::new("Map URL", "room.map_url()"),
        }
    }

    pub fn player_name(&self) -> Result<&str> {
        self.player_name.get().map(String::as_str)
    }

    pub fn tags(&self) -> Result<&[String]> {
        self.tags.get().map(Vec::as_slice)
    }

    /// `Ok(None)` for anonymous players.
    pub fn uuid(&self) -> Result<Option<&str>> {
        self.uuid.get().map(Option::as_deref)
    }

    pub fn user_room_token(&self) -> Result<Option<&str>> {
        self.user_room_token.get().map(Option::as_deref)
    }

    pub fn room_id(&self) -> Result<&str> {
        self.room_id.get().map(String::as_str)
    }

    pub fn map_url(&self) -> Result<&str> {
        self.map_url.get().map(String::as_str)
    }

    pub fn is_initialized(&self) -> bool {
        self.player_name.is_set()
    }

    /// Applies the handshake answer. Returns false if the context was already
    /// initialized, in which case nothing changes.
    pub(crate) fn apply(&self, state: GameState) -> bool {
        if self.is_initialized() {
            warn!(target: "host_context", "Host context already initialized");
            return false;
        }
        self.uuid.set(state.uuid);
        self.user_room_token.set(state.user_room_token);
        self.tags.set(state.tags);
        self.room_id.set(state.room_id);
        self.map_url.set(state.map_url);
        // Last, so is_initialized() implies every other field is set.
        let applied = self.player_name.set(state.player_name);
        debug!(target: "host_context", "Host context initialized");
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(uuid: Option<&str>) -> GameState {
        GameState {
            player_name: "Alice".into(),
            tags: vec!["admin".into()],
            uuid: uuid.map(String::from),
            user_room_token: None,
            room_id: "https://play.example.org/_/global/maps/office.json".into(),
            map_url: "https://maps.example.org/office.json".into(),
        }
    }

    #[test]
    fn reading_before_init_names_the_callback() {
        let ctx = HostContext::new();
        let err = ctx.player_name().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Player name not initialized yet. You should call player.name() within an on_init callback."
        );
        assert!(matches!(ctx.uuid(), Err(BridgeError::Uninitialized { field: "Player id", .. })));
    }

    #[test]
    fn absent_values_are_not_errors_after_init() {
        let ctx = HostContext::new();
        assert!(ctx.apply(state(None)));
        assert_eq!(ctx.uuid().unwrap(), None);
        assert_eq!(ctx.user_room_token().unwrap(), None);
        assert_eq!(ctx.player_name().unwrap(), "Alice");
        assert_eq!(ctx.tags().unwrap(), ["admin".to_string()]);
    }

    #[test]
    fn second_initialization_is_ignored() {
        let ctx = HostContext::new();
        ctx.apply(state(Some("uuid-1")));
        let mut other = state(Some("uuid-2"));
        other.player_name = "Bob".into();
        assert!(!ctx.apply(other));
        assert_eq!(ctx.player_name().unwrap(), "Alice");
        assert_eq!(ctx.uuid().unwrap(), Some("uuid-1"));
    }

    #[test]
    fn init_field_debug_shows_state() {
        let field: InitField<u32> = InitField::new("Answer", "answer()");
        assert_eq!(format!("{field:?}"), "Unset");
        field.set(42);
        assert_eq!(format!("{field:?}"), "Set(42)");
    }
}
