//! Type tags and payloads exchanged between scripts and the host.
//!
//! Each payload implements [`Payload`] so the same schema is used to validate
//! it on whichever side receives it.

use serde::{Deserialize, Serialize};

use crate::payload::Payload;
use crate::schema::{Schema, SchemaRegistry};

/// Type tag names used on `Envelope.type_tag`
pub mod types {
    // Script → host queries
    /// Initialization handshake, answered with a `GameState`
    pub const GET_STATE: &str = "getState";
    pub const SET_PLAYER_OUTLINE: &str = "setPlayerOutline";
    pub const REMOVE_PLAYER_OUTLINE: &str = "removePlayerOutline";
    pub const OPEN_CO_WEBSITE: &str = "openCoWebsite";
    pub const CLOSE_CO_WEBSITE: &str = "closeCoWebsite";
    pub const GET_CO_WEBSITES: &str = "getCoWebsites";

    // Script → host notifications
    /// Asks the host to start sending `hasPlayerMoved`
    pub const ON_PLAYER_MOVE: &str = "onPlayerMove";
    pub const REGISTER_MENU: &str = "registerMenu";
    pub const UNREGISTER_MENU: &str = "unregisterMenu";
    pub const OPEN_TAB: &str = "openTab";
    pub const GO_TO_PAGE: &str = "goToPage";

    // Host → script notifications
    pub const HAS_PLAYER_MOVED: &str = "hasPlayerMoved";
    pub const ENTER_EVENT: &str = "enterEvent";
    pub const LEAVE_EVENT: &str = "leaveEvent";
    pub const MENU_ITEM_CLICKED: &str = "menuItemClicked";
}

/// Answer to the initialization handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub player_name: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_room_token: Option<String>,
    pub room_id: String,
    pub map_url: String,
}

impl Payload for GameState {
    fn schema() -> Schema {
        Schema::object()
            .field("playerName", Schema::string())
            .field("tags", Schema::array(Schema::string()))
            .field("uuid", Schema::string().optional())
            .field("userRoomToken", Schema::string().optional())
            .field("roomId", Schema::string())
            .field("mapUrl", Schema::string())
            .build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerOutline {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Payload for PlayerOutline {
    fn schema() -> Schema {
        Schema::object()
            .field("red", Schema::number())
            .field("green", Schema::number())
            .field("blue", Schema::number())
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMovedEvent {
    /// One of "up", "down", "left", "right"
    pub direction: String,
    pub moving: bool,
    pub x: f64,
    pub y: f64,
}

impl Payload for PlayerMovedEvent {
    fn schema() -> Schema {
        Schema::object()
            .field("direction", Schema::string())
            .field("moving", Schema::boolean())
            .field("x", Schema::number())
            .field("y", Schema::number())
            .build()
    }
}

/// Player entered or left a named zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEvent {
    pub name: String,
}

impl Payload for ZoneEvent {
    fn schema() -> Schema {
        Schema::object().field("name", Schema::string()).build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuRegisterOptions {
    pub allow_api: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuRegisterEvent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe: Option<String>,
    pub options: MenuRegisterOptions,
}

impl Payload for MenuRegisterEvent {
    fn schema() -> Schema {
        Schema::object()
            .field("name", Schema::string())
            .field("iframe", Schema::string().optional())
            .field(
                "options",
                Schema::object().field("allowApi", Schema::boolean()).build(),
            )
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregisterMenuEvent {
    pub name: String,
}

impl Payload for UnregisterMenuEvent {
    fn schema() -> Schema {
        Schema::object().field("name", Schema::string()).build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemClickedEvent {
    pub menu_item: String,
}

impl Payload for MenuItemClickedEvent {
    fn schema() -> Schema {
        Schema::object().field("menuItem", Schema::string()).build()
    }
}

/// Payload of `openTab` and `goToPage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEvent {
    pub url: String,
}

impl Payload for UrlEvent {
    fn schema() -> Schema {
        Schema::object().field("url", Schema::string()).build()
    }
}

/// Request to open a page next to the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCoWebsiteEvent {
    pub url: String,
    /// Grants the embedded page access to the scripting API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_api: Option<bool>,
    /// Permission policy for the iframe `allow` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_policy: Option<String>,
    /// Insertion index among the open co-websites
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

impl Payload for OpenCoWebsiteEvent {
    fn schema() -> Schema {
        Schema::object()
            .field("url", Schema::string())
            .field("allowApi", Schema::boolean().optional())
            .field("allowPolicy", Schema::string().optional())
            .field("position", Schema::number().optional())
            .build()
    }
}

/// An open co-website as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoWebsiteInfo {
    pub id: String,
    pub position: u32,
}

impl Payload for CoWebsiteInfo {
    fn schema() -> Schema {
        Schema::object()
            .field("id", Schema::string())
            .field("position", Schema::number())
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseCoWebsiteEvent {
    pub id: String,
}

impl Payload for CloseCoWebsiteEvent {
    fn schema() -> Schema {
        Schema::object().field("id", Schema::string()).build()
    }
}

/// Registers the schemas of every notification the host sends to scripts.
pub fn register_host_events(registry: &SchemaRegistry) {
    registry.register(types::HAS_PLAYER_MOVED, PlayerMovedEvent::schema());
    registry.register(types::ENTER_EVENT, ZoneEvent::schema());
    registry.register(types::LEAVE_EVENT, ZoneEvent::schema());
    registry.register(types::MENU_ITEM_CLICKED, MenuItemClickedEvent::schema());
}

/// Registers the schemas of every message a script sends to the host,
/// notifications and query requests alike.
pub fn register_script_messages(registry: &SchemaRegistry) {
    registry.register(types::GET_STATE, <()>::schema());
    registry.register(types::SET_PLAYER_OUTLINE, PlayerOutline::schema());
    registry.register(types::REMOVE_PLAYER_OUTLINE, <()>::schema());
    registry.register(types::OPEN_CO_WEBSITE, OpenCoWebsiteEvent::schema());
    registry.register(types::CLOSE_CO_WEBSITE, CloseCoWebsiteEvent::schema());
    registry.register(types::GET_CO_WEBSITES, <()>::schema());

    registry.register(types::ON_PLAYER_MOVE, <()>::schema());
    registry.register(types::REGISTER_MENU, MenuRegisterEvent::schema());
    registry.register(types::UNREGISTER_MENU, UnregisterMenuEvent::schema());
    registry.register(types::OPEN_TAB, UrlEvent::schema());
    registry.register(types::GO_TO_PAGE, UrlEvent::schema());
}
