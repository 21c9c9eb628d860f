use std::fs;
use std::path::Path;

use framebridge_core::messages::GameState;
use serde::Deserialize;

use crate::{HostError, Result};

/// Host-side session settings: who the player is, which room they are in and
/// where the running script was loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostConfig {
    pub player_name: String,
    pub tags: Vec<String>,
    /// Absent for anonymous players
    pub uuid: Option<String>,
    pub user_room_token: Option<String>,
    pub room_id: String,
    pub map_url: String,
    /// Base URL relative iframe URLs from the script are resolved against
    pub script_origin: String,
    pub is_admin: bool,
    /// Shows the Contact menu when set
    pub contact_url: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            player_name: "Guest".to_string(),
            tags: Vec::new(),
            uuid: None,
            user_room_token: None,
            room_id: "_/global/maps.example.org/office.json".to_string(),
            map_url: "https://maps.example.org/office.json".to_string(),
            script_origin: "https://maps.example.org/scripts/".to_string(),
            is_admin: false,
            contact_url: None,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

impl HostConfig {
    /// Defaults overridden by `FRAMEBRIDGE_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_string("FRAMEBRIDGE_PLAYER_NAME") {
            config.player_name = v;
        }
        if let Some(v) = env_string("FRAMEBRIDGE_PLAYER_TAGS") {
            config.tags = v
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
        config.uuid = env_string("FRAMEBRIDGE_PLAYER_UUID").or(config.uuid);
        config.user_room_token = env_string("FRAMEBRIDGE_USER_ROOM_TOKEN").or(config.user_room_token);
        if let Some(v) = env_string("FRAMEBRIDGE_ROOM_ID") {
            config.room_id = v;
        }
        if let Some(v) = env_string("FRAMEBRIDGE_MAP_URL") {
            config.map_url = v;
        }
        if let Some(v) = env_string("FRAMEBRIDGE_SCRIPT_ORIGIN") {
            config.script_origin = v;
        }
        if let Some(v) = env_string("FRAMEBRIDGE_IS_ADMIN") {
            config.is_admin = matches!(v.as_str(), "1" | "true" | "yes");
        }
        config.contact_url = env_string("FRAMEBRIDGE_CONTACT_URL").or(config.contact_url);
        config
    }

    /// Loads the environment-driven config, then overlays a TOML file (path
    /// via FRAMEBRIDGE_HOST_CONFIG or ./framebridge_host.toml) if present.
    pub fn load() -> Self {
        let base = Self::from_env();
        let path = std::env::var("FRAMEBRIDGE_HOST_CONFIG")
            .unwrap_or_else(|_| "framebridge_host.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "host", path = %path, "No TOML config found; using defaults/env");
            return base;
        }
        let overlaid = fs::read_to_string(p)
            .map_err(|e| HostError::Config(e.to_string()))
            .and_then(|s| Self::overlay_toml(base.clone(), &s));
        match overlaid {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(target: "host", path = %path, error = %e, "Ignoring TOML config");
                base
            }
        }
    }

    /// Applies the fields present in `toml` on top of `base`.
    pub fn overlay_toml(base: Self, toml: &str) -> Result<Self> {
        let file: HostToml = toml::from_str(toml).map_err(|e| HostError::Config(e.to_string()))?;
        Ok(file.overlay(base))
    }

    /// The answer to a script's initialization handshake.
    pub fn game_state(&self) -> GameState {
        GameState {
            player_name: self.player_name.clone(),
            tags: self.tags.clone(),
            uuid: self.uuid.clone(),
            user_room_token: self.user_room_token.clone(),
            room_id: self.room_id.clone(),
            map_url: self.map_url.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct HostToml {
    script_origin: Option<String>,
    contact_url: Option<String>,
    player: Option<PlayerToml>,
    room: Option<RoomToml>,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerToml {
    name: Option<String>,
    tags: Option<Vec<String>>,
    uuid: Option<String>,
    user_room_token: Option<String>,
    is_admin: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RoomToml {
    id: Option<String>,
    map_url: Option<String>,
}

impl HostToml {
    fn overlay(self, mut base: HostConfig) -> HostConfig {
        if let Some(v) = self.script_origin {
            base.script_origin = v;
        }
        if let Some(v) = self.contact_url {
            base.contact_url = Some(v);
        }
        if let Some(p) = self.player {
            if let Some(v) = p.name {
                base.player_name = v;
            }
            if let Some(v) = p.tags {
                base.tags = v;
            }
            if let Some(v) = p.uuid {
                base.uuid = Some(v);
            }
            if let Some(v) = p.user_room_token {
                base.user_room_token = Some(v);
            }
            if let Some(v) = p.is_admin {
                base.is_admin = v;
            }
        }
        if let Some(r) = self.room {
            if let Some(v) = r.id {
                base.room_id = v;
            }
            if let Some(v) = r.map_url {
                base.map_url = v;
            }
        }
        base
    }
}
