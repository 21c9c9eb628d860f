use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::bridge::Bridge;
use crate::messages::{
    types, MenuItemClickedEvent, MenuRegisterEvent, MenuRegisterOptions, UnregisterMenuEvent,
};
use crate::registry::HandlerResult;
use crate::Result;

type ClickHandler = Arc<dyn Fn(&str) -> HandlerResult + Send + Sync>;

/// What a menu entry does when the player picks it.
#[derive(Clone)]
pub enum MenuOptions {
    /// Run a callback in the script, receiving the menu name
    Callback(ClickHandler),
    /// Let the host open an iframe, resolved against the script's origin
    Iframe { iframe: String, allow_api: bool },
}

impl MenuOptions {
    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(&str) -> HandlerResult + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(callback))
    }

    pub fn iframe(url: impl Into<String>) -> Self {
        Self::Iframe {
            iframe: url.into(),
            allow_api: false,
        }
    }

    /// Grants the menu iframe access to the scripting API. No effect on
    /// callback menus.
    pub fn allow_api(self, allow: bool) -> Self {
        match self {
            Self::Iframe { iframe, .. } => Self::Iframe {
                iframe,
                allow_api: allow,
            },
            other => other,
        }
    }
}

impl fmt::Debug for MenuOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::Iframe { iframe, allow_api } => f
                .debug_struct("Iframe")
                .field("iframe", iframe)
                .field("allow_api", allow_api)
                .finish(),
        }
    }
}

/// A registered menu entry.
#[derive(Clone)]
pub struct Menu {
    name: String,
    bridge: Bridge,
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu").field("name", &self.name).finish()
    }
}

impl Menu {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Removes the entry from the host menu and drops its local callback.
    pub fn remove(self) -> Result<()> {
        self.bridge.ui().unregister_menu(&self.name)
    }
}

pub struct UiCommands<'a> {
    bridge: &'a Bridge,
}

impl<'a> UiCommands<'a> {
    pub(crate) fn new(bridge: &'a Bridge) -> Self {
        Self { bridge }
    }

    /// Adds an entry to the host menu.
    ///
    /// Registering a name twice replaces the local click callback; the host
    /// keeps its first entry.
    pub fn register_menu_command(&self, name: &str, options: MenuOptions) -> Result<Menu> {
        let (iframe, allow_api) = match options {
            MenuOptions::Callback(callback) => {
                let menu_name = name.to_string();
                let id = self
                    .bridge
                    .on::<MenuItemClickedEvent, _>(types::MENU_ITEM_CLICKED, move |event| {
                        if event.menu_item == menu_name {
                            callback(&event.menu_item)
                        } else {
                            Ok(())
                        }
                    });
                if let Some(previous) = self.bridge.menus().insert(name.to_string(), id) {
                    debug!(target: "ui", menu = %name, "Replacing click callback");
                    self.bridge.off(&previous);
                }
                (None, false)
            }
            MenuOptions::Iframe { iframe, allow_api } => (Some(iframe), allow_api),
        };

        self.bridge.publish(
            types::REGISTER_MENU,
            &MenuRegisterEvent {
                name: name.to_string(),
                iframe,
                options: MenuRegisterOptions { allow_api },
            },
        )?;

        Ok(Menu {
            name: name.to_string(),
            bridge: self.bridge.clone(),
        })
    }

    pub fn unregister_menu(&self, name: &str) -> Result<()> {
        if let Some((_, id)) = self.bridge.menus().remove(name) {
            self.bridge.off(&id);
        }
        self.bridge.publish(
            types::UNREGISTER_MENU,
            &UnregisterMenuEvent {
                name: name.to_string(),
            },
        )
    }
}
