//! Host menu: the built-in entries plus whatever scripts register.

use std::collections::HashMap;

use tracing::{debug, warn};
use url::Url;

use crate::Result;

/// Built-in menu entries. Scripts can neither register nor remove them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedMenu {
    Profile,
    GlobalMessages,
    Contact,
    Settings,
    Invite,
    Credit,
}

impl ReservedMenu {
    /// Initial menu order.
    pub const ALL: [ReservedMenu; 6] = [
        ReservedMenu::Profile,
        ReservedMenu::GlobalMessages,
        ReservedMenu::Contact,
        ReservedMenu::Settings,
        ReservedMenu::Invite,
        ReservedMenu::Credit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReservedMenu::Profile => "Profile",
            ReservedMenu::GlobalMessages => "Global Messages",
            ReservedMenu::Contact => "Contact",
            ReservedMenu::Settings => "Settings",
            ReservedMenu::Invite => "Invite",
            ReservedMenu::Credit => "Credit",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }
}

/// Iframe shown when a custom menu entry is picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuIframe {
    pub url: Url,
    pub allow_api: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// Name already in the menu (built-in or custom); nothing changed
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unregistration {
    Removed,
    /// Built-in entries cannot be removed; nothing changed
    Reserved,
    Unknown,
}

/// Ordered list of visible menu entries and the iframes of custom ones.
#[derive(Debug, Clone)]
pub struct MenuRegistry {
    entries: Vec<String>,
    iframes: HashMap<String, MenuIframe>,
}

impl Default for MenuRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self {
            entries: ReservedMenu::ALL.iter().map(|m| m.label().to_string()).collect(),
            iframes: HashMap::new(),
        }
    }

    /// Adds a custom entry. A relative `iframe` is resolved against `origin`,
    /// the URL the registering script was loaded from.
    pub fn register(
        &mut self,
        name: &str,
        iframe: Option<&str>,
        origin: Option<&Url>,
        allow_api: bool,
    ) -> Result<Registration> {
        if self.contains(name) || ReservedMenu::from_label(name).is_some() {
            warn!(target: "menu_registry", menu = %name, "The menu already exists");
            return Ok(Registration::AlreadyExists);
        }

        // Resolve first so a bad URL leaves the menu untouched.
        let iframe = match iframe {
            Some(raw) => {
                let url = match origin {
                    Some(base) => base.join(raw)?,
                    None => Url::parse(raw)?,
                };
                Some(MenuIframe { url, allow_api })
            }
            None => None,
        };

        self.entries.push(name.to_string());
        if let Some(iframe) = iframe {
            debug!(target: "menu_registry", menu = %name, url = %iframe.url, "Registered iframe menu");
            self.iframes.insert(name.to_string(), iframe);
        } else {
            debug!(target: "menu_registry", menu = %name, "Registered callback menu");
        }
        Ok(Registration::Added)
    }

    pub fn unregister(&mut self, name: &str) -> Unregistration {
        if ReservedMenu::from_label(name).is_some() {
            warn!(target: "menu_registry", menu = %name, "Built-in menus can't be removed");
            return Unregistration::Reserved;
        }
        self.iframes.remove(name);
        match self.entries.iter().position(|e| e == name) {
            Some(index) => {
                self.entries.remove(index);
                debug!(target: "menu_registry", menu = %name, "Unregistered menu");
                Unregistration::Removed
            }
            None => Unregistration::Unknown,
        }
    }

    /// Re-evaluates the conditional built-in entries. Global Messages is for
    /// admins only; Contact needs a contact page.
    pub fn refresh_visibility(&mut self, is_admin: bool, has_contact_page: bool) {
        let global = ReservedMenu::GlobalMessages.label();
        let contact = ReservedMenu::Contact.label();
        self.entries.retain(|e| e != global && e != contact);
        if is_admin {
            self.entries.push(global.to_string());
        }
        if has_contact_page {
            self.entries.push(contact.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e == name)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn iframe(&self, name: &str) -> Option<&MenuIframe> {
        self.iframes.get(name)
    }
}
