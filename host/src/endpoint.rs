//! Host side of the boundary.
//!
//! The endpoint validates every script message with the same schema
//! machinery the script side uses, answers queries under the query's own
//! correlation id, and owns the host state scripts act on (menu, co-websites,
//! player outline). Messages are handled one at a time, in arrival order.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use framebridge_core::messages::{
    self, types, CloseCoWebsiteEvent, MenuItemClickedEvent, MenuRegisterEvent,
    OpenCoWebsiteEvent, PlayerMovedEvent, PlayerOutline, UnregisterMenuEvent, UrlEvent, ZoneEvent,
};
use framebridge_core::{narrow, Envelope, Publisher, Schema, SchemaRegistry, Transport};
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::HostConfig;
use crate::cowebsite::{CoWebsiteEntry, CoWebsiteList};
use crate::menu::{MenuIframe, MenuRegistry, ReservedMenu};
use crate::{HostError, Result};

/// Answers one query type. Registered handlers take precedence over the
/// built-in answers.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    /// The returned value is sent back as the response payload. An error
    /// leaves the query unanswered.
    async fn answer(&self, data: Value) -> Result<Value>;
}

/// What the host did when the player picked a menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    /// `menuItemClicked` went to the script that registered the entry
    Dispatched,
    /// Custom entry backed by an iframe; the host opens it itself
    OpenIframe(MenuIframe),
    BuiltIn(ReservedMenu),
    Unknown,
}

#[derive(Debug, Default)]
struct EndpointState {
    menus: MenuRegistry,
    co_websites: CoWebsiteList,
    outline: Option<PlayerOutline>,
    move_subscribed: bool,
    opened_tabs: Vec<String>,
    current_page: Option<String>,
}

struct EndpointInner {
    config: HostConfig,
    origin: Url,
    publisher: Publisher,
    schemas: SchemaRegistry,
    handlers: DashMap<String, Arc<dyn QueryHandler>>,
    state: RwLock<EndpointState>,
}

#[derive(Clone)]
pub struct HostEndpoint {
    inner: Arc<EndpointInner>,
}

impl HostEndpoint {
    pub fn new(transport: Arc<dyn Transport>, config: HostConfig) -> Result<Self> {
        let origin = Url::parse(&config.script_origin)?;
        let schemas = SchemaRegistry::new();
        messages::register_script_messages(&schemas);

        let mut menus = MenuRegistry::new();
        menus.refresh_visibility(config.is_admin, config.contact_url.is_some());

        Ok(Self {
            inner: Arc::new(EndpointInner {
                config,
                origin,
                publisher: Publisher::new(transport),
                schemas,
                handlers: DashMap::new(),
                state: RwLock::new(EndpointState {
                    menus,
                    ..EndpointState::default()
                }),
            }),
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    /// Installs a handler for a query type. Types without a registered
    /// schema accept any payload.
    pub fn register_handler(&self, type_tag: &str, handler: Arc<dyn QueryHandler>) {
        self.inner.schemas.ensure(type_tag, Schema::any());
        debug!(target: "host", type_tag = %type_tag, "Registering query handler");
        self.inner.handlers.insert(type_tag.to_string(), handler);
    }

    pub async fn handle_message(&self, raw: Value) {
        let envelope = match Envelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(violation) => {
                warn!(target: "host", %violation, "Dropping malformed script message");
                return;
            }
        };
        if let Err(violation) = self.inner.schemas.check(&envelope.type_tag, &envelope.data) {
            warn!(target: "host", type_tag = %envelope.type_tag, %violation, "Dropping invalid script message");
            return;
        }

        if envelope.is_correlated() {
            self.answer(envelope).await;
        } else if let Err(e) = self.handle_event(&envelope).await {
            warn!(target: "host", type_tag = %envelope.type_tag, error = %e, "Failed to handle script event");
        }
    }

    /// Handles script messages until the script side goes away.
    pub async fn run(&self, mut inbound: mpsc::UnboundedReceiver<Value>) {
        info!(target: "host", "Host endpoint listening for script messages");
        while let Some(raw) = inbound.recv().await {
            self.handle_message(raw).await;
        }
        info!(target: "host", "Script channel closed");
    }

    async fn answer(&self, query: Envelope) {
        let handler = self
            .inner
            .handlers
            .get(&query.type_tag)
            .map(|h| Arc::clone(h.value()));

        let result = match handler {
            Some(handler) => handler.answer(query.data.clone()).await,
            None => self.builtin_answer(&query).await,
        };

        match result {
            Ok(data) => {
                if let Err(e) = self.inner.publisher.send(&query.response(data)) {
                    warn!(target: "host", type_tag = %query.type_tag, error = %e, "Could not deliver answer");
                }
            }
            Err(e) => {
                error!(
                    target: "host",
                    type_tag = %query.type_tag,
                    id = ?query.id,
                    error = %e,
                    "Query failed; no answer sent"
                );
            }
        }
    }

    async fn builtin_answer(&self, query: &Envelope) -> Result<Value> {
        let data = query.data.clone();
        match query.type_tag.as_str() {
            types::GET_STATE => Ok(serde_json::to_value(self.inner.config.game_state())?),
            types::SET_PLAYER_OUTLINE => {
                let outline: PlayerOutline = narrow(data)?;
                self.inner.state.write().await.outline = Some(outline);
                Ok(Value::Null)
            }
            types::REMOVE_PLAYER_OUTLINE => {
                self.inner.state.write().await.outline = None;
                Ok(Value::Null)
            }
            types::OPEN_CO_WEBSITE => {
                let request: OpenCoWebsiteEvent = narrow(data)?;
                let url = self.inner.origin.join(&request.url)?;
                let info = self.inner.state.write().await.co_websites.open(
                    url,
                    request.allow_api.unwrap_or(false),
                    request.allow_policy,
                    request.position,
                );
                Ok(serde_json::to_value(info)?)
            }
            types::CLOSE_CO_WEBSITE => {
                let request: CloseCoWebsiteEvent = narrow(data)?;
                if !self.inner.state.write().await.co_websites.close(&request.id) {
                    warn!(target: "host", id = %request.id, "Closing unknown co-website");
                }
                Ok(Value::Null)
            }
            types::GET_CO_WEBSITES => {
                let list = self.inner.state.read().await.co_websites.list();
                Ok(serde_json::to_value(list)?)
            }
            other => Err(HostError::Query(format!("no handler for query `{other}`"))),
        }
    }

    async fn handle_event(&self, event: &Envelope) -> Result<()> {
        let data = event.data.clone();
        match event.type_tag.as_str() {
            types::ON_PLAYER_MOVE => {
                self.inner.state.write().await.move_subscribed = true;
            }
            types::REGISTER_MENU => {
                let request: MenuRegisterEvent = narrow(data)?;
                self.inner.state.write().await.menus.register(
                    &request.name,
                    request.iframe.as_deref(),
                    Some(&self.inner.origin),
                    request.options.allow_api,
                )?;
            }
            types::UNREGISTER_MENU => {
                let request: UnregisterMenuEvent = narrow(data)?;
                self.inner.state.write().await.menus.unregister(&request.name);
            }
            types::OPEN_TAB => {
                let request: UrlEvent = narrow(data)?;
                info!(target: "host", url = %request.url, "Opening tab");
                self.inner.state.write().await.opened_tabs.push(request.url);
            }
            types::GO_TO_PAGE => {
                let request: UrlEvent = narrow(data)?;
                info!(target: "host", url = %request.url, "Navigating away");
                self.inner.state.write().await.current_page = Some(request.url);
            }
            other => {
                debug!(target: "host", type_tag = %other, "No host behavior for event");
            }
        }
        Ok(())
    }

    /// Forwards a movement to the script, if it asked for movements.
    pub async fn player_moved(&self, event: &PlayerMovedEvent) -> Result<bool> {
        if !self.inner.state.read().await.move_subscribed {
            return Ok(false);
        }
        self.inner.publisher.publish_typed(types::HAS_PLAYER_MOVED, event)?;
        Ok(true)
    }

    pub fn enter_zone(&self, name: &str) -> Result<()> {
        let event = ZoneEvent {
            name: name.to_string(),
        };
        Ok(self.inner.publisher.publish_typed(types::ENTER_EVENT, &event)?)
    }

    pub fn leave_zone(&self, name: &str) -> Result<()> {
        let event = ZoneEvent {
            name: name.to_string(),
        };
        Ok(self.inner.publisher.publish_typed(types::LEAVE_EVENT, &event)?)
    }

    /// The player picked `name` in the host menu.
    pub async fn click_menu(&self, name: &str) -> Result<MenuAction> {
        {
            let state = self.inner.state.read().await;
            if !state.menus.contains(name) {
                return Ok(MenuAction::Unknown);
            }
            if let Some(reserved) = ReservedMenu::from_label(name) {
                return Ok(MenuAction::BuiltIn(reserved));
            }
            if let Some(iframe) = state.menus.iframe(name) {
                return Ok(MenuAction::OpenIframe(iframe.clone()));
            }
        }
        let event = MenuItemClickedEvent {
            menu_item: name.to_string(),
        };
        self.inner
            .publisher
            .publish_typed(types::MENU_ITEM_CLICKED, &event)?;
        Ok(MenuAction::Dispatched)
    }

    /// Re-evaluates the admin-only and contact entries, e.g. after the
    /// player's rights changed.
    pub async fn refresh_menu_visibility(&self, is_admin: bool) {
        let has_contact = self.inner.config.contact_url.is_some();
        self.inner
            .state
            .write()
            .await
            .menus
            .refresh_visibility(is_admin, has_contact);
    }

    pub async fn menu_entries(&self) -> Vec<String> {
        self.inner.state.read().await.menus.entries().to_vec()
    }

    pub async fn menu_iframe(&self, name: &str) -> Option<MenuIframe> {
        self.inner.state.read().await.menus.iframe(name).cloned()
    }

    pub async fn outline(&self) -> Option<PlayerOutline> {
        self.inner.state.read().await.outline
    }

    pub async fn co_website(&self, id: &str) -> Option<CoWebsiteEntry> {
        self.inner.state.read().await.co_websites.get(id).cloned()
    }

    pub async fn opened_tabs(&self) -> Vec<String> {
        self.inner.state.read().await.opened_tabs.clone()
    }

    pub async fn current_page(&self) -> Option<String> {
        self.inner.state.read().await.current_page.clone()
    }

    pub async fn is_move_subscribed(&self) -> bool {
        self.inner.state.read().await.move_subscribed
    }
}
