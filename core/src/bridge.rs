use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, info, warn};

use crate::api::{NavCommands, PlayerCommands, RoomCommands, UiCommands};
use crate::config::BridgeConfig;
use crate::context::HostContext;
use crate::correlator::{Correlator, Resolution};
use crate::envelope::{CorrelationId, Envelope};
use crate::messages::{self, types, GameState};
use crate::payload::Payload;
use crate::publisher::Publisher;
use crate::registry::{CallbackId, CallbackRegistry, DispatchReport, HandlerResult};
use crate::schema::{Schema, SchemaRegistry, SchemaViolation};
use crate::transport::Transport;
use crate::{BridgeError, Result};

/// What [`Bridge::handle_message`] did with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Correlated message, routed to the pending query table
    Response(Resolution),
    /// Notification, fanned out to the registered callbacks
    Dispatched(DispatchReport),
    /// Failed validation at the boundary and was dropped
    Dropped(SchemaViolation),
}

struct BridgeInner {
    publisher: Publisher,
    correlator: Correlator,
    callbacks: CallbackRegistry,
    schemas: SchemaRegistry,
    context: HostContext,
    init: OnceCell<()>,
    // Local click callbacks of registered menus, by menu name
    menus: DashMap<String, CallbackId>,
    closed: AtomicBool,
}

/// Script-side end of the boundary.
///
/// One `Bridge` owns the pending query table, the callback registry, the
/// boundary schemas and the host context. Clones share the same instance.
/// Inbound messages enter through [`Bridge::handle_message`] (or
/// [`Bridge::run`], which feeds it from a channel); everything else is
/// outbound.
///
/// # Examples
///
/// ```no_run
/// use framebridge_core::{Bridge, BridgeConfig, ChannelTransport};
/// use std::sync::Arc;
///
/// # async fn example(inbound: tokio::sync::mpsc::UnboundedReceiver<serde_json::Value>) -> framebridge_core::Result<()> {
/// let (to_host, _host_rx) = ChannelTransport::pair();
/// let bridge = Bridge::new(Arc::new(to_host), BridgeConfig::default());
/// tokio::spawn({
///     let bridge = bridge.clone();
///     async move { bridge.run(inbound).await }
/// });
///
/// bridge.on_init().await?;
/// println!("Hello {}", bridge.player().name()?);
/// bridge.player().set_outline_color(255, 0, 0).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl Bridge {
    pub fn new(transport: Arc<dyn Transport>, config: BridgeConfig) -> Self {
        let schemas = SchemaRegistry::new();
        messages::register_host_events(&schemas);

        Self {
            inner: Arc::new(BridgeInner {
                publisher: Publisher::new(transport),
                correlator: Correlator::new(config.id_prefix, config.pending_warn_threshold),
                callbacks: CallbackRegistry::new(),
                schemas,
                context: HostContext::new(),
                init: OnceCell::new(),
                menus: DashMap::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn context(&self) -> &HostContext {
        &self.inner.context
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.inner.callbacks
    }

    pub fn correlator(&self) -> &Correlator {
        &self.inner.correlator
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.inner.schemas
    }

    pub(crate) fn menus(&self) -> &DashMap<String, CallbackId> {
        &self.inner.menus
    }

    pub fn player(&self) -> PlayerCommands<'_> {
        PlayerCommands::new(self)
    }

    pub fn room(&self) -> RoomCommands<'_> {
        RoomCommands::new(self)
    }

    pub fn ui(&self) -> UiCommands<'_> {
        UiCommands::new(self)
    }

    pub fn nav(&self) -> NavCommands<'_> {
        NavCommands::new(self)
    }

    /// The single inbound entry point.
    ///
    /// Malformed envelopes and payloads failing their type's schema are logged
    /// and dropped; callbacks never see them.
    pub fn handle_message(&self, raw: Value) -> Inbound {
        let envelope = match Envelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(violation) => {
                warn!(target: "bridge", %violation, "Dropping malformed message");
                return Inbound::Dropped(violation);
            }
        };

        if envelope.is_correlated() {
            return Inbound::Response(self.inner.correlator.resolve(&envelope));
        }

        if let Err(violation) = self.inner.schemas.check(&envelope.type_tag, &envelope.data) {
            warn!(target: "bridge", type_tag = %envelope.type_tag, %violation, "Dropping invalid message");
            return Inbound::Dropped(violation);
        }

        let report = self.inner.callbacks.dispatch(&envelope);
        debug!(
            target: "bridge",
            type_tag = %envelope.type_tag,
            delivered = report.delivered,
            failed = report.failed,
            "Dispatched message"
        );
        Inbound::Dispatched(report)
    }

    /// Feeds `handle_message` until the host side goes away, then closes.
    pub async fn run(&self, mut inbound: mpsc::UnboundedReceiver<Value>) {
        info!(target: "bridge", "Bridge listening for host messages");
        while let Some(raw) = inbound.recv().await {
            self.handle_message(raw);
        }
        info!(target: "bridge", "Host channel closed");
        self.close();
    }

    /// Fire-and-forget notification to the host.
    pub fn publish<T: Serialize + ?Sized>(&self, type_tag: &str, data: &T) -> Result<()> {
        self.inner.publisher.publish_typed(type_tag, data)
    }

    /// Sends a query and waits for the host's answer.
    ///
    /// The answer is validated against `R::schema()` before it resolves the
    /// query; an invalid answer is dropped and the query stays pending. There
    /// is no timeout. Fails with [`BridgeError::Closed`] if the bridge closes
    /// first.
    pub async fn query<Q, R>(&self, type_tag: &str, data: &Q) -> Result<R>
    where
        Q: Serialize + ?Sized,
        R: Payload,
    {
        if self.is_closed() {
            return Err(BridgeError::Closed);
        }
        let data = serde_json::to_value(data)?;
        let (id, rx) = self.inner.correlator.begin(type_tag, R::schema());

        // close() may have run between the check above and begin()
        if self.is_closed() {
            self.inner.correlator.abandon(&id);
            return Err(BridgeError::Closed);
        }
        if let Err(err) = self
            .inner
            .publisher
            .send(&Envelope::query(type_tag, data, id.clone()))
        {
            self.inner.correlator.abandon(&id);
            return Err(err);
        }

        let value = rx.await.map_err(|_| BridgeError::Closed)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Registers a typed callback for host notifications of `type_tag`.
    ///
    /// If the tag has no boundary schema yet, `T::schema()` becomes it.
    pub fn on<T, F>(&self, type_tag: &str, handler: F) -> CallbackId
    where
        T: Payload,
        F: Fn(T) -> HandlerResult + Send + Sync + 'static,
    {
        if self.inner.schemas.ensure(type_tag, T::schema()) {
            debug!(target: "bridge", type_tag = %type_tag, "Boundary schema taken from handler payload");
        }
        self.inner.callbacks.register_typed::<T, F>(type_tag, handler)
    }

    pub fn off(&self, id: &CallbackId) -> bool {
        self.inner.callbacks.deregister(id)
    }

    /// Replaces the boundary schema of a host notification type.
    pub fn register_schema(&self, type_tag: &str, schema: Schema) {
        self.inner.schemas.register(type_tag, schema);
    }

    /// Runs the initialization handshake once and waits for it.
    ///
    /// The first caller sends the `getState` query; concurrent and later
    /// callers wait on the same result. Host context accessors only work once
    /// this has resolved.
    pub async fn on_init(&self) -> Result<()> {
        self.inner
            .init
            .get_or_try_init(|| async move {
                let state: GameState = self.query(types::GET_STATE, &()).await?;
                self.inner.context.apply(state);
                info!(target: "bridge", "Initialization handshake complete");
                Ok::<(), BridgeError>(())
            })
            .await?;
        Ok(())
    }

    /// Tears the bridge down: every pending query fails with `Closed`, and so
    /// does every later one. Registered callbacks stay in place.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let rejected = self.inner.correlator.reject_all();
        info!(target: "bridge", rejected, "Bridge closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    /// Correlation ids still waiting for an answer, sorted.
    pub fn pending_ids(&self) -> Vec<CorrelationId> {
        self.inner.correlator.pending_ids()
    }
}
