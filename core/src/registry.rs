use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::envelope::Envelope;
use crate::payload::Payload;
use crate::schema::Schema;
use crate::BridgeError;

/// Failure reported by a callback. Logged by the registry, never propagated.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<BridgeError> for HandlerError {
    fn from(err: BridgeError) -> Self {
        Self(err.to_string())
    }
}

pub type HandlerResult = std::result::Result<(), HandlerError>;

pub type Handler = Arc<dyn Fn(&Value) -> HandlerResult + Send + Sync>;

/// Handle returned by [`CallbackRegistry::register`], used to deregister.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackId {
    type_tag: String,
    seq: u64,
}

impl CallbackId {
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }
}

struct CallbackEntry {
    seq: u64,
    guard: Schema,
    handler: Handler,
}

/// Outcome of one dispatch, mostly useful to tests and logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that ran and returned `Ok`
    pub delivered: usize,
    /// Entries whose own guard rejected the payload
    pub rejected: usize,
    /// Handlers that returned an error or panicked
    pub failed: usize,
}

/// Type tag → ordered subscriber list.
///
/// Every entry keeps its own guard and re-validates the payload before its
/// handler runs, even when the boundary already checked it. Handlers run
/// synchronously in registration order; a failing or panicking handler is
/// logged and the remaining entries still run.
#[derive(Default)]
pub struct CallbackRegistry {
    entries: DashMap<String, Vec<Arc<CallbackEntry>>>,
    next_seq: AtomicU64,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an untyped handler guarded by `guard`.
    pub fn register<F>(&self, type_tag: impl Into<String>, guard: Schema, handler: F) -> CallbackId
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        let type_tag = type_tag.into();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(CallbackEntry {
            seq,
            guard,
            handler: Arc::new(handler),
        });

        self.entries
            .entry(type_tag.clone())
            .or_default()
            .push(entry);

        debug!(target: "callback_registry", type_tag = %type_tag, seq, "Registered callback");
        CallbackId { type_tag, seq }
    }

    /// Register a handler receiving the payload narrowed into `T`.
    pub fn register_typed<T, F>(&self, type_tag: impl Into<String>, handler: F) -> CallbackId
    where
        T: Payload,
        F: Fn(T) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(type_tag, T::schema(), move |data: &Value| {
            let payload = serde_json::from_value::<T>(data.clone()).map_err(BridgeError::from)?;
            handler(payload)
        })
    }

    /// Removes one entry. Returns false if it was already gone.
    pub fn deregister(&self, id: &CallbackId) -> bool {
        let removed = match self.entries.get_mut(&id.type_tag) {
            Some(mut list) => {
                let before = list.len();
                list.retain(|e| e.seq != id.seq);
                list.len() != before
            }
            None => false,
        };
        self.entries.remove_if(&id.type_tag, |_, list| list.is_empty());

        if removed {
            debug!(target: "callback_registry", type_tag = %id.type_tag, seq = id.seq, "Deregistered callback");
        }
        removed
    }

    pub fn len_for(&self, type_tag: &str) -> usize {
        self.entries.get(type_tag).map(|l| l.len()).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every entry registered for the envelope's type tag.
    pub fn dispatch(&self, envelope: &Envelope) -> DispatchReport {
        // Snapshot so handlers may register or deregister without deadlocking.
        let snapshot: Vec<Arc<CallbackEntry>> = match self.entries.get(&envelope.type_tag) {
            Some(list) => list.clone(),
            None => {
                debug!(target: "callback_registry", type_tag = %envelope.type_tag, "No callbacks for type");
                return DispatchReport::default();
            }
        };

        let mut report = DispatchReport::default();
        for entry in snapshot {
            if let Err(violation) = entry.guard.validate(&envelope.data) {
                warn!(
                    target: "callback_registry",
                    type_tag = %envelope.type_tag,
                    seq = entry.seq,
                    %violation,
                    "Callback guard rejected payload"
                );
                report.rejected += 1;
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| (entry.handler)(&envelope.data))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    error!(target: "callback_registry", type_tag = %envelope.type_tag, seq = entry.seq, error = %err, "Callback failed");
                    report.failed += 1;
                }
                Err(panic) => {
                    error!(
                        target: "callback_registry",
                        type_tag = %envelope.type_tag,
                        seq = entry.seq,
                        panic = %panic_message(panic.as_ref()),
                        "Callback panicked"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Mutex;

    fn zone() -> Envelope {
        Envelope::event("enterEvent", json!({"name": "iframeMenu"}))
    }

    fn name_schema() -> Schema {
        Schema::object().field("name", Schema::string()).build()
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let seen = Arc::clone(&seen);
            registry.register("enterEvent", name_schema(), move |_| {
                seen.lock().unwrap().push(i);
                Ok(())
            });
        }

        let report = registry.dispatch(&zone());
        assert_eq!(report.delivered, 3);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn failing_handlers_do_not_block_siblings() {
        let registry = CallbackRegistry::new();
        let calls = Arc::new(Mutex::new(0));

        registry.register("enterEvent", name_schema(), |_| Err(HandlerError::new("boom")));
        registry.register("enterEvent", name_schema(), |_| panic!("handler panicked"));
        let c = Arc::clone(&calls);
        registry.register("enterEvent", name_schema(), move |_| {
            *c.lock().unwrap() += 1;
            Ok(())
        });

        let report = registry.dispatch(&zone());
        assert_eq!(report.failed, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn each_entry_applies_its_own_guard() {
        let registry = CallbackRegistry::new();
        registry.register("enterEvent", name_schema(), |_| Ok(()));
        registry.register(
            "enterEvent",
            Schema::object().field("layer", Schema::string()).build(),
            |_| Ok(()),
        );

        let report = registry.dispatch(&zone());
        assert_eq!(report.delivered, 1);
        assert_eq!(report.rejected, 1);
    }

    #[test]
    fn deregister_removes_only_that_entry() {
        let registry = CallbackRegistry::new();
        let first = registry.register("enterEvent", name_schema(), |_| Ok(()));
        let _second = registry.register("enterEvent", name_schema(), |_| Ok(()));

        assert!(registry.deregister(&first));
        assert!(!registry.deregister(&first));
        assert_eq!(registry.len_for("enterEvent"), 1);
        assert_eq!(registry.dispatch(&zone()).delivered, 1);
    }

    #[test]
    fn deregistering_last_entry_drops_the_tag() {
        let registry = CallbackRegistry::new();
        let id = registry.register("enterEvent", name_schema(), |_| Ok(()));
        registry.deregister(&id);
        assert!(registry.is_empty());
        assert_eq!(registry.dispatch(&zone()), DispatchReport::default());
    }

    #[derive(Deserialize)]
    struct Zone {
        name: String,
    }

    impl Payload for Zone {
        fn schema() -> Schema {
            name_schema()
        }
    }

    #[test]
    fn typed_handlers_receive_narrowed_payload() {
        let registry = CallbackRegistry::new();
        let names = Arc::new(Mutex::new(Vec::new()));
        let n = Arc::clone(&names);
        registry.register_typed::<Zone, _>("enterEvent", move |zone| {
            n.lock().unwrap().push(zone.name);
            Ok(())
        });

        registry.dispatch(&zone());
        registry.dispatch(&Envelope::event("enterEvent", json!({"name": 5})));
        assert_eq!(*names.lock().unwrap(), vec!["iframeMenu".to_string()]);
    }

    #[test]
    fn handlers_may_register_during_dispatch() {
        let registry = Arc::new(CallbackRegistry::new());
        let r = Arc::clone(&registry);
        registry.register("enterEvent", name_schema(), move |_| {
            r.register("leaveEvent", name_schema(), |_| Ok(()));
            Ok(())
        });

        registry.dispatch(&zone());
        assert_eq!(registry.len_for("leaveEvent"), 1);
    }
}
