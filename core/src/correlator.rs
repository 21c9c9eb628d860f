use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::envelope::{CorrelationId, Envelope};
use crate::schema::{Schema, SchemaViolation};

/// A query waiting for its response.
struct PendingQuery {
    type_tag: String,
    response_schema: Schema,
    issued_at: DateTime<Utc>,
    tx: oneshot::Sender<Value>,
}

/// What happened to an inbound correlated envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The pending query was removed and its caller received the payload
    Resolved,
    /// The pending query was removed but its caller had dropped the future
    Discarded,
    /// No pending query carries this id: a duplicate, late or forged response
    Unknown,
    /// The response type tag differs from the query's; the query stays pending
    TypeMismatch { expected: String, found: String },
    /// The payload failed the response schema; the query stays pending
    Rejected(SchemaViolation),
}

/// Pending request table: correlation id → completion handle.
///
/// Ids are `{prefix}-{n}` with a per-instance counter, so no two queries of one
/// correlator ever share an id. An entry leaves the table exactly once: on the
/// first valid response, on [`Correlator::abandon`], or on
/// [`Correlator::reject_all`]. There is no timeout.
pub struct Correlator {
    prefix: String,
    next_id: AtomicU64,
    pending: DashMap<CorrelationId, PendingQuery>,
    warn_threshold: usize,
}

impl Correlator {
    pub fn new(prefix: impl Into<String>, warn_threshold: usize) -> Self {
        Self {
            prefix: prefix.into(),
            next_id: AtomicU64::new(1),
            pending: DashMap::new(),
            warn_threshold,
        }
    }

    /// Allocates an id and stores the pending entry. The caller posts the
    /// query envelope and awaits the returned receiver.
    pub fn begin(
        &self,
        type_tag: &str,
        response_schema: Schema,
    ) -> (CorrelationId, oneshot::Receiver<Value>) {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = CorrelationId::new(format!("{}-{}", self.prefix, n));
        let (tx, rx) = oneshot::channel();

        self.pending.insert(
            id.clone(),
            PendingQuery {
                type_tag: type_tag.to_string(),
                response_schema,
                issued_at: Utc::now(),
                tx,
            },
        );

        let count = self.pending.len();
        debug!(target: "correlator", id = %id, type_tag = %type_tag, pending = count, "Query pending");
        if count > self.warn_threshold {
            warn!(
                target: "correlator",
                pending = count,
                threshold = self.warn_threshold,
                "Pending query table keeps growing; the host may not be answering"
            );
        }
        (id, rx)
    }

    /// Matches a correlated envelope against the pending table.
    pub fn resolve(&self, envelope: &Envelope) -> Resolution {
        let Some(id) = &envelope.id else {
            return Resolution::Unknown;
        };

        // Validate before removal so a malformed answer cannot consume the slot.
        {
            let Some(pending) = self.pending.get(id) else {
                debug!(target: "correlator", id = %id, type_tag = %envelope.type_tag, "Ignoring response for unknown id");
                return Resolution::Unknown;
            };
            if pending.type_tag != envelope.type_tag {
                warn!(
                    target: "correlator",
                    id = %id,
                    expected = %pending.type_tag,
                    found = %envelope.type_tag,
                    "Dropping response with mismatched type"
                );
                return Resolution::TypeMismatch {
                    expected: pending.type_tag.clone(),
                    found: envelope.type_tag.clone(),
                };
            }
            if let Err(violation) = pending.response_schema.validate(&envelope.data) {
                warn!(target: "correlator", id = %id, type_tag = %envelope.type_tag, %violation, "Dropping invalid response");
                return Resolution::Rejected(violation);
            }
        }

        let Some((_, pending)) = self.pending.remove(id) else {
            return Resolution::Unknown;
        };
        let elapsed_ms = (Utc::now() - pending.issued_at).num_milliseconds();
        match pending.tx.send(envelope.data.clone()) {
            Ok(()) => {
                debug!(target: "correlator", id = %id, elapsed_ms, "Query resolved");
                Resolution::Resolved
            }
            Err(_) => {
                debug!(target: "correlator", id = %id, elapsed_ms, "Query resolved after its caller went away");
                Resolution::Discarded
            }
        }
    }

    /// Drops one pending entry without resolving it, e.g. when the query
    /// could not be posted.
    pub fn abandon(&self, id: &CorrelationId) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Drops every pending entry; their callers observe a closed channel.
    pub fn reject_all(&self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        if count > 0 {
            debug!(target: "correlator", count, "Rejected pending queries");
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn pending_ids(&self) -> Vec<CorrelationId> {
        let mut ids: Vec<CorrelationId> = self.pending.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Age of the oldest unanswered query.
    pub fn oldest_pending_age(&self) -> Option<chrono::Duration> {
        let now = Utc::now();
        self.pending
            .iter()
            .map(|e| now - e.value().issued_at)
            .max()
    }
}
