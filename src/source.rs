// 🔌 Data-layer seams - what the console core consumes but never implements
//
// The backend offers one-shot reads (entity list, members of an entity) and
// push-based live feeds. A live feed is handed a FeedSink to push into and
// returns a Subscription that owns its unsubscribe capability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::entities::Residential;
use crate::error::ConsoleResult;
use crate::residents::ResidentRecord;

// ============================================================================
// FEED PAYLOAD
// ============================================================================

/// One row of a live feed (a visitor entry, a payment, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,

    /// Sort field; most recent rows are shown first
    pub timestamp: DateTime<Utc>,

    /// Remaining document fields, passed through untouched
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl FeedItem {
    pub fn new(id: &str, timestamp: DateTime<Utc>) -> Self {
        FeedItem {
            id: id.to_string(),
            timestamp,
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: serde_json::Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }
}

/// A full payload from one source, stamped with the scope generation
/// that was current when the subscription was opened
#[derive(Debug, Clone)]
pub struct FeedUpdate {
    pub source_id: String,
    pub generation: u64,
    pub items: Vec<FeedItem>,
}

// ============================================================================
// FEED SINK
// ============================================================================

/// Write end handed to a live feed. Every payload is tagged with the source
/// it was opened for, so the feed cannot misattribute rows.
#[derive(Clone)]
pub struct FeedSink {
    source_id: String,
    generation: u64,
    tx: UnboundedSender<FeedUpdate>,
}

impl FeedSink {
    pub(crate) fn new(source_id: &str, generation: u64, tx: UnboundedSender<FeedUpdate>) -> Self {
        FeedSink {
            source_id: source_id.to_string(),
            generation,
            tx,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Push the latest full payload. Returns false once the aggregator is gone.
    pub fn deliver(&self, items: Vec<FeedItem>) -> bool {
        let update = FeedUpdate {
            source_id: self.source_id.clone(),
            generation: self.generation,
            items,
        };

        if self.tx.send(update).is_err() {
            tracing::debug!(source_id = %self.source_id, "feed delivered after aggregator closed");
            return false;
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for FeedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedSink")
            .field("source_id", &self.source_id)
            .field("generation", &self.generation)
            .finish()
    }
}

// ============================================================================
// SUBSCRIPTION HANDLE
// ============================================================================

type Unsubscribe = Box<dyn FnOnce() + Send>;

/// Owns the unsubscribe capability of one live feed.
///
/// The capability runs exactly once: through `unsubscribe()`, or when the
/// handle is dropped (scope change, teardown, error unwinding).
pub struct Subscription {
    id: Uuid,
    source_id: String,
    unsubscribe: Option<Unsubscribe>,
}

impl Subscription {
    pub fn new<F>(source_id: &str, unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Subscription {
            id: Uuid::new_v4(),
            source_id: source_id.to_string(),
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn is_active(&self) -> bool {
        self.unsubscribe.is_some()
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
            tracing::debug!(
                subscription = %self.id,
                source_id = %self.source_id,
                "unsubscribed"
            );
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("source_id", &self.source_id)
            .field("active", &self.is_active())
            .finish()
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// One-shot reads against the residential backend
pub trait ResidentialDirectory {
    fn fetch_entity_list(&self) -> ConsoleResult<Vec<Residential>>;

    fn fetch_members(&self, entity_id: &str) -> ConsoleResult<Vec<ResidentRecord>>;
}

/// Push-based live feed, one per residential entity.
/// Reconnection is the implementor's business; the console never retries.
pub trait FeedSource {
    fn subscribe(&self, entity_id: &str, sink: FeedSink) -> ConsoleResult<Subscription>;
}
