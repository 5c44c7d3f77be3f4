// 📡 Subscription Aggregator - Many live feeds, one sorted list
//
// One live feed per residential entity in scope. Every payload replaces that
// source's rows in the merged list, which is then re-sorted newest first.
// Changing scope tears down every feed and clears the list before the new
// feeds are opened, so rows of two scopes are never shown together.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::AggregatorConfig;
use crate::entities::{Residential, ResidentialRegistry};
use crate::source::{FeedItem, FeedSink, FeedSource, FeedUpdate, Subscription};

// ============================================================================
// SCOPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// One feed per entity known when the scope is activated
    AllEntities,

    SingleEntity(String),
}

// ============================================================================
// AGGREGATED ROWS
// ============================================================================

/// A feed row tagged with the entity it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedItem {
    #[serde(flatten)]
    pub item: FeedItem,

    pub source_id: String,

    pub source_label: String,
}

/// One open feed and the last payload it delivered
#[derive(Debug)]
pub struct SubscriptionEntry {
    pub source_id: String,
    pub last_known_items: Vec<FeedItem>,
    subscription: Subscription,
}

impl SubscriptionEntry {
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

type ChangeListener = Box<dyn FnMut(&[AggregatedItem])>;

// ============================================================================
// SUBSCRIPTION AGGREGATOR
// ============================================================================

/// Owns every subscription it opens; all of them are released on scope
/// change, on `teardown()`, or when the aggregator is dropped.
///
/// Single-threaded: payloads queue on an internal channel and are merged by
/// `pump()` or `next_update()`, one at a time, in arrival order.
pub struct SubscriptionAggregator<S: FeedSource> {
    source: S,
    registry: ResidentialRegistry,
    scope: Option<Scope>,

    /// Bumped on every scope change; payloads from older scopes are dropped
    generation: u64,

    entries: BTreeMap<String, SubscriptionEntry>,
    results: Vec<AggregatedItem>,
    loading: bool,

    tx: UnboundedSender<FeedUpdate>,
    rx: UnboundedReceiver<FeedUpdate>,
    listener: Option<ChangeListener>,
}

impl<S: FeedSource> SubscriptionAggregator<S> {
    pub fn new(source: S, entities: Vec<Residential>, config: &AggregatorConfig) -> Self {
        let mut registry = ResidentialRegistry::with_unknown_label(&config.unknown_label);
        registry.replace_all(entities);

        let (tx, rx) = mpsc::unbounded_channel();
        SubscriptionAggregator {
            source,
            registry,
            scope: None,
            generation: 0,
            entries: BTreeMap::new(),
            results: Vec::new(),
            loading: false,
            tx,
            rx,
            listener: None,
        }
    }

    /// Called with the merged list after every change
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: FnMut(&[AggregatedItem]) + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    /// Refresh the entity list used for labels and for the next
    /// `AllEntities` activation. Open feeds are left alone.
    pub fn set_entities(&mut self, entities: Vec<Residential>) {
        self.registry.replace_all(entities);
    }

    /// Replace every open feed with the feeds of `scope`.
    pub fn set_scope(&mut self, scope: Scope) {
        self.close_all();
        self.generation += 1;

        let source_ids = match &scope {
            Scope::AllEntities => self.registry.ids(),
            Scope::SingleEntity(id) => vec![id.clone()],
        };

        tracing::info!(
            scope = ?scope,
            generation = self.generation,
            sources = source_ids.len(),
            "activating feed scope"
        );

        for source_id in source_ids {
            let sink = FeedSink::new(&source_id, self.generation, self.tx.clone());
            match self.source.subscribe(&source_id, sink) {
                Ok(subscription) => {
                    self.entries.insert(
                        source_id.clone(),
                        SubscriptionEntry {
                            source_id,
                            last_known_items: Vec::new(),
                            subscription,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(source_id = %source_id, error = %e, "skipping feed source");
                }
            }
        }

        // Nothing to wait for: report "no data" instead of loading forever
        self.loading = !self.entries.is_empty();
        self.scope = Some(scope);
        self.notify();
    }

    /// Release every feed and clear the merged list
    pub fn teardown(&mut self) {
        self.close_all();
        self.generation += 1;
        self.scope = None;
        self.loading = false;
        self.notify();
    }

    fn close_all(&mut self) {
        let closed = self.entries.len();
        for (_, entry) in std::mem::take(&mut self.entries) {
            entry.subscription.unsubscribe();
        }
        self.results.clear();

        // Anything still queued belongs to the feeds just closed
        while self.rx.try_recv().is_ok() {}

        if closed > 0 {
            tracing::debug!(closed, "closed feed subscriptions");
        }
    }

    /// Merge one payload. Returns false when it was ignored because its
    /// scope is gone or its source has no open feed.
    pub fn apply(&mut self, update: FeedUpdate) -> bool {
        if update.generation != self.generation {
            tracing::debug!(source_id = %update.source_id, "dropping payload from previous scope");
            return false;
        }

        let Some(entry) = self.entries.get_mut(&update.source_id) else {
            tracing::debug!(source_id = %update.source_id, "dropping payload from closed feed");
            return false;
        };
        entry.last_known_items = update.items.clone();

        let label = self.registry.label_for(&update.source_id);
        self.results.retain(|row| row.source_id != update.source_id);
        self.results.extend(update.items.into_iter().map(|item| AggregatedItem {
            item,
            source_id: update.source_id.clone(),
            source_label: label.clone(),
        }));

        // stable: equal timestamps keep insertion order
        self.results
            .sort_by(|a, b| b.item.timestamp.cmp(&a.item.timestamp));

        self.loading = false;
        self.notify();
        true
    }

    /// Merge every payload already queued. Returns how many were merged.
    pub fn pump(&mut self) -> usize {
        let mut merged = 0;
        while let Ok(update) = self.rx.try_recv() {
            if self.apply(update) {
                merged += 1;
            }
        }
        merged
    }

    /// Wait for the next payload and merge it
    pub async fn next_update(&mut self) -> bool {
        match self.rx.recv().await {
            Some(update) => self.apply(update),
            None => false,
        }
    }

    fn notify(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&self.results);
        }
    }

    pub fn results(&self) -> &[AggregatedItem] {
        &self.results
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    pub fn active_sources(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn last_known_items(&self, source_id: &str) -> Option<&[FeedItem]> {
        self.entries
            .get(source_id)
            .map(|e| e.last_known_items.as_slice())
    }

    pub fn registry(&self) -> &ResidentialRegistry {
        &self.registry
    }
}

impl<S: FeedSource> Drop for SubscriptionAggregator<S> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!(open = self.entries.len(), "aggregator dropped with open feeds");
        }
        for (_, entry) in std::mem::take(&mut self.entries) {
            entry.subscription.unsubscribe();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryFeedHub;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn item(id: &str, secs: i64) -> FeedItem {
        FeedItem::new(id, Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn entities() -> Vec<Residential> {
        vec![
            Residential::new("R1", "Los Pinos", "PIN01"),
            Residential::new("R2", "Los Olmos", "OLM02"),
        ]
    }

    fn aggregator(hub: &InMemoryFeedHub) -> SubscriptionAggregator<InMemoryFeedHub> {
        SubscriptionAggregator::new(hub.clone(), entities(), &AggregatorConfig::default())
    }

    fn ids(aggregator: &SubscriptionAggregator<InMemoryFeedHub>) -> Vec<&str> {
        aggregator.results().iter().map(|r| r.item.id.as_str()).collect()
    }

    #[test]
    fn test_merge_replaces_source_rows_and_sorts() {
        let hub = InMemoryFeedHub::new();
        let mut aggregator = aggregator(&hub);
        aggregator.set_scope(Scope::SingleEntity("R1".to_string()));
        assert!(aggregator.is_loading());

        hub.publish("R1", vec![item("x1", 100)]);
        assert_eq!(aggregator.pump(), 1);
        assert_eq!(ids(&aggregator), vec!["x1"]);
        assert!(!aggregator.is_loading());

        hub.publish("R1", vec![item("x1", 100), item("x2", 200)]);
        aggregator.pump();
        assert_eq!(ids(&aggregator), vec!["x2", "x1"]);
        assert_eq!(aggregator.results()[0].source_label, "Los Pinos");
    }

    #[test]
    fn test_redelivery_is_idempotent() {
        let hub = InMemoryFeedHub::new();
        let mut aggregator = aggregator(&hub);
        aggregator.set_scope(Scope::SingleEntity("R1".to_string()));

        let payload = vec![item("a", 1), item("b", 2)];
        hub.publish("R1", payload.clone());
        hub.publish("R1", payload.clone());
        assert_eq!(aggregator.pump(), 2);

        assert_eq!(ids(&aggregator), vec!["b", "a"]);
        assert_eq!(aggregator.last_known_items("R1"), Some(payload.as_slice()));
    }

    #[test]
    fn test_all_entities_merges_sources() {
        let hub = InMemoryFeedHub::new();
        let mut aggregator = aggregator(&hub);
        aggregator.set_scope(Scope::AllEntities);
        assert_eq!(aggregator.active_sources(), vec!["R1", "R2"]);

        hub.publish("R2", vec![item("o1", 150)]);
        hub.publish("R1", vec![item("p1", 100), item("p2", 300)]);
        aggregator.pump();
        assert_eq!(ids(&aggregator), vec!["p2", "o1", "p1"]);

        hub.publish("R2", vec![]);
        aggregator.pump();
        assert_eq!(ids(&aggregator), vec!["p2", "p1"]);

        let timestamps: Vec<_> = aggregator.results().iter().map(|r| r.item.timestamp).collect();
        assert!(timestamps.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_merge_ignores_arrival_order_across_sources() {
        let forward_hub = InMemoryFeedHub::new();
        let mut forward = aggregator(&forward_hub);
        forward.set_scope(Scope::AllEntities);
        forward_hub.publish("R1", vec![item("p1", 100), item("p2", 300)]);
        forward_hub.publish("R2", vec![item("o1", 150), item("o2", 50)]);
        forward.pump();

        let backward_hub = InMemoryFeedHub::new();
        let mut backward = aggregator(&backward_hub);
        backward.set_scope(Scope::AllEntities);
        backward_hub.publish("R2", vec![item("o1", 150), item("o2", 50)]);
        backward_hub.publish("R1", vec![item("p1", 100), item("p2", 300)]);
        backward.pump();

        assert_eq!(ids(&forward), vec!["p2", "o1", "p1", "o2"]);
        assert_eq!(forward.results(), backward.results());
    }

    #[test]
    fn test_scope_change_drops_late_payloads() {
        let hub = InMemoryFeedHub::new();
        let mut aggregator = aggregator(&hub);
        aggregator.set_scope(Scope::SingleEntity("R1".to_string()));
        hub.publish("R1", vec![item("a1", 100)]);
        aggregator.pump();

        // queued but not merged before the switch
        hub.publish("R1", vec![item("a2", 500)]);
        aggregator.set_scope(Scope::SingleEntity("R2".to_string()));
        assert!(aggregator.results().is_empty());
        assert_eq!(hub.subscribers_of("R1"), 0);

        hub.publish("R1", vec![item("a3", 900)]);
        hub.publish("R2", vec![item("b1", 50)]);
        aggregator.pump();

        assert_eq!(ids(&aggregator), vec!["b1"]);
        assert!(aggregator.results().iter().all(|r| r.source_id == "R2"));
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let hub = InMemoryFeedHub::new();
        let mut aggregator = aggregator(&hub);
        aggregator.set_scope(Scope::SingleEntity("R1".to_string()));
        aggregator.set_scope(Scope::SingleEntity("R1".to_string()));

        let stale = FeedUpdate {
            source_id: "R1".to_string(),
            generation: 1,
            items: vec![item("old", 1)],
        };
        assert!(!aggregator.apply(stale));
        assert!(aggregator.results().is_empty());
    }

    #[test]
    fn test_failed_source_is_skipped() {
        let hub = InMemoryFeedHub::new();
        hub.fail_on("R1");
        let mut aggregator = aggregator(&hub);
        aggregator.set_scope(Scope::AllEntities);

        assert_eq!(aggregator.active_sources(), vec!["R2"]);
        hub.publish("R2", vec![item("o1", 10)]);
        aggregator.pump();
        assert_eq!(ids(&aggregator), vec!["o1"]);
    }

    #[test]
    fn test_empty_entity_list_reports_no_data() {
        let hub = InMemoryFeedHub::new();
        let mut aggregator =
            SubscriptionAggregator::new(hub.clone(), vec![], &AggregatorConfig::default());
        aggregator.set_scope(Scope::AllEntities);

        assert!(!aggregator.is_loading());
        assert!(aggregator.results().is_empty());
        assert_eq!(hub.active_subscriptions(), 0);
    }

    #[test]
    fn test_unknown_source_label() {
        let hub = InMemoryFeedHub::new();
        let config = AggregatorConfig {
            unknown_label: "Desconocido".to_string(),
        };
        let mut aggregator = SubscriptionAggregator::new(hub.clone(), entities(), &config);
        aggregator.set_scope(Scope::SingleEntity("R9".to_string()));

        hub.publish("R9", vec![item("z", 1)]);
        aggregator.pump();
        assert_eq!(aggregator.results()[0].source_label, "Desconocido");
    }

    #[test]
    fn test_teardown_and_drop_release_every_feed() {
        let hub = InMemoryFeedHub::new();
        let mut aggregator = aggregator(&hub);
        aggregator.set_scope(Scope::AllEntities);
        assert_eq!(hub.active_subscriptions(), 2);

        aggregator.teardown();
        assert_eq!(hub.active_subscriptions(), 0);
        assert_eq!(aggregator.scope(), None);

        aggregator.set_scope(Scope::AllEntities);
        assert_eq!(hub.active_subscriptions(), 2);
        drop(aggregator);
        assert_eq!(hub.active_subscriptions(), 0);
    }

    #[test]
    fn test_listener_sees_every_change() {
        let hub = InMemoryFeedHub::new();
        let mut aggregator = aggregator(&hub);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        aggregator.on_change(move |rows| sink.borrow_mut().push(rows.len()));

        aggregator.set_scope(Scope::SingleEntity("R1".to_string()));
        hub.publish("R1", vec![item("a", 1), item("b", 2)]);
        aggregator.pump();
        aggregator.set_scope(Scope::SingleEntity("R2".to_string()));

        assert_eq!(*seen.borrow(), vec![0, 2, 0]);
    }

    #[tokio::test]
    async fn test_next_update_merges_one_payload() {
        let hub = InMemoryFeedHub::new();
        hub.publish("R1", vec![item("snap", 5)]);

        let mut aggregator = aggregator(&hub);
        aggregator.set_scope(Scope::SingleEntity("R1".to_string()));

        assert!(aggregator.next_update().await);
        assert_eq!(ids(&aggregator), vec!["snap"]);
    }
}
