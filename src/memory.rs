// 🧪 In-process collaborators - directory + live feed hub held in memory
// Behave like the hosted backend: a new subscriber immediately receives the
// current snapshot, later publishes push full payloads to live subscribers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::entities::Residential;
use crate::error::{ConsoleError, ConsoleResult};
use crate::residents::ResidentRecord;
use crate::source::{FeedItem, FeedSink, FeedSource, ResidentialDirectory, Subscription};

// ============================================================================
// IN-MEMORY DIRECTORY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    entities: Vec<Residential>,
    members: HashMap<String, Vec<ResidentRecord>>,
    unreachable: HashSet<String>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, entity: Residential) {
        self.entities.push(entity);
    }

    pub fn add_member(&mut self, entity_id: &str, record: ResidentRecord) {
        self.members.entry(entity_id.to_string()).or_default().push(record);
    }

    /// Member reads for this entity fail from now on
    pub fn mark_unreachable(&mut self, entity_id: &str) {
        self.unreachable.insert(entity_id.to_string());
    }
}

impl ResidentialDirectory for InMemoryDirectory {
    fn fetch_entity_list(&self) -> ConsoleResult<Vec<Residential>> {
        Ok(self.entities.clone())
    }

    fn fetch_members(&self, entity_id: &str) -> ConsoleResult<Vec<ResidentRecord>> {
        if self.unreachable.contains(entity_id) {
            return Err(ConsoleError::FetchFailed {
                entity_id: entity_id.to_string(),
                reason: "entity unreachable".to_string(),
            });
        }

        if !self.entities.iter().any(|e| e.id == entity_id) {
            return Err(ConsoleError::EntityNotFound(entity_id.to_string()));
        }

        Ok(self.members.get(entity_id).cloned().unwrap_or_default())
    }
}

// ============================================================================
// IN-MEMORY FEED HUB
// ============================================================================

#[derive(Default)]
struct HubState {
    /// Live sinks per entity, keyed by an internal token
    sinks: HashMap<String, Vec<(Uuid, FeedSink)>>,

    /// Latest payload per entity, replayed to new subscribers
    snapshots: HashMap<String, Vec<FeedItem>>,

    failing: HashSet<String>,
}

/// Clones share the same hub
#[derive(Clone, Default)]
pub struct InMemoryFeedHub {
    state: Arc<Mutex<HubState>>,
}

impl InMemoryFeedHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the entity's payload and push it to every live subscriber.
    /// Returns how many subscribers received it.
    pub fn publish(&self, entity_id: &str, items: Vec<FeedItem>) -> usize {
        let mut state = self.state();
        state.snapshots.insert(entity_id.to_string(), items.clone());

        let Some(sinks) = state.sinks.get(entity_id) else {
            return 0;
        };

        sinks
            .iter()
            .filter(|(_, sink)| sink.deliver(items.clone()))
            .count()
    }

    /// Subscribing to this entity fails from now on
    pub fn fail_on(&self, entity_id: &str) {
        self.state().failing.insert(entity_id.to_string());
    }

    pub fn active_subscriptions(&self) -> usize {
        self.state().sinks.values().map(Vec::len).sum()
    }

    pub fn subscribers_of(&self, entity_id: &str) -> usize {
        self.state().sinks.get(entity_id).map_or(0, Vec::len)
    }
}

impl FeedSource for InMemoryFeedHub {
    fn subscribe(&self, entity_id: &str, sink: FeedSink) -> ConsoleResult<Subscription> {
        let token = Uuid::new_v4();
        {
            let mut state = self.state();
            if state.failing.contains(entity_id) {
                return Err(ConsoleError::SubscriptionFailed {
                    source_id: entity_id.to_string(),
                    reason: "listener rejected".to_string(),
                });
            }

            if let Some(snapshot) = state.snapshots.get(entity_id) {
                sink.deliver(snapshot.clone());
            }

            state
                .sinks
                .entry(entity_id.to_string())
                .or_default()
                .push((token, sink));
        }

        let hub = Arc::clone(&self.state);
        let key = entity_id.to_string();
        Ok(Subscription::new(entity_id, move || {
            let mut state = hub.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(sinks) = state.sinks.get_mut(&key) {
                sinks.retain(|(t, _)| *t != token);
                if sinks.is_empty() {
                    state.sinks.remove(&key);
                }
            }
        }))
    }
}
