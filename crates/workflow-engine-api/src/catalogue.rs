//! Workflow catalogue (component D): read-only workflow definitions,
//! filtered by caller roles, memoised behind an explicit bounded LRU.
//!
//! No external LRU crate is pulled in for this — the teacher's dependency
//! stack doesn't carry one, so the bound is implemented directly as a
//! `HashMap` plus a recency `VecDeque`, matching spec-mandated sizes of 32
//! entries for per-workflow lookups and 16 for full listings.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use workflow_engine_core::error::WorkflowError;
use workflow_engine_core::workflow::WorkflowDefinition;

const PER_WORKFLOW_CAPACITY: usize = 32;
const LISTING_CAPACITY: usize = 16;

/// Backing store the catalogue reads through on a cache miss.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn load_workflow(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>, WorkflowError>;
    async fn load_all_workflows(&self) -> Result<Vec<WorkflowDefinition>, WorkflowError>;
}

/// A fixed-capacity least-recently-used map. Insert/get both refresh
/// recency; eviction drops the least-recently-touched key.
struct LruCache<K: Eq + std::hash::Hash + Clone, V: Clone> {
    capacity: usize,
    entries: HashMap<K, V>,
    recency: VecDeque<K>,
}

impl<K: Eq + std::hash::Hash + Clone, V: Clone> LruCache<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(pos);
        }
        self.recency.push_back(key.clone());
    }

    fn get(&mut self, key: &K) -> Option<V> {
        let value = self.entries.get(key).cloned();
        if value.is_some() {
            self.touch(key);
        }
        value
    }

    fn put(&mut self, key: K, value: V) {
        self.entries.insert(key.clone(), value);
        self.touch(&key);
        while self.entries.len() > self.capacity {
            if let Some(evict) = self.recency.pop_front() {
                self.entries.remove(&evict);
            } else {
                break;
            }
        }
    }
}

/// Sorts a role list into a stable cache key so `["admin","ops"]` and
/// `["ops","admin"]` address the same entry.
fn role_key(roles: &[String]) -> Vec<String> {
    let mut sorted = roles.to_vec();
    sorted.sort();
    sorted
}

fn is_authorised(def: &WorkflowDefinition, roles: &[String]) -> bool {
    roles.iter().any(|r| def.roles.contains(r))
}

type ByWorkflowCache = LruCache<(String, Vec<String>), Option<WorkflowDefinition>>;
type ListingsCache = LruCache<Vec<String>, Vec<WorkflowDefinition>>;

pub struct Catalogue<S: WorkflowStore> {
    store: S,
    by_workflow: Mutex<ByWorkflowCache>,
    listings: Mutex<ListingsCache>,
}

impl<S: WorkflowStore> Catalogue<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            by_workflow: Mutex::new(LruCache::new(PER_WORKFLOW_CAPACITY)),
            listings: Mutex::new(LruCache::new(LISTING_CAPACITY)),
        }
    }

    /// Returns the definition only if at least one of `roles` is authorised;
    /// otherwise `None`, indistinguishable from a missing workflow, by design.
    pub async fn get_steps_by_workflow_id(
        &self,
        workflow_id: &str,
        roles: &[String],
    ) -> Result<Option<WorkflowDefinition>, WorkflowError> {
        let key = (workflow_id.to_string(), role_key(roles));
        if let Some(cached) = self.by_workflow.lock().unwrap().get(&key) {
            return Ok(cached);
        }

        let loaded = self.store.load_workflow(workflow_id).await?;
        let filtered = loaded.filter(|def| is_authorised(def, roles));
        self.by_workflow.lock().unwrap().put(key, filtered.clone());
        Ok(filtered)
    }

    pub async fn get_all_workflows(&self, roles: &[String]) -> Result<Vec<WorkflowDefinition>, WorkflowError> {
        let key = role_key(roles);
        if let Some(cached) = self.listings.lock().unwrap().get(&key) {
            return Ok(cached);
        }

        let all = self.store.load_all_workflows().await?;
        let filtered: Vec<WorkflowDefinition> = all.into_iter().filter(|def| is_authorised(def, roles)).collect();
        self.listings.lock().unwrap().put(key, filtered.clone());
        Ok(filtered)
    }
}
