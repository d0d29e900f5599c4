//! Namespace Table
//!
//! Maps group names to their controllers. Servers are handed a `Groups`
//! instance explicitly; embedders that want the classic process-wide
//! table use the free functions, which target a lazily-created default
//! instance.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::cache::ValueView;
use crate::config::GroupConfig;
use crate::group::service::{Group, Source};

/// A named-group registry. Read-mostly: lookups vastly outnumber
/// creation and destruction.
pub struct Groups {
    map: DashMap<String, Arc<Group>>,
}

impl Groups {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Creates a group under `name` with the given origin getter. An
    /// existing group under the same name is replaced.
    pub fn create<F, Fut>(&self, name: &str, config: GroupConfig, source: F) -> Arc<Group>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ValueView>> + Send + 'static,
    {
        let source: Source = Arc::new(move |key| {
            Box::pin(source(key)) as Pin<Box<dyn Future<Output = anyhow::Result<ValueView>> + Send>>
        });
        let group = Arc::new(Group::new(name, config, source));
        self.map.insert(name.to_string(), group.clone());
        tracing::info!("Registered cache group: {}", name);
        group
    }

    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.map.get(name).map(|entry| entry.value().clone())
    }

    /// Removes the namespace. Callers holding the returned `Arc` can
    /// still drain it; new lookups miss immediately.
    pub fn destroy(&self, name: &str) -> Option<Arc<Group>> {
        let removed = self.map.remove(name).map(|(_, group)| group);
        if removed.is_some() {
            tracing::info!("Destroyed cache group: {}", name);
        }
        removed
    }

    pub fn names(&self) -> Vec<String> {
        self.map.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for Groups {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_GROUPS: OnceLock<Groups> = OnceLock::new();

/// The process-wide default table, created on first use.
pub fn default_groups() -> &'static Groups {
    DEFAULT_GROUPS.get_or_init(Groups::new)
}

/// Creates a group in the process-wide table.
pub fn new_group<F, Fut>(name: &str, config: GroupConfig, source: F) -> Arc<Group>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ValueView>> + Send + 'static,
{
    default_groups().create(name, config, source)
}

/// Looks up a group in the process-wide table.
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    default_groups().get(name)
}

/// Removes a group from the process-wide table.
pub fn destroy_group(name: &str) -> Option<Arc<Group>> {
    default_groups().destroy(name)
}
