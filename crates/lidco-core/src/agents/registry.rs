//! Copy-on-write agent registry
//!
//! Readers take an [`Arc<AgentSnapshot>`] and keep it for the whole run, so a
//! reload never changes an agent underneath an in-flight request. Writers
//! build a complete new snapshot and swap it in; the lock is only held for
//! the pointer swap.

use super::agent::Agent;
use super::config::AgentConfig;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Immutable set of agents at one generation
#[derive(Debug, Default)]
pub struct AgentSnapshot {
    generation: u64,
    agents: BTreeMap<String, Arc<Agent>>,
}

impl AgentSnapshot {
    fn build(generation: u64, configs: impl IntoIterator<Item = AgentConfig>) -> Self {
        let agents = configs
            .into_iter()
            .map(|config| (config.name.clone(), Arc::new(Agent::new(config))))
            .collect();
        Self { generation, agents }
    }

    /// Generation counter; increases with every swap
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Look up an agent
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.get(name).cloned()
    }

    /// Check if an agent exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Agent names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    /// Agents, sorted by name
    pub fn agents(&self) -> impl Iterator<Item = &Arc<Agent>> {
        self.agents.values()
    }

    /// Number of agents
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Holder of the current [`AgentSnapshot`]
#[derive(Debug)]
pub struct AgentRegistry {
    current: RwLock<Arc<AgentSnapshot>>,
}

impl AgentRegistry {
    /// Create a registry at generation 1
    pub fn new(configs: impl IntoIterator<Item = AgentConfig>) -> Self {
        Self {
            current: RwLock::new(Arc::new(AgentSnapshot::build(1, configs))),
        }
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<AgentSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Current generation
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    /// Swap in a new agent set; returns the new generation
    pub fn replace(&self, configs: impl IntoIterator<Item = AgentConfig>) -> u64 {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let generation = current.generation + 1;
        let snapshot = AgentSnapshot::build(generation, configs);
        info!(generation, agents = snapshot.len(), "Agent registry replaced");
        *current = Arc::new(snapshot);
        generation
    }

    /// Add or replace one agent; returns the new generation
    pub fn register(&self, config: AgentConfig) -> u64 {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let generation = current.generation + 1;
        let mut agents = current.agents.clone();
        info!(agent = %config.name, generation, "Agent registered");
        agents.insert(config.name.clone(), Arc::new(Agent::new(config)));
        *current = Arc::new(AgentSnapshot { generation, agents });
        generation
    }
}
