//! Tag-keyed read-through cache.
//!
//! Reads are memoized under a tag until something revalidates that tag.
//! Revalidation clears the entry, bumps the tag's generation and announces
//! the tag on the event bus. A load that started before a revalidation is
//! returned to its caller but never stored, so a stale value cannot outlive
//! the read that produced it.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use fresco_core::error::FrescoResult;

use crate::event_bus::{AppEvent, EventBus};

struct Entries<T> {
    values: HashMap<String, T>,
    generations: HashMap<String, u64>,
}

impl<T> Entries<T> {
    fn generation(&self, tag: &str) -> u64 {
        self.generations.get(tag).copied().unwrap_or(0)
    }
}

/// Memoizes values of type `T` under string tags.
#[derive(Clone)]
pub struct TagCache<T: Clone + Send + Sync> {
    entries: Arc<RwLock<Entries<T>>>,
    event_bus: EventBus,
}

impl<T: Clone + Send + Sync> TagCache<T> {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries {
                values: HashMap::new(),
                generations: HashMap::new(),
            })),
            event_bus,
        }
    }

    /// Return the cached value for `tag`, loading and storing it on a miss.
    /// A failed load is not cached, nor is one raced by a revalidation.
    pub async fn get_or_load<F>(&self, tag: &str, load: F) -> FrescoResult<T>
    where
        F: FnOnce() -> FrescoResult<T>,
    {
        let started_at = {
            let entries = self.entries.read().await;
            if let Some(hit) = entries.values.get(tag) {
                debug!("cache hit for {tag}");
                return Ok(hit.clone());
            }
            entries.generation(tag)
        };

        let value = load()?;

        let mut entries = self.entries.write().await;
        if entries.generation(tag) == started_at {
            entries.values.insert(tag.to_string(), value.clone());
            debug!("cache filled for {tag}");
        } else {
            debug!("discarding load for {tag}, revalidated mid-read");
        }
        Ok(value)
    }

    /// Drop the entry for `tag` and announce it.
    pub async fn revalidate(&self, tag: &str) {
        {
            let mut entries = self.entries.write().await;
            entries.values.remove(tag);
            *entries.generations.entry(tag.to_string()).or_insert(0) += 1;
        }
        self.event_bus.emit(AppEvent::CacheRevalidated {
            tag: tag.to_string(),
        });
    }

    /// Whether a value is currently cached for `tag`.
    pub async fn contains(&self, tag: &str) -> bool {
        self.entries.read().await.values.contains_key(tag)
    }
}
