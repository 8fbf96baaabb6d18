//! Get-or-create registry of data providers.
//!
//! Providers are keyed by normalized collection path. A path is bound to
//! the entity type it was first requested with.

use crate::error::{ProviderError, ProviderResult};
use crate::provider::DataProvider;
use crate::tree_provider::TreeDataProvider;
use canopy_codec::Document;
use canopy_store::{TreeStore, path};
use parking_lot::Mutex;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Type-erased handle used to tear a provider down.
pub trait Observable: Send + Sync {
    fn cancel_observation(&self);
}

impl<T: Document> Observable for TreeDataProvider<T> {
    fn cancel_observation(&self) {
        DataProvider::cancel_observation(self);
    }
}

struct Entry {
    provider: Arc<dyn Any + Send + Sync>,
    observable: Arc<dyn Observable>,
    entity: &'static str,
}

/// Hands out one provider per collection path.
pub struct DataProviderFactory {
    store: Arc<dyn TreeStore>,
    providers: Mutex<HashMap<String, Entry>>,
}

impl DataProviderFactory {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        info!(backend = store.backend_name(), "data provider factory ready");
        Self {
            store,
            providers: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn TreeStore> {
        &self.store
    }

    /// Returns the provider for `collection`, creating it on first use.
    ///
    /// `"messages"`, `"/messages"` and `"messages/"` name the same provider.
    pub fn get_provider<T: Document>(
        &self,
        collection: &str,
    ) -> ProviderResult<Arc<TreeDataProvider<T>>> {
        let key = normalize(collection)?;
        let mut providers = self.providers.lock();

        if let Some(entry) = providers.get(&key) {
            return entry
                .provider
                .clone()
                .downcast::<TreeDataProvider<T>>()
                .map_err(|_| ProviderError::TypeMismatch {
                    path: key,
                    expected: type_name::<T>(),
                    actual: entry.entity,
                });
        }

        let provider = Arc::new(TreeDataProvider::<T>::new(self.store.clone(), key.clone()));
        debug!(path = %key, entity = type_name::<T>(), "provider created");
        providers.insert(
            key,
            Entry {
                provider: provider.clone(),
                observable: provider.clone(),
                entity: type_name::<T>(),
            },
        );
        Ok(provider)
    }

    /// Cancels the observation of one provider and forgets it. Returns
    /// whether a provider was registered for `collection`.
    pub fn teardown(&self, collection: &str) -> ProviderResult<bool> {
        let key = normalize(collection)?;
        let removed = self.providers.lock().remove(&key);
        Ok(match removed {
            Some(entry) => {
                entry.observable.cancel_observation();
                debug!(path = %key, "provider torn down");
                true
            }
            None => false,
        })
    }

    /// Cancels and forgets every provider.
    pub fn teardown_all(&self) {
        let drained: Vec<Entry> = self.providers.lock().drain().map(|(_, e)| e).collect();
        let count = drained.len();
        for entry in drained {
            entry.observable.cancel_observation();
        }
        if count > 0 {
            info!(count, "all providers torn down");
        }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.lock().len()
    }
}

impl Drop for DataProviderFactory {
    fn drop(&mut self) {
        self.teardown_all();
    }
}

fn normalize(collection: &str) -> ProviderResult<String> {
    let normalized = path::normalize(collection)
        .map_err(|e| ProviderError::InvalidPath(e.to_string()))?;
    if normalized.is_empty() {
        return Err(ProviderError::InvalidPath(format!(
            "{collection:?} does not name a collection"
        )));
    }
    Ok(normalized)
}
