//! [`DataProvider`] over any [`TreeStore`].

use crate::error::{ProviderError, ProviderResult};
use crate::observation::{Gate, ListenerGuard, Observation};
use crate::provider::{ChildHandler, DataProvider, PendingWrite};
use async_trait::async_trait;
use canopy_codec::{Document, Field, Identifiable, NodeMap, decode_keyed, decode_list, encode};
use canopy_store::{ChildChange, ChildSink, Query, StoreError, StoreResult, TreeStore, WriteHandle};
use canopy_types::ObservationType;
use parking_lot::Mutex;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// A data provider for the collection of `T` stored at one path.
pub struct TreeDataProvider<T> {
    store: Arc<dyn TreeStore>,
    path: String,
    current: Mutex<Option<Observation>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for TreeDataProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeDataProvider")
            .field("entity", &type_name::<T>())
            .field("path", &self.path)
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl<T: Document> TreeDataProvider<T> {
    /// Creates a provider for `path`, which is used as given.
    pub fn new(store: Arc<dyn TreeStore>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
            current: Mutex::new(None),
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn TreeStore> {
        &self.store
    }

    fn child_path(&self, id: &str) -> StoreResult<String> {
        if id.is_empty() || id.contains('/') {
            return Err(StoreError::InvalidPath(format!(
                "{id:?} is not a child id of {:?}",
                self.path
            )));
        }
        Ok(canopy_store::path::child(&self.path, id))
    }

    /// Child path and encoded mapping for `entity`. Nothing is written
    /// unless both succeed.
    fn prepare_write(&self, entity: &T) -> ProviderResult<(String, NodeMap)> {
        let child = self.child_path(entity.id())?;
        Ok((child, encode(entity)?))
    }

    fn field(name: &str) -> ProviderResult<&'static Field<T>> {
        T::field(name).ok_or_else(|| ProviderError::MissingField {
            entity: type_name::<T>(),
            field: name.to_string(),
        })
    }

    /// Replaces the current observation with one over `query`.
    ///
    /// `skip` names a key whose Added event is suppressed.
    fn start_observation(
        &self,
        query: Query,
        skip: Option<String>,
        handler: ChildHandler<T>,
    ) -> ProviderResult<()> {
        self.cancel_observation();

        let gate = Gate::open();
        let sink = observation_sink(gate.clone(), self.path.clone(), skip, handler);

        let previous = self.current.lock().replace(Observation {
            gate: gate.clone(),
            guard: None,
        });
        drop(previous);

        // The store may replay children into the sink before returning.
        let id = match self.store.listen(&self.path, &query, sink) {
            Ok(id) => id,
            Err(e) => {
                self.take_if(&gate);
                return Err(e.into());
            }
        };
        let guard = ListenerGuard::new(self.store.clone(), id);

        let mut current = self.current.lock();
        match current.as_mut() {
            Some(observation) if observation.gate.same(&gate) => {
                observation.guard = Some(guard);
                debug!(path = %self.path, %id, "observation started");
            }
            _ => {
                // Cancelled or superseded while the store was replaying.
                drop(current);
                drop(guard);
            }
        }
        Ok(())
    }

    fn take_if(&self, gate: &Gate) {
        let taken = {
            let mut current = self.current.lock();
            match current.as_ref() {
                Some(observation) if observation.gate.same(gate) => current.take(),
                _ => None,
            }
        };
        drop(taken);
    }
}

/// Builds the sink that decodes store changes for `handler`.
fn observation_sink<T: Document>(
    gate: Gate,
    path: String,
    skip: Option<String>,
    handler: ChildHandler<T>,
) -> ChildSink {
    Arc::new(move |change| {
        gate.pass(|| match change {
            ChildChange::Added { key, value, .. } => {
                if skip.as_deref() == Some(key.as_str()) {
                    debug!(%path, %key, "suppressing boundary child");
                    return;
                }
                deliver(&handler, &path, ObservationType::ChildAdded, &key, &value);
            }
            ChildChange::Changed { key, value, .. } => {
                deliver(&handler, &path, ObservationType::ChildChanged, &key, &value);
            }
            ChildChange::Removed { key } => {
                let mut removed = T::default();
                removed.set_id(key);
                handler(ObservationType::ChildRemoved, removed);
            }
            ChildChange::Moved { key, .. } => {
                panic!(
                    "child {key:?} of {path:?} was reordered; observations only run \
                     key-ordered or unordered queries, so the backend broke its contract"
                );
            }
        });
    })
}

fn deliver<T: Document>(
    handler: &ChildHandler<T>,
    path: &str,
    kind: ObservationType,
    key: &str,
    value: &serde_json::Value,
) {
    match decode_keyed::<T>(key, value) {
        Ok(Some(entity)) => handler(kind, entity),
        Ok(None) => warn!(path, key, %kind, "dropping event for a child that is not a record"),
        Err(e) => warn!(path, key, %kind, error = %e, "dropping undecodable child event"),
    }
}

#[async_trait]
impl<T: Document> DataProvider<T> for TreeDataProvider<T> {
    fn path(&self) -> &str {
        &self.path
    }

    fn create(&self, entity: &mut T) -> ProviderResult<String> {
        Ok(self.create_with_ack(entity)?.into_id())
    }

    fn create_with_ack(&self, entity: &mut T) -> ProviderResult<PendingWrite> {
        let generated = !entity.is_persisted();
        if generated {
            entity.set_id(self.store.push_key(&self.path));
        }

        let (child, values) = match self.prepare_write(entity) {
            Ok(written) => written,
            Err(e) => {
                if generated {
                    entity.set_id(String::new());
                }
                return Err(e);
            }
        };

        debug!(path = %self.path, id = entity.id(), generated, "create");
        let handle = self.store.update(&child, values);
        Ok(PendingWrite::new(entity.id().to_string(), handle))
    }

    async fn read(&self, id: &str) -> ProviderResult<Option<T>> {
        let child = self.child_path(id)?;
        let snapshot = self.store.get(&child, &Query::new()).await?;
        match decode_keyed::<T>(id, snapshot.value()) {
            Ok(entity) => Ok(entity),
            Err(e) => {
                warn!(path = %self.path, id, error = %e, "dropping undecodable record");
                Ok(None)
            }
        }
    }

    async fn read_all(&self) -> ProviderResult<Vec<T>> {
        let snapshot = self.store.get(&self.path, &Query::new()).await?;
        Ok(decode_list::<T>(snapshot.value()).into_values().collect())
    }

    async fn read_first_from_child_value(
        &self,
        field: &str,
        value: &str,
    ) -> ProviderResult<Option<T>> {
        let target = Self::field(field)?;
        let query = Query::new()
            .order_by_child(field)
            .equal_to(target.query_value(value))
            .limit_to_first(1);
        let snapshot = self.store.get(&self.path, &query).await?;
        Ok(decode_list::<T>(snapshot.value()).into_values().next())
    }

    async fn read_all_with_child_value(&self, field: &str, value: &str) -> ProviderResult<Vec<T>> {
        let target = Self::field(field)?;
        let query = Query::new()
            .order_by_child(field)
            .equal_to(target.query_value(value));
        let snapshot = self.store.get(&self.path, &query).await?;

        // Range equality in the store can match values whose text differs.
        let matches = decode_list::<T>(snapshot.value())
            .into_values()
            .filter(|entity| match target.text(entity) {
                Ok(text) => text.as_deref() == Some(value),
                Err(e) => {
                    debug!(field, error = %e, "field has no textual form");
                    false
                }
            })
            .collect();
        Ok(matches)
    }

    async fn read_page_from_newest(
        &self,
        page_size: usize,
        cursor: Option<&str>,
    ) -> ProviderResult<Vec<T>> {
        if page_size == 0 {
            return Ok(Vec::new());
        }
        let cursor = cursor.filter(|c| !c.is_empty());

        let limit = u32::try_from(page_size).unwrap_or(u32::MAX);
        let mut query = Query::new().order_by_key();
        query = match cursor {
            Some(cursor) => query.end_at(cursor).limit_to_last(limit.saturating_add(1)),
            None => query.limit_to_last(limit),
        };

        let snapshot = self.store.get(&self.path, &query).await?;
        let mut page: Vec<T> = decode_list::<T>(snapshot.value())
            .into_iter()
            .filter(|(key, entity)| cursor != Some(key.as_str()) && cursor != Some(entity.id()))
            .map(|(_, entity)| entity)
            .collect();
        page.sort_by(|a, b| b.id().cmp(a.id()));
        page.truncate(page_size);
        Ok(page)
    }

    async fn exists(&self, id: &str) -> ProviderResult<bool> {
        let child = self.child_path(id)?;
        Ok(self.store.get(&child, &Query::new()).await?.exists())
    }

    fn delete(&self, id: &str) -> WriteHandle {
        match self.child_path(id) {
            Ok(child) => {
                debug!(path = %self.path, id, "delete");
                self.store.remove(&child)
            }
            Err(e) => WriteHandle::completed(&self.path, Err(e)),
        }
    }

    fn observe(&self, handler: ChildHandler<T>) -> ProviderResult<()> {
        self.start_observation(Query::new(), None, handler)
    }

    fn observe_after_id(&self, after_id: &str, handler: ChildHandler<T>) -> ProviderResult<()> {
        if after_id.is_empty() {
            return self.start_observation(Query::new().order_by_key(), None, handler);
        }
        let query = Query::new().order_by_key().start_at(after_id);
        self.start_observation(query, Some(after_id.to_string()), handler)
    }

    fn cancel_observation(&self) {
        let taken = self.current.lock().take();
        if taken.is_some() {
            debug!(path = %self.path, "observation cancelled");
        }
        drop(taken);
    }

    fn has_observation(&self) -> bool {
        self.current.lock().is_some()
    }
}
