//! The data provider contract.

use crate::error::ProviderResult;
use async_trait::async_trait;
use canopy_codec::Document;
use canopy_store::WriteHandle;
use canopy_types::ObservationType;

/// Receives the child events of an observation.
///
/// A removed child arrives as a default entity carrying only its id.
pub type ChildHandler<T> = Box<dyn Fn(ObservationType, T) + Send + Sync>;

/// A create whose write has been issued but not confirmed.
#[derive(Debug)]
pub struct PendingWrite {
    id: String,
    handle: WriteHandle,
}

impl PendingWrite {
    pub(crate) fn new(id: String, handle: WriteHandle) -> Self {
        Self { id, handle }
    }

    /// Id of the created or updated entity.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drops the write handle, keeping only the id.
    pub fn into_id(self) -> String {
        self.id
    }

    /// Waits until the store confirms the write.
    pub async fn confirmed(self) -> ProviderResult<String> {
        self.handle.wait().await?;
        Ok(self.id)
    }
}

/// Typed access to one collection of entities.
///
/// Writes are fire-and-forget: they return once issued. Reads resolve
/// exactly once. At most one observation is live per provider; starting
/// another one cancels the first.
#[async_trait]
pub trait DataProvider<T: Document>: Send + Sync {
    /// Collection path served by this provider.
    fn path(&self) -> &str;

    /// Creates or upserts `entity` and returns its id.
    ///
    /// An entity without an id is given a fresh store key first. Fields
    /// that encode as null are left untouched in the store.
    fn create(&self, entity: &mut T) -> ProviderResult<String>;

    /// Like [`create`](Self::create), but the caller can await the write.
    fn create_with_ack(&self, entity: &mut T) -> ProviderResult<PendingWrite>;

    /// Reads one entity. `None` when absent or undecodable.
    async fn read(&self, id: &str) -> ProviderResult<Option<T>>;

    /// Reads the whole collection in key order, skipping undecodable
    /// records.
    async fn read_all(&self) -> ProviderResult<Vec<T>>;

    /// The first entity whose `field` equals `value`, using a single
    /// limited query.
    async fn read_first_from_child_value(&self, field: &str, value: &str)
    -> ProviderResult<Option<T>>;

    /// Every entity whose `field`, in stored textual form, is exactly
    /// `value`.
    async fn read_all_with_child_value(&self, field: &str, value: &str) -> ProviderResult<Vec<T>>;

    /// Up to `page_size` entities, newest key first, strictly older than
    /// `cursor` when one is given.
    async fn read_page_from_newest(
        &self,
        page_size: usize,
        cursor: Option<&str>,
    ) -> ProviderResult<Vec<T>>;

    /// Whether a child with this id exists.
    async fn exists(&self, id: &str) -> ProviderResult<bool>;

    /// Removes one entity. Removing an absent entity succeeds.
    fn delete(&self, id: &str) -> WriteHandle;

    /// Observes every child of the collection.
    fn observe(&self, handler: ChildHandler<T>) -> ProviderResult<()>;

    /// Observes the children whose key sorts after `after_id` (all of them
    /// when `after_id` is empty).
    fn observe_after_id(&self, after_id: &str, handler: ChildHandler<T>) -> ProviderResult<()>;

    /// Stops the current observation, if any.
    fn cancel_observation(&self);

    fn has_observation(&self) -> bool;
}
