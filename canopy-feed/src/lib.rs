//! A message feed built on Canopy data providers.
//!
//! [`MessageFeed`] is the domain service of the demo: it posts messages,
//! pages back through history and observes new arrivals, all through the
//! provider the factory hands out for the messages collection.

use canopy_codec::{Document, Field, Identifiable, field};
use canopy_provider::{
    ChildHandler, DataProvider, DataProviderFactory, Observable, ProviderResult,
    TreeDataProvider,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// One chat message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub id: String,
    pub name: String,
    pub text: String,
    pub date: DateTime<Utc>,
}

impl Message {
    /// A message that has not been posted yet, dated now.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            text: text.into(),
            date: Utc::now(),
        }
    }
}

impl Identifiable for Message {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Document for Message {
    const FIELDS: &'static [Field<Self>] = &[
        field!(Message, id),
        field!(Message, name),
        field!(Message, text),
        field!(Message, date),
    ];
}

/// Feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Collection holding the messages.
    pub messages_path: String,
    /// Page size used when a caller does not pick one.
    pub page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            messages_path: "messages".to_string(),
            page_size: 20,
        }
    }
}

/// Handle to a running observation, used to cancel it.
pub type ObservationHandle = Arc<dyn Observable>;

pub struct MessageFeed {
    factory: Arc<DataProviderFactory>,
    config: FeedConfig,
}

impl MessageFeed {
    pub fn new(factory: Arc<DataProviderFactory>, config: FeedConfig) -> Self {
        Self { factory, config }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    fn provider(&self) -> ProviderResult<Arc<TreeDataProvider<Message>>> {
        self.factory.get_provider::<Message>(&self.config.messages_path)
    }

    /// Posts `message` and returns its id. A message without an id gets a
    /// fresh one, which is also written back into `message`.
    pub fn post_message(&self, message: &mut Message) -> ProviderResult<String> {
        let id = self.provider()?.create(message)?;
        info!(%id, name = %message.name, "message posted");
        Ok(id)
    }

    /// Posts `message` and waits until the store has applied the write.
    pub async fn post_message_confirmed(&self, message: &mut Message) -> ProviderResult<String> {
        let pending = self.provider()?.create_with_ack(message)?;
        let id = pending.confirmed().await?;
        info!(%id, name = %message.name, "message posted and confirmed");
        Ok(id)
    }

    /// Newest messages first, strictly older than `before` when given.
    /// `page_size` falls back to the configured size.
    pub async fn recent_messages(
        &self,
        page_size: Option<usize>,
        before: Option<&str>,
    ) -> ProviderResult<Vec<Message>> {
        let size = page_size.unwrap_or(self.config.page_size);
        let page = self.provider()?.read_page_from_newest(size, before).await?;
        debug!(size, before, returned = page.len(), "read message page");
        Ok(page)
    }

    /// Observes every message, replacing any earlier observation.
    pub fn observe_messages(&self, handler: ChildHandler<Message>) -> ProviderResult<ObservationHandle> {
        let provider = self.provider()?;
        provider.observe(handler)?;
        Ok(provider)
    }

    /// Observes the messages posted after `after_id`.
    pub fn observe_messages_after(
        &self,
        after_id: &str,
        handler: ChildHandler<Message>,
    ) -> ProviderResult<ObservationHandle> {
        let provider = self.provider()?;
        provider.observe_after_id(after_id, handler)?;
        Ok(provider)
    }

    pub fn cancel_observation(&self, handle: &ObservationHandle) {
        handle.cancel_observation();
    }
}
