//! Shared entities and stores for provider tests.

#![allow(dead_code)]

use async_trait::async_trait;
use canopy_codec::{Bytes, Document, Field, Identifiable, field};
use canopy_provider::ChildHandler;
use canopy_store::{
    ChildChange, ChildSink, ListenerId, MemoryTree, Query, Snapshot, StoreError, StoreResult,
    TreeStore, WriteHandle,
};
use canopy_types::ObservationType;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub id: String,
    pub name: String,
    pub text: String,
    pub title: Option<String>,
    pub likes: i64,
    pub date: DateTime<Utc>,
}

impl Message {
    pub fn new(id: &str, name: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            text: text.to_string(),
            date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            ..Default::default()
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
        field!(Message, title),
        field!(Message, likes),
        field!(Message, date),
    ];
}

/// An entity the store cannot represent.
#[derive(Debug, Default)]
pub struct Upload {
    pub id: String,
    pub data: Bytes,
}

impl Identifiable for Upload {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Document for Upload {
    const FIELDS: &'static [Field<Self>] = &[field!(Upload, id), field!(Upload, data)];
}

pub fn map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not a mapping: {other}"),
    }
}

pub fn seeded() -> Arc<MemoryTree> {
    Arc::new(MemoryTree::with_root(json!({
        "messages": {
            "k1": { "name": "ada", "text": "first" },
            "k2": { "name": "bob", "text": "second" },
            "k3": { "name": "ada", "text": "third" },
        }
    })))
}

pub type Events = Arc<Mutex<Vec<(ObservationType, Message)>>>;

/// A handler that records every event it receives.
pub fn recorder() -> (ChildHandler<Message>, Events) {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let seen = events.clone();
    let handler: ChildHandler<Message> = Box::new(move |kind, message| seen.lock().push((kind, message)));
    (handler, events)
}

/// `(kind, id)` pairs of the recorded events.
pub fn ids(events: &Events) -> Vec<(ObservationType, String)> {
    events
        .lock()
        .iter()
        .map(|(kind, message)| (*kind, message.id.clone()))
        .collect()
}

/// A store that ignores queries.
///
/// `get` answers every read with `children`, `listen` replays `replay`
/// into the sink and returns `listen_error` instead when one is set.
#[derive(Default)]
pub struct ScriptedStore {
    pub children: Value,
    pub replay: Vec<ChildChange>,
    pub listen_error: Option<String>,
    pub queries: Mutex<Vec<Query>>,
    pub unlistened: Mutex<Vec<ListenerId>>,
}

#[async_trait]
impl TreeStore for ScriptedStore {
    fn backend_name(&self) -> &'static str {
        "scripted"
    }

    fn push_key(&self, _path: &str) -> String {
        "generated".to_string()
    }

    fn update(&self, path: &str, _values: Map<String, Value>) -> WriteHandle {
        WriteHandle::completed(path, Ok(()))
    }

    fn remove(&self, path: &str) -> WriteHandle {
        WriteHandle::completed(path, Ok(()))
    }

    async fn get(&self, path: &str, query: &Query) -> StoreResult<Snapshot> {
        self.queries.lock().push(query.clone());
        Ok(Snapshot::new(path, self.children.clone()))
    }

    fn listen(&self, _path: &str, query: &Query, sink: ChildSink) -> StoreResult<ListenerId> {
        self.queries.lock().push(query.clone());
        if let Some(message) = &self.listen_error {
            return Err(StoreError::ListenerClosed(message.clone()));
        }
        for change in self.replay.clone() {
            sink(change);
        }
        Ok(ListenerId::new(7))
    }

    fn unlisten(&self, id: ListenerId) {
        self.unlistened.lock().push(id);
    }
}
