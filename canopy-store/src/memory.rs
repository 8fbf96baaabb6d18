//! In-process tree store.
//!
//! `MemoryTree` keeps the whole tree in one JSON value. Writes apply
//! synchronously; listeners are notified on the writing thread before the
//! write call returns, in registration order. Notifications for writes from
//! different threads never interleave. A handler may write to the tree or
//! stop listeners from inside a notification; changes caused by such a write
//! are queued behind the notifications already pending, so every listener
//! still sees its changes in the order the tree went through them.

use crate::change::{ChildChange, ChildSink, diff_children, initial_changes};
use crate::error::{StoreError, StoreResult};
use crate::node::{node_at, prune, set_at};
use crate::path;
use crate::query::Query;
use crate::snapshot::Snapshot;
use crate::store::{ListenerId, TreeStore};
use crate::write::WriteHandle;
use async_trait::async_trait;
use canopy_types::PushKeyGenerator;
use parking_lot::{Mutex, ReentrantMutex};
use serde_json::{Map, Value};
use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

struct Listener {
    path: Vec<String>,
    query: Query,
    window: Vec<(String, Value)>,
    sink: ChildSink,
}

type Delivery = (ListenerId, ChildSink, Vec<ChildChange>);

#[derive(Default)]
struct TreeState {
    root: Value,
    listeners: BTreeMap<ListenerId, Listener>,
}

impl TreeState {
    /// Re-evaluates every listener's window and collects what changed.
    fn refresh_windows(&mut self) -> Vec<Delivery> {
        let root = &self.root;
        let mut out = Vec::new();
        for (id, listener) in self.listeners.iter_mut() {
            let window = listener.query.window(node_at(root, &listener.path));
            let changes = diff_children(&listener.window, &window);
            listener.window = window;
            if !changes.is_empty() {
                out.push((*id, listener.sink.clone(), changes));
            }
        }
        out
    }
}

/// A tree store held entirely in memory.
pub struct MemoryTree {
    state: Mutex<TreeState>,
    /// Held for a whole write and its notifications. The flag is set while
    /// the outermost call on the holding thread drains `queue`.
    dispatch: ReentrantMutex<Cell<bool>>,
    queue: Mutex<VecDeque<Delivery>>,
    keys: PushKeyGenerator,
    next_listener: AtomicU64,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TreeState::default()),
            dispatch: ReentrantMutex::new(Cell::new(false)),
            queue: Mutex::new(VecDeque::new()),
            keys: PushKeyGenerator::new(),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Creates a tree whose root holds `root`.
    pub fn with_root(root: Value) -> Self {
        let tree = Self::new();
        tree.state.lock().root = prune(root).unwrap_or(Value::Null);
        tree
    }

    /// The node at `path` as stored, or null.
    pub fn value_at(&self, path: &str) -> StoreResult<Value> {
        let segments = path::segments(path)?;
        Ok(node_at(&self.state.lock().root, &segments).clone())
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    fn apply(&self, writes: Vec<(Vec<String>, Value)>) {
        let draining = self.dispatch.lock();
        let pending = {
            let mut state = self.state.lock();
            for (segments, value) in writes {
                set_at(&mut state.root, &segments, value);
            }
            state.refresh_windows()
        };
        self.deliver(&draining, pending);
    }

    /// Queues `pending` and, unless a call further up this thread's stack is
    /// already draining, runs sinks outside the state lock until the queue is
    /// empty. Stops early for a listener that was removed by an earlier
    /// notification.
    fn deliver(&self, draining: &Cell<bool>, pending: Vec<Delivery>) {
        self.queue.lock().extend(pending);
        if draining.get() {
            trace!("nested write, notifications queued");
            return;
        }
        draining.set(true);
        let _reset = ResetOnDrop(draining);

        loop {
            let next = self.queue.lock().pop_front();
            let Some((id, sink, changes)) = next else {
                break;
            };
            for change in changes {
                if !self.state.lock().listeners.contains_key(&id) {
                    trace!(%id, "listener gone, dropping remaining changes");
                    break;
                }
                sink(change);
            }
        }
    }
}

/// Clears the draining flag even when a sink panics.
struct ResetOnDrop<'a>(&'a Cell<bool>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TreeStore for MemoryTree {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn push_key(&self, _path: &str) -> String {
        self.keys.next_key()
    }

    fn update(&self, path: &str, values: Map<String, Value>) -> WriteHandle {
        let base = match path::segments(path) {
            Ok(segments) => segments,
            Err(e) => return WriteHandle::completed(path, Err(e)),
        };

        let mut writes = Vec::with_capacity(values.len());
        for (key, value) in values {
            let sub = match path::segments(&key) {
                Ok(sub) if !sub.is_empty() => sub,
                Ok(_) => {
                    let err = StoreError::InvalidPath(format!("empty update key under {path:?}"));
                    return WriteHandle::completed(path, Err(err));
                }
                Err(e) => return WriteHandle::completed(path, Err(e)),
            };
            let mut target = base.clone();
            target.extend(sub);
            writes.push((target, value));
        }

        debug!(path, entries = writes.len(), "update");
        self.apply(writes);
        WriteHandle::completed(path, Ok(()))
    }

    fn remove(&self, path: &str) -> WriteHandle {
        match path::segments(path) {
            Ok(segments) => {
                debug!(path, "remove");
                self.apply(vec![(segments, Value::Null)]);
                WriteHandle::completed(path, Ok(()))
            }
            Err(e) => WriteHandle::completed(path, Err(e)),
        }
    }

    async fn get(&self, path: &str, query: &Query) -> StoreResult<Snapshot> {
        query.validate()?;
        let segments = path::segments(path)?;
        let key = segments.last().cloned().unwrap_or_default();

        let state = self.state.lock();
        let node = node_at(&state.root, &segments);
        if query.is_default() {
            Ok(Snapshot::new(key, node.clone()))
        } else {
            Ok(Snapshot::from_children(key, query.window(node)))
        }
    }

    fn listen(&self, path: &str, query: &Query, sink: ChildSink) -> StoreResult<ListenerId> {
        query.validate()?;
        let segments = path::segments(path)?;
        let id = ListenerId::new(self.next_listener.fetch_add(1, Ordering::Relaxed));

        let draining = self.dispatch.lock();
        let initial = {
            let mut state = self.state.lock();
            let window = query.window(node_at(&state.root, &segments));
            let initial = initial_changes(&window);
            state.listeners.insert(
                id,
                Listener {
                    path: segments,
                    query: query.clone(),
                    window,
                    sink: sink.clone(),
                },
            );
            initial
        };
        debug!(%id, path, replayed = initial.len(), "listener registered");
        self.deliver(&draining, vec![(id, sink, initial)]);
        Ok(id)
    }

    fn unlisten(&self, id: ListenerId) {
        if self.state.lock().listeners.remove(&id).is_some() {
            debug!(%id, "listener removed");
        }
    }
}
