//! `TreeStore` over the Realtime Database REST protocol.
//!
//! Nodes live at `{database_url}/{path}.json`. Reads are GETs, merges are
//! PATCHes, removals are DELETEs. Listeners hold a GET open with
//! `Accept: text/event-stream` and turn the server's `put`/`patch` events
//! into child changes against a local copy of the listened window.

use crate::config::RestConfig;
use crate::sse::{SseParser, StreamEvent};
use async_trait::async_trait;
use canopy_store::{
    ChildSink, ListenerId, OrderBy, Query, Snapshot, StoreError, StoreResult, TreeStore,
    WriteCompleter, WriteHandle, diff_children, node, path,
};
use canopy_types::PushKeyGenerator;
use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use url::Url;

/// One queued write.
struct WriteJob {
    method: Method,
    url: Url,
    body: Option<Map<String, Value>>,
    completer: WriteCompleter,
}

struct Inner {
    config: RestConfig,
    base: Url,
    client: Client,
    keys: PushKeyGenerator,
    writer: Mutex<Option<mpsc::UnboundedSender<WriteJob>>>,
    listeners: Mutex<HashMap<ListenerId, JoinHandle<()>>>,
    next_listener: AtomicU64,
}

/// A tree store backed by a Realtime Database REST endpoint.
///
/// Writes are applied in the order they were issued. Writing and listening
/// need a Tokio runtime; without one, writes fail through their
/// [`WriteHandle`] and `listen` returns [`StoreError::Runtime`].
///
/// A listener lasts as long as its event stream. Once the server ends the
/// stream, through `cancel`, `auth_revoked` or a plain end of body, the
/// listener is dropped with a warning and its sink gets nothing more.
/// [`RestTree::listener_count`] shows how many are still open.
pub struct RestTree {
    inner: Arc<Inner>,
}

impl RestTree {
    /// Creates a client for `config.database_url`.
    pub fn new(config: RestConfig) -> StoreResult<Self> {
        let base = Url::parse(config.database_url.trim_end_matches('/')).map_err(|e| {
            StoreError::InvalidPath(format!("invalid database url {:?}: {e}", config.database_url))
        })?;
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| StoreError::Network(format!("failed to create HTTP client: {e}")))?;

        info!(url = %base, "REST tree store ready");
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                base,
                client,
                keys: PushKeyGenerator::new(),
                writer: Mutex::new(None),
                listeners: Mutex::new(HashMap::new()),
                next_listener: AtomicU64::new(1),
            }),
        })
    }

    pub fn config(&self) -> &RestConfig {
        &self.inner.config
    }

    /// Number of listener streams still running.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .values()
            .filter(|task| !task.is_finished())
            .count()
    }

    fn queue_write(
        &self,
        method: Method,
        path: &str,
        body: Option<Map<String, Value>>,
    ) -> WriteHandle {
        let (completer, handle) = WriteHandle::pending(path);
        let url = match path::segments(path).map(|s| self.inner.node_url(&s)) {
            Ok(url) => url,
            Err(e) => {
                completer.complete(Err(e));
                return handle;
            }
        };

        let job = WriteJob {
            method,
            url,
            body,
            completer,
        };
        if let Err(job) = self.inner.send_write(job) {
            job.completer
                .complete(Err(StoreError::Runtime("no Tokio runtime for write".to_string())));
        }
        handle
    }
}

impl Drop for RestTree {
    fn drop(&mut self) {
        for (_, task) in self.inner.listeners.lock().drain() {
            task.abort();
        }
    }
}

impl Inner {
    fn node_url(&self, segments: &[String]) -> Url {
        let mut url = self.base.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}/{}.json", segments.join("/")));
        url
    }

    fn auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.query(&[("auth", token.as_str())]),
            None => request,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.request_timeout_ms)
    }

    /// Hands a write to the writer task, starting it on first use.
    fn send_write(&self, job: WriteJob) -> Result<(), WriteJob> {
        let mut writer = self.writer.lock();
        let job = match writer.as_ref() {
            Some(tx) => match tx.send(job) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let Ok(runtime) = Handle::try_current() else {
            return Err(job);
        };
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_writer(
            self.client.clone(),
            self.config.auth_token.clone(),
            self.timeout(),
            rx,
        ));
        let sent = tx.send(job).map_err(|mpsc::error::SendError(job)| job);
        *writer = Some(tx);
        sent
    }
}

/// Applies queued writes one at a time, in order.
async fn run_writer(
    client: Client,
    auth_token: Option<String>,
    timeout: Duration,
    mut rx: mpsc::UnboundedReceiver<WriteJob>,
) {
    while let Some(job) = rx.recv().await {
        let mut request = client
            .request(job.method.clone(), job.url.clone())
            .timeout(timeout);
        if let Some(token) = &auth_token {
            request = request.query(&[("auth", token.as_str())]);
        }
        if let Some(body) = &job.body {
            request = request.json(body);
        }

        debug!(method = %job.method, url = %job.url.path(), "write");
        let result = match request.send().await {
            Ok(response) => check_status(response, job.method == Method::DELETE)
                .await
                .map(|_| ()),
            Err(e) => Err(network("write", e)),
        };
        job.completer.complete(result);
    }
    trace!("writer stopped");
}

fn network(what: &str, e: reqwest::Error) -> StoreError {
    StoreError::Network(format!("{what} failed: {e}"))
}

/// Fails on a non-success status; a 404 passes when `allow_missing`.
async fn check_status(response: Response, allow_missing: bool) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() || (allow_missing && status == StatusCode::NOT_FOUND) {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

/// The REST query parameters for `query`. Values are JSON-encoded.
pub fn query_params(query: &Query) -> StoreResult<Vec<(&'static str, String)>> {
    let mut params = Vec::new();
    match &query.order_by {
        OrderBy::Unordered => {}
        OrderBy::Key => params.push(("orderBy", "\"$key\"".to_string())),
        OrderBy::Child(field) => params.push(("orderBy", serde_json::to_string(field)?)),
    }
    for (name, value) in [
        ("equalTo", &query.equal_to),
        ("startAt", &query.start_at),
        ("endAt", &query.end_at),
    ] {
        if let Some(value) = value {
            params.push((name, serde_json::to_string(value)?));
        }
    }
    if let Some(n) = query.limit_to_first {
        params.push(("limitToFirst", n.to_string()));
    }
    if let Some(n) = query.limit_to_last {
        params.push(("limitToLast", n.to_string()));
    }
    Ok(params)
}

#[async_trait]
impl TreeStore for RestTree {
    fn backend_name(&self) -> &'static str {
        "rest"
    }

    fn push_key(&self, _path: &str) -> String {
        self.inner.keys.next_key()
    }

    fn update(&self, path: &str, values: Map<String, Value>) -> WriteHandle {
        self.queue_write(Method::PATCH, path, Some(values))
    }

    fn remove(&self, path: &str) -> WriteHandle {
        self.queue_write(Method::DELETE, path, None)
    }

    async fn get(&self, path: &str, query: &Query) -> StoreResult<Snapshot> {
        query.validate()?;
        let segments = path::segments(path)?;
        let key = segments.last().cloned().unwrap_or_default();
        let params = query_params(query)?;

        debug!(path, "GET");
        let request = self
            .inner
            .client
            .get(self.inner.node_url(&segments))
            .query(&params)
            .timeout(self.inner.timeout());
        let response = self
            .inner
            .auth(request)
            .send()
            .await
            .map_err(|e| network("read", e))?;
        let text = check_status(response, false)
            .await?
            .text()
            .await
            .map_err(|e| network("read body", e))?;
        let value: Value = serde_json::from_str(&text)?;

        if query.is_default() {
            Ok(Snapshot::new(key, value))
        } else {
            Ok(Snapshot::from_children(key, query.window(&value)))
        }
    }

    /// Opens an event stream for `path`. The stream is not reopened when
    /// the server closes it; the listener then ends and `sink` is dropped
    /// without a final notification.
    fn listen(&self, path: &str, query: &Query, sink: ChildSink) -> StoreResult<ListenerId> {
        query.validate()?;
        let segments = path::segments(path)?;
        let runtime = Handle::try_current()
            .map_err(|e| StoreError::Runtime(format!("listen needs a Tokio runtime: {e}")))?;

        let id = ListenerId::new(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.inner.listeners.lock();
        let task = runtime.spawn(run_listener(
            self.inner.clone(),
            id,
            segments,
            query.clone(),
            sink,
        ));
        listeners.insert(id, task);
        debug!(%id, path, "listener started");
        Ok(id)
    }

    fn unlisten(&self, id: ListenerId) {
        if let Some(task) = self.inner.listeners.lock().remove(&id) {
            task.abort();
            debug!(%id, "listener stopped");
        }
    }
}

async fn run_listener(
    inner: Arc<Inner>,
    id: ListenerId,
    segments: Vec<String>,
    query: Query,
    sink: ChildSink,
) {
    match stream_changes(&inner, &segments, &query, &sink).await {
        Ok(()) => debug!(%id, "event stream ended"),
        Err(e) => warn!(%id, error = %e, "listener closed"),
    }
    inner.listeners.lock().remove(&id);
}

async fn stream_changes(
    inner: &Inner,
    segments: &[String],
    query: &Query,
    sink: &ChildSink,
) -> StoreResult<()> {
    let request = inner
        .client
        .get(inner.node_url(segments))
        .header(ACCEPT, "text/event-stream")
        .query(&query_params(query)?);
    let response = inner
        .auth(request)
        .send()
        .await
        .map_err(|e| network("listen", e))?;
    let mut body = check_status(response, false).await?.bytes_stream();

    let mut parser = SseParser::new();
    let mut cache = Value::Null;
    let mut window: Vec<(String, Value)> = Vec::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| network("event stream", e))?;
        for event in parser.push(&chunk) {
            let event = StreamEvent::from_sse(&event)?;
            match event {
                StreamEvent::Put { path: at, data } => {
                    node::set_at(&mut cache, &path::segments(&at)?, data);
                }
                StreamEvent::Patch { path: at, data } => {
                    let base = path::segments(&at)?;
                    let Value::Object(entries) = data else {
                        continue;
                    };
                    for (key, value) in entries {
                        let mut target = base.clone();
                        target.extend(path::segments(&key)?);
                        node::set_at(&mut cache, &target, value);
                    }
                }
                StreamEvent::KeepAlive => continue,
                StreamEvent::Unknown(name) => {
                    trace!(event = %name, "ignoring stream event");
                    continue;
                }
                closing @ (StreamEvent::Cancel(_) | StreamEvent::AuthRevoked) => {
                    return Err(closing
                        .closing_error()
                        .unwrap_or_else(|| StoreError::ListenerClosed("closed".to_string())));
                }
            }

            let next = query.window(&cache);
            for change in diff_children(&window, &next) {
                sink(change);
            }
            window = next;
        }
    }
    Ok(())
}
