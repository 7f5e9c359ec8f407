use crate::protocol::{CloseReason, ViewEvent};
use crate::view::{DisposeCallback, ViewHandle, ViewHost};
use async_stream::stream;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::{Router, routing::get};
use log::{debug, error};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

const PORT_FALLBACK_ATTEMPTS: u16 = 12;
const EVENT_CHANNEL_CAPACITY: usize = 64;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 6437,
            bind_address: String::from("127.0.0.1"),
        }
    }
}

struct ViewShared {
    document: String,
    latest_fragment: RwLock<Option<String>>,
    broadcaster: broadcast::Sender<ViewEvent>,
    disposed: AtomicBool,
    dispose_callbacks: Mutex<Vec<DisposeCallback>>,
}

impl ViewShared {
    fn new(document: String) -> Self {
        let (broadcaster, _receiver) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            document,
            latest_fragment: RwLock::new(None),
            broadcaster,
            disposed: AtomicBool::new(false),
            dispose_callbacks: Mutex::new(Vec::new()),
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn latest_fragment(&self) -> Option<String> {
        match self.latest_fragment.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store_fragment(&self, html: &str) {
        let mut guard = match self.latest_fragment.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(html.to_string());
    }

    fn dispose(&self, reason: CloseReason) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let _ = self.broadcaster.send(ViewEvent::ViewClosed { reason });

        let callbacks = {
            let mut guard = lock(&self.dispose_callbacks);
            std::mem::take(&mut *guard)
        };
        for callback in callbacks {
            callback();
        }
    }
}

struct HttpViewHandle {
    shared: Arc<ViewShared>,
}

impl ViewHandle for HttpViewHandle {
    fn post_update(&self, html: &str) {
        if self.shared.is_disposed() {
            return;
        }

        self.shared.store_fragment(html);
        let _ = self.shared.broadcaster.send(ViewEvent::Update {
            html: html.to_string(),
        });
    }

    fn on_dispose(&self, callback: DisposeCallback) {
        let mut guard = lock(&self.shared.dispose_callbacks);
        if self.shared.is_disposed() {
            // dispose already ran and drained; honor the contract now
            drop(guard);
            callback();
        } else {
            guard.push(callback);
        }
    }

    fn dispose(&self) {
        self.shared.dispose(CloseReason::Closed);
    }

    fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }
}

#[derive(Default)]
struct ViewRegistry {
    active: RwLock<Option<Arc<ViewShared>>>,
}

impl ViewRegistry {
    fn current(&self) -> Option<Arc<ViewShared>> {
        match self.active.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn install(&self, view: Arc<ViewShared>) -> Option<Arc<ViewShared>> {
        match self.active.write() {
            Ok(mut guard) => guard.replace(view),
            Err(poisoned) => poisoned.into_inner().replace(view),
        }
    }

    fn take(&self) -> Option<Arc<ViewShared>> {
        match self.active.write() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// localhost HTTP view host: `/` serves the rendered document, `/events`
/// streams incremental updates over SSE. One live view at a time; creating
/// a new view disposes the previous one.
pub struct HttpViewHost {
    addr: SocketAddr,
    registry: Arc<ViewRegistry>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HttpViewHost {
    pub async fn bind(config: &ServerConfig) -> std::io::Result<Self> {
        let (listener, addr) = bind_listener(config).await?;
        let registry = Arc::new(ViewRegistry::default());
        let app = build_router(registry.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;

            if let Err(err) = served {
                error!("preview server stopped with error: {err}");
            }
        });

        Ok(Self {
            addr,
            registry,
            shutdown: Mutex::new(Some(shutdown_tx)),
            task: Mutex::new(Some(task)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.addr.ip(), self.addr.port())
    }

    pub async fn stop(&self) {
        if let Some(view) = self.registry.take() {
            view.dispose(CloseReason::HostShutdown);
        }

        let shutdown = lock(&self.shutdown).take();
        let task = lock(&self.task).take();

        if let Some(tx) = shutdown {
            let _ = tx.send(());
        }
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl ViewHost for HttpViewHost {
    fn create_view(&self, title: &str, initial_html: String) -> Arc<dyn ViewHandle> {
        debug!("view created: {title}");

        let shared = Arc::new(ViewShared::new(initial_html));
        if let Some(previous) = self.registry.install(shared.clone()) {
            previous.dispose(CloseReason::Closed);
        }

        Arc::new(HttpViewHandle { shared })
    }
}

fn build_router(registry: Arc<ViewRegistry>) -> Router {
    Router::new()
        .route("/", get(document))
        .route("/events", get(events))
        .with_state(registry)
}

async fn document(State(registry): State<Arc<ViewRegistry>>) -> Response {
    let Some(view) = registry.current() else {
        return (StatusCode::NOT_FOUND, "no preview open").into_response();
    };
    if view.is_disposed() {
        return (StatusCode::GONE, "preview closed").into_response();
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static(
            "default-src 'none'; script-src 'unsafe-inline'; style-src 'unsafe-inline'; connect-src 'self'; img-src 'self' https: http: data:;",
        ),
    );

    (headers, Html(view.document.clone())).into_response()
}

async fn events(State(registry): State<Arc<ViewRegistry>>) -> Response {
    let Some(view) = registry.current() else {
        return (StatusCode::NOT_FOUND, "no preview open").into_response();
    };
    if view.is_disposed() {
        return (StatusCode::GONE, "preview closed").into_response();
    }

    let mut rx = view.broadcaster.subscribe();
    let replay = view.latest_fragment();

    let stream = stream! {
        // late joiners catch up with the newest fragment before live events
        if let Some(html) = replay {
            yield Ok::<Event, Infallible>(sse_event(&ViewEvent::Update { html }));
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    yield Ok::<Event, Infallible>(sse_event(&ViewEvent::Heartbeat));
                }
                recv = rx.recv() => {
                    match recv {
                        Ok(event) => {
                            let closing = matches!(event, ViewEvent::ViewClosed { .. });
                            yield Ok::<Event, Infallible>(sse_event(&event));
                            if closing {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    };

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(20))
                .text("keepalive"),
        )
        .into_response()
}

fn sse_event(payload: &ViewEvent) -> Event {
    let data = serde_json::to_string(payload).unwrap_or_else(|_| {
        String::from("{\"type\":\"error\",\"message\":\"serialization_error\"}")
    });

    Event::default().event(payload.event_name()).data(data)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

async fn bind_listener(config: &ServerConfig) -> std::io::Result<(TcpListener, SocketAddr)> {
    let start_port = config.port;
    let end_port = config
        .port
        .saturating_add(PORT_FALLBACK_ATTEMPTS.saturating_sub(1));
    let mut last_error: Option<std::io::Error> = None;

    for port in start_port..=end_port {
        let addr = format!("{}:{port}", config.bind_address);
        match TcpListener::bind(&addr).await {
            Ok(listener) => {
                let bound = listener.local_addr()?;
                return Ok((listener, bound));
            }
            Err(err) => {
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| std::io::Error::other("failed to bind preview server")))
}
