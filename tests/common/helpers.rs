use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use haul::http::{Transport, TransportResponse};
use haul::progress::{ProgressEvent, ProgressSink};
use haul::transfer::{TransferSpec, TransferState};
use haul::{Downloader, DownloaderBuilder, Error};
use reqwest::{StatusCode, Url};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// Common test constants
pub const TEST_HOST: &str = "http://mock.test";
pub const TEST_USER_AGENT: &str = "haul-test-agent";
pub const TEST_BACKOFF: Duration = Duration::from_millis(10);

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates a temporary file with the given content
pub fn create_temp_file(dir: &Path, filename: &str, content: &[u8]) -> PathBuf {
    let file_path = dir.join(filename);
    fs::write(&file_path, content).expect("Failed to write temporary file");
    file_path
}

/// Creates test file content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// URL of `path` on the mock host
pub fn mock_url(path: &str) -> Url {
    Url::parse(&format!("{}{}", TEST_HOST, path)).expect("Invalid mock URL")
}

/// Spec for `path` on the mock host, landing in `dir`
pub fn mock_spec(dir: &Path, path: &str) -> TransferSpec {
    TransferSpec::new(&mock_url(path), dir.join(path.trim_start_matches('/')))
}

/// Asserts that a file exists at the given path
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "File should exist at path: {:?}", path);
}

/// Asserts that no working file is left next to `destination`
pub fn assert_no_working_file(destination: &Path) {
    let working = haul::transfer::working_path(destination);
    assert!(
        !working.exists(),
        "Working file should not exist: {:?}",
        working
    );
}

/// Builder wired to `transport` with a short backoff and no progress display
pub fn mock_downloader_builder(dir: &Path, transport: Arc<MockTransport>) -> DownloaderBuilder {
    DownloaderBuilder::new()
        .directory(dir.to_path_buf())
        .backoff_unit(TEST_BACKOFF)
        .transport(transport)
}

pub fn mock_downloader(dir: &Path, transport: Arc<MockTransport>) -> Downloader {
    mock_downloader_builder(dir, transport).build()
}

// === Scripted transport ===

/// What the mock answers to one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Serve the file, honouring the requested range.
    Serve,
    /// Serve the whole file with a 200, ignoring the range.
    IgnoreRange,
    /// Answer with an empty body and this status.
    Status(u16),
    /// Fail before any response head.
    ConnectError,
    /// Serve from the requested offset, then break after `n` bytes.
    Truncate(usize),
    /// Send the head, then never deliver the body.
    Stall,
    /// Serve from the requested offset without declaring a length.
    Unsized,
    /// Serve from the requested offset, declaring `u64::MAX` bytes.
    Oversized,
}

#[derive(Default)]
struct Resource {
    content: Bytes,
    script: VecDeque<Reply>,
}

/// In-memory [`Transport`] with per-path scripted replies.
///
/// Once a path's script runs out, requests are served normally. Unknown
/// paths answer 404.
pub struct MockTransport {
    resources: Mutex<HashMap<String, Resource>>,
    requests: Mutex<Vec<(String, u64)>>,
    chunk: usize,
    delay: Duration,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            resources: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            chunk: 1024,
            delay: Duration::ZERO,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of the body chunks.
    pub fn chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }

    /// Pause before each body chunk.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Serve `content` at `path`.
    pub fn file(self, path: &str, content: impl Into<Bytes>) -> Self {
        self.resources
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .content = content.into();
        self
    }

    /// Answer the next requests for `path` with `replies`, in order.
    pub fn script(self, path: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.resources
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .script
            .extend(replies);
        self
    }

    /// Offsets requested for `path`, in order.
    pub fn offsets(&self, path: &str) -> Vec<u64> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, offset)| *offset)
            .collect()
    }

    /// Number of requests for `path`.
    pub fn attempts(&self, path: &str) -> usize {
        self.offsets(path).len()
    }

    /// Highest number of requests in flight at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn respond(&self, path: &str, offset: u64) -> haul::Result<TransportResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), offset));

        let (content, reply) = {
            let mut resources = self.resources.lock().unwrap();
            match resources.get_mut(path) {
                Some(resource) => (
                    resource.content.clone(),
                    resource.script.pop_front().unwrap_or(Reply::Serve),
                ),
                None => (Bytes::new(), Reply::Status(404)),
            }
        };

        let guard = ActiveGuard::enter(self.active.clone(), self.peak.clone());
        let len = content.len() as u64;
        match reply {
            Reply::ConnectError => Err(Error::Transport("connection refused".into())),
            Reply::Status(code) => Ok(empty(StatusCode::from_u16(code).unwrap())),
            Reply::IgnoreRange => Ok(self.body(StatusCode::OK, content, None, guard)),
            Reply::Stall => Ok(TransportResponse {
                status: StatusCode::OK,
                content_length: Some(len),
                body: stream::pending::<haul::Result<Bytes>>()
                    .map(move |item| {
                        let _held = &guard;
                        item
                    })
                    .boxed(),
            }),
            Reply::Serve | Reply::Truncate(_) | Reply::Unsized | Reply::Oversized
                if offset > 0 && offset >= len =>
            {
                Ok(empty(StatusCode::RANGE_NOT_SATISFIABLE))
            }
            Reply::Serve => Ok(self.body(
                range_status(offset),
                content.slice(offset as usize..),
                None,
                guard,
            )),
            Reply::Unsized | Reply::Oversized => {
                let mut response =
                    self.body(range_status(offset), content.slice(offset as usize..), None, guard);
                response.content_length = match reply {
                    Reply::Oversized => Some(u64::MAX),
                    _ => None,
                };
                Ok(response)
            }
            Reply::Truncate(n) => {
                let status = range_status(offset);
                let rest = content.slice(offset as usize..);
                let declared = rest.len() as u64;
                let cut = rest.slice(..n.min(rest.len()));
                Ok(self.body(status, cut, Some(declared), guard))
            }
        }
    }

    /// Body of `content` split into chunks; a declared length larger than
    /// the content ends the stream with an error.
    fn body(
        &self,
        status: StatusCode,
        content: Bytes,
        declared: Option<u64>,
        guard: ActiveGuard,
    ) -> TransportResponse {
        let actual = content.len() as u64;
        let content_length = declared.unwrap_or(actual);
        let chunk = self.chunk.max(1);
        let mut chunks: Vec<haul::Result<Bytes>> = (0..content.len())
            .step_by(chunk)
            .map(|start| Ok(content.slice(start..(start + chunk).min(content.len()))))
            .collect();
        if content_length > actual {
            chunks.push(Err(Error::Transport("connection reset".into())));
        }
        let delay = self.delay;
        let body = stream::iter(chunks)
            .then(move |item| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                item
            })
            .map(move |item| {
                let _held = &guard;
                item
            })
            .boxed();
        TransportResponse {
            status,
            content_length: Some(content_length),
            body,
        }
    }
}

impl Transport for MockTransport {
    fn get<'a>(&'a self, url: &'a Url, offset: u64) -> BoxFuture<'a, haul::Result<TransportResponse>> {
        Box::pin(async move { self.respond(url.path(), offset) })
    }
}

fn range_status(offset: u64) -> StatusCode {
    if offset > 0 {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    }
}

fn empty(status: StatusCode) -> TransportResponse {
    TransportResponse {
        status,
        content_length: Some(0),
        body: stream::empty().boxed(),
    }
}

/// Counts a request as in flight until its body is dropped.
struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl ActiveGuard {
    fn enter(active: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

// === Recording progress sink ===

/// Keeps every progress event it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// States `task` went through, in order.
    ///
    /// Tasks are destination paths; `task` matches their trailing components.
    pub fn states(&self, task: &str) -> Vec<TransferState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Status { task: t, state } if is_task(&t, task) => Some(state),
                _ => None,
            })
            .collect()
    }

    /// Bytes reported for `task`.
    pub fn bytes(&self, task: &str) -> u64 {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Bytes { task: t, bytes, .. } if is_task(&t, task) => Some(bytes),
                _ => None,
            })
            .sum()
    }

    /// Totals carried by the byte events of `task`.
    pub fn byte_totals(&self, task: &str) -> Vec<Option<u64>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Bytes { task: t, total, .. } if is_task(&t, task) => Some(total),
                _ => None,
            })
            .collect()
    }

    /// Batch progress notifications, in order.
    pub fn batch(&self) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Batch { completed, total } => Some((completed, total)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn is_task(recorded: &str, task: &str) -> bool {
    Path::new(recorded).ends_with(task)
}

impl ProgressSink for RecordingSink {
    fn on_transfer_start(&self, task: &str, resumed_from: u64, total: Option<u64>) {
        self.push(ProgressEvent::TransferStart {
            task: task.to_string(),
            resumed_from,
            total,
        });
    }

    fn on_byte_progress(&self, task: &str, bytes: u64, total: Option<u64>) {
        self.push(ProgressEvent::Bytes {
            task: task.to_string(),
            bytes,
            total,
        });
    }

    fn on_task_status(&self, task: &str, state: &TransferState) {
        self.push(ProgressEvent::Status {
            task: task.to_string(),
            state: *state,
        });
    }

    fn on_batch_progress(&self, completed: usize, total: usize) {
        self.push(ProgressEvent::Batch { completed, total });
    }
}

// === Local HTTP server ===

/// Minimal HTTP/1.1 server on localhost.
///
/// Serves `content` on every path except `/missing` (404), honours
/// `Range: bytes=N-` and closes each connection after one response.
pub async fn serve(content: Vec<u8>) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("No local address");
    let content = Arc::new(content);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let content = content.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&head).to_string();
                let path = head
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();
                let offset = head
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if !name.eq_ignore_ascii_case("range") {
                            return None;
                        }
                        value
                            .trim()
                            .strip_prefix("bytes=")?
                            .trim_end_matches('-')
                            .parse::<usize>()
                            .ok()
                    })
                    .unwrap_or(0);

                let (status, body) = if path == "/missing" {
                    ("404 Not Found", &content[..0])
                } else if offset > 0 && offset >= content.len() {
                    ("416 Range Not Satisfiable", &content[..0])
                } else if offset > 0 {
                    ("206 Partial Content", &content[offset..])
                } else {
                    ("200 OK", &content[..])
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.write_all(body).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    Url::parse(&format!("http://{}/", addr)).expect("Invalid server URL")
}
