//! In-process HTTP server used by the integration tests.
//!
//! Serves one in-memory body, optionally honouring `Range`, counts the requests
//! it receives and can be told to fail the GET whose range starts at a given offset,
//! to hold back ranged GETs from an offset onwards, or to announce another length on HEAD.
#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hyper::header::{ACCEPT_RANGES, CONNECTION, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::{Body, Method, Request, Response, StatusCode};
use tokio::net::TcpListener;

pub struct ServerState {
    body: Vec<u8>,
    accept_ranges: bool,
    head_status: StatusCode,
    head_length: Option<u64>,
    fail_at: Mutex<Option<u64>>,
    slow_from: Option<(u64, Duration)>,
    heads: AtomicUsize,
    gets: AtomicUsize,
    unranged_gets: AtomicUsize,
    range_starts: Mutex<Vec<u64>>,
}

pub struct TestServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

pub struct TestServerBuilder {
    body: Vec<u8>,
    accept_ranges: bool,
    head_status: StatusCode,
    head_length: Option<u64>,
    fail_at: Option<u64>,
    slow_from: Option<(u64, Duration)>,
}

impl TestServerBuilder {
    pub fn accept_ranges(mut self, yes: bool) -> Self {
        self.accept_ranges = yes;
        self
    }

    pub fn head_status(mut self, status: StatusCode) -> Self {
        self.head_status = status;
        self
    }

    pub fn fail_range_at(mut self, start: u64) -> Self {
        self.fail_at = Some(start);
        self
    }

    /// HEAD announces `len` bytes whatever the GET body is.
    pub fn head_content_length(mut self, len: u64) -> Self {
        self.head_length = Some(len);
        self
    }

    /// Ranged GETs starting at `start` or later are answered after `delay`.
    pub fn slow_ranges_from(mut self, start: u64, delay: Duration) -> Self {
        self.slow_from = Some((start, delay));
        self
    }

    pub async fn start(self) -> TestServer {
        let state = Arc::new(ServerState {
            body: self.body,
            accept_ranges: self.accept_ranges,
            head_status: self.head_status,
            head_length: self.head_length,
            fail_at: Mutex::new(self.fail_at),
            slow_from: self.slow_from,
            heads: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            unranged_gets: AtomicUsize::new(0),
            range_starts: Mutex::new(Vec::new()),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = server_state.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = state.clone();
                        async move { Ok::<_, Infallible>(handle(&state, req).await) }
                    });
                    let _ = Http::new().http1_only(true).serve_connection(stream, service).await;
                });
            }
        });

        TestServer { addr, state }
    }
}

impl TestServer {
    pub fn builder(body: Vec<u8>) -> TestServerBuilder {
        TestServerBuilder {
            body,
            accept_ranges: true,
            head_status: StatusCode::OK,
            head_length: None,
            fail_at: None,
            slow_from: None,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path)
    }

    pub fn heads(&self) -> usize {
        self.state.heads.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.state.gets.load(Ordering::SeqCst)
    }

    pub fn unranged_gets(&self) -> usize {
        self.state.unranged_gets.load(Ordering::SeqCst)
    }

    pub fn range_starts(&self) -> Vec<u64> {
        let mut starts = self.state.range_starts.lock().unwrap().clone();
        starts.sort_unstable();
        starts
    }

    pub fn reset_counters(&self) {
        self.state.gets.store(0, Ordering::SeqCst);
        self.state.unranged_gets.store(0, Ordering::SeqCst);
        self.state.range_starts.lock().unwrap().clear();
    }

    pub fn clear_failures(&self) {
        *self.state.fail_at.lock().unwrap() = None;
    }
}

/// Deterministic, non-repeating-per-chunk payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn parse_range(value: &str) -> Option<(u64, u64)> {
    let bytes = value.strip_prefix("bytes=")?;
    let (start, end) = bytes.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

async fn handle(state: &ServerState, req: Request<Body>) -> Response<Body> {
    let mut builder = Response::builder().header(CONNECTION, "close");
    if state.accept_ranges {
        builder = builder.header(ACCEPT_RANGES, "bytes");
    }

    match *req.method() {
        Method::HEAD => {
            state.heads.fetch_add(1, Ordering::SeqCst);
            if state.head_status != StatusCode::OK {
                return builder.status(state.head_status).body(Body::empty()).unwrap();
            }
            if let Some(len) = state.head_length {
                return builder
                    .status(StatusCode::OK)
                    .header(CONTENT_LENGTH, len)
                    .body(Body::empty())
                    .unwrap();
            }
            // hyper drops the body of a HEAD response but keeps its length
            builder
                .status(StatusCode::OK)
                .header(CONTENT_LENGTH, state.body.len())
                .body(Body::from(state.body.clone()))
                .unwrap()
        }
        Method::GET => {
            state.gets.fetch_add(1, Ordering::SeqCst);
            let range = req
                .headers()
                .get(RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_range);

            let Some((start, end)) = range else {
                state.unranged_gets.fetch_add(1, Ordering::SeqCst);
                return builder
                    .status(StatusCode::OK)
                    .body(Body::from(state.body.clone()))
                    .unwrap();
            };

            state.range_starts.lock().unwrap().push(start);
            if let Some((from, delay)) = state.slow_from {
                if start >= from {
                    tokio::time::sleep(delay).await;
                }
            }
            if *state.fail_at.lock().unwrap() == Some(start) {
                return builder
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Body::empty())
                    .unwrap();
            }

            if !state.accept_ranges {
                return builder
                    .status(StatusCode::OK)
                    .body(Body::from(state.body.clone()))
                    .unwrap();
            }

            let end = end.min(state.body.len() as u64 - 1);
            let slice = state.body[start as usize..=end as usize].to_vec();
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, state.body.len()))
                .body(Body::from(slice))
                .unwrap()
        }
        _ => builder
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .body(Body::empty())
            .unwrap(),
    }
}
