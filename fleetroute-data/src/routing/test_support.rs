//! Test utilities for network-backed providers.
//!
//! [`CannedServer`] is a minimal HTTP/1.1 server on a loopback port that
//! answers each incoming connection with the next pre-configured response
//! and records what it was sent. It lets tests exercise the real
//! [`crate::BlockingClient`] without a running OSRM or VROOM service.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// One canned reply.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    status: u16,
    content_type: &'static str,
    body: String,
    delay: Option<Duration>,
}

impl CannedResponse {
    /// Reply with `status` and a JSON `body`.
    #[must_use]
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.into(),
            delay: None,
        }
    }

    /// Reply with `status` and a plain-text `body`.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            content_type: "text/plain",
            ..Self::json(status, body)
        }
    }

    /// Accept the connection, then stay silent for `delay` and hang up.
    #[must_use]
    pub fn stalled(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::json(200, "")
        }
    }
}

/// A request captured by [`CannedServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    /// Request line, e.g. `GET /table/v1/driving/0,0 HTTP/1.1`.
    pub line: String,
    /// Request body.
    pub body: String,
}

impl CapturedRequest {
    /// Request target from the request line.
    #[must_use]
    pub fn target(&self) -> &str {
        self.line.split(' ').nth(1).unwrap_or_default()
    }
}

/// Loopback HTTP server answering with canned responses in order.
///
/// The server stops accepting once every response has been served.
#[derive(Debug)]
pub struct CannedServer {
    base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl CannedServer {
    /// Bind a loopback port and serve `responses` on a background thread.
    ///
    /// # Errors
    ///
    /// Returns an error if no loopback port can be bound.
    pub fn start(responses: Vec<CannedResponse>) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&requests);
        thread::spawn(move || serve(&listener, responses, &captured));
        Ok(Self { base_url, requests })
    }

    /// Base URL of the server, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// A loopback URL on which nothing listens.
#[must_use]
pub fn unused_base_url() -> String {
    let port = TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map_or(9, |addr| addr.port());
    format!("http://127.0.0.1:{port}")
}

fn serve(
    listener: &TcpListener,
    responses: Vec<CannedResponse>,
    captured: &Mutex<Vec<CapturedRequest>>,
) {
    for response in responses {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        if let Some(request) = read_request(&mut stream)
            && let Ok(mut guard) = captured.lock()
        {
            guard.push(request);
        }
        if let Some(delay) = response.delay {
            thread::sleep(delay);
            continue;
        }
        let reply = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            response.status,
            if response.status < 400 { "OK" } else { "Error" },
            response.content_type,
            response.body.len(),
            response.body,
        );
        if stream.write_all(reply.as_bytes()).is_err() {
            return;
        }
    }
}

fn read_request(stream: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];
    let head_end = loop {
        if let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break end + 4;
        }
        let read = stream.read(&mut chunk).ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(chunk.get(..read)?);
    };
    let head = String::from_utf8(buffer.get(..head_end)?.to_vec()).ok()?;
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buffer.len() < head_end + length {
        let read = stream.read(&mut chunk).ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(chunk.get(..read)?);
    }
    let body = buffer.get(head_end..).unwrap_or_default();
    Some(CapturedRequest {
        line: head.lines().next().unwrap_or_default().to_owned(),
        body: String::from_utf8_lossy(body).into_owned(),
    })
}
