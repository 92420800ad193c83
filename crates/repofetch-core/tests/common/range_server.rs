//! Minimal HTTP/1.1 server that serves repository files with Range GET for integration tests.
//!
//! Files are keyed by their repository-relative path; request paths of the
//! form `/{repo}/resolve/{revision}/{path}` are mapped back to that key.
//! Each file can inject faults: a fixed error status, 416 for ranged
//! requests, dropped or stalled connections, a body cut short, pacing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct FileBehavior {
    /// Always answer with this status and no body.
    pub fail_status: Option<u16>,
    /// Delay before any response (lets parallel siblings start first).
    pub delay: Duration,
    /// Answer every ranged request with 416.
    pub reject_ranges: bool,
    /// Ignore Range and always send 200 with the full body.
    pub ignore_range: bool,
    /// Close the first N connections without a response.
    pub drop_first: usize,
    /// Hold the first N connections open silently for `stall_for`, then close.
    pub stall_first: usize,
    pub stall_for: Duration,
    /// On the first connection, send only this many body bytes, then close.
    pub cut_first_after: Option<usize>,
    /// Write the body in pieces of this size with this pause between them.
    pub pace: Option<(usize, Duration)>,
}

/// One request as seen by the server.
#[derive(Debug, Clone)]
pub struct RequestLog {
    pub path: String,
    pub range: Option<String>,
    pub authorization: Option<String>,
}

struct ServedFile {
    body: Vec<u8>,
    behavior: FileBehavior,
}

struct Shared {
    files: HashMap<String, ServedFile>,
    hits: Mutex<HashMap<String, usize>>,
    log: Mutex<Vec<RequestLog>>,
}

pub struct RangeServer {
    base_url: String,
    shared: Arc<Shared>,
}

impl RangeServer {
    /// Starts a server in a background thread. It runs until the process exits.
    pub fn start(files: Vec<(&str, Vec<u8>, FileBehavior)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let shared = Arc::new(Shared {
            files: files
                .into_iter()
                .map(|(p, body, behavior)| (p.to_string(), ServedFile { body, behavior }))
                .collect(),
            hits: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        });
        let accept_shared = Arc::clone(&shared);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let shared = Arc::clone(&accept_shared);
                thread::spawn(move || handle(stream, &shared));
            }
        });
        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            shared,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RequestLog> {
        self.shared.log.lock().unwrap().clone()
    }

    pub fn requests_for(&self, path: &str) -> Vec<RequestLog> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }
}

fn handle(mut stream: TcpStream, shared: &Shared) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let req = parse_request(request);
    if !req.method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }
    let key = file_key(&req.target);
    shared.log.lock().unwrap().push(RequestLog {
        path: key.clone(),
        range: req.range_header.clone(),
        authorization: req.authorization.clone(),
    });
    let hit = {
        let mut hits = shared.hits.lock().unwrap();
        let h = hits.entry(key.clone()).or_insert(0);
        *h += 1;
        *h
    };

    let Some(file) = shared.files.get(&key) else {
        let _ = stream.write_all(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    };
    let b = &file.behavior;

    if hit <= b.drop_first {
        return;
    }
    if hit <= b.stall_first {
        thread::sleep(b.stall_for);
        return;
    }
    if !b.delay.is_zero() {
        thread::sleep(b.delay);
    }
    if let Some(code) = b.fail_status {
        let response = format!(
            "HTTP/1.1 {} Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            code
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    let total = file.body.len() as u64;
    let (status, content_range, slice) = match req.range_start {
        Some(_) if b.reject_ranges => {
            let response = format!(
                "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                total
            );
            let _ = stream.write_all(response.as_bytes());
            return;
        }
        Some(start) if !b.ignore_range => {
            if start >= total {
                let response = format!(
                    "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    total
                );
                let _ = stream.write_all(response.as_bytes());
                return;
            }
            (
                "206 Partial Content",
                Some(format!("bytes {}-{}/{}", start, total - 1, total)),
                &file.body[start as usize..],
            )
        }
        _ => ("200 OK", None, &file.body[..]),
    };

    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\nConnection: close\r\n",
        status,
        slice.len()
    );
    if let Some(cr) = content_range {
        head.push_str(&format!("Content-Range: {}\r\n", cr));
    }
    head.push_str("\r\n");
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }

    let body = match b.cut_first_after {
        Some(n) if hit == 1 => &slice[..n.min(slice.len())],
        _ => slice,
    };
    match b.pace {
        Some((piece, gap)) => {
            for part in body.chunks(piece.max(1)) {
                if stream.write_all(part).is_err() {
                    return;
                }
                let _ = stream.flush();
                thread::sleep(gap);
            }
        }
        None => {
            let _ = stream.write_all(body);
        }
    }
    let _ = stream.flush();
}

struct ParsedRequest {
    method: String,
    target: String,
    range_header: Option<String>,
    range_start: Option<u64>,
    authorization: Option<String>,
}

fn parse_request(request: &str) -> ParsedRequest {
    let mut out = ParsedRequest {
        method: String::new(),
        target: String::new(),
        range_header: None,
        range_start: None,
        authorization: None,
    };
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if out.method.is_empty() {
            let mut parts = line.split_whitespace();
            out.method = parts.next().unwrap_or("").to_string();
            out.target = parts.next().unwrap_or("").to_string();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            if name.trim().eq_ignore_ascii_case("range") {
                out.range_header = Some(value.to_string());
                if let Some(part) = value.strip_prefix("bytes=") {
                    if let Some((a, _)) = part.split_once('-') {
                        out.range_start = a.trim().parse().ok();
                    }
                }
            } else if name.trim().eq_ignore_ascii_case("authorization") {
                out.authorization = Some(value.to_string());
            }
        }
    }
    out
}

/// `/{repo...}/resolve/{revision}/{path}` → `{path}`.
fn file_key(target: &str) -> String {
    let path = target.split('?').next().unwrap_or("");
    match path.find("/resolve/") {
        Some(i) => {
            let rest = &path[i + "/resolve/".len()..];
            rest.split_once('/').map(|(_, p)| p).unwrap_or("").to_string()
        }
        None => path.trim_start_matches('/').to_string(),
    }
}
