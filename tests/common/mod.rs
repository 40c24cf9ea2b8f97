//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use loupe::middleware::access_log::LogSink;
use loupe::{Router, Server};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

/// One call the interceptor made on its sink.
#[derive(Clone, Debug)]
#[allow(dead_code)]
pub enum Entry {
    Access { channel: String, text: String },
    Error { text: String },
}

/// A sink that keeps every entry in memory.
#[derive(Clone, Default)]
pub struct RecordingSink(Arc<Mutex<Vec<Entry>>>);

impl RecordingSink {
    pub fn entries(&self) -> Vec<Entry> {
        self.0.lock().unwrap().clone()
    }
}

impl LogSink for RecordingSink {
    fn write(&self, channel: &str, text: &str) {
        self.0.lock().unwrap().push(Entry::Access { channel: channel.to_owned(), text: text.to_owned() });
    }

    fn error(&self, text: &str, _include_stack: bool) {
        self.0.lock().unwrap().push(Entry::Error { text: text.to_owned() });
    }
}

/// Strips the marker lines from an entry and parses the JSON inside.
pub fn payload(text: &str) -> Value {
    let start = text.find('{').unwrap_or_else(|| panic!("no payload in {text:?}"));
    let end = text.rfind('}').unwrap_or_else(|| panic!("no payload in {text:?}"));
    serde_json::from_str(&text[start..=end]).unwrap()
}

/// Serves `router` on `addr` until the returned sender is dropped or fired.
pub async fn start(router: Router, addr: SocketAddr) -> oneshot::Sender<()> {
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(async move {
        Server::bind(addr.to_string())
            .serve_with_shutdown(router, async {
                let _ = stopped.await;
            })
            .await
            .unwrap();
    });

    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return stop;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("server on {addr} never came up");
}

/// Sends one HTTP/1.1 request and returns the status code and body.
pub async fn send(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut request = format!(
        "{method} {path} HTTP/1.1\r\nhost: {addr}\r\nconnection: close\r\ncontent-length: {}\r\n",
        body.len(),
    );
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    request.push_str("\r\n");
    request.push_str(body);
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();

    let status = raw.split(' ').nth(1).unwrap().parse().unwrap();
    let body = raw.split_once("\r\n\r\n").map(|(_, b)| b.to_owned()).unwrap_or_default();
    (status, body)
}
