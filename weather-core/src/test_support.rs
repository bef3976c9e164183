//! Minimal in-process HTTP stub for exercising the reqwest clients.

use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
    task::JoinHandle,
};

/// What the stub does with one accepted connection.
pub enum Reply {
    Json(u16, String),
    /// Accept and never answer.
    Silent,
}

/// A captured request: request line plus headers, then the body.
#[derive(Debug, Clone)]
pub struct Captured {
    pub head: String,
    pub body: String,
}

pub struct Stub {
    pub base_url: String,
    pub requests: mpsc::UnboundedReceiver<Captured>,
    _task: JoinHandle<()>,
}

impl Stub {
    pub async fn next_request(&mut self) -> Captured {
        self.requests.recv().await.expect("stub closed before a request arrived")
    }
}

/// Serves `replies` in order, one connection each.
pub async fn serve(replies: Vec<Reply>) -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        for reply in replies {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let captured = read_request(&mut socket).await;
            let _ = tx.send(captured);

            match reply {
                Reply::Json(status, body) => {
                    let response = format!(
                        "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
                Reply::Silent => {
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        drop(socket);
                    });
                }
            }
        }
    });

    Stub { base_url, requests: rx, _task: task }
}

async fn read_request(socket: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let expected = content_length(&head);
            if buf.len() >= end + 4 + expected {
                let body = String::from_utf8_lossy(&buf[end + 4..end + 4 + expected]).to_string();
                return Captured { head, body };
            }
        }
    }

    Captured { head: String::from_utf8_lossy(&buf).to_string(), body: String::new() }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}
