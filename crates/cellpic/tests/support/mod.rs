//! Local HTTP server and fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Clone, Debug)]
pub enum Reply {
    Respond { status: u16, body: Vec<u8> },
    /// Read the request, then close the connection without answering.
    Hangup,
    /// Read the request and never answer.
    Stall,
}

impl Reply {
    pub fn ok(body: Vec<u8>) -> Self {
        Reply::Respond { status: 200, body }
    }

    pub fn status(status: u16) -> Self {
        Reply::Respond {
            status,
            body: Vec::new(),
        }
    }
}

/// Serves scripted replies per path. Each request pops the next reply; the
/// last reply of a path repeats forever. Unknown paths get 404.
pub struct TestServer {
    pub base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, Vec<Reply>)>) -> Self {
        let routes: HashMap<String, VecDeque<Reply>> = routes
            .into_iter()
            .map(|(path, replies)| (path.to_string(), replies.into()))
            .collect();
        let routes = Arc::new(Mutex::new(routes));
        let hits = Arc::new(Mutex::new(HashMap::new()));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test http listener");
        let addr = listener.local_addr().expect("listener addr");

        let server_hits = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&routes);
                let hits = Arc::clone(&server_hits);
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let mut request = Vec::new();
                    loop {
                        let Ok(n) = socket.read(&mut buf).await else {
                            return;
                        };
                        if n == 0 {
                            break;
                        }
                        request.extend_from_slice(&buf[..n]);
                        if request.windows(4).any(|w| w == b"\r\n\r\n") || request.len() > 16 * 1024 {
                            break;
                        }
                    }

                    let text = String::from_utf8_lossy(&request);
                    let path = text
                        .lines()
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                        .unwrap_or("/")
                        .to_string();

                    *hits.lock().unwrap().entry(path.clone()).or_insert(0) += 1;
                    let reply = {
                        let mut routes = routes.lock().unwrap();
                        match routes.get_mut(&path) {
                            Some(queue) if queue.len() > 1 => queue.pop_front(),
                            Some(queue) => queue.front().cloned(),
                            None => None,
                        }
                    }
                    .unwrap_or(Reply::status(404));

                    let (status, body) = match reply {
                        Reply::Respond { status, body } => (status, body),
                        Reply::Hangup => return,
                        Reply::Stall => {
                            tokio::time::sleep(Duration::from_secs(60)).await;
                            return;
                        }
                    };
                    let headers = format!(
                        "HTTP/1.1 {status} Scripted\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(headers.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            hits,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgb([30u8, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png fixture");
    out.into_inner()
}

/// Fast-retry settings so failing URLs do not slow the suite down.
pub fn fast_config() -> cellpic::Config {
    cellpic::Config {
        http: cellpic::HttpConfig {
            timeout_ms: 2_000,
            base_delay_ms: 1,
            max_delay_ms: 2,
            ..cellpic::HttpConfig::default()
        },
        ..cellpic::Config::default()
    }
}
