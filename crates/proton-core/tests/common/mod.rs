#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{Builder, EntryType, Header};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl Route {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: b"<html>error page</html>".to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Minimal HTTP/1.1 responder: one request per connection, unknown paths
/// answer 404.
pub struct TestServer {
    pub addr: SocketAddr,
}

impl TestServer {
    pub async fn start(routes: HashMap<String, Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("test listener should bind");
        let addr = listener.local_addr().expect("listener should have an address");
        let routes = Arc::new(routes);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                tokio::spawn(async move {
                    let mut request: Vec<u8> = Vec::new();
                    let mut chunk = [0_u8; 1024];
                    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(read) => request.extend_from_slice(&chunk[..read]),
                        }
                    }

                    let head = String::from_utf8_lossy(&request);
                    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let route = routes
                        .get(&path)
                        .cloned()
                        .unwrap_or_else(|| Route::status(404));

                    if !route.delay.is_zero() {
                        tokio::time::sleep(route.delay).await;
                    }

                    let reason = match route.status {
                        200 => "OK",
                        404 => "Not Found",
                        _ => "Error",
                    };
                    let header = format!(
                        "HTTP/1.1 {} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        route.status,
                        route.body.len()
                    );
                    let _ = socket.write_all(header.as_bytes()).await;
                    let _ = socket.write_all(&route.body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

pub fn archive_route(version: &str) -> String {
    format!("/repo/releases/download/{version}/{version}.tar.gz")
}

/// A release archive laid out like upstream: one top-level directory named
/// after the version.
pub fn release_archive(version: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Directory);
    header.set_mode(0o755);
    header.set_size(0);
    builder
        .append_data(&mut header, format!("{version}/"), std::io::empty())
        .expect("directory entry should be written");

    for (name, data) in files {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(data.len() as u64);
        builder
            .append_data(&mut header, format!("{version}/{name}"), data.as_bytes())
            .expect("file entry should be written");
    }

    builder
        .into_inner()
        .expect("tar stream should be finalized")
        .finish()
        .expect("gzip stream should be finalized")
}

/// Every path under `root`, relative and sorted, with file contents.
pub fn snapshot(root: &std::path::Path) -> Vec<(String, Option<Vec<u8>>)> {
    fn walk(base: &std::path::Path, dir: &std::path::Path, out: &mut Vec<(String, Option<Vec<u8>>)>) {
        for entry in std::fs::read_dir(dir).expect("directory should be listable") {
            let path = entry.expect("entry should be readable").path();
            let relative = path
                .strip_prefix(base)
                .expect("path should be under base")
                .display()
                .to_string();
            if path.is_dir() {
                out.push((relative, None));
                walk(base, &path, out);
            } else {
                let data = std::fs::read(&path).expect("file should be readable");
                out.push((relative, Some(data)));
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
