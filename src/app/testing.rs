//! Scripted transport for unit tests
//!
//! Replies are queued per URL; the last reply for a URL repeats forever. Every
//! call is counted so tests can assert on network traffic.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use crate::app::client::Transport;
use crate::app::models::{CatalogEntry, FilePart, PartRole};
use crate::errors::{DownloadError, DownloadResult};

pub const BASE: &str = "https://mdk.cab";

pub fn url(path: &str) -> Url {
    Url::parse(BASE).unwrap().join(path).unwrap()
}

/// One scripted response
#[derive(Debug, Clone)]
pub enum Reply {
    Body(Vec<u8>),
    Status(u16),
}

impl Reply {
    pub fn html(body: &str) -> Self {
        Reply::Body(body.as_bytes().to_vec())
    }

    fn into_result(self, url: &Url) -> DownloadResult<Vec<u8>> {
        match self {
            Reply::Body(bytes) => Ok(bytes),
            Reply::Status(404) => Err(DownloadError::NotFound {
                url: url.to_string(),
            }),
            Reply::Status(503) => Err(DownloadError::ServerOverloaded),
            Reply::Status(status) => Err(DownloadError::ServerError { status }),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockTransport {
    pages: Mutex<HashMap<String, VecDeque<Reply>>>,
    files: Mutex<HashMap<String, VecDeque<Reply>>>,
    head_sizes: Mutex<HashMap<String, u64>>,
    dead: Mutex<HashSet<String>>,
    page_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    file_calls: AtomicUsize,
}

fn next_reply(queue: &mut VecDeque<Reply>) -> Option<Reply> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, path: &str, html: &str) -> Self {
        self.page_replies(path, vec![Reply::html(html)])
    }

    pub fn page_replies(self, path: &str, replies: Vec<Reply>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url(path).to_string(), replies.into());
        self
    }

    pub fn file(self, path: &str, bytes: Vec<u8>) -> Self {
        self.file_replies(path, vec![Reply::Body(bytes)])
    }

    pub fn file_replies(self, path: &str, replies: Vec<Reply>) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(url(path).to_string(), replies.into());
        self
    }

    /// Advertise a size on HEAD regardless of the file body
    pub fn head_size(self, path: &str, size: u64) -> Self {
        self.head_sizes
            .lock()
            .unwrap()
            .insert(url(path).to_string(), size);
        self
    }

    /// Make HEAD on `path` answer 404
    pub fn dead(self, path: &str) -> Self {
        self.dead.lock().unwrap().insert(url(path).to_string());
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn file_calls(&self) -> usize {
        self.file_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.page_calls() + self.probe_calls() + self.file_calls()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch_page(&self, url: &Url) -> DownloadResult<String> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .pages
            .lock()
            .unwrap()
            .get_mut(url.as_str())
            .and_then(next_reply)
            .unwrap_or(Reply::Status(404));
        let bytes = reply.into_result(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn probe(&self, url: &Url) -> DownloadResult<Option<u64>> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let key = url.as_str();
        if self.dead.lock().unwrap().contains(key) {
            return Err(DownloadError::NotFound {
                url: url.to_string(),
            });
        }
        if let Some(size) = self.head_sizes.lock().unwrap().get(key) {
            return Ok(Some(*size));
        }

        let files = self.files.lock().unwrap();
        let queue = files.get(key).ok_or_else(|| DownloadError::NotFound {
            url: url.to_string(),
        })?;
        Ok(queue.iter().find_map(|reply| match reply {
            Reply::Body(bytes) => Some(bytes.len() as u64),
            Reply::Status(_) => None,
        }))
    }

    async fn fetch_to_file(&self, url: &Url, destination: &Path) -> DownloadResult<u64> {
        self.file_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .files
            .lock()
            .unwrap()
            .get_mut(url.as_str())
            .and_then(next_reply)
            .unwrap_or(Reply::Status(404));
        let bytes = reply.into_result(url)?;
        tokio::fs::write(destination, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

/// Detail page markup with one download link per `(href, size)` pair
pub fn detail_html(title: &str, parent: Option<&str>, links: &[(&str, u64)]) -> String {
    let parent = parent
        .map(|p| format!(r#"<dd class="parent"><a href="/game/{0}">{0}</a></dd>"#, p))
        .unwrap_or_default();
    let links: String = links
        .iter()
        .map(|(href, size)| format!(r#"<li><a href="{}" data-size="{}">dl</a></li>"#, href, size))
        .collect();
    format!(
        r#"<html><body><h1>{}</h1><dl><dd class="genre">Shooter / Flying vertical</dd>{}</dl><ul>{}</ul></body></html>"#,
        title, parent, links
    )
}

/// A fresh entry with split archive parts named after `(identifier, size, role)`
pub fn entry(identifier: &str, parts: &[(&str, u64, PartRole)]) -> CatalogEntry {
    CatalogEntry {
        identifier: identifier.to_string(),
        display_name: identifier.to_string(),
        developer: "Cave".to_string(),
        manufacturer: "Cave".to_string(),
        category: None,
        parent: None,
        parts: parts
            .iter()
            .map(|(name, size, role)| {
                FilePart::new(
                    format!("{}.zip", name),
                    url(&format!("/download/split/{}.zip", name)),
                    *role,
                    Some(*size),
                )
            })
            .collect(),
        refreshed_at: Utc::now(),
    }
}
