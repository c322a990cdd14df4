//! Scripted catalog site and pipeline builders shared by the integration tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use url::Url;

use shmupfetch::app::batch::cancellation_channel;
use shmupfetch::app::{
    BatchRunner, CatalogClient, CatalogConfig, CatalogFilter, CatalogStore, DownloadConfig,
    DownloadOrchestrator, InventoryScanner, OrientationPolicy, Pipeline, RetryPolicy, Transport,
};
use shmupfetch::errors::{DownloadError, DownloadResult};

pub const BASE: &str = "https://catalog.test";

pub fn url(path: &str) -> Url {
    Url::parse(BASE).unwrap().join(path).unwrap()
}

/// A remote file: its body, or a status it always fails with
#[derive(Clone)]
enum Remote {
    Body(Vec<u8>),
    Failing { advertised: u64, status: u16 },
}

/// In-memory stand-in for the catalog site
#[derive(Default)]
pub struct ScriptedSite {
    pages: Mutex<HashMap<String, Result<String, u16>>>,
    files: Mutex<HashMap<String, Remote>>,
    page_requests: AtomicUsize,
    file_requests: Mutex<HashMap<String, usize>>,
}

impl ScriptedSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, path: &str, html: impl Into<String>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url(path).to_string(), Ok(html.into()));
        self
    }

    /// Every request for `path` answers `status`
    pub fn broken_page(self, path: &str, status: u16) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url(path).to_string(), Err(status));
        self
    }

    pub fn file(self, path: &str, bytes: Vec<u8>) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(url(path).to_string(), Remote::Body(bytes));
        self
    }

    /// HEAD advertises `advertised` bytes; every GET answers `status`
    pub fn failing_file(self, path: &str, advertised: u64, status: u16) -> Self {
        self.files.lock().unwrap().insert(
            url(path).to_string(),
            Remote::Failing { advertised, status },
        );
        self
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    pub fn file_requests(&self, path: &str) -> usize {
        self.file_requests
            .lock()
            .unwrap()
            .get(url(path).as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_file_requests(&self) -> usize {
        self.file_requests.lock().unwrap().values().sum()
    }

    fn status_error(url: &Url, status: u16) -> DownloadError {
        match status {
            404 => DownloadError::NotFound {
                url: url.to_string(),
            },
            status => DownloadError::ServerError { status },
        }
    }
}

#[async_trait]
impl Transport for ScriptedSite {
    async fn fetch_page(&self, url: &Url) -> DownloadResult<String> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        match self.pages.lock().unwrap().get(url.as_str()) {
            Some(Ok(html)) => Ok(html.clone()),
            Some(Err(status)) => Err(Self::status_error(url, *status)),
            None => Err(Self::status_error(url, 404)),
        }
    }

    async fn probe(&self, url: &Url) -> DownloadResult<Option<u64>> {
        match self.files.lock().unwrap().get(url.as_str()) {
            Some(Remote::Body(bytes)) => Ok(Some(bytes.len() as u64)),
            Some(Remote::Failing { advertised, .. }) => Ok(Some(*advertised)),
            None => Err(Self::status_error(url, 404)),
        }
    }

    async fn fetch_to_file(&self, url: &Url, destination: &Path) -> DownloadResult<u64> {
        *self
            .file_requests
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        let remote = self.files.lock().unwrap().get(url.as_str()).cloned();
        match remote {
            Some(Remote::Body(bytes)) => {
                tokio::fs::write(destination, &bytes).await?;
                Ok(bytes.len() as u64)
            }
            Some(Remote::Failing { status, .. }) => Err(Self::status_error(url, status)),
            None => Err(Self::status_error(url, 404)),
        }
    }
}

/// Listing page linking every identifier in `games`
pub fn listing_html(games: &[(&str, &str)]) -> String {
    let rows: String = games
        .iter()
        .map(|(id, title)| format!(r#"<li><a href="/game/{}">{}</a></li>"#, id, title))
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", rows)
}

/// Detail page with one split download per `(file stem, size)`
pub fn detail_html(title: &str, parent: Option<&str>, parts: &[(&str, u64)]) -> String {
    let parent = parent
        .map(|p| format!(r#"<p class="parent">Clone of <a href="/game/{0}">{0}</a></p>"#, p))
        .unwrap_or_default();
    let links: String = parts
        .iter()
        .map(|(stem, size)| {
            format!(
                r#"<a href="/download/split/{}.zip" data-size="{}">{}.zip</a>"#,
                stem, size, stem
            )
        })
        .collect();
    format!(
        r#"<html><body><h1>{}</h1><span class="genre">Shooter / Flying vertical</span>{}<div>{}</div></body></html>"#,
        title, parent, links
    )
}

/// Catalog configuration for a single developer "Cave" listed under "Cave"
pub fn catalog_config() -> CatalogConfig {
    CatalogConfig {
        base_url: Url::parse(BASE).unwrap(),
        developers: [
            ("Cave".to_string(), vec!["Cave".to_string()]),
            ("Toaplan".to_string(), vec!["Toaplan".to_string()]),
        ]
        .into_iter()
        .collect(),
        filter: CatalogFilter::new(["mahjong"], ["uopoko"]),
        display_names: HashMap::new(),
        ..Default::default()
    }
}

pub struct Harness {
    pub pipeline: Pipeline,
    /// Keeps the cancellation flag open for the pipeline's lifetime
    pub cancel: watch::Sender<bool>,
}

pub fn pipeline(
    site: Arc<ScriptedSite>,
    store: Arc<dyn CatalogStore>,
    destination: &Path,
) -> Harness {
    let client = Arc::new(CatalogClient::new(
        site,
        store,
        catalog_config(),
        RetryPolicy::immediate(3),
    ));
    let orchestrator = Arc::new(DownloadOrchestrator::new(
        client.clone(),
        DownloadConfig {
            retry: RetryPolicy::immediate(3),
            ..Default::default()
        },
    ));
    let (cancel, rx) = cancellation_channel();
    let runner = BatchRunner::new(orchestrator, destination, 2, rx);

    Harness {
        pipeline: Pipeline::new(
            client,
            InventoryScanner::default(),
            runner,
            destination,
            OrientationPolicy::new(["donpachi"]),
        ),
        cancel,
    }
}
