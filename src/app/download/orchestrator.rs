//! Multi-part download orchestration
//!
//! Parts are fetched one at a time, in plan order, into a hidden staging
//! directory of their own under the destination. Nothing reaches the destination until
//! every part has been fetched and its size verified; then the parts are
//! renamed into place. Any failure removes the staging directory, and a failed
//! move removes the files this run created, unless another execution in flight
//! also uses them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, info, warn};

use super::plan::DownloadPlan;
use crate::app::client::CatalogClient;
use crate::app::models::{AssembledArtifact, CatalogEntry, FilePart};
use crate::app::retry::RetryPolicy;
use crate::constants::{files, http};
use crate::errors::{CatalogError, DownloadError, DownloadResult, Result};

/// Settings for part downloads
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Extension of the assembled archive
    pub archive_extension: String,
    /// Retry policy applied to each part
    pub retry: RetryPolicy,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            archive_extension: files::ARCHIVE_EXTENSION.to_string(),
            retry: RetryPolicy::default().with_attempt_timeout(http::DEFAULT_TIMEOUT * 20),
        }
    }
}

impl DownloadConfig {
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.retry = self.retry.with_attempt_timeout(timeout);
        self
    }
}

/// Reference counts of final part paths used by executions in flight
#[derive(Debug, Default)]
struct PathClaims {
    counts: Mutex<HashMap<PathBuf, usize>>,
}

impl PathClaims {
    fn claim(&self, paths: &[PathBuf]) -> Claim<'_> {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        for path in paths {
            *counts.entry(path.clone()).or_default() += 1;
        }
        Claim {
            claims: self,
            paths: paths.to_vec(),
        }
    }

    /// Whether more than one execution currently uses `path`
    fn is_shared(&self, path: &Path) -> bool {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        counts.get(path).is_some_and(|count| *count > 1)
    }
}

/// Released when the owning execution finishes
struct Claim<'a> {
    claims: &'a PathClaims,
    paths: Vec<PathBuf>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut counts = self
            .claims
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for path in &self.paths {
            if let Some(count) = counts.get_mut(path) {
                *count -= 1;
                if *count == 0 {
                    counts.remove(path);
                }
            }
        }
    }
}

/// Resolves entries into plans and materializes plans on disk
#[derive(Debug)]
pub struct DownloadOrchestrator {
    client: Arc<CatalogClient>,
    config: DownloadConfig,
    claims: PathClaims,
}

impl DownloadOrchestrator {
    pub fn new(client: Arc<CatalogClient>, config: DownloadConfig) -> Self {
        Self {
            client,
            config,
            claims: PathClaims::default(),
        }
    }

    /// Resolve an entry's parts and validate them into a plan
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::NoPartsFound` when the entry has no parts,
    /// `DownloadError::InvalidPlan` when a part is not live or the parts fail
    /// validation, or the catalog error that prevented resolution
    pub async fn plan(&self, entry: &CatalogEntry) -> Result<DownloadPlan> {
        let parts = match self.client.resolve_parts(entry).await {
            Ok(parts) => parts,
            Err(CatalogError::PartUnavailable {
                identifier, part, ..
            }) => {
                return Err(DownloadError::InvalidPlan {
                    identifier,
                    reason: format!("part {} is not live", part),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };
        let plan = DownloadPlan::new(&entry.identifier, parts, &self.config.archive_extension)?;
        debug!(
            "Planned {}: {} parts, {} bytes",
            plan.identifier(),
            plan.parts().len(),
            plan.total_size()
        );
        Ok(plan)
    }

    /// Fetch, verify and place every part of a plan under `destination`
    ///
    /// Returns immediately, without network access, when every part is already
    /// present at its planned size.
    ///
    /// # Errors
    ///
    /// - `DownloadError::DownloadIncomplete` when a part exhausts its retries
    /// - `DownloadError::IntegrityMismatch` when a part keeps the wrong size
    ///   after one extra fetch
    /// - `DownloadError::AtomicOperationFailed` when a part cannot be moved
    ///   into place
    ///
    /// In every case no file from this run is left in `destination`.
    pub async fn execute(
        &self,
        plan: &DownloadPlan,
        destination: &Path,
    ) -> DownloadResult<AssembledArtifact> {
        let parts = plan.parts();
        let final_paths: Vec<PathBuf> = parts.iter().map(|p| destination.join(&p.name)).collect();
        let _claim = self.claims.claim(&final_paths);

        let mut present = Vec::with_capacity(parts.len());
        for (part, path) in parts.iter().zip(&final_paths) {
            present.push(has_planned_size(path, part).await);
        }

        if present.iter().all(|p| *p) {
            info!("{} already present, nothing to fetch", plan.identifier());
            return Ok(self.artifact(plan, destination, final_paths, 0, true));
        }

        fs::create_dir_all(destination).await?;
        let staging = tempfile::Builder::new()
            .prefix(&format!("{}{}-", files::STAGING_PREFIX, plan.identifier()))
            .tempdir_in(destination)?;

        let result = self
            .fetch_and_place(plan, &staging, &final_paths, &present)
            .await;
        if let Err(e) = staging.close() {
            warn!("Could not remove staging directory: {}", e);
        }

        match result {
            Ok(fetched) => {
                info!(
                    "Assembled {} ({} bytes, {} fetched)",
                    plan.target_name(),
                    plan.total_size(),
                    fetched
                );
                Ok(self.artifact(plan, destination, final_paths, fetched, false))
            }
            Err(e) => {
                warn!("Download of {} failed: {}", plan.identifier(), e);
                Err(e)
            }
        }
    }

    async fn fetch_and_place(
        &self,
        plan: &DownloadPlan,
        staging: &TempDir,
        final_paths: &[PathBuf],
        present: &[bool],
    ) -> DownloadResult<u64> {
        let mut staged: Vec<(usize, PathBuf)> = Vec::new();
        let mut fetched = 0;

        for (index, part) in plan.parts().iter().enumerate() {
            if present[index] {
                debug!("Reusing existing {}", part.name);
                continue;
            }
            let staged_path = staging
                .path()
                .join(format!("{:02}-{}", index, part.name.replace('/', "_")));
            fetched += self.fetch_part(plan, part, &staged_path).await?;
            staged.push((index, staged_path));
        }

        // One extra fetch for parts that came back at the wrong size
        let mut mismatched = Vec::new();
        for (index, path) in &staged {
            let part = &plan.parts()[*index];
            if !has_planned_size(path, part).await {
                mismatched.push((*index, path.clone()));
            }
        }
        for (index, path) in &mismatched {
            let part = &plan.parts()[*index];
            warn!("Size mismatch on {}, fetching again", part.name);
            fetched += self.fetch_part(plan, part, path).await?;

            let actual = file_size(path).await;
            let expected = part.size.unwrap_or_default();
            if actual != Some(expected) {
                return Err(DownloadError::IntegrityMismatch {
                    identifier: plan.identifier().to_string(),
                    part: part.name.clone(),
                    expected,
                    actual: actual.unwrap_or_default(),
                });
            }
        }

        // Files that did not exist before this run
        let mut created: Vec<&PathBuf> = Vec::with_capacity(staged.len());
        for (index, staged_path) in &staged {
            let final_path = &final_paths[*index];
            let existed = fs::try_exists(final_path).await.unwrap_or(true);
            if let Err(e) = place(staged_path, final_path).await {
                warn!(
                    "Could not move {} into place: {}",
                    final_path.display(),
                    e
                );
                self.roll_back(&created).await;
                return Err(DownloadError::AtomicOperationFailed {
                    temp_path: staged_path.clone(),
                    final_path: final_path.clone(),
                });
            }
            if !existed {
                created.push(final_path);
            }
        }

        Ok(fetched)
    }

    async fn roll_back(&self, created: &[&PathBuf]) {
        for path in created {
            if self.claims.is_shared(path) {
                debug!("Keeping {}, still used by another entry", path.display());
                continue;
            }
            if let Err(e) = fs::remove_file(path).await {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }

    async fn fetch_part(
        &self,
        plan: &DownloadPlan,
        part: &FilePart,
        staged_path: &Path,
    ) -> DownloadResult<u64> {
        let transport = self.client.transport();
        let written = self
            .config
            .retry
            .run(&format!("{} part {}", plan.identifier(), part.name), || {
                transport.fetch_to_file(&part.url, staged_path)
            })
            .await
            .map_err(|e| DownloadError::DownloadIncomplete {
                identifier: plan.identifier().to_string(),
                part: part.name.clone(),
                attempts: e.attempts,
                reason: e.last_error.to_string(),
            })?;

        debug!("Fetched {} ({} bytes)", part.name, written);
        Ok(written)
    }

    fn artifact(
        &self,
        plan: &DownloadPlan,
        destination: &Path,
        files: Vec<PathBuf>,
        bytes_fetched: u64,
        already_present: bool,
    ) -> AssembledArtifact {
        AssembledArtifact {
            identifier: plan.identifier().to_string(),
            path: destination.join(plan.target_name()),
            total_size: plan.total_size(),
            bytes_fetched,
            files,
            already_present,
        }
    }
}

async fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

async fn has_planned_size(path: &Path, part: &FilePart) -> bool {
    part.size.is_some() && file_size(path).await == part.size
}

async fn place(staged: &Path, final_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::rename(staged, final_path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::CatalogConfig;
    use crate::app::models::PartRole;
    use crate::app::store::MemoryStore;
    use crate::app::testing::{entry, MockTransport, Reply, BASE};
    use tempfile::tempdir;
    use url::Url;

    fn orchestrator(transport: Arc<MockTransport>) -> DownloadOrchestrator {
        let config = CatalogConfig {
            base_url: Url::parse(BASE).unwrap(),
            ..Default::default()
        };
        let client = CatalogClient::new(
            transport,
            Arc::new(MemoryStore::new()),
            config,
            RetryPolicy::immediate(3),
        );
        DownloadOrchestrator::new(
            Arc::new(client),
            DownloadConfig {
                retry: RetryPolicy::immediate(3),
                ..Default::default()
            },
        )
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_base_and_delta_assembled() {
        let transport = Arc::new(
            MockTransport::new()
                .file("/download/split/parent.zip", vec![1; 50])
                .file("/download/split/clone.zip", vec![2; 10]),
        );
        let orchestrator = orchestrator(transport.clone());
        let dest = tempdir().unwrap();

        let clone = entry(
            "clone",
            &[("parent", 50, PartRole::Base), ("clone", 10, PartRole::Delta)],
        );
        let plan = orchestrator.plan(&clone).await.unwrap();
        let artifact = orchestrator.execute(&plan, dest.path()).await.unwrap();

        assert_eq!(artifact.identifier, "clone");
        assert_eq!(artifact.total_size, 60);
        assert_eq!(artifact.path, dest.path().join("clone.zip"));
        assert_eq!(artifact.bytes_fetched, 60);
        assert!(!artifact.already_present);
        assert_eq!(listing(dest.path()), ["clone.zip", "parent.zip"]);
        assert_eq!(std::fs::read(dest.path().join("clone.zip")).unwrap(), vec![2; 10]);
    }

    #[tokio::test]
    async fn test_second_execute_makes_no_network_calls() {
        let transport = Arc::new(MockTransport::new().file("/download/split/ket.zip", vec![9; 30]));
        let orchestrator = orchestrator(transport.clone());
        let dest = tempdir().unwrap();

        let plan = orchestrator
            .plan(&entry("ket", &[("ket", 30, PartRole::Base)]))
            .await
            .unwrap();
        orchestrator.execute(&plan, dest.path()).await.unwrap();

        let calls = transport.network_calls();
        let again = orchestrator.execute(&plan, dest.path()).await.unwrap();
        assert!(again.already_present);
        assert_eq!(transport.network_calls(), calls);
    }

    #[tokio::test]
    async fn test_existing_parent_is_reused() {
        let transport = Arc::new(
            MockTransport::new()
                .file("/download/split/parent.zip", vec![1; 50])
                .file("/download/split/clone.zip", vec![2; 10]),
        );
        let orchestrator = orchestrator(transport.clone());
        let dest = tempdir().unwrap();
        std::fs::write(dest.path().join("parent.zip"), vec![7; 50]).unwrap();

        let plan = orchestrator
            .plan(&entry(
                "clone",
                &[("parent", 50, PartRole::Base), ("clone", 10, PartRole::Delta)],
            ))
            .await
            .unwrap();
        let artifact = orchestrator.execute(&plan, dest.path()).await.unwrap();

        assert_eq!(transport.file_calls(), 1);
        assert_eq!(artifact.total_size, 60);
        assert_eq!(artifact.bytes_fetched, 10);
        assert_eq!(std::fs::read(dest.path().join("parent.zip")).unwrap(), vec![7; 50]);
    }

    /// Parent and clone plan where the clone's final path is a non-empty
    /// directory, so moving the clone into place fails after the parent moved
    async fn blocked_clone(dest: &Path) -> (DownloadOrchestrator, DownloadPlan) {
        let transport = Arc::new(
            MockTransport::new()
                .file("/download/split/gunbird.zip", vec![1; 40])
                .file("/download/split/gunbirdj.zip", vec![2; 8]),
        );
        let orchestrator = orchestrator(transport);
        let blocker = dest.join("gunbirdj.zip");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let plan = orchestrator
            .plan(&entry(
                "gunbirdj",
                &[("gunbird", 40, PartRole::Base), ("gunbirdj", 8, PartRole::Delta)],
            ))
            .await
            .unwrap();
        (orchestrator, plan)
    }

    #[tokio::test]
    async fn test_failed_move_removes_created_parent() {
        let dest = tempdir().unwrap();
        let (orchestrator, plan) = blocked_clone(dest.path()).await;

        let err = orchestrator.execute(&plan, dest.path()).await.unwrap_err();

        assert!(matches!(err, DownloadError::AtomicOperationFailed { .. }));
        assert!(!dest.path().join("gunbird.zip").exists());
        assert_eq!(listing(dest.path()), ["gunbirdj.zip"]);
    }

    #[tokio::test]
    async fn test_failed_move_keeps_replaced_parent() {
        let dest = tempdir().unwrap();
        std::fs::write(dest.path().join("gunbird.zip"), vec![0; 3]).unwrap();
        let (orchestrator, plan) = blocked_clone(dest.path()).await;

        let err = orchestrator.execute(&plan, dest.path()).await.unwrap_err();

        assert!(matches!(err, DownloadError::AtomicOperationFailed { .. }));
        assert_eq!(std::fs::read(dest.path().join("gunbird.zip")).unwrap(), vec![1; 40]);
    }

    #[tokio::test]
    async fn test_failed_move_keeps_parent_used_elsewhere() {
        let dest = tempdir().unwrap();
        let (orchestrator, plan) = blocked_clone(dest.path()).await;
        let _sibling = orchestrator
            .claims
            .claim(&[dest.path().join("gunbird.zip")]);

        let err = orchestrator.execute(&plan, dest.path()).await.unwrap_err();

        assert!(matches!(err, DownloadError::AtomicOperationFailed { .. }));
        assert_eq!(std::fs::read(dest.path().join("gunbird.zip")).unwrap(), vec![1; 40]);
    }

    #[tokio::test]
    async fn test_persistent_size_mismatch() {
        let transport = Arc::new(
            MockTransport::new()
                .head_size("/download/split/bgaregga.zip", 100)
                .file("/download/split/bgaregga.zip", vec![0; 64]),
        );
        let orchestrator = orchestrator(transport.clone());
        let dest = tempdir().unwrap();

        let plan = orchestrator
            .plan(&entry("bgaregga", &[("bgaregga", 100, PartRole::Base)]))
            .await
            .unwrap();
        let err = orchestrator.execute(&plan, dest.path()).await.unwrap_err();

        match err {
            DownloadError::IntegrityMismatch {
                part,
                expected,
                actual,
                ..
            } => {
                assert_eq!(part, "bgaregga.zip");
                assert_eq!(expected, 100);
                assert_eq!(actual, 64);
            }
            other => panic!("Expected IntegrityMismatch, got {:?}", other),
        }
        assert_eq!(transport.file_calls(), 2);
        assert!(listing(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn test_mismatch_fixed_by_second_pass() {
        let transport = Arc::new(
            MockTransport::new()
                .head_size("/download/split/sstriker.zip", 20)
                .file_replies(
                    "/download/split/sstriker.zip",
                    vec![Reply::Body(vec![0; 19]), Reply::Body(vec![0; 20])],
                ),
        );
        let orchestrator = orchestrator(transport.clone());
        let dest = tempdir().unwrap();

        let plan = orchestrator
            .plan(&entry("sstriker", &[("sstriker", 20, PartRole::Base)]))
            .await
            .unwrap();
        let artifact = orchestrator.execute(&plan, dest.path()).await.unwrap();
        assert_eq!(artifact.total_size, 20);
        assert_eq!(listing(dest.path()), ["sstriker.zip"]);
    }

    #[tokio::test]
    async fn test_exhausted_part_leaves_nothing_behind() {
        let transport = Arc::new(
            MockTransport::new()
                .file("/download/split/gunbird.zip", vec![1; 40])
                .head_size("/download/split/gunbirdj.zip", 8)
                .file_replies("/download/split/gunbirdj.zip", vec![Reply::Status(500)]),
        );
        let orchestrator = orchestrator(transport.clone());
        let dest = tempdir().unwrap();

        let plan = orchestrator
            .plan(&entry(
                "gunbirdj",
                &[("gunbird", 40, PartRole::Base), ("gunbirdj", 8, PartRole::Delta)],
            ))
            .await
            .unwrap();
        let err = orchestrator.execute(&plan, dest.path()).await.unwrap_err();

        match err {
            DownloadError::DownloadIncomplete { part, attempts, .. } => {
                assert_eq!(part, "gunbirdj.zip");
                assert_eq!(attempts, 3);
            }
            other => panic!("Expected DownloadIncomplete, got {:?}", other),
        }
        assert!(listing(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn test_dead_part_leaves_no_plan() {
        let transport = Arc::new(MockTransport::new().dead("/download/split/raiden.zip"));
        let orchestrator = orchestrator(transport);

        let err = orchestrator
            .plan(&entry("raiden", &[("raiden", 10, PartRole::Base)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::errors::AppError::Download(DownloadError::InvalidPlan { .. })
        ));
    }

    #[tokio::test]
    async fn test_dead_delta_is_not_planned_without_it() {
        let transport = Arc::new(
            MockTransport::new()
                .file("/download/split/kinst.zip", vec![7; 40])
                .dead("/download/split/kinstdisk.zip"),
        );
        let orchestrator = orchestrator(transport.clone());

        let err = orchestrator
            .plan(&entry(
                "kinst",
                &[("kinst", 40, PartRole::Base), ("kinstdisk", 500, PartRole::Delta)],
            ))
            .await
            .unwrap_err();

        match err {
            crate::errors::AppError::Download(DownloadError::InvalidPlan {
                identifier,
                reason,
            }) => {
                assert_eq!(identifier, "kinst");
                assert_eq!(reason, "part kinstdisk.zip is not live");
            }
            other => panic!("Expected InvalidPlan, got {:?}", other),
        }
        assert_eq!(transport.file_calls(), 0);
    }
}
