// src/stage/stager.rs

//! Applying a [`StagingPlan`] and undoing it.
//!
//! [`FileStager::stage`] returns a [`StagedWorkspace`] guard. The guard owns
//! everything needed to put the workspace back: files it created are
//! deleted, files it overwrote are restored from a private backup copy.
//! Reverting happens through [`StagedWorkspace::revert`] on the normal path
//! and through `Drop` on every other one (early return, panic, a cancelled
//! future), so a workspace is never left half-staged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::bail;
use tracing::{debug, error, warn};

use crate::errors::{AgentPlaneError, Result};
use crate::fs::FileSystem;
use crate::stage::plan::{StageEntry, StagingPlan};

static BACKUP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Copies planned files into a workspace, backing up what it overwrites.
#[derive(Debug, Clone)]
pub struct FileStager {
    fs: Arc<dyn FileSystem>,
    backup_root: PathBuf,
}

impl FileStager {
    /// `backup_root` holds one short-lived sub-directory per staged plan.
    pub fn new(fs: Arc<dyn FileSystem>, backup_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            backup_root: backup_root.into(),
        }
    }

    /// Stager backing up into `$TMPDIR/agentplane-backups`.
    pub fn with_default_backup_root(fs: Arc<dyn FileSystem>) -> Self {
        Self::new(fs, std::env::temp_dir().join("agentplane-backups"))
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Apply every entry of `plan` in order.
    ///
    /// If entry *k* fails, entries before it (and any backup already taken
    /// for *k*) are reverted before the error is returned.
    pub fn stage(&self, plan: &StagingPlan) -> Result<StagedWorkspace> {
        let seq = BACKUP_SEQ.fetch_add(1, Ordering::Relaxed);
        let backup_dir = self
            .backup_root
            .join(format!("{}-{}", std::process::id(), seq));

        let mut staged = StagedWorkspace {
            fs: Arc::clone(&self.fs),
            backup_dir,
            backup_dir_created: false,
            applied: Vec::new(),
            reverted: false,
        };

        for entry in plan.entries() {
            if let Err(source) = staged.apply(entry) {
                warn!(
                    destination = ?entry.destination,
                    error = %source,
                    staged = staged.applied.len(),
                    "staging failed; rolling back"
                );
                if let Err(rollback) = staged.revert_inner() {
                    error!(error = %rollback, "rollback after staging failure was incomplete");
                }
                return Err(AgentPlaneError::Staging {
                    path: entry.destination.clone(),
                    source,
                });
            }
        }

        debug!(
            target_dir = ?plan.target_dir(),
            files = staged.applied.len(),
            backups = staged.backup_map().len(),
            "workspace staged"
        );
        Ok(staged)
    }
}

#[derive(Debug)]
enum Applied {
    /// Destination did not exist before staging; delete on revert.
    Created(PathBuf),
    /// Destination existed; its original bytes live at `backup`.
    Replaced { destination: PathBuf, backup: PathBuf },
}

/// Scoped handle on a staged workspace. Reverts on drop.
#[derive(Debug)]
#[must_use = "dropping a StagedWorkspace reverts it immediately"]
pub struct StagedWorkspace {
    fs: Arc<dyn FileSystem>,
    backup_dir: PathBuf,
    backup_dir_created: bool,
    applied: Vec<Applied>,
    reverted: bool,
}

impl StagedWorkspace {
    /// Destination -> backup path, for destinations that existed before.
    pub fn backup_map(&self) -> BTreeMap<PathBuf, PathBuf> {
        self.applied
            .iter()
            .filter_map(|a| match a {
                Applied::Replaced {
                    destination,
                    backup,
                } => Some((destination.clone(), backup.clone())),
                Applied::Created(_) => None,
            })
            .collect()
    }

    /// Destinations that will be deleted on revert.
    pub fn created_files(&self) -> Vec<&Path> {
        self.applied
            .iter()
            .filter_map(|a| match a {
                Applied::Created(p) => Some(p.as_path()),
                Applied::Replaced { .. } => None,
            })
            .collect()
    }

    /// Restore the workspace to its pre-staging state.
    pub fn revert(mut self) -> Result<()> {
        self.revert_inner()
    }

    fn apply(&mut self, entry: &StageEntry) -> anyhow::Result<()> {
        let dest = &entry.destination;

        if self.fs.exists(dest) {
            if self.fs.is_dir(dest) {
                bail!("destination {:?} is a directory", dest);
            }
            if !self.backup_dir_created {
                self.fs.create_dir_all(&self.backup_dir)?;
                self.backup_dir_created = true;
            }
            let name = dest
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let backup = self
                .backup_dir
                .join(format!("{}-{}", self.applied.len(), name));
            self.fs.copy(dest, &backup)?;
            self.applied.push(Applied::Replaced {
                destination: dest.clone(),
                backup,
            });
        } else {
            self.applied.push(Applied::Created(dest.clone()));
        }

        self.fs.copy(&entry.source, dest)
    }

    fn revert_inner(&mut self) -> Result<()> {
        self.reverted = true;
        let mut failures = Vec::new();

        for applied in std::mem::take(&mut self.applied).into_iter().rev() {
            match applied {
                Applied::Created(path) => {
                    if self.fs.exists(&path) {
                        if let Err(e) = self.fs.remove_file(&path) {
                            failures.push(format!("{}: {e}", path.display()));
                        }
                    }
                }
                Applied::Replaced {
                    destination,
                    backup,
                } => {
                    if let Err(e) = self.fs.copy(&backup, &destination) {
                        failures.push(format!(
                            "{} (original kept at {}): {e}",
                            destination.display(),
                            backup.display()
                        ));
                    }
                }
            }
        }

        // Keep backups around if anything could not be restored from them.
        if self.backup_dir_created && failures.is_empty() {
            if let Err(e) = self.fs.remove_dir_all(&self.backup_dir) {
                warn!(dir = ?self.backup_dir, error = %e, "could not remove backup directory");
            }
            self.backup_dir_created = false;
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AgentPlaneError::Revert { failures })
        }
    }
}

impl Drop for StagedWorkspace {
    fn drop(&mut self) {
        if self.reverted {
            return;
        }
        warn!("staged workspace dropped without explicit revert; reverting now");
        if let Err(e) = self.revert_inner() {
            error!(error = %e, "revert on drop failed");
        }
    }
}
