//! Allocation session service
//!
//! Owns the lifecycle around the normalizer: start a draft for an entity set,
//! apply edits, gate and persist the confirmed result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{to_basis_points, ConfirmedAllocation, Draft, EntityId, Normalizer};
use crate::infrastructure::traits::FileSystem;

/// File holding the in-progress allocation.
pub const DRAFT_FILE: &str = "draft.json";

/// File holding every confirmed allocation, oldest first.
pub const HISTORY_FILE: &str = "history.json";

/// Service for editing and confirming allocations.
pub struct SessionService {
    fs: Arc<dyn FileSystem>,
    normalizer: Normalizer,
    data_dir: PathBuf,
}

impl SessionService {
    /// Create a new session service storing its files under `data_dir`.
    pub fn new(fs: Arc<dyn FileSystem>, normalizer: Normalizer, data_dir: &Path) -> Self {
        Self {
            fs,
            normalizer,
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn draft_path(&self) -> PathBuf {
        self.data_dir.join(DRAFT_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    /// Start a session for `entity_ids`.
    ///
    /// An existing draft for the same ids in the same order is kept as is.
    /// Any other entity set replaces the draft with a fresh equal split.
    #[instrument(skip(self))]
    pub fn start(&self, entity_ids: &[EntityId]) -> ApplicationResult<Draft> {
        if let Some(draft) = self.current()? {
            if draft.entity_ids == entity_ids {
                debug!("start: entity set unchanged, keeping draft");
                return Ok(draft);
            }
            info!(
                "start: entity set changed from {:?}, re-initializing",
                draft.entity_ids
            );
        }

        let allocation = self.normalizer.initialize(entity_ids)?;
        let draft = Draft {
            entity_ids: entity_ids.to_vec(),
            allocation,
            updated_at: Utc::now(),
        };
        self.write_json(&self.draft_path(), &draft, "write draft")?;
        Ok(draft)
    }

    /// Set one share of the current draft and rebalance the rest.
    #[instrument(skip(self))]
    pub fn set_share(&self, id: EntityId, value: f64) -> ApplicationResult<Draft> {
        let mut draft = self.current()?.ok_or(ApplicationError::NoActiveSession)?;
        draft.allocation =
            self.normalizer
                .set_share(&draft.allocation, id, value, &draft.entity_ids)?;
        draft.updated_at = Utc::now();
        debug!("set_share: total now {}", draft.allocation.total());

        self.write_json(&self.draft_path(), &draft, "write draft")?;
        Ok(draft)
    }

    /// Current draft, if a session is in progress.
    pub fn current(&self) -> ApplicationResult<Option<Draft>> {
        self.read_json(&self.draft_path(), "draft")
    }

    /// Gate the draft on its total, append it to the history, end the session.
    ///
    /// An unbalanced draft is left untouched and reported as
    /// [`crate::domain::DomainError::TotalMismatch`].
    #[instrument(skip(self))]
    pub fn confirm(&self) -> ApplicationResult<ConfirmedAllocation> {
        let draft = self.current()?.ok_or(ApplicationError::NoActiveSession)?;
        draft.allocation.ensure_balanced()?;

        let confirmed = ConfirmedAllocation {
            confirmed_at: Utc::now(),
            total: draft.allocation.total(),
            shares: draft.allocation.to_records(),
            basis_points: to_basis_points(&draft.allocation),
        };

        let mut history = self.history()?;
        history.push(confirmed.clone());

        // draft goes first so a failed confirm never leaves a history entry behind
        let draft_path = self.draft_path();
        self.fs
            .remove_file(&draft_path)
            .with_path_context("remove draft", &draft_path)?;
        if let Err(e) = self.write_json(&self.history_path(), &history, "write history") {
            warn!("confirm: history not written, restoring draft");
            self.write_json(&draft_path, &draft, "restore draft")?;
            return Err(e);
        }

        info!(
            "confirm: {} shares stored, history has {} entries",
            confirmed.shares.len(),
            history.len()
        );
        Ok(confirmed)
    }

    /// Drop the current draft. Returns false when there was none.
    #[instrument(skip(self))]
    pub fn discard(&self) -> ApplicationResult<bool> {
        let draft_path = self.draft_path();
        if !self.fs.exists(&draft_path) {
            return Ok(false);
        }
        self.fs
            .remove_file(&draft_path)
            .with_path_context("remove draft", &draft_path)?;
        Ok(true)
    }

    /// All confirmed allocations, oldest first.
    pub fn history(&self) -> ApplicationResult<Vec<ConfirmedAllocation>> {
        Ok(self
            .read_json(&self.history_path(), "history")?
            .unwrap_or_default())
    }

    fn read_json<T: DeserializeOwned>(
        &self,
        path: &Path,
        what: &str,
    ) -> ApplicationResult<Option<T>> {
        if !self.fs.exists(path) {
            return Ok(None);
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context(&format!("read {what}"), path)?;
        let value =
            serde_json::from_str(&content).with_path_context(&format!("parse {what}"), path)?;
        Ok(Some(value))
    }

    fn write_json<T: Serialize>(
        &self,
        path: &Path,
        value: &T,
        action: &str,
    ) -> ApplicationResult<()> {
        self.fs
            .ensure_parent(path)
            .with_path_context("create data dir", path)?;
        let content = serde_json::to_string_pretty(value).with_path_context(action, path)?;
        self.fs.write(path, &content).with_path_context(action, path)
    }
}
