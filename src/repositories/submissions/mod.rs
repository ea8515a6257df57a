mod memory;
mod sheet;
mod types;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::config::{Settings, StoreBackend};
use crate::models::{NewSubmission, Submission, SubmissionKey};

pub(crate) use memory::MemoryStore;
pub(crate) use sheet::SheetStore;
pub(crate) use types::{GradeUpdate, StoreError};

/// Backing store for submissions and their reviews.
///
/// `update_grade` answers `false` when the store did not accept the write (unknown
/// row or an explicit rejection); transport problems come back as errors.
#[async_trait]
pub(crate) trait SubmissionStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Submission>>;

    async fn update_grade(&self, row_id: u32, update: &GradeUpdate) -> Result<bool>;

    async fn append(&self, submission: NewSubmission) -> Result<SubmissionKey>;

    fn backend_name(&self) -> &'static str;
}

pub(crate) async fn from_settings(settings: &Settings) -> Result<Arc<dyn SubmissionStore>> {
    let store: Arc<dyn SubmissionStore> = match settings.store().backend {
        StoreBackend::Memory => match settings.store().seed_path.as_deref() {
            Some(path) => Arc::new(MemoryStore::from_seed_file(path).await?),
            None => Arc::new(MemoryStore::default()),
        },
        StoreBackend::Sheet => Arc::new(SheetStore::from_settings(settings)?),
    };

    tracing::info!(backend = store.backend_name(), "Submission store ready");
    Ok(store)
}
