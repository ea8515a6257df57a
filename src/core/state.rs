use std::sync::Arc;

use crate::core::config::Settings;
use crate::repositories::submissions::SubmissionStore;
use crate::services::ai_grading::AiScorer;
use crate::services::auto_grade::AutoGrader;
use crate::tasks::batch::BatchTracker;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn SubmissionStore>,
    scorer: Arc<dyn AiScorer>,
    batches: BatchTracker,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        store: Arc<dyn SubmissionStore>,
        scorer: Arc<dyn AiScorer>,
    ) -> Self {
        Self {
            inner: Arc::new(InnerState { settings, store, scorer, batches: BatchTracker::default() }),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &Arc<dyn SubmissionStore> {
        &self.inner.store
    }

    pub(crate) fn batches(&self) -> &BatchTracker {
        &self.inner.batches
    }

    pub(crate) fn auto_grader(&self) -> AutoGrader {
        AutoGrader::new(
            self.inner.scorer.clone(),
            self.inner.store.clone(),
            self.inner.settings.ai().comment_language.clone(),
        )
    }
}
