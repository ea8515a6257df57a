use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::api;
use crate::core::{config::Settings, state::AppState};
use crate::models::{ActivityType, Grade, NewSubmission, Room, RubricScores, Submission, SubmissionKey};
use crate::repositories::submissions::{GradeUpdate, MemoryStore, SubmissionStore};
use crate::services::ai_grading::{AiContractError, AiRubric, AiScorer, ScoreError, ScoreRequest};

pub(crate) const TEST_REVIEWER: &str = "ครูทดสอบ";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) store: Arc<FlakyStore>,
    pub(crate) scorer: Arc<ScriptedScorer>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<AsyncMutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(AsyncMutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("GRADER_ENV", "test");
    std::env::set_var("GRADER_STRICT_CONFIG", "0");
    std::env::set_var("STORE_BACKEND", "memory");
    std::env::remove_var("STORE_SEED_PATH");
    std::env::remove_var("SHEET_API_URL");
    std::env::set_var("OPENAI_API_KEY", "test-key");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::set_var("REVIEWER_NAME", TEST_REVIEWER);
    std::env::remove_var("PROJECT_NAME");
    std::env::remove_var("API_V1_STR");
    std::env::remove_var("REPORT_LOCALE");
    std::env::remove_var("RESULT_POLL_INTERVAL_SECONDS");
    std::env::remove_var("RESULT_AWAIT_MAX_SECONDS");
    std::env::remove_var("AI_MAX_RETRIES");
}

pub(crate) async fn setup_test_context(submissions: Vec<Submission>) -> TestContext {
    let guard = env_lock().await;
    set_test_env();
    test_context_from_env(guard, submissions)
}

/// Builds a context from whatever is in the environment; the caller holds the lock.
pub(crate) fn test_context_from_env(
    guard: OwnedMutexGuard<()>,
    submissions: Vec<Submission>,
) -> TestContext {
    let settings = Settings::load().expect("settings");
    let store = Arc::new(FlakyStore::new(submissions, &[], &[]));
    let scorer = Arc::new(ScriptedScorer::default());

    let state = AppState::new(settings, store.clone(), scorer.clone());
    let app = api::router::router(state.clone());

    TestContext { state, app, store, scorer, _guard: guard }
}

/// Prathom 5 sports-day submission in the "Sports Day" sheet.
pub(crate) fn submission(name: &str, number: &str, room: Room, row_id: u32) -> Submission {
    submission_in(name, number, Grade::Prathom5, room, ActivityType::SportsDay, row_id)
}

pub(crate) fn submission_in(
    name: &str,
    number: &str,
    grade: Grade,
    room: Room,
    activity_type: ActivityType,
    row_id: u32,
) -> Submission {
    Submission {
        name: name.to_string(),
        student_number: number.to_string(),
        grade,
        room,
        activity_type,
        file_url: Some(format!("https://videos.example/{row_id}.mp4")),
        sheet_name: activity_type.label().to_string(),
        row_id: Some(row_id),
        review: None,
    }
}

/// AI stand-in: fixed scores, configurable failures and latency, records every call.
#[derive(Default)]
pub(crate) struct ScriptedScorer {
    failing: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedScorer {
    pub(crate) fn failing_for(names: &[&str]) -> Self {
        let scorer = Self::default();
        for name in names {
            scorer.fail_for(name);
        }
        scorer
    }

    pub(crate) fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(delay);
        self
    }

    pub(crate) fn fail_for(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiScorer for ScriptedScorer {
    async fn score(&self, request: &ScoreRequest) -> Result<AiRubric, ScoreError> {
        self.calls.lock().unwrap().push(request.name.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(&request.name) {
            return Err(AiContractError::Malformed("scripted failure".to_string()).into());
        }

        Ok(AiRubric {
            scores: RubricScores {
                content_accuracy: 4,
                participation: 4,
                presentation: 3,
                discipline: 5,
            },
            comment: "ทำได้ดีมาก ฝึกต่อไปนะ".to_string(),
        })
    }
}

/// Memory store that can refuse or fail writes for chosen rows and go offline.
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    rejected: Mutex<HashSet<u32>>,
    broken: Mutex<HashSet<u32>>,
    unavailable: AtomicBool,
    list_calls: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn new(submissions: Vec<Submission>, rejected: &[u32], broken: &[u32]) -> Self {
        Self {
            inner: MemoryStore::with_submissions(submissions),
            rejected: Mutex::new(rejected.iter().copied().collect()),
            broken: Mutex::new(broken.iter().copied().collect()),
            unavailable: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn reject_row(&self, row_id: u32) {
        self.rejected.lock().unwrap().insert(row_id);
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionStore for FlakyStore {
    async fn list(&self) -> anyhow::Result<Vec<Submission>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("store offline");
        }
        self.inner.list().await
    }

    async fn update_grade(&self, row_id: u32, update: &GradeUpdate) -> anyhow::Result<bool> {
        if self.broken.lock().unwrap().contains(&row_id) {
            anyhow::bail!("connection reset while writing row {row_id}");
        }
        if self.rejected.lock().unwrap().contains(&row_id) {
            return Ok(false);
        }
        self.inner.update_grade(row_id, update).await
    }

    async fn append(&self, submission: NewSubmission) -> anyhow::Result<SubmissionKey> {
        self.inner.append(submission).await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
