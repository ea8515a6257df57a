use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::core::config::Settings;
use crate::models::{NewSubmission, Submission, SubmissionKey};

use super::types::{GradeUpdate, StoreError};
use super::SubmissionStore;

/// Spreadsheet web-app endpoint speaking `{action, ...}` JSON.
#[derive(Debug, Clone)]
pub(crate) struct SheetStore {
    client: Client,
    url: String,
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateGradeCommand<'a> {
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    row_id: u32,
    #[serde(flatten)]
    update: &'a GradeUpdate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommand<'a> {
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    #[serde(flatten)]
    submission: &'a NewSubmission,
}

impl SheetStore {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let store = settings.store();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(store.request_timeout))
            .build()
            .context("Failed to build sheet HTTP client")?;

        let token = Some(store.sheet_api_token.trim())
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        Ok(Self { client, url: store.sheet_api_url.clone(), token })
    }

    async fn post(&self, body: &impl Serialize) -> Result<Value> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .context("Failed to call sheet endpoint")?;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Http { status: status.as_u16(), body }.into());
    }

    response.json::<Value>().await.context("Failed to decode sheet endpoint response")
}

fn success_flag(body: &Value) -> bool {
    body.get("success").and_then(Value::as_bool).unwrap_or(false)
}

/// Accepts either a bare array of rows or `{data: [...]}`; rows that do not decode are
/// skipped so one bad line cannot hide the rest of the sheet.
pub(super) fn parse_rows(body: Value) -> Result<Vec<Submission>, StoreError> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => return Err(StoreError::MissingField("data")),
        },
        _ => return Err(StoreError::MissingField("data")),
    };

    let mut submissions = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<Submission>(row) {
            Ok(mut submission) => {
                if let Some(review) = submission.review.as_mut() {
                    review.recompute();
                }
                submissions.push(submission);
            }
            Err(err) => {
                tracing::warn!(index, error = %err, "Skipping malformed sheet row");
            }
        }
    }

    Ok(submissions)
}

#[async_trait]
impl SubmissionStore for SheetStore {
    async fn list(&self) -> Result<Vec<Submission>> {
        let mut query = vec![("action", "list")];
        if let Some(token) = self.token.as_deref() {
            query.push(("token", token));
        }

        let response = self
            .client
            .get(&self.url)
            .query(&query)
            .send()
            .await
            .context("Failed to list sheet submissions")?;
        let body = read_body(response).await?;
        let submissions = parse_rows(body)?;

        tracing::debug!(count = submissions.len(), "Fetched sheet submissions");
        Ok(submissions)
    }

    async fn update_grade(&self, row_id: u32, update: &GradeUpdate) -> Result<bool> {
        let command = UpdateGradeCommand {
            action: "updateGrade",
            token: self.token.as_deref(),
            row_id,
            update,
        };
        let body = self.post(&command).await?;
        let accepted = success_flag(&body);
        if !accepted {
            tracing::warn!(sheet = %update.sheet_name, row_id, "Sheet rejected grade update");
        }
        Ok(accepted)
    }

    async fn append(&self, submission: NewSubmission) -> Result<SubmissionKey> {
        let command =
            CreateCommand { action: "create", token: self.token.as_deref(), submission: &submission };
        let body = self.post(&command).await?;
        if !success_flag(&body) {
            return Err(StoreError::Rejected { action: "create" }.into());
        }

        let sheet_name = body
            .get("sheetName")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| submission.activity_type.label().to_string());
        let row_id = body
            .get("rowId")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
            .ok_or(StoreError::MissingField("rowId"))?;

        Ok(SubmissionKey { sheet_name, row_id })
    }

    fn backend_name(&self) -> &'static str {
        "sheet"
    }
}
