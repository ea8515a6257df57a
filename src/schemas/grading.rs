use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchStartResponse {
    pub(crate) batch_id: Uuid,
    pub(crate) total: usize,
    pub(crate) status_url: String,
}
