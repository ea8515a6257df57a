use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::rubric::Review;
use crate::models::types::{ActivityType, Grade, Room};

/// One participant's entry for one activity, as held by the submission store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Submission {
    pub(crate) name: String,
    pub(crate) student_number: String,
    pub(crate) grade: Grade,
    pub(crate) room: Room,
    pub(crate) activity_type: ActivityType,
    #[serde(default)]
    pub(crate) file_url: Option<String>,
    pub(crate) sheet_name: String,
    #[serde(default)]
    pub(crate) row_id: Option<u32>,
    #[serde(default)]
    pub(crate) review: Option<Review>,
}

impl Submission {
    /// Store address; `None` until the store has assigned a row.
    pub(crate) fn key(&self) -> Option<SubmissionKey> {
        self.row_id.map(|row_id| SubmissionKey { sheet_name: self.sheet_name.clone(), row_id })
    }

    pub(crate) fn has_key(&self, key: &SubmissionKey) -> bool {
        self.row_id == Some(key.row_id) && self.sheet_name == key.sheet_name
    }

    /// Identifier for logs; falls back to the sheet name alone when no row is assigned.
    pub(crate) fn log_label(&self) -> String {
        match self.row_id {
            Some(row_id) => format!("{}-{row_id}", self.sheet_name),
            None => format!("{}-?", self.sheet_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionKey {
    pub(crate) sheet_name: String,
    pub(crate) row_id: u32,
}

impl fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.sheet_name, self.row_id)
    }
}

/// A validated intake record that has not been written to the store yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewSubmission {
    pub(crate) name: String,
    pub(crate) student_number: String,
    pub(crate) grade: Grade,
    pub(crate) room: Room,
    pub(crate) activity_type: ActivityType,
    pub(crate) file_url: String,
}
