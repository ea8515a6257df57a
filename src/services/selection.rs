//! Filter and ordering shared by the review queue, the batch pending set and both
//! report exports. Every caller goes through [`select`]; there is no second sort.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::{
    classify, ActivityType, Grade, ReviewStatus, Room, Scope, StatusFilter, Submission,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct SelectionCriteria {
    pub(crate) text_query: String,
    pub(crate) grade: Scope<Grade>,
    pub(crate) room: Scope<Room>,
    pub(crate) activity_type: Scope<ActivityType>,
    pub(crate) status: StatusFilter,
}

/// Report scope: grade and activity are always pinned, room may span all rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportScope {
    pub(crate) grade: Grade,
    #[serde(default)]
    pub(crate) room: Scope<Room>,
    pub(crate) activity_type: ActivityType,
}

impl SelectionCriteria {
    pub(crate) fn for_report(scope: &ReportScope) -> Self {
        Self {
            text_query: String::new(),
            grade: Scope::Only(scope.grade),
            room: scope.room,
            activity_type: Scope::Only(scope.activity_type),
            status: StatusFilter::All,
        }
    }

    pub(crate) fn matches(&self, submission: &Submission) -> bool {
        self.matches_text(submission)
            && self.grade.admits(&submission.grade)
            && self.room.admits(&submission.room)
            && self.activity_type.admits(&submission.activity_type)
            && self.status.admits(classify(submission))
    }

    fn matches_text(&self, submission: &Submission) -> bool {
        if self.text_query.is_empty() {
            return true;
        }

        submission.name.to_lowercase().contains(&self.text_query.to_lowercase())
            || submission.student_number.contains(&self.text_query)
    }
}

pub(crate) fn select(submissions: &[Submission], criteria: &SelectionCriteria) -> Vec<Submission> {
    let mut selected: Vec<Submission> =
        submissions.iter().filter(|submission| criteria.matches(submission)).cloned().collect();
    // `sort_by` is stable, so equal keys keep their input order.
    selected.sort_by(queue_order);
    selected
}

/// Items of an already-selected sequence that still need a grade, order preserved.
pub(crate) fn pending(selected: &[Submission]) -> Vec<Submission> {
    selected
        .iter()
        .filter(|submission| classify(submission) == ReviewStatus::Pending)
        .cloned()
        .collect()
}

/// Room label compared as text, then student number compared as an integer.
///
/// Room labels sort lexicographically, so a tenth room would land between rooms 1
/// and 2. Only four rooms exist, so the order is kept as is.
pub(crate) fn queue_order(a: &Submission, b: &Submission) -> Ordering {
    a.room.label().cmp(b.room.label()).then_with(|| {
        parse_student_number(&a.student_number).cmp(&parse_student_number(&b.student_number))
    })
}

/// Leading-integer parse of a student number; blanks and non-numeric text give 0.
pub(crate) fn parse_student_number(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit);
    let magnitude = digits
        .fold(0_i64, |acc, digit| acc.saturating_mul(10).saturating_add(i64::from(digit - b'0')));

    if negative {
        -magnitude
    } else {
        magnitude
    }
}
