use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::ReviewSettings;
use crate::core::time::{format_report_date, today_at_offset};
use crate::models::{classify, ReviewStatus, Scope, Submission};
use crate::services::selection::ReportScope;

const REPORT_TITLE: &str = "ใบรายงานคะแนนวิชาสุขศึกษาและพลศึกษา";
const PENDING_PLACEHOLDER: &str = "รอการประเมิน";
const MISSING_SCORE: &str = "-";
const ALL_ROOMS: &str = "ทุกห้องเรียน";
const SIGNATURE_LINE: &str = "ลงชื่อ.......................................................... คุณครูผู้สอน";
const PRINTED_ON_LABEL: &str = "วันที่พิมพ์";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ReportMode {
    Detailed,
    Summary,
}

impl ReportMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Detailed => "detailed",
            Self::Summary => "summary",
        }
    }

    fn filename_prefix(self) -> &'static str {
        match self {
            Self::Detailed => "รายงานละเอียด",
            Self::Summary => "สรุปคะแนน",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum ColumnKind {
    Room,
    StudentNumber,
    Name,
    TotalScore,
    Comment,
}

impl ColumnKind {
    fn header(self) -> &'static str {
        match self {
            Self::Room => "ห้อง",
            Self::StudentNumber => "เลขที่",
            Self::Name => "ชื่อ-นามสกุล",
            Self::TotalScore => "คะแนนรวม (20)",
            Self::Comment => "หมายเหตุ / คำแนะนำจากครู",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ReportColumn {
    pub(crate) kind: ColumnKind,
    pub(crate) header: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ReportRow {
    pub(crate) cells: Vec<String>,
    pub(crate) graded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportFooter {
    pub(crate) signature_line: &'static str,
    pub(crate) reviewer_name: String,
    pub(crate) printed_on_label: &'static str,
    pub(crate) printed_on: String,
}

impl ReportFooter {
    pub(crate) fn new(reviewer_name: impl Into<String>, printed_on: impl Into<String>) -> Self {
        Self {
            signature_line: SIGNATURE_LINE,
            reviewer_name: reviewer_name.into(),
            printed_on_label: PRINTED_ON_LABEL,
            printed_on: printed_on.into(),
        }
    }

    /// Footer dated today in the configured zone and locale.
    pub(crate) fn for_today(review: &ReviewSettings) -> Self {
        let today = today_at_offset(review.utc_offset_hours);
        Self::new(review.reviewer_name.clone(), format_report_date(today, review.locale))
    }
}

/// Print-ready report; rendering to paper or PDF happens outside this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportDocument {
    pub(crate) mode: ReportMode,
    pub(crate) filename: String,
    pub(crate) title: &'static str,
    pub(crate) activity_heading: &'static str,
    pub(crate) subtitle: String,
    pub(crate) columns: Vec<ReportColumn>,
    pub(crate) rows: Vec<ReportRow>,
    pub(crate) footer: ReportFooter,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("ไม่พบข้อมูลนักเรียนในเงื่อนไขที่เลือก ({grade}, {room}, {activity})")]
pub(crate) struct EmptySelection {
    pub(crate) grade: &'static str,
    pub(crate) room: String,
    pub(crate) activity: &'static str,
}

/// Builds a report from rows already selected for `scope`. An empty selection is
/// returned as [`EmptySelection`] instead of a blank document.
pub(crate) fn assemble(
    submissions: &[Submission],
    scope: &ReportScope,
    mode: ReportMode,
    footer: ReportFooter,
) -> Result<ReportDocument, EmptySelection> {
    let room_text = match scope.room {
        Scope::All => ALL_ROOMS.to_string(),
        Scope::Only(room) => room.local_label(),
    };

    if submissions.is_empty() {
        return Err(EmptySelection {
            grade: scope.grade.label(),
            room: room_text,
            activity: scope.activity_type.label(),
        });
    }

    let grade_short = scope.grade.short_label();
    let subtitle = match mode {
        ReportMode::Detailed => format!("ระดับชั้น {grade_short} | {room_text}"),
        ReportMode::Summary => format!("ใบสรุปคะแนนรวมกิจกรรม ระดับชั้น {grade_short} ({room_text})"),
    };
    let filename = format!(
        "{}_{}_{}_{}",
        mode.filename_prefix(),
        scope.grade.label(),
        room_text,
        scope.activity_type.label()
    );

    let kinds = column_kinds(mode, scope);
    let rows = submissions.iter().map(|submission| build_row(submission, &kinds)).collect();
    let columns = kinds.iter().map(|kind| ReportColumn { kind: *kind, header: kind.header() }).collect();

    metrics::counter!("reports_generated_total", "mode" => mode.as_str()).increment(1);

    Ok(ReportDocument {
        mode,
        filename,
        title: REPORT_TITLE,
        activity_heading: scope.activity_type.report_heading(),
        subtitle,
        columns,
        rows,
        footer,
    })
}

fn column_kinds(mode: ReportMode, scope: &ReportScope) -> Vec<ColumnKind> {
    match mode {
        ReportMode::Summary => {
            let mut kinds = Vec::with_capacity(4);
            if scope.room == Scope::All {
                kinds.push(ColumnKind::Room);
            }
            kinds.extend([ColumnKind::StudentNumber, ColumnKind::Name, ColumnKind::TotalScore]);
            kinds
        }
        ReportMode::Detailed => vec![
            ColumnKind::StudentNumber,
            ColumnKind::Name,
            ColumnKind::TotalScore,
            ColumnKind::Comment,
        ],
    }
}

fn build_row(submission: &Submission, kinds: &[ColumnKind]) -> ReportRow {
    let graded_review =
        submission.review.as_ref().filter(|_| classify(submission) == ReviewStatus::Graded);

    let cells = kinds
        .iter()
        .map(|kind| match kind {
            ColumnKind::Room => submission.room.number().to_string(),
            ColumnKind::StudentNumber => submission.student_number.clone(),
            ColumnKind::Name => submission.name.clone(),
            ColumnKind::TotalScore => graded_review
                .map_or_else(|| MISSING_SCORE.to_string(), |review| review.total_score.to_string()),
            ColumnKind::Comment => graded_review
                .map(|review| review.comment.trim())
                .filter(|comment| !comment.is_empty())
                .unwrap_or(PENDING_PLACEHOLDER)
                .to_string(),
        })
        .collect();

    ReportRow { cells, graded: graded_review.is_some() }
}
