pub(crate) mod ai_grading;
pub(crate) mod auto_grade;
pub(crate) mod reports;
pub(crate) mod results;
pub(crate) mod selection;
