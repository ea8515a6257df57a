pub(crate) mod batch;
pub(crate) mod result_watch;
