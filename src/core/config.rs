mod parsing;
mod settings;
mod types;

pub(crate) use types::{ReportLocale, ReviewSettings, Settings, StoreBackend};
