use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::core::config::ReportLocale;

/// Offset between the Gregorian and Thai Buddhist calendars.
const BUDDHIST_ERA_OFFSET: i32 = 543;

pub(crate) fn today_at_offset(hours: i8) -> Date {
    let offset = UtcOffset::from_hms(hours, 0, 0).unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset).date()
}

/// Long-form date as printed in report footers, e.g. `19 ตุลาคม 2569` or `October 19, 2026`.
pub(crate) fn format_report_date(date: Date, locale: ReportLocale) -> String {
    match locale {
        ReportLocale::Thai => format!(
            "{} {} {}",
            date.day(),
            thai_month_name(date.month()),
            date.year() + BUDDHIST_ERA_OFFSET
        ),
        ReportLocale::English => format!("{} {}, {}", date.month(), date.day(), date.year()),
    }
}

fn thai_month_name(month: Month) -> &'static str {
    match month {
        Month::January => "มกราคม",
        Month::February => "กุมภาพันธ์",
        Month::March => "มีนาคม",
        Month::April => "เมษายน",
        Month::May => "พฤษภาคม",
        Month::June => "มิถุนายน",
        Month::July => "กรกฎาคม",
        Month::August => "สิงหาคม",
        Month::September => "กันยายน",
        Month::October => "ตุลาคม",
        Month::November => "พฤศจิกายน",
        Month::December => "ธันวาคม",
    }
}
