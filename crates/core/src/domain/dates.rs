//! Spanish calendar formatting used in proposals and reminders.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

fn month_name(month: u32) -> &'static str {
    MONTHS.get(month.saturating_sub(1) as usize).copied().unwrap_or("enero")
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "lunes",
        Weekday::Tue => "martes",
        Weekday::Wed => "miércoles",
        Weekday::Thu => "jueves",
        Weekday::Fri => "viernes",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

/// `17 de octubre de 2026`
pub fn spanish_long_date(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = instant.with_timezone(&offset);
    format!("{} de {} de {}", local.day(), month_name(local.month()), local.year())
}

/// `sábado, 17 de octubre de 2026, 14:30`
pub fn spanish_long_datetime(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = instant.with_timezone(&offset);
    format!(
        "{}, {} de {} de {}, {:02}:{:02}",
        weekday_name(local.weekday()),
        local.day(),
        month_name(local.month()),
        local.year(),
        local.hour(),
        local.minute()
    )
}

/// `17/10/2026 14:30`, the same shape users type when booking.
pub fn short_datetime(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant.with_timezone(&offset).format("%d/%m/%Y %H:%M").to_string()
}
