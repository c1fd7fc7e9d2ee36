//! Step validators. Pure and synchronous; the only input besides the raw text
//! is the clock reading and business offset for the date rule.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use regex::Regex;

pub const EMPTY_ANSWER: &str = "Por favor escribe una respuesta válida.";
pub const INVALID_EMAIL: &str =
    "❌ El correo no es válido.\n\nEscríbelo con el formato *nombre@dominio.com*";
pub const INVALID_DATETIME_FORMAT: &str =
    "❌ Formato de fecha no válido.\n\nUsa el formato *DD/MM/AAAA HH:MM*, por ejemplo *25/01/2026 14:30*";
pub const DATETIME_NOT_IN_FUTURE: &str =
    "❌ La fecha de la cita debe ser en el futuro.\n\nIndica una fecha y hora posteriores a este momento.";

static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
static DATETIME: OnceLock<Option<Regex>> = OnceLock::new();

fn email_pattern() -> Option<&'static Regex> {
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok()).as_ref()
}

fn datetime_pattern() -> Option<&'static Regex> {
    DATETIME
        .get_or_init(|| {
            Regex::new(r"^([0-9]{1,2})/([0-9]{1,2})/([0-9]{4}) ([0-9]{1,2}):([0-9]{2})$").ok()
        })
        .as_ref()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
}

impl Rejection {
    fn new(reason: &str) -> Self {
        Self { reason: reason.to_owned() }
    }
}

/// Trims surrounding whitespace; rejects what is left if it is empty.
pub fn non_empty(raw: &str) -> Result<String, Rejection> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Rejection::new(EMPTY_ANSWER));
    }
    Ok(trimmed.to_owned())
}

/// Minimal `local@domain.tld` shape, checked after trimming.
pub fn email(raw: &str) -> Result<String, Rejection> {
    let trimmed = raw.trim();
    match email_pattern() {
        Some(pattern) if pattern.is_match(trimmed) => Ok(trimmed.to_owned()),
        _ => Err(Rejection::new(INVALID_EMAIL)),
    }
}

/// `D/M/YYYY H:MM` read as wall-clock time at `offset`. Out-of-range parts
/// roll over into the next unit, so `32/01/2026 10:00` is 1 February.
pub fn future_datetime(
    raw: &str,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<DateTime<Utc>, Rejection> {
    let instant = parse_lenient_datetime(raw.trim(), offset)
        .ok_or_else(|| Rejection::new(INVALID_DATETIME_FORMAT))?;
    if instant <= now {
        return Err(Rejection::new(DATETIME_NOT_IN_FUTURE));
    }
    Ok(instant)
}

fn parse_lenient_datetime(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let captures = datetime_pattern()?.captures(raw)?;
    let part = |index: usize| captures.get(index)?.as_str().parse::<i64>().ok();

    let (day, month, year, hour, minute) = (part(1)?, part(2)?, part(3)?, part(4)?, part(5)?);

    let total_months = year * 12 + month - 1;
    let first_of_month = NaiveDate::from_ymd_opt(
        i32::try_from(total_months.div_euclid(12)).ok()?,
        u32::try_from(total_months.rem_euclid(12) + 1).ok()?,
        1,
    )?;
    let local = first_of_month.and_hms_opt(0, 0, 0)?
        + Duration::days(day - 1)
        + Duration::hours(hour)
        + Duration::minutes(minute);

    offset.from_local_datetime(&local).single().map(|instant| instant.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Utc};

    use super::{
        email, future_datetime, non_empty, DATETIME_NOT_IN_FUTURE, EMPTY_ANSWER,
        INVALID_DATETIME_FORMAT, INVALID_EMAIL,
    };

    fn offset() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).expect("valid offset")
    }

    #[test]
    fn non_empty_trims_and_rejects_blank() {
        assert_eq!(non_empty("  TechStore \n"), Ok("TechStore".to_owned()));
        for blank in ["", "   ", "\t\n"] {
            assert_eq!(non_empty(blank).map_err(|r| r.reason), Err(EMPTY_ANSWER.to_owned()));
        }
    }

    #[test]
    fn email_requires_minimal_shape() {
        assert_eq!(email("a@b.co"), Ok("a@b.co".to_owned()));
        assert_eq!(email(" ana@digitdeck.co "), Ok("ana@digitdeck.co".to_owned()));
        for invalid in ["a@b", "ab.co", "a b@c.co", "a@@b.co", ""] {
            assert_eq!(
                email(invalid).map_err(|r| r.reason),
                Err(INVALID_EMAIL.to_owned()),
                "{invalid} must be rejected"
            );
        }
    }

    #[test]
    fn datetime_accepts_future_instants() {
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).single().expect("valid now");

        let accepted = future_datetime("25/01/2025 14:30", now, offset()).expect("future date");
        assert_eq!(
            accepted,
            Utc.with_ymd_and_hms(2025, 1, 25, 19, 30, 0).single().expect("valid instant")
        );
        assert!(future_datetime("25/01/2099 14:30", now, offset()).is_ok());
        assert!(future_datetime("5/1/2025 9:05", now, offset()).is_ok());
    }

    #[test]
    fn datetime_rejects_wrong_pattern_and_past() {
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).single().expect("valid now");

        for malformed in ["2025/01/25 14:30", "25-01-2025 14:30", "25/01/25 14:30", "25/01/2025 14:3"]
        {
            assert_eq!(
                future_datetime(malformed, now, offset()).map_err(|r| r.reason),
                Err(INVALID_DATETIME_FORMAT.to_owned()),
                "{malformed} must be rejected"
            );
        }
        assert_eq!(
            future_datetime("25/01/2020 14:30", now, offset()).map_err(|r| r.reason),
            Err(DATETIME_NOT_IN_FUTURE.to_owned())
        );
    }

    #[test]
    fn datetime_equal_to_now_is_not_future() {
        let now = Utc.with_ymd_and_hms(2025, 1, 25, 19, 30, 0).single().expect("valid now");
        assert!(future_datetime("25/01/2025 14:30", now, offset()).is_err());
    }

    #[test]
    fn out_of_range_components_roll_over() {
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).single().expect("valid now");
        let expect_local = |raw: &str, y, m, d, h, min| {
            let parsed = future_datetime(raw, now, offset()).expect("rolls over");
            let expected = offset()
                .with_ymd_and_hms(y, m, d, h, min, 0)
                .single()
                .expect("valid local")
                .with_timezone(&Utc);
            assert_eq!(parsed, expected, "{raw}");
        };

        expect_local("32/01/2026 10:00", 2026, 2, 1, 10, 0);
        expect_local("15/13/2026 10:00", 2027, 1, 15, 10, 0);
        expect_local("31/12/2026 24:00", 2027, 1, 1, 0, 0);
        expect_local("10/02/2026 10:75", 2026, 2, 10, 11, 15);
        expect_local("0/03/2026 10:00", 2026, 2, 28, 10, 0);
    }
}
