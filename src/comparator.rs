//! Comparator expressions for size, depth and date filters.
//!
//! Numbers: `"> 10"`, `"<= 2k"`, `"== 1.5mi"`, `"3"`. Units are decimal
//! (`k`, `m`, `g`) or binary (`ki`, `mi`, `gi`), case-insensitive. A bare
//! number means equality.
//!
//! Dates: `"since yesterday"`, `"before 2024-01-01"`, `"> 2 hours ago"`,
//! `"until now"`. `since`/`after` mean `>`, `until`/`before` mean `<`.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use regex::Regex;

use crate::error::{Result, VfindError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    fn parse(op: &str) -> Option<Self> {
        match op.to_ascii_lowercase().as_str() {
            "" | "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">" | "since" | "after" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "<" | "until" | "before" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            _ => None,
        }
    }

    fn test<T: PartialOrd>(self, value: T, target: T) -> bool {
        match self {
            Self::Eq => value == target,
            Self::Ne => value != target,
            Self::Gt => value > target,
            Self::Ge => value >= target,
            Self::Lt => value < target,
            Self::Le => value <= target,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        })
    }
}

// ---------------------------------------------------------------------------
// NumberComparator
// ---------------------------------------------------------------------------

/// A numeric test such as `">= 2k"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberComparator {
    pub operator: Operator,
    pub target: u64,
}

fn number_syntax() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(==|!=|[<>]=?)?\s*([0-9]+(?:\.[0-9]+)?)\s*([kmg]i?)?\s*$")
            .expect("number comparator syntax is a valid regex")
    })
}

impl NumberComparator {
    pub fn new(operator: Operator, target: u64) -> Self {
        Self { operator, target }
    }

    pub fn test(&self, value: u64) -> bool {
        self.operator.test(value, self.target)
    }
}

impl FromStr for NumberComparator {
    type Err = VfindError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || VfindError::InvalidComparator(format!("{s:?} is not a valid number test"));
        let caps = number_syntax().captures(s).ok_or_else(invalid)?;

        let operator = Operator::parse(caps.get(1).map_or("", |m| m.as_str())).ok_or_else(invalid)?;
        let number: f64 = caps[2].parse().map_err(|_| invalid())?;
        let multiplier: f64 = match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
            None => 1.0,
            Some("k") => 1_000.0,
            Some("ki") => 1_024.0,
            Some("m") => 1_000_000.0,
            Some("mi") => 1_048_576.0,
            Some("g") => 1_000_000_000.0,
            Some("gi") => 1_073_741_824.0,
            Some(_) => return Err(invalid()),
        };

        Ok(Self::new(operator, (number * multiplier).round() as u64))
    }
}

impl fmt::Display for NumberComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.target)
    }
}

// ---------------------------------------------------------------------------
// DateComparator
// ---------------------------------------------------------------------------

/// A timestamp test such as `"since yesterday"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateComparator {
    pub operator: Operator,
    /// Seconds since the Unix epoch.
    pub target: i64,
}

fn date_syntax() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(==|!=|[<>]=?|after|since|before|until)?\s*(.+?)\s*$")
            .expect("date comparator syntax is a valid regex")
    })
}

fn relative_syntax() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^([+-]?\d+)\s*(sec|second|min|minute|hour|day|week|fortnight|month|year)s?(\s+ago)?$",
        )
        .expect("relative date syntax is a valid regex")
    })
}

impl DateComparator {
    pub fn new(operator: Operator, target: i64) -> Self {
        Self { operator, target }
    }

    pub fn test(&self, timestamp: i64) -> bool {
        self.operator.test(timestamp, self.target)
    }

    /// Parse relative to an explicit "now"; used for deterministic tests.
    pub fn parse_at(s: &str, now: DateTime<Local>) -> Result<Self> {
        let invalid = || VfindError::InvalidComparator(format!("{s:?} is not a valid date test"));
        let caps = date_syntax().captures(s).ok_or_else(invalid)?;
        let operator = Operator::parse(caps.get(1).map_or("", |m| m.as_str())).ok_or_else(invalid)?;
        let target = parse_date(&caps[2], now).ok_or_else(invalid)?;
        Ok(Self::new(operator, target))
    }
}

impl FromStr for DateComparator {
    type Err = VfindError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_at(s, Local::now())
    }
}

/// Resolve a date expression to a Unix timestamp.
fn parse_date(expr: &str, now: DateTime<Local>) -> Option<i64> {
    let lower = expr.trim().to_ascii_lowercase();
    let midnight = |date: NaiveDate| date.and_hms_opt(0, 0, 0).and_then(local_timestamp);

    match lower.as_str() {
        "now" => return Some(now.timestamp()),
        "today" | "midnight" => return midnight(now.date_naive()),
        "yesterday" => return midnight(now.date_naive().pred_opt()?),
        "tomorrow" => return midnight(now.date_naive().succ_opt()?),
        _ => {}
    }

    if let Some(secs) = lower.strip_prefix('@') {
        return secs.parse().ok();
    }

    if let Some(caps) = relative_syntax().captures(&lower) {
        let amount: i64 = caps[1].parse().ok()?;
        let unit: i64 = match &caps[2] {
            "sec" | "second" => 1,
            "min" | "minute" => 60,
            "hour" => 3_600,
            "day" => 86_400,
            "week" => 604_800,
            "fortnight" => 1_209_600,
            "month" => 2_592_000,
            "year" => 31_536_000,
            _ => return None,
        };
        let offset = amount.checked_mul(unit)?;
        let offset = if caps.get(3).is_some() { -offset } else { offset };
        return now.timestamp().checked_add(offset);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(expr.trim()) {
        return Some(dt.timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(expr.trim(), format) {
            return local_timestamp(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(expr.trim(), "%Y-%m-%d") {
        return midnight(date);
    }

    None
}

fn local_timestamp(dt: NaiveDateTime) -> Option<i64> {
    Local.from_local_datetime(&dt).earliest().map(|d| d.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operators_and_units() {
        let c: NumberComparator = "> 1".parse().unwrap();
        assert_eq!(c, NumberComparator::new(Operator::Gt, 1));

        let c: NumberComparator = "<= 2K".parse().unwrap();
        assert_eq!(c, NumberComparator::new(Operator::Le, 2_000));

        let c: NumberComparator = "1.5ki".parse().unwrap();
        assert_eq!(c, NumberComparator::new(Operator::Eq, 1_536));

        let c: NumberComparator = "!= 0".parse().unwrap();
        assert!(c.test(3));
        assert!(!c.test(0));
    }

    #[test]
    fn rejects_garbage() {
        assert!("big".parse::<NumberComparator>().is_err());
        assert!("=> 3".parse::<NumberComparator>().is_err());
        assert!("> 2 tb".parse::<NumberComparator>().is_err());
    }

    #[test]
    fn date_keywords_map_to_operators() {
        let now = Local.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();

        let since = DateComparator::parse_at("since yesterday", now).unwrap();
        assert_eq!(since.operator, Operator::Gt);
        let yesterday = Local.with_ymd_and_hms(2024, 5, 9, 0, 0, 0).unwrap().timestamp();
        assert_eq!(since.target, yesterday);

        let before = DateComparator::parse_at("before 2024-01-01", now).unwrap();
        assert_eq!(before.operator, Operator::Lt);
        assert_eq!(before.target, Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp());
    }

    #[test]
    fn relative_dates() {
        let now = Local.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let c = DateComparator::parse_at("> 2 hours ago", now).unwrap();
        assert_eq!(c.target, now.timestamp() - 7_200);

        let c = DateComparator::parse_at("until +1 day", now).unwrap();
        assert_eq!(c.target, now.timestamp() + 86_400);

        let c = DateComparator::parse_at("@1700000000", now).unwrap();
        assert_eq!(c, DateComparator::new(Operator::Eq, 1_700_000_000));
    }

    #[test]
    fn unparseable_dates_fail() {
        assert!("since the dawn of time".parse::<DateComparator>().is_err());
    }
}
