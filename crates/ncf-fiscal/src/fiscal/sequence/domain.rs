use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AlertConfig;
use crate::fiscal::catalog::TypeCode;
use crate::fiscal::document::CompanyId;

/// Digits in the sequential part of an NCF.
pub const NUMBER_DIGITS: usize = 8;
/// Full NCF length: series letter + two-digit type code + eight digits.
pub const FISCAL_NUMBER_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceRangeId(pub String);

impl fmt::Display for SequenceRangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single-letter NCF series ("A", "B", "E", ...), stored uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Series(char);

impl Series {
    pub fn new(value: char) -> Result<Self, SequenceConfigError> {
        if value.is_ascii_alphabetic() {
            Ok(Self(value.to_ascii_uppercase()))
        } else {
            Err(SequenceConfigError::InvalidSeries(value))
        }
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<char> for Series {
    type Error = SequenceConfigError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Series> for char {
    fn from(value: Series) -> Self {
        value.0
    }
}

/// Range state, with precedence disabled > expired > exhausted > active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceStatus {
    Active,
    Exhausted,
    Expired,
    Disabled,
}

impl SequenceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Exhausted => "exhausted",
            Self::Expired => "expired",
            Self::Disabled => "disabled",
        }
    }
}

/// One DGII-authorized numeric interval for a (document type, company) pair.
///
/// The cursor holds the last issued number; a cursor below `range_start`
/// means nothing has been issued yet. `range_start` must be at least 1, as
/// the fresh-cursor sentinel sits one below it. Ranges are never extended
/// in place: once exhausted or expired a new range must be registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceRange {
    pub id: SequenceRangeId,
    pub name: String,
    pub company: CompanyId,
    pub document_type: TypeCode,
    pub series: Series,
    pub range_start: u32,
    pub range_end: u32,
    pub cursor: u32,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub enabled: bool,
    pub low_stock_threshold: u32,
    pub expiry_alert_days: i64,
    /// Store-assigned registration order, used as the lookup tie-break.
    pub created_seq: u64,
}

impl SequenceRange {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SequenceRangeId,
        name: impl Into<String>,
        company: CompanyId,
        document_type: TypeCode,
        series: Series,
        range_start: u32,
        range_end: u32,
        valid_from: NaiveDate,
        valid_until: NaiveDate,
    ) -> Result<Self, SequenceConfigError> {
        if range_start == 0 || range_start >= range_end {
            return Err(SequenceConfigError::InvalidBounds {
                start: range_start,
                end: range_end,
            });
        }
        if valid_from >= valid_until {
            return Err(SequenceConfigError::InvalidWindow {
                from: valid_from,
                until: valid_until,
            });
        }
        let alerts = AlertConfig::default();
        Ok(Self {
            id,
            name: name.into(),
            company,
            document_type,
            series,
            range_start,
            range_end,
            cursor: range_start.saturating_sub(1),
            valid_from,
            valid_until,
            enabled: true,
            low_stock_threshold: alerts.low_stock_threshold,
            expiry_alert_days: alerts.expiry_alert_days,
            created_seq: 0,
        })
    }

    pub fn with_alert_thresholds(mut self, alerts: AlertConfig) -> Self {
        self.low_stock_threshold = alerts.low_stock_threshold;
        self.expiry_alert_days = alerts.expiry_alert_days;
        self
    }

    pub fn status(&self, today: NaiveDate) -> SequenceStatus {
        if !self.enabled {
            SequenceStatus::Disabled
        } else if today > self.valid_until {
            SequenceStatus::Expired
        } else if self.cursor >= self.range_end {
            SequenceStatus::Exhausted
        } else {
            SequenceStatus::Active
        }
    }

    pub fn total(&self) -> u32 {
        self.range_end - self.range_start + 1
    }

    /// Numbers issued so far. Counts the cursor itself once issuance has
    /// started, so an exhausted range reports zero availability.
    pub fn used(&self) -> u32 {
        if self.cursor < self.range_start {
            0
        } else {
            self.cursor - self.range_start + 1
        }
    }

    pub fn available(&self) -> u32 {
        self.total() - self.used()
    }

    pub fn percent_used(&self) -> f64 {
        f64::from(self.used()) / f64::from(self.total()) * 100.0
    }

    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.valid_until - today).num_days()
    }

    pub fn low_stock_alert(&self, today: NaiveDate) -> bool {
        self.status(today) == SequenceStatus::Active
            && self.available() > 0
            && self.available() <= self.low_stock_threshold
    }

    pub fn expiry_alert(&self, today: NaiveDate) -> bool {
        let remaining = self.days_until_expiry(today);
        self.status(today) == SequenceStatus::Active
            && remaining > 0
            && remaining <= self.expiry_alert_days
    }

    /// Next number the range would issue. First issuance starts at
    /// `range_start`; afterwards the cursor advances by one. The allocator
    /// and the preview path both go through here so they cannot diverge.
    pub fn next_number(&self) -> u32 {
        if self.cursor < self.range_start {
            self.range_start
        } else {
            self.cursor + 1
        }
    }

    /// Human-readable label used in alerts and error messages.
    pub fn display_label(&self) -> String {
        format!(
            "[{}] {}{} - {}",
            self.company, self.series, self.document_type, self.name
        )
    }

    pub fn alert_lines(&self, today: NaiveDate) -> Vec<String> {
        let mut lines = Vec::new();
        if self.low_stock_alert(today) {
            lines.push(format!(
                "Low stock: only {} NCF numbers left in sequence {}",
                self.available(),
                self.display_label()
            ));
        }
        if self.expiry_alert(today) {
            lines.push(format!(
                "Expiring soon: sequence {} expires in {} days ({})",
                self.display_label(),
                self.days_until_expiry(today),
                self.valid_until
            ));
        }
        lines
    }
}

#[derive(Debug, Error)]
pub enum SequenceConfigError {
    #[error("range start {start} must be at least 1 and below range end {end}")]
    InvalidBounds { start: u32, end: u32 },
    #[error("valid-from {from} must be before valid-until {until}")]
    InvalidWindow { from: NaiveDate, until: NaiveDate },
    #[error("series must be a single ASCII letter, got '{0}'")]
    InvalidSeries(char),
}

/// A formatted NCF: series letter, two-digit type code, eight-digit number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FiscalNumber(String);

impl FiscalNumber {
    pub fn compose(series: Series, code: &TypeCode, number: u32) -> Self {
        Self(format!(
            "{}{}{:0width$}",
            series.as_char(),
            code,
            number,
            width = NUMBER_DIGITS
        ))
    }

    pub fn parse(value: &str) -> Result<Self, InvalidFiscalNumber> {
        let bytes = value.as_bytes();
        let well_formed = bytes.len() == FISCAL_NUMBER_LEN
            && bytes[0].is_ascii_alphabetic()
            && bytes[1..].iter().all(u8::is_ascii_digit);
        if well_formed {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidFiscalNumber {
                value: value.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn series_char(&self) -> char {
        // Invariant: constructed only through compose/parse, never empty.
        self.0.as_bytes()[0] as char
    }

    pub fn type_code(&self) -> &str {
        &self.0[1..3]
    }

    pub fn sequence_digits(&self) -> &str {
        &self.0[3..]
    }
}

impl fmt::Display for FiscalNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FiscalNumber {
    type Error = InvalidFiscalNumber;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FiscalNumber> for String {
    fn from(value: FiscalNumber) -> Self {
        value.0
    }
}

#[derive(Debug, Error)]
#[error("fiscal number '{value}' must be one letter followed by ten digits")]
pub struct InvalidFiscalNumber {
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(cursor: u32) -> SequenceRange {
        let mut range = SequenceRange::new(
            SequenceRangeId("seq-b01".to_string()),
            "2026 authorization",
            CompanyId("main".to_string()),
            TypeCode::new("01").expect("valid code"),
            Series::new('B').expect("valid series"),
            1,
            10,
            NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            NaiveDate::from_ymd_opt(2026, 12, 31).expect("valid date"),
        )
        .expect("valid range");
        range.cursor = cursor;
        range
    }

    #[test]
    fn rejects_inverted_bounds_and_window() {
        let from = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date");
        let until = NaiveDate::from_ymd_opt(2026, 12, 31).expect("valid date");
        let id = SequenceRangeId("seq".to_string());
        let company = CompanyId("main".to_string());
        let code = TypeCode::new("01").expect("valid code");
        let series = Series::new('B').expect("valid series");

        assert!(matches!(
            SequenceRange::new(
                id.clone(),
                "bad",
                company.clone(),
                code.clone(),
                series,
                10,
                10,
                from,
                until
            ),
            Err(SequenceConfigError::InvalidBounds { .. })
        ));
        assert!(matches!(
            SequenceRange::new(
                id.clone(),
                "bad",
                company.clone(),
                code.clone(),
                series,
                0,
                10,
                from,
                until
            ),
            Err(SequenceConfigError::InvalidBounds { .. })
        ));
        assert!(matches!(
            SequenceRange::new(id, "bad", company, code, series, 1, 10, until, from),
            Err(SequenceConfigError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn status_is_pure_function_of_inputs() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date");

        let fresh = range(0);
        assert_eq!(fresh.status(today), SequenceStatus::Active);

        let exhausted = range(10);
        assert_eq!(exhausted.status(today), SequenceStatus::Exhausted);
        assert_eq!(exhausted.available(), 0);

        let mut disabled = range(10);
        disabled.enabled = false;
        assert_eq!(disabled.status(today), SequenceStatus::Disabled);

        let past_window = NaiveDate::from_ymd_opt(2027, 1, 1).expect("valid date");
        assert_eq!(range(0).status(past_window), SequenceStatus::Expired);
    }

    #[test]
    fn usage_metrics_track_the_cursor() {
        assert_eq!(range(0).used(), 0);
        assert_eq!(range(0).available(), 10);
        assert_eq!(range(1).used(), 1);
        assert_eq!(range(10).used(), 10);
        assert_eq!(range(10).available(), 0);
        assert!((range(5).percent_used() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn next_number_handles_first_issuance() {
        assert_eq!(range(0).next_number(), 1);
        assert_eq!(range(1).next_number(), 2);
    }

    #[test]
    fn alerts_only_fire_while_active() {
        let today = NaiveDate::from_ymd_opt(2026, 12, 15).expect("valid date");
        let mut near_end = range(3);
        near_end.low_stock_threshold = 10;
        assert!(near_end.low_stock_alert(today));
        assert!(near_end.expiry_alert(today));

        let lines = near_end.alert_lines(today);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Low stock"));
        assert!(lines[1].contains("expires in 16 days"));

        let mut disabled = near_end.clone();
        disabled.enabled = false;
        assert!(disabled.alert_lines(today).is_empty());
    }

    #[test]
    fn fiscal_number_format_round_trips() {
        let number = FiscalNumber::compose(
            Series::new('B').expect("valid series"),
            &TypeCode::new("01").expect("valid code"),
            1,
        );
        assert_eq!(number.as_str(), "B0100000001");
        assert_eq!(number.series_char(), 'B');
        assert_eq!(number.type_code(), "01");
        assert_eq!(number.sequence_digits(), "00000001");

        assert!(FiscalNumber::parse("B0100000001").is_ok());
        assert!(FiscalNumber::parse("B010000001").is_err());
        assert!(FiscalNumber::parse("0B100000001").is_err());
        assert!(FiscalNumber::parse("B01000000012").is_err());
    }
}
