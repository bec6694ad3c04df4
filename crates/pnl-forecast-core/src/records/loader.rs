use chrono::{Month, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::PnlError;
use crate::types::{LineItem, LineItems, Money};
use crate::PnlResult;

/// Column carrying the month token, e.g. "Jan-23" (spelling preserved verbatim).
pub const PERIOD_COLUMN: &str = "monthes";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One untyped input row: column name to cell value. Cells may be JSON
/// numbers or strings; `null`, empty strings and absent keys are "missing".
pub type RawRow = BTreeMap<String, Value>;

/// A validated month of raw figures, before any derived metric is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodObservation {
    pub period_label: String,
    pub period_date: NaiveDate,
    pub amounts: LineItems,
}

/// Why a row was excluded from the record sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    ParseError,
    MissingField,
    InvalidNumber,
    NegativeAmount,
    DuplicatePeriod,
}

/// A row the loader refused, kept for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// 1-based position in the input (header excluded)
    pub row_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_label: Option<String>,
    pub kind: RejectionKind,
    pub reason: String,
}

/// Everything the loader produced from one batch of rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadOutcome {
    /// Valid observations, ascending by `period_date`, unique per month
    pub observations: Vec<PeriodObservation>,
    pub rejected: Vec<RejectedRow>,
    /// Rows skipped because `revenue` was empty or absent
    pub dropped_missing_revenue: usize,
    pub rows_read: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse an abbreviated month-year token such as "Jan-23" into the first day
/// of that month.
///
/// The token must be exactly three letters, a hyphen and two digits. Years
/// 00–68 map to 20xx and 69–99 to 19xx.
pub fn parse_period_label(label: &str) -> PnlResult<NaiveDate> {
    let token = label.trim();
    let parse_err = |reason: &str| PnlError::ParseError {
        label: label.to_string(),
        reason: reason.to_string(),
    };

    let (month_part, year_part) = token
        .split_once('-')
        .ok_or_else(|| parse_err("expected '{Mon}-{YY}'"))?;

    if month_part.len() != 3 || !month_part.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(parse_err("month must be a 3-letter abbreviation"));
    }
    if year_part.len() != 2 || !year_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(parse_err("year must be 2 digits"));
    }

    let month =
        Month::from_str(month_part).map_err(|_| parse_err("unknown month abbreviation"))?;
    let yy: i32 = year_part
        .parse()
        .map_err(|_| parse_err("year must be 2 digits"))?;
    let year = if yy < 69 { 2000 + yy } else { 1900 + yy };

    NaiveDate::from_ymd_opt(year, month.number_from_month(), 1)
        .ok_or_else(|| parse_err("date out of range"))
}

/// Turn raw rows into a sorted, de-duplicated sequence of observations.
///
/// Never fails as a whole: malformed rows are rejected individually and rows
/// without revenue are counted and skipped.
pub fn load_records(rows: &[RawRow]) -> LoadOutcome {
    let mut outcome = LoadOutcome {
        rows_read: rows.len(),
        ..LoadOutcome::default()
    };
    let mut candidates: Vec<(usize, PeriodObservation)> = Vec::with_capacity(rows.len());

    for (idx, raw) in rows.iter().enumerate() {
        let row_number = idx + 1;
        let row = trim_keys(raw);

        match read_row(&row) {
            Ok(Some(obs)) => candidates.push((row_number, obs)),
            Ok(None) => {
                debug!(row_number, "dropping row without revenue");
                outcome.dropped_missing_revenue += 1;
            }
            Err(RowFault { kind, error }) => {
                warn!(row_number, ?kind, %error, "rejecting row");
                outcome.rejected.push(RejectedRow {
                    row_number,
                    period_label: text_cell(&row, PERIOD_COLUMN),
                    kind,
                    reason: error.to_string(),
                });
            }
        }
    }

    // Stable sort keeps input order among same-month rows, so the first one wins.
    candidates.sort_by_key(|(_, obs)| obs.period_date);

    let mut seen: HashSet<NaiveDate> = HashSet::with_capacity(candidates.len());
    for (row_number, obs) in candidates {
        if !seen.insert(obs.period_date) {
            let e = PnlError::DuplicatePeriod {
                label: obs.period_label.clone(),
            };
            warn!(row_number, error = %e, "rejecting row");
            outcome.rejected.push(RejectedRow {
                row_number,
                period_label: Some(obs.period_label),
                kind: RejectionKind::DuplicatePeriod,
                reason: e.to_string(),
            });
            continue;
        }
        outcome.observations.push(obs);
    }
    outcome.rejected.sort_by_key(|r| r.row_number);

    debug!(
        loaded = outcome.observations.len(),
        rejected = outcome.rejected.len(),
        dropped = outcome.dropped_missing_revenue,
        "records loaded"
    );
    outcome
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn trim_keys(row: &RawRow) -> RawRow {
    row.iter()
        .map(|(k, v)| (k.trim().to_string(), v.clone()))
        .collect()
}

/// A row-level failure, classified where it is raised.
struct RowFault {
    kind: RejectionKind,
    error: PnlError,
}

impl RowFault {
    fn new(kind: RejectionKind, error: PnlError) -> Self {
        RowFault { kind, error }
    }
}

/// `Ok(None)` means the row has no revenue and should be dropped.
fn read_row(row: &RawRow) -> Result<Option<PeriodObservation>, RowFault> {
    let revenue = match read_amount(row, LineItem::Revenue)? {
        Some(v) => v,
        None => return Ok(None),
    };

    let label = text_cell(row, PERIOD_COLUMN).ok_or_else(|| missing(PERIOD_COLUMN))?;
    let period_date = parse_period_label(&label)
        .map_err(|e| RowFault::new(RejectionKind::ParseError, e))?;

    let mut amounts = LineItems {
        revenue,
        ..LineItems::default()
    };
    for item in LineItem::COSTS {
        *amounts.get_mut(item) =
            read_amount(row, item)?.ok_or_else(|| missing(item.column_name()))?;
    }
    if amounts.checked_net_profit().is_none() {
        return Err(RowFault::new(
            RejectionKind::InvalidNumber,
            PnlError::InvalidInput {
                field: "net_profit_after_tax".into(),
                reason: "row totals leave the representable range".into(),
            },
        ));
    }

    Ok(Some(PeriodObservation {
        period_label: label,
        period_date,
        amounts,
    }))
}

fn missing(field: &str) -> RowFault {
    RowFault::new(
        RejectionKind::MissingField,
        PnlError::MissingField {
            field: field.into(),
        },
    )
}

fn read_amount(row: &RawRow, item: LineItem) -> Result<Option<Money>, RowFault> {
    let field = item.column_name();
    let invalid = |value: String| {
        RowFault::new(
            RejectionKind::InvalidNumber,
            PnlError::InvalidNumber {
                field: field.into(),
                value,
            },
        )
    };
    let value = match row.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => {
            let text = n.to_string();
            parse_decimal(&text).ok_or_else(|| invalid(text))?
        }
        Some(Value::String(s)) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, ',' | '$' | '_'))
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            parse_decimal(&cleaned).ok_or_else(|| invalid(cleaned.clone()))?
        }
        Some(other) => return Err(invalid(other.to_string())),
    };

    if value.is_sign_negative() && !value.is_zero() {
        return Err(RowFault::new(
            RejectionKind::NegativeAmount,
            PnlError::NegativeAmount {
                field: field.into(),
                value,
            },
        ));
    }
    Ok(Some(value))
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn text_cell(row: &RawRow, field: &str) -> Option<String> {
    match row.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
