//! Production record types for tubecost.
//!
//! A day's record is built in layers: the raw [`ProductionInputs`] a client
//! submits, the [`CostBreakdown`] derived from them, the flattened
//! [`CalculatedRecord`] that is written to storage, and the stored
//! [`ProductionRecord`] carrying the identifier and timestamps.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Raw inputs captured for one production day.
///
/// Numeric fields are lenient on the way in: JSON numbers are taken as-is,
/// strings are read up to the end of their numeric prefix, and missing
/// fields, `null`, booleans and strings without a numeric prefix become `0`.
/// Only `date` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionInputs {
    /// Calendar day the record covers.
    pub date: NaiveDate,

    /// Tubes produced.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub production: f64,
    /// Tubes accepted after inspection.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub outdone: f64,

    /// Paper used, in kilograms.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub paper_quantity_kg: f64,
    /// Paper rate per kilogram.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub paper_rate: f64,

    /// Paste used.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub paste_quantity: f64,
    /// Paste rate.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub paste_rate: f64,

    /// Outer paste used.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub outer_paste_quantity: f64,
    /// Outer paste rate.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub outer_paste_rate: f64,

    /// Packing material used.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub packing_quantity: f64,
    /// Packing material rate.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub packing_rate: f64,

    /// Number of workers.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub labour_count: f64,
    /// Wage per worker.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub labour_wage: f64,

    /// Electricity units consumed.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub eb_units: f64,
    /// Electricity bill amount.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub eb_amount: f64,

    /// Overheads amount.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub overheads_amount: f64,

    /// Food amount.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub food_amount: f64,
}

impl ProductionInputs {
    /// Create inputs for the given day with every quantity set to zero.
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            production: 0.0,
            outdone: 0.0,
            paper_quantity_kg: 0.0,
            paper_rate: 0.0,
            paste_quantity: 0.0,
            paste_rate: 0.0,
            outer_paste_quantity: 0.0,
            outer_paste_rate: 0.0,
            packing_quantity: 0.0,
            packing_rate: 0.0,
            labour_count: 0.0,
            labour_wage: 0.0,
            eb_units: 0.0,
            eb_amount: 0.0,
            overheads_amount: 0.0,
            food_amount: 0.0,
        }
    }
}

/// Costs derived from a day's inputs.
///
/// Every field is recomputed from scratch on each write and is never edited
/// directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostBreakdown {
    /// Total paper cost.
    pub paper_cost: f64,
    /// Paper cost per tube.
    pub paper_cost_per_tube: f64,
    /// Total paste cost.
    pub paste_cost: f64,
    /// Paste cost per tube.
    pub paste_cost_per_tube: f64,
    /// Total outer paste cost.
    pub outer_paste_cost: f64,
    /// Outer paste cost per tube.
    pub outer_paste_cost_per_tube: f64,
    /// Total packing cost.
    pub packing_cost: f64,
    /// Packing cost per tube.
    pub packing_cost_per_tube: f64,
    /// Total labour cost.
    pub labour_cost: f64,
    /// Labour cost per tube.
    pub labour_cost_per_tube: f64,
    /// Electricity cost per tube.
    pub eb_cost_per_tube: f64,
    /// Overheads cost per tube.
    pub overheads_cost_per_tube: f64,
    /// Food cost per tube.
    pub food_cost_per_tube: f64,
    /// Sum of all eight per-tube costs.
    pub grand_total_cost_per_tube: f64,
}

impl CostBreakdown {
    /// The eight per-tube costs that make up the grand total.
    #[must_use]
    pub fn per_tube_costs(&self) -> [f64; 8] {
        [
            self.paper_cost_per_tube,
            self.paste_cost_per_tube,
            self.outer_paste_cost_per_tube,
            self.packing_cost_per_tube,
            self.labour_cost_per_tube,
            self.eb_cost_per_tube,
            self.overheads_cost_per_tube,
            self.food_cost_per_tube,
        ]
    }
}

/// Raw inputs merged with their derived costs.
///
/// Serializes as one flat JSON object, the shape both stores persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedRecord {
    /// The raw inputs.
    #[serde(flatten)]
    pub inputs: ProductionInputs,
    /// The derived costs.
    #[serde(flatten)]
    pub costs: CostBreakdown,
}

impl CalculatedRecord {
    /// Tubes rejected on the day (`production - outdone`).
    ///
    /// Display-only; never persisted.
    #[must_use]
    pub fn rejection(&self) -> f64 {
        self.inputs.production - self.inputs.outdone
    }

    /// Rejected tubes as a percentage of production, or `0` with no production.
    #[must_use]
    pub fn rejection_rate(&self) -> f64 {
        if self.inputs.production == 0.0 {
            0.0
        } else {
            self.rejection() / self.inputs.production * 100.0
        }
    }
}

/// A calculated record with its display-time rejection figures.
///
/// Returned by previews; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationPreview {
    /// The calculated record.
    #[serde(flatten)]
    pub record: CalculatedRecord,
    /// Rejected tubes (`production - outdone`).
    pub rejection: f64,
    /// Rejected tubes as a percentage of production.
    pub rejection_rate: f64,
}

impl From<CalculatedRecord> for CalculationPreview {
    fn from(record: CalculatedRecord) -> Self {
        Self {
            rejection: record.rejection(),
            rejection_rate: record.rejection_rate(),
            record,
        }
    }
}

/// A record as held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    /// Identifier assigned by the store.
    pub id: i64,

    /// Inputs and derived costs.
    #[serde(flatten)]
    pub record: CalculatedRecord,

    /// When the record was first written.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,

    /// When the record was last written.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductionRecord {
    /// The raw inputs of this record.
    #[must_use]
    pub fn inputs(&self) -> &ProductionInputs {
        &self.record.inputs
    }

    /// The derived costs of this record.
    #[must_use]
    pub fn costs(&self) -> &CostBreakdown {
        &self.record.costs
    }
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 (what tubecost writes) and `SQLite`'s `CURRENT_TIMESTAMP`
/// format (`YYYY-MM-DD HH:MM:SS`, UTC).
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(parse_timestamp))
}

/// Read the longest numeric prefix of `value`, ignoring leading whitespace.
///
/// `"12abc"` reads as `12`, `"1.5e3kg"` as `1500`. Text without a numeric
/// prefix, and anything that does not fit in a finite `f64`, reads as `0`.
#[must_use]
pub fn parse_leading_number(value: &str) -> f64 {
    let text = value.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |mut pos: usize| {
        while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
            pos += 1;
        }
        pos
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if has_digits || frac_end > end + 1 {
            has_digits = true;
            end = frac_end;
        }
    }
    if !has_digits {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }

    text[..end]
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientF64)
}

struct LenientF64;

impl<'de> de::Visitor<'de> for LenientF64 {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a numeric string or null")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        Ok(parse_leading_number(v))
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<f64, E> {
        Ok(0.0)
    }

    fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }

    fn visit_none<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(self)
    }
}
