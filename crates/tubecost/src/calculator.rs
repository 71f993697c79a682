//! Cost calculation for production records.
//!
//! [`calculate`] is the single place derived costs are produced. It is a pure
//! function of the raw inputs and a [`DivisorPolicy`] that names, per cost
//! category, whether the per-tube figure is taken over total production or
//! over accepted (outdone) tubes.

use serde::{Deserialize, Serialize};

use crate::record::{CalculatedRecord, CostBreakdown, ProductionInputs};

/// The tube count a category's cost is spread over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Divisor {
    /// All tubes produced on the day.
    #[default]
    Production,
    /// Tubes accepted after inspection.
    Outdone,
}

impl Divisor {
    /// Pick the tube count this divisor refers to.
    #[must_use]
    pub fn of(self, inputs: &ProductionInputs) -> f64 {
        match self {
            Self::Production => inputs.production,
            Self::Outdone => inputs.outdone,
        }
    }
}

impl std::fmt::Display for Divisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Outdone => write!(f, "outdone"),
        }
    }
}

/// Per-category divisor choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivisorPolicy {
    /// Divisor for paper cost.
    pub paper: Divisor,
    /// Divisor for paste cost.
    pub paste: Divisor,
    /// Divisor for outer paste cost.
    pub outer_paste: Divisor,
    /// Divisor for packing cost.
    pub packing: Divisor,
    /// Divisor for labour cost.
    pub labour: Divisor,
    /// Divisor for electricity cost.
    pub electricity: Divisor,
    /// Divisor for overheads.
    pub overheads: Divisor,
    /// Divisor for food.
    pub food: Divisor,
}

impl DivisorPolicy {
    /// Every category spread over total production.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// The entry-form convention: paper, paste and outer paste are spread over
    /// accepted tubes, everything else over total production.
    #[must_use]
    pub fn form() -> Self {
        Self {
            paper: Divisor::Outdone,
            paste: Divisor::Outdone,
            outer_paste: Divisor::Outdone,
            ..Self::default()
        }
    }
}

/// Round to two decimal places, halves away from zero.
///
/// Infinite and NaN values round to `0` so every derived figure stays a
/// storable number.
#[must_use]
pub fn round2(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    let scaled = x * 100.0;
    if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        // Too large to carry a fractional part anyway
        x
    }
}

/// Divide and round to two decimals, yielding `0` for a zero denominator.
///
/// `-0.0` counts as zero.
#[must_use]
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        round2(numerator / denominator)
    }
}

/// Derive every cost for a day's inputs.
///
/// Never mutates `inputs` and never fails: a zero divisor yields a zero
/// per-tube figure for that category.
#[must_use]
pub fn calculate(inputs: &ProductionInputs, policy: &DivisorPolicy) -> CalculatedRecord {
    let per_tube = |amount: f64, divisor: Divisor| safe_divide(amount, divisor.of(inputs));

    let paper_cost = round2(inputs.paper_quantity_kg * inputs.paper_rate);
    let paste_cost = round2(inputs.paste_quantity * inputs.paste_rate);
    let outer_paste_cost = round2(inputs.outer_paste_quantity * inputs.outer_paste_rate);
    let packing_cost = round2(inputs.packing_quantity * inputs.packing_rate);
    let labour_cost = round2(inputs.labour_count * inputs.labour_wage);

    let mut costs = CostBreakdown {
        paper_cost,
        paper_cost_per_tube: per_tube(paper_cost, policy.paper),
        paste_cost,
        paste_cost_per_tube: per_tube(paste_cost, policy.paste),
        outer_paste_cost,
        outer_paste_cost_per_tube: per_tube(outer_paste_cost, policy.outer_paste),
        packing_cost,
        packing_cost_per_tube: per_tube(packing_cost, policy.packing),
        labour_cost,
        labour_cost_per_tube: per_tube(labour_cost, policy.labour),
        eb_cost_per_tube: per_tube(inputs.eb_amount, policy.electricity),
        overheads_cost_per_tube: per_tube(inputs.overheads_amount, policy.overheads),
        food_cost_per_tube: per_tube(inputs.food_amount, policy.food),
        grand_total_cost_per_tube: 0.0,
    };
    costs.grand_total_cost_per_tube = round2(costs.per_tube_costs().iter().sum());

    CalculatedRecord {
        inputs: inputs.clone(),
        costs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_inputs() -> ProductionInputs {
        let mut inputs = ProductionInputs::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        inputs.production = 10000.0;
        inputs.outdone = 9500.0;
        inputs.paper_quantity_kg = 250.0;
        inputs.paper_rate = 45.5;
        inputs.packing_quantity = 100.0;
        inputs.packing_rate = 5.0;
        inputs.labour_count = 10.0;
        inputs.labour_wage = 500.0;
        inputs.eb_amount = 1200.0;
        inputs.overheads_amount = 2000.0;
        inputs.food_amount = 800.0;
        inputs
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(2.344), 2.34);
        assert_eq!(round2(113.75 / 100.0), 1.14);
        assert_eq!(round2(-1.125), -1.13);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_round2_idempotent() {
        for x in [0.0, 1.234_567, -9.875, 11375.0, 0.005, 123_456.789, -0.004] {
            assert_eq!(round2(round2(x)), round2(x), "not idempotent for {x}");
        }
    }

    #[test]
    fn test_safe_divide_zero_denominator() {
        for n in [0.0, 1.0, -5.0, 11375.0] {
            assert_eq!(safe_divide(n, 0.0), 0.0);
            assert_eq!(safe_divide(n, -0.0), 0.0);
        }
    }

    #[test]
    fn test_safe_divide_rounds() {
        assert_eq!(safe_divide(1200.0, 10000.0), 0.12);
        assert_eq!(safe_divide(11375.0, 9500.0), 1.2);
        assert_eq!(safe_divide(1.0, 3.0), 0.33);
    }

    #[test]
    fn test_worked_example_production_policy() {
        let record = calculate(&sample_inputs(), &DivisorPolicy::production());
        let costs = record.costs;

        assert_eq!(costs.paper_cost, 11375.0);
        assert_eq!(costs.paper_cost_per_tube, 1.14);
        assert_eq!(costs.paste_cost_per_tube, 0.0);
        assert_eq!(costs.outer_paste_cost_per_tube, 0.0);
        assert_eq!(costs.packing_cost, 500.0);
        assert_eq!(costs.packing_cost_per_tube, 0.05);
        assert_eq!(costs.labour_cost, 5000.0);
        assert_eq!(costs.labour_cost_per_tube, 0.5);
        assert_eq!(costs.eb_cost_per_tube, 0.12);
        assert_eq!(costs.overheads_cost_per_tube, 0.2);
        assert_eq!(costs.food_cost_per_tube, 0.08);
        assert_eq!(costs.grand_total_cost_per_tube, 2.09);
    }

    #[test]
    fn test_worked_example_form_policy() {
        let record = calculate(&sample_inputs(), &DivisorPolicy::form());
        assert_eq!(record.costs.paper_cost_per_tube, 1.2);
        assert_eq!(record.costs.packing_cost_per_tube, 0.05);
        assert_eq!(record.costs.grand_total_cost_per_tube, 2.15);
    }

    #[test]
    fn test_grand_total_is_rounded_sum() {
        let mut inputs = sample_inputs();
        inputs.paste_quantity = 13.0;
        inputs.paste_rate = 7.77;
        inputs.outer_paste_quantity = 3.3;
        inputs.outer_paste_rate = 19.1;

        for policy in [DivisorPolicy::production(), DivisorPolicy::form()] {
            let costs = calculate(&inputs, &policy).costs;
            let expected = round2(costs.per_tube_costs().iter().sum());
            assert_eq!(costs.grand_total_cost_per_tube, expected);
        }
    }

    #[test]
    fn test_zero_production_yields_zero_per_tube() {
        let mut inputs = sample_inputs();
        inputs.production = 0.0;
        inputs.outdone = 0.0;

        let costs = calculate(&inputs, &DivisorPolicy::form()).costs;
        assert_eq!(costs.paper_cost, 11375.0);
        assert!(costs.per_tube_costs().iter().all(|c| *c == 0.0));
        assert_eq!(costs.grand_total_cost_per_tube, 0.0);
    }

    #[test]
    fn test_round2_non_finite_is_zero() {
        assert_eq!(round2(f64::INFINITY), 0.0);
        assert_eq!(round2(f64::NEG_INFINITY), 0.0);
        assert_eq!(round2(f64::NAN), 0.0);
        assert_eq!(round2(f64::MAX), f64::MAX);
    }

    #[test]
    fn test_overflowing_inputs_yield_finite_costs() {
        let mut inputs = sample_inputs();
        inputs.paper_quantity_kg = 1e300;
        inputs.paper_rate = 1e300;

        for policy in [DivisorPolicy::production(), DivisorPolicy::form()] {
            let record = calculate(&inputs, &policy);
            let costs = record.costs;
            assert_eq!(costs.paper_cost, 0.0);
            assert!(costs.per_tube_costs().iter().all(|c| c.is_finite()));
            assert!(costs.grand_total_cost_per_tube.is_finite());

            let json = serde_json::to_string(&record).unwrap();
            let back: CalculatedRecord = serde_json::from_str(&json).unwrap();
            assert_eq!(back.costs, record.costs);
        }
    }

    #[test]
    fn test_calculate_is_pure() {
        let inputs = sample_inputs();
        let before = inputs.clone();
        let first = calculate(&inputs, &DivisorPolicy::production());
        let second = calculate(&inputs, &DivisorPolicy::production());

        assert_eq!(first, second);
        assert_eq!(inputs, before);
        assert_eq!(first.inputs, inputs);
    }

    #[test]
    fn test_divisor_of() {
        let inputs = sample_inputs();
        assert_eq!(Divisor::Production.of(&inputs), 10000.0);
        assert_eq!(Divisor::Outdone.of(&inputs), 9500.0);
    }

    #[test]
    fn test_divisor_policy_deserialize() {
        let policy: DivisorPolicy = serde_json::from_str(r#"{"paper": "outdone"}"#).unwrap();
        assert_eq!(policy.paper, Divisor::Outdone);
        assert_eq!(policy.paste, Divisor::Production);
    }

    #[test]
    fn test_divisor_display() {
        assert_eq!(Divisor::Production.to_string(), "production");
        assert_eq!(Divisor::Outdone.to_string(), "outdone");
    }
}
