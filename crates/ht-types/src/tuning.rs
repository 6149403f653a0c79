//! Session-wide scoring rules and trial budgets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::TuneError;

/// Whether a higher or a lower monitor value is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rule {
    Greater,
    Less,
}

impl Rule {
    /// The worst possible score under this rule. Substituted for failed
    /// trials and corrupted readings so that scores stay totally ordered.
    pub fn worst(self) -> f64 {
        match self {
            Self::Greater => f64::NEG_INFINITY,
            Self::Less => f64::INFINITY,
        }
    }

    /// Strict comparison: `candidate` beats `incumbent`.
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Greater => candidate > incumbent,
            Self::Less => candidate < incumbent,
        }
    }

    /// Replace NaN and infinite scores with [`Rule::worst`].
    pub fn sanitize(self, score: f64) -> f64 {
        if score.is_finite() {
            score
        } else {
            self.worst()
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greater => "greater",
            Self::Less => "less",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rule {
    type Err = TuneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greater" => Ok(Self::Greater),
            "less" => Ok(Self::Less),
            other => Err(TuneError::Config(format!("Rule {other} is not supported"))),
        }
    }
}

/// How the scoreboard is reduced to the single score reported for a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportOp {
    /// Most recent reading.
    #[default]
    Latest,
    /// Arithmetic mean over every retained reading.
    Mean,
}

impl ReportOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Mean => "mean",
        }
    }
}

impl fmt::Display for ReportOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportOp {
    type Err = TuneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(Self::Latest),
            "mean" => Ok(Self::Mean),
            other => Err(TuneError::Config(format!(
                "report_op {other} is not supported"
            ))),
        }
    }
}

/// Per-trial training budget. Exactly one of the two limits is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBudget {
    /// Stop once this many training iterations have completed.
    Iterations(u64),
    /// Stop once this many training epochs have completed.
    Epochs(u64),
}

impl StopBudget {
    /// Build a budget from the optional iteration and epoch limits. A limit of
    /// zero counts as unset; exactly one must be positive.
    pub fn from_limits(
        tuning_iter: Option<u64>,
        tuning_epoch: Option<u64>,
    ) -> Result<Self, TuneError> {
        match (tuning_iter.unwrap_or(0), tuning_epoch.unwrap_or(0)) {
            (iters, 0) if iters > 0 => Ok(Self::Iterations(iters)),
            (0, epochs) if epochs > 0 => Ok(Self::Epochs(epochs)),
            (0, 0) => Err(TuneError::Config(
                "one of tuning_iter and tuning_epoch must be set".to_string(),
            )),
            (iters, epochs) => Err(TuneError::Config(format!(
                "tuning_iter ({iters}) and tuning_epoch ({epochs}) should be set only one"
            ))),
        }
    }

    pub fn tuning_iter(self) -> Option<u64> {
        match self {
            Self::Iterations(n) => Some(n),
            Self::Epochs(_) => None,
        }
    }

    pub fn tuning_epoch(self) -> Option<u64> {
        match self {
            Self::Epochs(n) => Some(n),
            Self::Iterations(_) => None,
        }
    }

    pub fn is_epoch_based(self) -> bool {
        matches!(self, Self::Epochs(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_sentinels() {
        assert_eq!(Rule::Greater.worst(), f64::NEG_INFINITY);
        assert_eq!(Rule::Less.worst(), f64::INFINITY);
        assert_eq!(Rule::Greater.sanitize(f64::NAN), f64::NEG_INFINITY);
        assert_eq!(Rule::Less.sanitize(f64::NEG_INFINITY), f64::INFINITY);
        assert_eq!(Rule::Less.sanitize(0.25), 0.25);
    }

    #[test]
    fn rule_comparison_is_strict() {
        assert!(Rule::Greater.is_better(2.0, 1.0));
        assert!(!Rule::Greater.is_better(1.0, 1.0));
        assert!(Rule::Less.is_better(1.0, 2.0));
        assert!(!Rule::Less.is_better(2.0, 2.0));
    }

    #[test]
    fn parse_rule_and_report_op() {
        assert_eq!("greater".parse::<Rule>().unwrap(), Rule::Greater);
        assert_eq!("less".parse::<Rule>().unwrap(), Rule::Less);
        assert!("max".parse::<Rule>().is_err());

        assert_eq!("mean".parse::<ReportOp>().unwrap(), ReportOp::Mean);
        assert!("median".parse::<ReportOp>().is_err());
        assert_eq!(ReportOp::default(), ReportOp::Latest);
    }

    #[test]
    fn serde_names_are_lowercase() {
        assert_eq!(serde_json::to_string(&Rule::Less).unwrap(), "\"less\"");
        let op: ReportOp = serde_json::from_str("\"latest\"").unwrap();
        assert_eq!(op, ReportOp::Latest);
        assert!(serde_json::from_str::<Rule>("\"bigger\"").is_err());
    }

    #[test]
    fn stop_budget_requires_exactly_one_limit() {
        assert_eq!(
            StopBudget::from_limits(Some(100), None).unwrap(),
            StopBudget::Iterations(100)
        );
        assert_eq!(
            StopBudget::from_limits(Some(0), Some(3)).unwrap(),
            StopBudget::Epochs(3)
        );
        assert!(StopBudget::from_limits(Some(10), Some(2)).is_err());
        assert!(StopBudget::from_limits(None, None).is_err());
        assert!(StopBudget::from_limits(Some(0), Some(0)).is_err());
    }

    #[test]
    fn stop_budget_accessors() {
        let budget = StopBudget::Epochs(4);
        assert!(budget.is_epoch_based());
        assert_eq!(budget.tuning_epoch(), Some(4));
        assert_eq!(budget.tuning_iter(), None);
    }
}
