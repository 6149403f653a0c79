//! Hyperparameter spec definitions and candidate values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ht_types::{SearchError, SearchResult};

/// Describes how one hyperparameter may be sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterDomain {
    /// Continuous range [lower, upper], optionally log-scaled.
    Continuous {
        lower: f64,
        upper: f64,
        #[serde(default)]
        log_scale: bool,
    },
    /// Integer range [lower, upper] inclusive.
    Integer { lower: i64, upper: i64 },
    /// Categorical choices.
    Discrete { values: Vec<serde_json::Value> },
}

impl ParameterDomain {
    /// Check the domain is well formed. `path` is only used for the error.
    pub fn validate(&self, path: &str) -> SearchResult<()> {
        let invalid = |message: String| SearchError::InvalidDomain {
            path: path.to_string(),
            message,
        };
        match self {
            Self::Continuous {
                lower,
                upper,
                log_scale,
            } => {
                if !lower.is_finite() || !upper.is_finite() {
                    return Err(invalid("bounds must be finite".to_string()));
                }
                if lower >= upper {
                    return Err(invalid(format!("lower {lower} must be below upper {upper}")));
                }
                if *log_scale && *lower <= 0.0 {
                    return Err(invalid(format!(
                        "log-scaled range needs a positive lower bound, got {lower}"
                    )));
                }
            }
            Self::Integer { lower, upper } => {
                if lower > upper {
                    return Err(invalid(format!("lower {lower} exceeds upper {upper}")));
                }
            }
            Self::Discrete { values } => {
                if values.is_empty() {
                    return Err(invalid("no values to choose from".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Whether `value` lies inside this domain.
    pub fn contains(&self, value: &ParameterValue) -> bool {
        match (self, value) {
            (Self::Continuous { lower, upper, .. }, ParameterValue::Float(v)) => {
                *lower <= *v && *v <= *upper
            }
            (Self::Continuous { lower, upper, .. }, ParameterValue::Int(v)) => {
                let v = *v as f64;
                *lower <= v && v <= *upper
            }
            (Self::Integer { lower, upper }, ParameterValue::Int(v)) => lower <= v && v <= upper,
            (Self::Discrete { values }, other) => {
                let json = other.to_json();
                values.iter().any(|candidate| *candidate == json)
            }
            _ => false,
        }
    }
}

/// A concrete parameter value produced by a searcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Json(serde_json::Value),
}

impl ParameterValue {
    /// Value as it is written into the config tree.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Json(v) => v.clone(),
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<serde_json::Value> for ParameterValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// One concrete assignment: dotted config path -> value.
pub type Candidate = BTreeMap<String, ParameterValue>;

/// Render a candidate as `{path=value, ...}` for log lines.
pub fn describe(candidate: &Candidate) -> String {
    let parts: Vec<String> = candidate
        .iter()
        .map(|(path, value)| format!("{path}={value}"))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

/// The full search space: dotted config path -> sampling domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HyperparameterSpec {
    parameters: BTreeMap<String, ParameterDomain>,
}

impl HyperparameterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, path: impl Into<String>, domain: ParameterDomain) -> Self {
        self.parameters.insert(path.into(), domain);
        self
    }

    pub fn add_continuous(self, path: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.add(
            path,
            ParameterDomain::Continuous {
                lower,
                upper,
                log_scale: false,
            },
        )
    }

    pub fn add_log_uniform(self, path: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.add(
            path,
            ParameterDomain::Continuous {
                lower,
                upper,
                log_scale: true,
            },
        )
    }

    pub fn add_integer(self, path: impl Into<String>, lower: i64, upper: i64) -> Self {
        self.add(path, ParameterDomain::Integer { lower, upper })
    }

    pub fn add_discrete(self, path: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        self.add(path, ParameterDomain::Discrete { values })
    }

    pub fn get(&self, path: &str) -> Option<&ParameterDomain> {
        self.parameters.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterDomain)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Validate every domain.
    pub fn validate(&self) -> SearchResult<()> {
        for (path, domain) in &self.parameters {
            domain.validate(path)?;
        }
        Ok(())
    }

    /// Check that a candidate only names spec paths, with in-domain values.
    pub fn check_candidate(&self, candidate: &Candidate) -> SearchResult<()> {
        for (path, value) in candidate {
            let domain = self.get(path).ok_or_else(|| SearchError::UnknownParameter {
                path: path.clone(),
            })?;
            if !domain.contains(value) {
                return Err(SearchError::InvalidDomain {
                    path: path.clone(),
                    message: format!("value {value} lies outside the domain"),
                });
            }
        }
        Ok(())
    }
}
