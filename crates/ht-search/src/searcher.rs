//! The searcher contract and the registry that builds searchers by type name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use ht_types::{Rule, SearchError, SearchResult};

use crate::replay::ReplaySearcher;
use crate::space::{Candidate, HyperparameterSpec};

/// Black-box search strategy.
///
/// A tuning session calls [`Searcher::suggest`] and [`Searcher::record`]
/// alternately, one pair per trial, and only on the coordinating process.
pub trait Searcher: Send {
    /// Produce the next candidate to evaluate.
    fn suggest(&mut self) -> SearchResult<Candidate>;

    /// Feed back the agreed score of a finished trial.
    fn record(&mut self, candidate: &Candidate, score: f64);

    /// Human-readable searcher name.
    fn name(&self) -> &str;
}

/// Searcher configuration: a `type` plus searcher-specific options.
///
/// ```json
/// {"type": "replay", "candidates": [{"optimizer.lr": 0.01}]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearcherConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl SearcherConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: serde_json::Map::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn option(&self, key: &str) -> Option<&serde_json::Value> {
        self.options.get(key)
    }
}

/// Session settings every searcher is built with.
#[derive(Debug, Clone, PartialEq)]
pub struct SearcherContext {
    pub rule: Rule,
    pub hparam_spec: HyperparameterSpec,
    pub num_trials: usize,
}

type SearcherFactory =
    Box<dyn Fn(&SearcherConfig, &SearcherContext) -> SearchResult<Box<dyn Searcher>> + Send + Sync>;

/// Maps searcher type names to factories.
pub struct SearcherRegistry {
    factories: BTreeMap<String, SearcherFactory>,
}

impl SearcherRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding the searchers shipped with this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ReplaySearcher::KIND, |config, context| {
            ReplaySearcher::from_config(config, context)
                .map(|searcher| Box::new(searcher) as Box<dyn Searcher>)
        });
        registry
    }

    /// Register (or replace) a factory under `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&SearcherConfig, &SearcherContext) -> SearchResult<Box<dyn Searcher>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build the searcher named by `config.kind`.
    pub fn build(
        &self,
        config: &SearcherConfig,
        context: &SearcherContext,
    ) -> SearchResult<Box<dyn Searcher>> {
        let factory = self
            .factories
            .get(&config.kind)
            .ok_or_else(|| SearchError::UnknownSearcher {
                kind: config.kind.clone(),
            })?;
        info!(kind = %config.kind, "Building searcher");
        factory(config, context)
    }
}

impl Default for SearcherRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for SearcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearcherRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::ParameterValue;
    use serde_json::json;

    struct ConstantSearcher {
        candidate: Candidate,
    }

    impl Searcher for ConstantSearcher {
        fn suggest(&mut self) -> SearchResult<Candidate> {
            Ok(self.candidate.clone())
        }

        fn record(&mut self, _candidate: &Candidate, _score: f64) {}

        fn name(&self) -> &str {
            "constant"
        }
    }

    fn context() -> SearcherContext {
        SearcherContext {
            rule: Rule::Greater,
            hparam_spec: HyperparameterSpec::new().add_continuous("lr", 0.0, 1.0),
            num_trials: 4,
        }
    }

    #[test]
    fn searcher_config_flattens_options() {
        let config: SearcherConfig = serde_json::from_value(json!({
            "type": "nevergrad",
            "solver_type": "CMA"
        }))
        .unwrap();
        assert_eq!(config.kind, "nevergrad");
        assert_eq!(config.option("solver_type"), Some(&json!("CMA")));

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back, json!({"type": "nevergrad", "solver_type": "CMA"}));
    }

    #[test]
    fn unknown_searcher_type_is_rejected() {
        let registry = SearcherRegistry::with_builtins();
        let err = registry
            .build(&SearcherConfig::new("bayes"), &context())
            .err()
            .unwrap();
        assert_eq!(
            err,
            SearchError::UnknownSearcher {
                kind: "bayes".into()
            }
        );
    }

    #[test]
    fn registered_factory_receives_context() {
        let mut registry = SearcherRegistry::new();
        registry.register("constant", |_config, context| {
            assert_eq!(context.num_trials, 4);
            let mut candidate = Candidate::new();
            candidate.insert("lr".into(), 0.5.into());
            Ok(Box::new(ConstantSearcher { candidate }) as Box<dyn Searcher>)
        });
        assert!(registry.contains("constant"));
        assert!(!registry.contains(ReplaySearcher::KIND));

        let mut searcher = registry
            .build(&SearcherConfig::new("constant"), &context())
            .unwrap();
        assert_eq!(searcher.name(), "constant");
        assert_eq!(searcher.suggest().unwrap()["lr"], ParameterValue::Float(0.5));
    }

    #[test]
    fn builtins_include_replay() {
        let registry = SearcherRegistry::default();
        assert_eq!(registry.kinds().collect::<Vec<_>>(), vec!["replay"]);
    }
}
