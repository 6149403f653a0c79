//! # ht-search
//!
//! Hyperparameter spec definitions and the pluggable searcher contract for
//! Hypertune.
//!
//! Concrete optimization algorithms live outside this crate. They implement
//! [`Searcher`] and are registered with a [`SearcherRegistry`] under a type
//! name, so a session can build them from a [`SearcherConfig`].

mod replay;
mod searcher;
mod space;

pub use replay::ReplaySearcher;
pub use searcher::{Searcher, SearcherConfig, SearcherContext, SearcherRegistry};
pub use space::{describe, Candidate, HyperparameterSpec, ParameterDomain, ParameterValue};
