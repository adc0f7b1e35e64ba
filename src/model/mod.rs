//! Route profit regression.
//!
//! A gradient-boosted ensemble of squared-error regression trees is trained
//! on a seeded partition of the route feature table, scored on the holdout,
//! and applied to every route.

pub mod gbm;
pub mod metrics;
pub mod profit;
pub mod split;
pub mod tree;

pub use profit::{ModelReport, ProfitModel};
