//! Route-level analysis of cleaned flight and ticket data.
//!
//! Flights and tickets are keyed to an order-independent route, aggregated
//! per route and joined, turned into revenue/cost/profit features, and handed
//! to the profit model. Descriptive insights (profit ranking, daily trends,
//! route network) are derived alongside.

pub mod aggregate;
pub mod analyzer;
pub mod features;
pub mod insights;
pub mod route_key;
pub mod types;
pub mod utility;
