//! Adapters Layer - concrete implementations of the ports
//!
//! - `market_data`: REST quote/history client
//! - `broker`: REST brokerage with managed session, plus a paper broker
//! - `ledger`: durable JSON-file ledger
//! - `cli`: command-line surface

pub mod broker;
pub mod cli;
pub mod ledger;
pub mod market_data;
