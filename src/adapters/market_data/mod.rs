//! Market data adapters

pub mod rest;

pub use rest::RestMarketData;
