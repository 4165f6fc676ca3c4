#![allow(dead_code, unused_imports, unused_variables)]
//! Quorum Trader - multi-strategy signal aggregation and risk-gated
//! trade execution engine
//!
//! Runs several technical strategies per symbol, reduces their signals to
//! one decision via confidence-weighted voting, gates the decision through
//! a stateful risk policy, and records every attempt in a durable ledger.
//!
//! # Modules
//!
//! - `domain`: Core business logic (Signal, DecisionAggregator, RiskGate, TradeRecord)
//! - `ports`: Trait abstractions (MarketDataSource, BrokerageClient, Ledger)
//! - `strategy`: Signal generation (SMA crossover, RSI oscillator)
//! - `adapters`: External implementations (REST market data, brokerage, file ledger, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Engine and pacing

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod strategy;
