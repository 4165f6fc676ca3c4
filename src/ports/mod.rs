//! Ports Layer - trait seams to the external collaborators
//!
//! The engine only ever talks to market data, the brokerage, and the
//! ledger through these traits; adapters provide the real implementations
//! and `mocks` provides deterministic in-memory ones for tests.

pub mod brokerage;
pub mod ledger;
pub mod market_data;
pub mod mocks;

pub use brokerage::{BrokerageClient, BrokerageError, OpenPositions, OrderReceipt, PortfolioView};
pub use ledger::{Ledger, LedgerError, SignalEntry};
pub use market_data::{ChainedMarketData, MarketDataError, MarketDataSource, PricePoint};
