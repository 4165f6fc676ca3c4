//! Brokerage adapters: REST client with managed session, and an
//! in-process paper broker for demos and tests.

pub mod paper;
pub mod rest;
pub mod session;

pub use paper::PaperBroker;
pub use rest::RestBrokerage;
pub use session::{Credentials, SessionManager};
