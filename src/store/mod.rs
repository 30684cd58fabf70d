//! State refreshed from the ledger and the price feed

pub mod balance;
pub mod price;

pub use balance::{BalanceConfig, BalanceStore, RefreshState};
pub use price::PriceCache;
