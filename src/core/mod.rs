//! Core business logic abstractions

pub mod asset;
pub mod config;
pub mod error;
pub mod ledger;
pub mod log;
pub mod portfolio;
pub mod price;
pub mod retry;

// Re-export main types for cleaner imports
pub use asset::{Asset, AssetBalance, BalanceSnapshot, PriceQuote, PriceSnapshot, WalletId};
pub use error::FetchError;
pub use ledger::{LedgerProvider, TokenAccount, TokenAccountData};
pub use price::PriceProvider;
pub use retry::{Fetched, RetryPolicy, fetch_with_retry};
