//! Ledger query abstractions

use crate::core::asset::WalletId;
use anyhow::Result;
use async_trait::async_trait;

/// A token account located for a wallet and mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccount {
    pub address: String,
    /// Program that owns the account, e.g. the SPL token program.
    pub program_owner: String,
    pub data_len: u64,
}

/// Decoded token account payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountData {
    pub amount: u64,
    /// Wallet the tokens belong to.
    pub owner: String,
}

#[async_trait]
pub trait LedgerProvider: Send + Sync {
    /// Native balance in the smallest unit (lamports).
    async fn get_native_balance(&self, identity: &WalletId) -> Result<u64>;

    /// Returns `None` when the wallet holds no account for `mint`.
    async fn get_token_account(
        &self,
        identity: &WalletId,
        mint: &str,
    ) -> Result<Option<TokenAccount>>;

    async fn get_token_account_data(&self, account: &str) -> Result<TokenAccountData>;
}
