pub mod price_api;
pub mod solana_rpc;

pub use price_api::HttpPriceProvider;
pub use solana_rpc::SolanaRpcProvider;
