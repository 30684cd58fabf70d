use crate::core::asset::WalletId;
use crate::core::error::FetchError;
use crate::core::ledger::{LedgerProvider, TokenAccount, TokenAccountData};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};

const COMMITMENT: &str = "confirmed";

/// Ledger reads over Solana JSON-RPC.
pub struct SolanaRpcProvider {
    url: String,
    client: reqwest::Client,
}

impl SolanaRpcProvider {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("goldwatch/0.1")
            .build()?;
        Ok(SolanaRpcProvider {
            url: url.to_string(),
            client,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        debug!("Calling {} on {}", method, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for method: {}", e, method))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for method: {}",
                response.status(),
                method
            ));
        }

        let text = response.text().await?;
        let body: RpcResponse<T> = serde_json::from_str(&text).map_err(|e| {
            FetchError::MalformedResponse(format!("failed to parse {method} response: {e}"))
        })?;

        if let Some(err) = body.error {
            return Err(anyhow!(
                "RPC error {} for method {}: {}",
                err.code,
                method,
                err.message
            ));
        }
        body.result.ok_or_else(|| {
            FetchError::MalformedResponse(format!("{method} response has no result")).into()
        })
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: AccountInfo,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    owner: String,
    data: AccountData,
    space: Option<u64>,
}

impl AccountInfo {
    fn data_len(&self) -> u64 {
        self.space.unwrap_or(match &self.data {
            AccountData::Parsed(parsed) => parsed.space,
            AccountData::Binary(parts) => parts.first().map_or(0, |raw| raw.len() as u64),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AccountData {
    Parsed(ParsedAccountData),
    Binary(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct ParsedAccountData {
    parsed: ParsedToken,
    #[serde(default)]
    space: u64,
}

#[derive(Debug, Deserialize)]
struct ParsedToken {
    info: TokenInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenInfo {
    token_amount: TokenAmount,
    owner: String,
}

#[derive(Debug, Deserialize)]
struct TokenAmount {
    // Raw amount as a decimal string, it may exceed what JSON numbers hold exactly
    amount: String,
}

#[async_trait]
impl LedgerProvider for SolanaRpcProvider {
    #[instrument(name = "GetNativeBalance", skip(self), fields(identity = %identity))]
    async fn get_native_balance(&self, identity: &WalletId) -> Result<u64> {
        let balance: WithContext<u64> = self
            .call(
                "getBalance",
                json!([identity.as_str(), { "commitment": COMMITMENT }]),
            )
            .await?;
        Ok(balance.value)
    }

    #[instrument(name = "GetTokenAccount", skip(self), fields(identity = %identity, mint = %mint))]
    async fn get_token_account(
        &self,
        identity: &WalletId,
        mint: &str,
    ) -> Result<Option<TokenAccount>> {
        let accounts: WithContext<Vec<KeyedAccount>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    identity.as_str(),
                    { "mint": mint },
                    { "encoding": "jsonParsed", "commitment": COMMITMENT }
                ]),
            )
            .await?;

        Ok(accounts.value.into_iter().next().map(|keyed| TokenAccount {
            data_len: keyed.account.data_len(),
            address: keyed.pubkey,
            program_owner: keyed.account.owner,
        }))
    }

    #[instrument(name = "GetTokenAccountData", skip(self), fields(account = %account))]
    async fn get_token_account_data(&self, account: &str) -> Result<TokenAccountData> {
        let info: WithContext<Option<AccountInfo>> = self
            .call(
                "getAccountInfo",
                json!([account, { "encoding": "jsonParsed", "commitment": COMMITMENT }]),
            )
            .await?;

        let info = info
            .value
            .ok_or_else(|| FetchError::AccountNotFound(account.to_string()))?;
        let AccountData::Parsed(parsed) = info.data else {
            return Err(FetchError::MalformedResponse(format!(
                "account {account} is not a parsed token account"
            ))
            .into());
        };

        let token = parsed.parsed.info;
        let amount = token.token_amount.amount.parse::<u64>().map_err(|e| {
            FetchError::MalformedResponse(format!(
                "invalid token amount '{}' for {}: {}",
                token.token_amount.amount, account, e
            ))
        })?;
        Ok(TokenAccountData {
            amount,
            owner: token.owner,
        })
    }
}
