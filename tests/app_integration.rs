use goldwatch::core::asset::Asset;
use serde_json::json;
use std::fs;
use std::time::Duration;
use tracing::info;

const WALLET: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
const MINT: &str = "GoLDppdjB1vDTPSGxyMJFqdnj134yH6Prg9eqsGDiw6A";
const GOLD_ACCOUNT: &str = "3Kz9gBvyMBYkFDgSQxHzGcfTV4YwkhqZAdfWpWfDyzjq";
const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

mod test_utils {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_account() -> serde_json::Value {
        json!({
            "lamports": 2039280,
            "owner": TOKEN_PROGRAM,
            "executable": false,
            "rentEpoch": 0,
            "space": 165,
            "data": {
                "program": "spl-token",
                "space": 165,
                "parsed": {
                    "type": "account",
                    "info": {
                        "mint": MINT,
                        "owner": WALLET,
                        "tokenAmount": {"amount": "2500000", "decimals": 6}
                    }
                }
            }
        })
    }

    async fn mock_rpc(server: &MockServer, rpc_method: &str, result: serde_json::Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": result
            })))
            .mount(server)
            .await;
    }

    /// RPC node holding 1.5 SOL and 2.5 GOLD, optionally without the GOLD account.
    pub async fn create_rpc_mock_server(with_gold: bool) -> MockServer {
        let server = MockServer::start().await;
        mock_rpc(
            &server,
            "getBalance",
            json!({"context": {"slot": 1}, "value": 1_500_000_000u64}),
        )
        .await;

        let accounts = if with_gold {
            json!([{"pubkey": GOLD_ACCOUNT, "account": token_account()}])
        } else {
            json!([])
        };
        mock_rpc(
            &server,
            "getTokenAccountsByOwner",
            json!({"context": {"slot": 1}, "value": accounts}),
        )
        .await;
        mock_rpc(
            &server,
            "getAccountInfo",
            json!({"context": {"slot": 1}, "value": token_account()}),
        )
        .await;
        server
    }

    pub async fn create_price_mock_server(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prices"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "success": true,
                "data": {"prices": [
                    {"symbol": "SOL", "price": 150.0},
                    {"symbol": "GOLD", "price": 2.0}
                ]}
            })))
            .mount(&server)
            .await;
        server
    }

    pub fn write_config(
        file: &tempfile::NamedTempFile,
        rpc: &MockServer,
        prices: &MockServer,
    ) {
        let config_content = format!(
            r#"
            wallet: "{WALLET}"
            providers:
              rpc:
                url: {}
              prices:
                url: {}/api/prices
            gold:
              mint: "{MINT}"
            refresh:
              backoff_ms: 10
        "#,
            rpc.uri(),
            prices.uri()
        );
        fs::write(file.path(), config_content).expect("Failed to write config file");
    }
}

#[test_log::test(tokio::test)]
async fn test_balance_command_with_mock() {
    let rpc = test_utils::create_rpc_mock_server(true).await;
    let prices = test_utils::create_price_mock_server(200).await;
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(&config_file, &rpc, &prices);

    let result = goldwatch::run_command(
        goldwatch::AppCommand::Balance,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Balance command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_missing_config_fails() {
    let result =
        goldwatch::run_command(goldwatch::AppCommand::Balance, Some("/nonexistent.yaml")).await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_scheduler_publishes_balances() {
    let rpc = test_utils::create_rpc_mock_server(true).await;
    let prices = test_utils::create_price_mock_server(200).await;
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(&config_file, &rpc, &prices);

    let config = goldwatch::config::AppConfig::load_from_path(config_file.path()).unwrap();
    let scheduler = goldwatch::build_scheduler(&config).unwrap();
    let mut updates = scheduler.balances().subscribe();

    scheduler.attach(config.wallet.clone());
    let snapshot = tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("No balances-updated within 5s")
        .expect("Channel closed");
    info!(?snapshot, "Received balances");

    assert_eq!(snapshot.get(Asset::Sol).raw, 1_500_000_000);
    assert_eq!(snapshot.get(Asset::Gold).raw, 2_500_000);
    assert!(
        scheduler
            .balances()
            .refresh_state()
            .last_updated_at
            .is_some()
    );

    scheduler.detach();
}

#[test_log::test(tokio::test)]
async fn test_missing_gold_account_and_price_outage() {
    let rpc = test_utils::create_rpc_mock_server(false).await;
    let prices = test_utils::create_price_mock_server(503).await;
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(&config_file, &rpc, &prices);

    let config = goldwatch::config::AppConfig::load_from_path(config_file.path()).unwrap();
    let scheduler = goldwatch::build_scheduler(&config).unwrap();
    let balances = scheduler.balances();

    balances.attach(config.wallet.clone());
    let snapshot = balances
        .refresh_all(&config.wallet)
        .await
        .expect("cycle published");
    let price_snapshot = scheduler.prices().refresh().await;

    assert_eq!(snapshot.get(Asset::Sol).raw, 1_500_000_000);
    assert_eq!(snapshot.get(Asset::Gold).raw, 0);
    assert_eq!(price_snapshot.price(Asset::Sol), 0.0);
    assert!(price_snapshot.fetched_at.is_none());
}
