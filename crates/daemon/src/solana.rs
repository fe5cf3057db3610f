//! Token balance lookups over Solana JSON-RPC.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use common::chain::{ChainError, ChainState};
use common::crypto::WalletPublicKey;

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<RpcResult>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResult {
    value: Vec<KeyedAccount>,
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    account: Account,
}

#[derive(Debug, Deserialize)]
struct Account {
    data: AccountData,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    parsed: ParsedAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedAccount {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    token_amount: TokenAmount,
}

#[derive(Debug, Deserialize)]
struct TokenAmount {
    /// Raw amount as a decimal string
    amount: String,
}

#[derive(Debug, Clone)]
pub struct SolanaRpc {
    client: Client,
    url: Url,
}

impl SolanaRpc {
    pub fn new(url: Url) -> Result<Self, ChainError> {
        let client = Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Unavailable(e.to_string()))?;
        Ok(Self { client, url })
    }
}

/// Sum the raw token amounts of every account in a
/// `getTokenAccountsByOwner` response.
fn total_balance(envelope: RpcEnvelope) -> Result<u64, ChainError> {
    if let Some(error) = envelope.error {
        return Err(ChainError::InvalidResponse(format!(
            "rpc error {}: {}",
            error.code, error.message
        )));
    }
    let result = envelope
        .result
        .ok_or_else(|| ChainError::InvalidResponse("missing result".into()))?;

    result.value.iter().try_fold(0u64, |total, keyed| {
        let amount = &keyed.account.data.parsed.info.token_amount.amount;
        let amount: u64 = amount
            .parse()
            .map_err(|_| ChainError::InvalidResponse(format!("bad token amount {:?}", amount)))?;
        Ok(total.saturating_add(amount))
    })
}

#[async_trait]
impl ChainState for SolanaRpc {
    async fn token_balance(
        &self,
        account: &WalletPublicKey,
        mint: &str,
    ) -> Result<u64, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTokenAccountsByOwner",
            "params": [
                account.to_base58(),
                { "mint": mint },
                { "encoding": "jsonParsed" }
            ]
        });

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Unavailable(format!("rpc returned {}", status)));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
        let balance = total_balance(envelope)?;
        tracing::debug!(%account, mint, balance, "token balance");
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(amount: &str) -> serde_json::Value {
        json!({
            "pubkey": "C2gJg6tKpQs41PRS1nC8aw3ZKNZK3HQQZGVrDFDup5nx",
            "account": {
                "data": {
                    "parsed": {
                        "info": {
                            "mint": "3wyAj7Rt1TWVPZVteFJPLa26JmLvdb1CAKEFZm3NY75E",
                            "tokenAmount": {
                                "amount": amount,
                                "decimals": 0,
                                "uiAmount": 1.0
                            }
                        },
                        "type": "account"
                    },
                    "program": "spl-token"
                },
                "lamports": 2039280
            }
        })
    }

    fn envelope(value: serde_json::Value) -> RpcEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_sums_accounts() {
        let env = envelope(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "context": { "slot": 1 },
                "value": [account("1"), account("0"), account("4")]
            }
        }));
        assert_eq!(total_balance(env).unwrap(), 5);
    }

    #[test]
    fn test_no_accounts_is_zero() {
        let env = envelope(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "context": { "slot": 1 }, "value": [] }
        }));
        assert_eq!(total_balance(env).unwrap(), 0);
    }

    #[test]
    fn test_rpc_error_surfaces() {
        let env = envelope(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "Invalid param: WrongSize" }
        }));
        assert!(matches!(
            total_balance(env),
            Err(ChainError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_non_numeric_amount() {
        let env = envelope(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "context": { "slot": 1 }, "value": [account("lots")] }
        }));
        assert!(total_balance(env).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let rpc = SolanaRpc::new(Url::parse("http://127.0.0.1:1/").unwrap()).unwrap();
        let wallet = common::testkit::TestWallet::generate();
        let err = rpc.token_balance(&wallet.public(), "mint").await.unwrap_err();
        assert!(matches!(err, ChainError::Unavailable(_)));
    }
}
