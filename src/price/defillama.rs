//! DeFiLlama 历史价格源（Tier 3）
//!
//! 按精确时间戳查询代币 USD 价格，调用方再用 Tier 1 的 ETH/USD
//! 比率换算回 ETH。

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;

use crate::core::config::PriceApiConfig;
use crate::core::errors::{Result, RiskError};

#[derive(Debug, Deserialize)]
struct LlamaPriceResponse {
    #[serde(default)]
    coins: HashMap<String, LlamaCoin>,
}

#[derive(Debug, Deserialize)]
struct LlamaCoin {
    price: f64,
}

/// 查询代币在指定时间戳的 USD 价格
///
/// DeFiLlama 用 `ethereum:0x...` 形式标识代币；未收录的代币返回 0.0。
pub async fn usd_price(
    client: &Client,
    config: &PriceApiConfig,
    token_address: &str,
    timestamp: u64,
) -> Result<f64> {
    let coin_id = format!("ethereum:{}", token_address);
    let url = format!("{}/{}/{}", config.defillama_api_url, timestamp, coin_id);

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| RiskError::data_source("defillama", e))?;

    if !response.status().is_success() {
        return Err(RiskError::data_source("defillama", format!("HTTP {}", response.status())));
    }

    let data: LlamaPriceResponse = response
        .json()
        .await
        .map_err(|e| RiskError::data_source("defillama", format!("bad JSON: {}", e)))?;

    Ok(data.coins.get(&coin_id).map(|coin| coin.price).unwrap_or(0.0))
}
