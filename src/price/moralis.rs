//! Moralis ERC-20 API 集成
//!
//! 两个用途：代币元数据（symbol/decimals）与 Tier 4 的按日期 USD 价格。
//! 请求需携带 `X-API-Key` 头。

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::core::config::PriceApiConfig;
use crate::core::domain::TokenInfo;
use crate::core::errors::{Result, RiskError};

/// Moralis 元数据响应条目（简化）
#[derive(Debug, Deserialize)]
struct MoralisTokenMetadata {
    symbol: Option<String>,
    decimals: Option<String>,
}

/// Moralis 价格响应（简化）
#[derive(Debug, Deserialize)]
struct MoralisPriceResponse {
    #[serde(default)]
    usd_price: f64,
}

/// 查询代币元数据
///
/// 字段缺失时退回 `UNKNOWN`/18；HTTP 或解析failed返回 Err，
/// 由调用方决定兜底与缓存策略。
pub async fn token_metadata(
    client: &Client,
    config: &PriceApiConfig,
    token_address: &str,
) -> Result<TokenInfo> {
    let response = client
        .get(&config.moralis_metadata_url)
        .query(&[("chain", "eth"), ("addresses", token_address)])
        .header("accept", "application/json")
        .header("X-API-Key", &config.moralis_api_key)
        .send()
        .await
        .map_err(|e| RiskError::data_source("moralis", e))?;

    if !response.status().is_success() {
        return Err(RiskError::data_source("moralis", format!("HTTP {}", response.status())));
    }

    let entries: Vec<MoralisTokenMetadata> = response
        .json()
        .await
        .map_err(|e| RiskError::data_source("moralis", format!("bad JSON: {}", e)))?;

    let info = match entries.into_iter().next() {
        Some(meta) => TokenInfo {
            symbol: meta
                .symbol
                .filter(|s| !s.is_empty())
                .map(|s| s.to_uppercase())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            decimals: meta.decimals.and_then(|d| d.parse().ok()).unwrap_or(18),
        },
        None => TokenInfo::unknown(),
    };

    Ok(info)
}

/// 查询代币截至某日期的 USD 价格（Tier 4）
pub async fn usd_price(
    client: &Client,
    config: &PriceApiConfig,
    token_address: &str,
    timestamp: u64,
) -> Result<f64> {
    let to_date = DateTime::<Utc>::from_timestamp(timestamp as i64, 0)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    let url = format!("{}/{}/price", config.moralis_price_url, token_address);

    let response = client
        .get(&url)
        .query(&[("chain", "eth"), ("to_date", to_date.as_str())])
        .header("accept", "application/json")
        .header("X-API-Key", &config.moralis_api_key)
        .send()
        .await
        .map_err(|e| RiskError::data_source("moralis", e))?;

    if !response.status().is_success() {
        return Err(RiskError::data_source("moralis", format!("HTTP {}", response.status())));
    }

    let data: MoralisPriceResponse = response
        .json()
        .await
        .map_err(|e| RiskError::data_source("moralis", format!("bad JSON: {}", e)))?;

    Ok(data.usd_price)
}
