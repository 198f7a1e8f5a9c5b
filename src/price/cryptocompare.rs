//! CryptoCompare 历史价格源
//!
//! tier瀑布的 Tier 1/2 远端，同时提供 ETH/BTC 月度换算比率。
//! 返回的 JSON 形如 `{"ETH": {"USD": 1850.0}}`，键随请求币种变化，
//! 因此用动态 Value 解析。

use reqwest::Client;
use serde_json::Value;

use crate::core::config::PriceApiConfig;
use crate::core::errors::{Result, RiskError};

/// 查询 `fsym -> tsym` 在指定时间戳的历史价格
///
/// 价格缺失（响应中没有对应键）返回 0.0，由调用方决定是否降级到下一tier。
pub async fn price_historical(
    client: &Client,
    config: &PriceApiConfig,
    fsym: &str,
    tsym: &str,
    timestamp: u64,
) -> Result<f64> {
    let ts = timestamp.to_string();
    let response = client
        .get(&config.cryptocompare_api_url)
        .query(&[
            ("fsym", fsym),
            ("tsyms", tsym),
            ("ts", ts.as_str()),
            ("api_key", config.cryptocompare_api_key.as_str()),
        ])
        .send()
        .await
        // without_url: api_key 在查询串里，error信息不能携带完整 URL
        .map_err(|e| RiskError::data_source("cryptocompare", e.without_url()))?;

    if !response.status().is_success() {
        return Err(RiskError::data_source(
            "cryptocompare",
            format!("HTTP {}", response.status()),
        ));
    }

    let data: Value = response
        .json()
        .await
        .map_err(|e| RiskError::data_source("cryptocompare", format!("bad JSON: {}", e.without_url())))?;

    let price = data
        .get(fsym)
        .and_then(|v| v.get(tsym))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    Ok(price)
}
