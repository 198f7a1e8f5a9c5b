//! 价格解析子系统
//!
//! 把任意 ERC-20 代币在某时间点的价值换算为 pipeline 基准单位（ETH），
//! 通过分层瀑布依次尝试外部价格源：
//!
//! - Tier 0：wrapped 原生币（WETH）恒等于 1.0，无远程调用
//! - Tier 1：稳定币白名单，走 ETH/USD 月度反比
//! - Tier 2：CryptoCompare SYMBOL→ETH 直查
//! - Tier 3：DeFiLlama USD 价 × Tier 1 换算
//! - Tier 4：Moralis USD 价 × Tier 1 换算
//!
//! 命中第一个 `> 0` 的tier即停；全部failed返回 0.0（软failed，调用方
//! 必须把 0 理解为"无法定价"而不是真实零价值）。
//!
//! 所有价格按 UTC 日历月分桶缓存，同月同代币的重复调用不再触网。

pub mod cache;
pub mod cryptocompare;
pub mod defillama;
pub mod moralis;

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use tracing::{debug, warn};

use crate::core::config::PriceApiConfig;
use crate::core::domain::TokenInfo;
use cache::{RatioCache, TokenInfoCache};

/// 稳定币白名单（Tier 1 路径）
const STABLECOIN_SYMBOLS: [&str; 3] = ["USDT", "USDC", "DAI"];

/// wrapped 原生币 symbol（Tier 0 路径）
const WRAPPED_NATIVE_SYMBOL: &str = "WETH";

/// 知名合约的硬编码元数据表，省去一次远程查询
static KNOWN_TOKENS: Lazy<HashMap<&'static str, TokenInfo>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        "0xdac17f958d2ee523a2206206994597c13d831ec7",
        TokenInfo { symbol: "USDT".to_string(), decimals: 6 },
    );
    table.insert(
        "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
        TokenInfo { symbol: "USDC".to_string(), decimals: 6 },
    );
    table.insert(
        "0x6b175474e89094c44da98b954eedeac495271d0f",
        TokenInfo { symbol: "DAI".to_string(), decimals: 18 },
    );
    table.insert(
        "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
        TokenInfo { symbol: "WETH".to_string(), decimals: 18 },
    );
    table.insert(
        "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599",
        TokenInfo { symbol: "WBTC".to_string(), decimals: 8 },
    );
    table
});

/// 时间戳所在 UTC 日历月的 key（`YYYY-MM-01`）
pub fn month_key(timestamp: u64) -> String {
    let dt = DateTime::<Utc>::from_timestamp(timestamp as i64, 0).unwrap_or(DateTime::UNIX_EPOCH);
    format!("{:04}-{:02}-01", dt.year(), dt.month())
}

/// 时间戳所在 UTC 日历月一日零点的 unix 秒
pub fn month_timestamp(timestamp: u64) -> u64 {
    let dt = DateTime::<Utc>::from_timestamp(timestamp as i64, 0).unwrap_or(DateTime::UNIX_EPOCH);
    Utc.with_ymd_and_hms(dt.year(), dt.month(), 1, 0, 0, 0)
        .single()
        .map(|d| d.timestamp().max(0) as u64)
        .unwrap_or(0)
}

/// 价格解析器
///
/// 持有两个显式缓存（月度比率、代币元数据）与自己的 HTTP 客户端。
/// 并发分析共享同一实例即可获得缓存收益。
pub struct PriceResolver {
    http: Client,
    config: PriceApiConfig,
    /// 代币比率缓存：`SYMBOL_YYYY-MM-01_0xaddr -> ratio`
    ratio_cache: RatioCache,
    /// 基准比率缓存：`ETH_USD_YYYY-MM-01` / `ETH_BTC_YYYY-MM-01`
    base_cache: RatioCache,
    token_info_cache: TokenInfoCache,
}

impl PriceResolver {
    /// 创建新的价格解析器
    pub fn new(config: PriceApiConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            config,
            ratio_cache: RatioCache::new(),
            base_cache: RatioCache::new(),
            token_info_cache: TokenInfoCache::new(),
        }
    }

    /// 解析代币元数据（symbol + decimals）
    ///
    /// 顺序：进程内缓存 → 知名合约表 → Moralis 元数据 API。
    /// 远程failed时兜底 `UNKNOWN`/18 并同样写入缓存，避免反复重查。
    pub async fn token_info(&self, token_address: &str) -> TokenInfo {
        let lower = token_address.to_lowercase();

        if let Some(info) = self.token_info_cache.get(&lower) {
            return info;
        }

        if let Some(info) = KNOWN_TOKENS.get(lower.as_str()) {
            self.token_info_cache.insert(lower, info.clone());
            return info.clone();
        }

        let info = match moralis::token_metadata(&self.http, &self.config, &lower).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Token metadata lookup failed for {}: {}", lower, e);
                TokenInfo::unknown()
            }
        };

        self.token_info_cache.insert(lower, info.clone());
        info
    }

    /// 解析代币 → ETH 的换算比率（月度分桶）
    ///
    /// 返回 0.0 表示所有tier都无法定价；这是软降级，不是error。
    pub async fn resolve_ratio(&self, token_address: &str, timestamp: u64) -> f64 {
        let lower = token_address.to_lowercase();
        let info = self.token_info(&lower).await;

        // Tier 0: wrapped 原生币恒等
        if info.symbol == WRAPPED_NATIVE_SYMBOL {
            return 1.0;
        }

        let cache_key = format!("{}_{}_{}", info.symbol, month_key(timestamp), lower);
        if let Some(ratio) = self.ratio_cache.get(&cache_key) {
            return ratio;
        }

        let ratio = if STABLECOIN_SYMBOLS.contains(&info.symbol.as_str()) {
            // Tier 1: 稳定币 ≈ 1 USD，取 ETH/USD 月度反比
            self.eth_per_usd(timestamp).await
        } else {
            self.token_ratio_from_apis(&info.symbol, &lower, timestamp).await
        };

        if ratio > 0.0 {
            self.ratio_cache.insert(cache_key, ratio);
        } else {
            warn!("All price tiers failed for {} ({}), treating value as unpriceable", info.symbol, lower);
        }

        ratio
    }

    /// Tier 2 → 3 → 4 依次尝试，命中第一个正值即返回
    async fn token_ratio_from_apis(&self, symbol: &str, token_address: &str, timestamp: u64) -> f64 {
        // Tier 2: SYMBOL → ETH 直查（UNKNOWN symbol 跳过）
        if symbol != "UNKNOWN" {
            match cryptocompare::price_historical(
                &self.http,
                &self.config,
                symbol,
                "ETH",
                month_timestamp(timestamp),
            )
            .await
            {
                Ok(price) if price > 0.0 => return price,
                Ok(_) => debug!("cryptocompare has no {} price in ETH, falling through", symbol),
                Err(e) => debug!("cryptocompare tier failed for {}: {}", symbol, e),
            }
        }

        // Tier 3: DeFiLlama USD 锚定
        match defillama::usd_price(&self.http, &self.config, token_address, timestamp).await {
            Ok(usd) if usd > 0.0 => {
                let per_usd = self.eth_per_usd(timestamp).await;
                if per_usd > 0.0 {
                    return usd * per_usd;
                }
            }
            Ok(_) => debug!("defillama has no price for {}, falling through", token_address),
            Err(e) => debug!("defillama tier failed for {}: {}", token_address, e),
        }

        // Tier 4: Moralis USD 锚定
        match moralis::usd_price(&self.http, &self.config, token_address, timestamp).await {
            Ok(usd) if usd > 0.0 => {
                let per_usd = self.eth_per_usd(timestamp).await;
                if per_usd > 0.0 {
                    return usd * per_usd;
                }
            }
            Ok(_) => debug!("moralis has no price for {}", token_address),
            Err(e) => debug!("moralis tier failed for {}: {}", token_address, e),
        }

        0.0
    }

    /// ETH-per-USD 月度比率（Tier 1 与 USD 锚定tier共用）
    ///
    /// 缓存的是 ETH/USD 报价本身；返回其倒数。failed返回 0.0 且不缓存。
    async fn eth_per_usd(&self, timestamp: u64) -> f64 {
        let key = format!("ETH_USD_{}", month_key(timestamp));

        if let Some(usd) = self.base_cache.get(&key) {
            return if usd > 0.0 { 1.0 / usd } else { 0.0 };
        }

        match cryptocompare::price_historical(
            &self.http,
            &self.config,
            "ETH",
            "USD",
            month_timestamp(timestamp),
        )
        .await
        {
            Ok(usd) if usd > 0.0 => {
                self.base_cache.insert(key, usd);
                1.0 / usd
            }
            Ok(_) => 0.0,
            Err(e) => {
                warn!("Could not fetch ETH/USD price ({}), USD-anchored conversion will fail", e);
                0.0
            }
        }
    }

    /// ETH → BTC 月度换算比率
    ///
    /// 特征工程把两条链统一到 BTC 计价时使用。远程failed时退回
    /// 按年份的历史均值常数（不缓存，下次调用仍会尝试远端）。
    pub async fn eth_btc_ratio(&self, timestamp: u64) -> f64 {
        let key = format!("ETH_BTC_{}", month_key(timestamp));

        if let Some(ratio) = self.base_cache.get(&key) {
            return ratio;
        }

        match cryptocompare::price_historical(
            &self.http,
            &self.config,
            "ETH",
            "BTC",
            month_timestamp(timestamp),
        )
        .await
        {
            Ok(price) if price > 0.0 => {
                self.base_cache.insert(key, price);
                return price;
            }
            Ok(_) => {}
            Err(e) => debug!("cryptocompare ETH/BTC lookup failed: {}", e),
        }

        let year = DateTime::<Utc>::from_timestamp(timestamp as i64, 0)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .year();
        let fallback = if year <= 2016 {
            0.02
        } else if year <= 2017 {
            0.05
        } else if year <= 2018 {
            0.08
        } else if year <= 2020 {
            0.04
        } else {
            0.067
        };
        warn!("Could not fetch ETH/BTC price, using fallback ratio: {}", fallback);
        fallback
    }

    /// 比率缓存条目数（测试用）
    pub fn cached_ratio_count(&self) -> usize {
        self.ratio_cache.len() + self.base_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_key_truncates_to_first_day() {
        // 2023-05-17 12:34:56 UTC
        assert_eq!(month_key(1_684_326_896), "2023-05-01");
        // 月初边界
        assert_eq!(month_key(1_682_899_200), "2023-05-01");
    }

    #[test]
    fn test_month_timestamp_is_start_of_month() {
        // 2023-05-17 → 2023-05-01 00:00:00 UTC = 1682899200
        assert_eq!(month_timestamp(1_684_326_896), 1_682_899_200);
        // 幂等：月初时间戳映射到自身
        assert_eq!(month_timestamp(1_682_899_200), 1_682_899_200);
    }

    #[test]
    fn test_known_token_table_covers_stablecoins() {
        let usdt = KNOWN_TOKENS.get("0xdac17f958d2ee523a2206206994597c13d831ec7").unwrap();
        assert_eq!(usdt.symbol, "USDT");
        assert_eq!(usdt.decimals, 6);
        let weth = KNOWN_TOKENS.get("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2").unwrap();
        assert_eq!(weth.symbol, "WETH");
    }

    #[tokio::test]
    async fn test_wrapped_native_resolves_without_network() {
        // 配置指向不存在的端点：WETH 不应触发任何远程调用
        let config = PriceApiConfig {
            cryptocompare_api_url: "http://127.0.0.1:1/unreachable".to_string(),
            defillama_api_url: "http://127.0.0.1:1/unreachable".to_string(),
            moralis_metadata_url: "http://127.0.0.1:1/unreachable".to_string(),
            moralis_price_url: "http://127.0.0.1:1/unreachable".to_string(),
            ..PriceApiConfig::default()
        };
        let resolver = PriceResolver::new(config);
        let ratio = resolver
            .resolve_ratio("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", 1_684_326_896)
            .await;
        assert_eq!(ratio, 1.0);
    }
}
