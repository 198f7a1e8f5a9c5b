//! 风险分析pipeline配置
//!
//! 所有外部端点与 API 密钥集中在这里，测试时可替换为 mock 服务器 URL。
//! 密钥从环境变量读取，绝不写入日志或error信息。

use serde::{Deserialize, Serialize};

/// 链indexer配置（Etherscan / mempool.space）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Etherscan 风格 API 根（`?module=account&action=...`）
    pub etherscan_api_url: String,
    /// Etherscan API key（ETHERSCAN_API_KEY）
    pub etherscan_api_key: String,
    /// mempool.space 风格 API 根（`/api/address/{addr}/txs`）
    pub mempool_api_url: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            etherscan_api_url: "https://api.etherscan.io/api".to_string(),
            etherscan_api_key: String::new(),
            mempool_api_url: "https://mempool.space".to_string(),
        }
    }
}

/// 历史价格源配置（tier瀑布的三个远端）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceApiConfig {
    /// CryptoCompare pricehistorical 端点（Tier 1/2 + ETH/BTC）
    pub cryptocompare_api_url: String,
    pub cryptocompare_api_key: String,
    /// DeFiLlama 历史价格根（Tier 3）
    pub defillama_api_url: String,
    /// Moralis ERC-20 元数据端点
    pub moralis_metadata_url: String,
    /// Moralis ERC-20 价格根（Tier 4）
    pub moralis_price_url: String,
    pub moralis_api_key: String,
}

impl Default for PriceApiConfig {
    fn default() -> Self {
        Self {
            cryptocompare_api_url: "https://min-api.cryptocompare.com/data/pricehistorical"
                .to_string(),
            cryptocompare_api_key: String::new(),
            defillama_api_url: "https://coins.llama.fi/prices/historical".to_string(),
            moralis_metadata_url: "https://deep-index.moralis.io/api/v2.2/erc20/metadata"
                .to_string(),
            moralis_price_url: "https://deep-index.moralis.io/api/v2.2/erc20".to_string(),
            moralis_api_key: String::new(),
        }
    }
}

/// 外部协作服务配置（模型、社区oracle、历史持久化）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    /// 评分模型服务根 URL
    pub model_api_url: String,
    /// 社区oracle服务根 URL
    pub community_api_url: String,
    /// 历史持久化服务根 URL
    pub history_api_url: String,
}

/// 风险分析配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub indexer: IndexerConfig,
    pub price: PriceApiConfig,
    pub services: ServiceConfig,

    /// 每个address最多分析的transaction数
    #[serde(default = "RiskConfig::default_max_transactions")]
    pub max_transactions: usize,
}

impl RiskConfig {
    fn default_max_transactions() -> usize {
        100
    }

    /// 从环境变量构建配置，缺省使用生产端点
    ///
    /// 非密钥字段（端点 URL）可通过 `RISK_*_URL` 覆盖，方便集成测试。
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("ETHERSCAN_API_KEY") {
            config.indexer.etherscan_api_key = key;
        }
        if let Ok(key) = std::env::var("CRYPTOCOMPARE_API_KEY") {
            config.price.cryptocompare_api_key = key;
        }
        if let Ok(key) = std::env::var("MORALIS_API_KEY") {
            config.price.moralis_api_key = key;
        }
        if let Ok(url) = std::env::var("RISK_MODEL_URL") {
            config.services.model_api_url = url;
        }
        if let Ok(url) = std::env::var("RISK_COMMUNITY_URL") {
            config.services.community_api_url = url;
        }
        if let Ok(url) = std::env::var("RISK_HISTORY_URL") {
            config.services.history_api_url = url;
        }

        config
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            indexer: IndexerConfig::default(),
            price: PriceApiConfig::default(),
            services: ServiceConfig::default(),
            max_transactions: Self::default_max_transactions(),
        }
    }
}
