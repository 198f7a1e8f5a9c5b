//! 评分模型协作方
//!
//! 远端模型按链暴露两个端点：Bitcoin 端点收纯数值向量，
//! Ethereum 端点收 (名, 值) 对——布局契约见 `features::layout`。
//! 返回 Ok/Err union，Ok 载荷至少包含勒索概率、置信度、
//! 分析的transaction数与链类型。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::core::domain::{ChainType, ModelScore};
use crate::core::errors::{Result, RiskError};
use crate::features::FeatureVector;

/// 评分模型的抽象接口
#[async_trait]
pub trait ScoringModel: Send + Sync {
    /// 对特征向量评分
    async fn score(
        &self,
        features: &FeatureVector,
        address: &str,
        transaction_count: u32,
    ) -> Result<ModelScore>;
}

/// 模型服务的 HTTP 客户端实现
pub struct HttpScoringModel {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
enum ModelResponse {
    Ok(ModelScore),
    Err(String),
}

impl HttpScoringModel {
    /// 创建新的模型客户端
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl ScoringModel for HttpScoringModel {
    async fn score(
        &self,
        features: &FeatureVector,
        address: &str,
        transaction_count: u32,
    ) -> Result<ModelScore> {
        let (endpoint, body) = match features.chain() {
            ChainType::Bitcoin => (
                "analyze_btc_address",
                json!({
                    "features": features.values(),
                    "address": address,
                    "feature_count": features.len(),
                }),
            ),
            ChainType::Ethereum => (
                "analyze_eth_address",
                json!({
                    "features": features.pairs(),
                    "address": address,
                    "transaction_count": transaction_count,
                }),
            ),
        };

        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RiskError::data_source("model", e))?;

        if !response.status().is_success() {
            return Err(RiskError::data_source("model", format!("HTTP {}", response.status())));
        }

        let result: ModelResponse = response
            .json()
            .await
            .map_err(|e| RiskError::data_source("model", format!("bad JSON: {}", e)))?;

        match result {
            ModelResponse::Ok(score) => Ok(score),
            ModelResponse::Err(message) => Err(RiskError::data_source(
                "model",
                format!("{} scoring failed for {}: {}", features.chain(), address, message),
            )),
        }
    }
}
