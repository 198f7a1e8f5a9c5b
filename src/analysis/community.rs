//! 社区oracle协作方
//!
//! 社区投票/举报服务作为不透明 RPC 消费：输入address，
//! 输出 safe/unsafe 布尔值加可选的举报详情。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::core::domain::CommunityReport;
use crate::core::errors::{Result, RiskError};

/// 社区flag检查的抽象接口
#[async_trait]
pub trait CommunityOracle: Send + Sync {
    /// 查询address是否被社区flag为不安全
    async fn check_address(&self, address: &str) -> Result<CommunityReport>;
}

/// 社区服务的 HTTP 客户端实现
pub struct HttpCommunityOracle {
    client: Client,
    base_url: String,
}

/// 服务端返回 Ok/Err union
#[derive(Debug, Deserialize)]
enum CommunityResponse {
    Ok(CommunityReport),
    Err(String),
}

impl HttpCommunityOracle {
    /// 创建新的社区oracle客户端
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl CommunityOracle for HttpCommunityOracle {
    async fn check_address(&self, address: &str) -> Result<CommunityReport> {
        let url = format!("{}/analyze_address", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "address": address }))
            .send()
            .await
            .map_err(|e| RiskError::data_source("community", e))?;

        if !response.status().is_success() {
            return Err(RiskError::data_source("community", format!("HTTP {}", response.status())));
        }

        let result: CommunityResponse = response
            .json()
            .await
            .map_err(|e| RiskError::data_source("community", format!("bad JSON: {}", e)))?;

        match result {
            CommunityResponse::Ok(report) => Ok(report),
            CommunityResponse::Err(message) => Err(RiskError::data_source(
                "community",
                format!("analysis failed for {}: {}", address, message),
            )),
        }
    }
}
