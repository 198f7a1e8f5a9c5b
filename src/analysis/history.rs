//! 历史持久化协作方
//!
//! Orchestrator 视角下 fire-and-forget：写failed记日志后丢弃，
//! 绝不改变已经返回给调用方的verdict。

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::domain::{AnalysisVerdict, VerdictSource};
use crate::core::errors::{Result, RiskError};

/// 历史记录的判定方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyzedType {
    CommunityVote,
    AIAnalysis,
}

/// 交给持久化服务的verdict记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeHistoryEntry {
    pub address: String,
    pub is_safe: bool,
    pub analyzed_type: AnalyzedType,
    /// 链名称；社区路径提前终止时可能是 "Unknown"
    pub token_type: String,
    /// unix 秒
    pub created_at: u64,
    /// verdict摘要（JSON 字符串）
    pub metadata: String,
}

impl AnalyzeHistoryEntry {
    /// fromverdict构造历史记录
    pub fn from_verdict(verdict: &AnalysisVerdict) -> Self {
        let analyzed_type = match verdict.source {
            VerdictSource::Community => AnalyzedType::CommunityVote,
            VerdictSource::Model | VerdictSource::CommunityAndModel => AnalyzedType::AIAnalysis,
        };

        let metadata = serde_json::json!({
            "confidence": verdict.confidence,
            "risk_level": verdict.risk_level,
            "source": verdict.source,
        })
        .to_string();

        Self {
            address: verdict.address.clone(),
            is_safe: verdict.is_safe,
            analyzed_type,
            token_type: verdict
                .chain
                .map(|chain| chain.as_str().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            created_at: Utc::now().timestamp().max(0) as u64,
            metadata,
        }
    }
}

/// 历史持久化的抽象接口
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// 写入一条分析历史
    async fn record(&self, entry: AnalyzeHistoryEntry) -> Result<()>;
}

/// 历史服务的 HTTP 客户端实现
pub struct HttpHistorySink {
    client: Client,
    base_url: String,
}

impl HttpHistorySink {
    /// 创建新的历史客户端
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl HistorySink for HttpHistorySink {
    async fn record(&self, entry: AnalyzeHistoryEntry) -> Result<()> {
        let url = format!("{}/create_analyze_history", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&entry)
            .send()
            .await
            .map_err(|e| RiskError::data_source("history", e))?;

        if !response.status().is_success() {
            return Err(RiskError::data_source("history", format!("HTTP {}", response.status())));
        }

        Ok(())
    }
}
