//! Risk Analysis Orchestrator
//!
//! 两阶段判定状态机（社区优先）：
//!
//! ```text
//! Start ─→ CommunityCheck ─ unsafe ─→ Unsafe(by community) ─→ Persisted
//!              │ safe
//!              ▼
//!          ModelScore ─ model unsafe ─→ Unsafe(by model) ─→ Persisted
//!              │ model safe
//!              ▼
//!          Safe(by both) ─→ Persisted
//! ```
//!
//! fusion规则是确定性的：社区 unsafe 立即终止（来源 community）；
//! 社区 safe 才进入模型评分，safe/unsafe 分别给出
//! community_and_model / model 来源。"社区 unsafe + 模型任意"
//! 在模型阶段from结构上不存在——社区分支已提前返回。

pub mod community;
pub mod history;
pub mod model;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use crate::core::config::RiskConfig;
use crate::core::domain::{AnalysisVerdict, ChainType, RiskLevel, VerdictSource};
use crate::core::errors::Result;
use crate::core::validation::{detect_chain, validate_target_address};
use crate::features::{self, FeatureVector};
use crate::normalizer;
use crate::price::PriceResolver;

pub use community::{CommunityOracle, HttpCommunityOracle};
pub use history::{AnalyzeHistoryEntry, AnalyzedType, HistorySink, HttpHistorySink};
pub use model::{HttpScoringModel, ScoringModel};

/// 社区verdict作为最终来源时的置信度（低于模型路径）
const COMMUNITY_CONFIDENCE: u8 = 75;

/// 风险分析入口
///
/// 并发请求各自独立运行 pipeline；共享的只有 `PriceResolver`
/// 内部的两个缓存。
pub struct RiskAnalyzer {
    config: RiskConfig,
    http: Client,
    resolver: Arc<PriceResolver>,
    community: Arc<dyn CommunityOracle>,
    model: Arc<dyn ScoringModel>,
    history: Arc<dyn HistorySink>,
}

impl RiskAnalyzer {
    /// 用 HTTP 协作方构建（生产路径）
    pub fn new(config: RiskConfig) -> Self {
        let community = Arc::new(HttpCommunityOracle::new(config.services.community_api_url.clone()));
        let model = Arc::new(HttpScoringModel::new(config.services.model_api_url.clone()));
        let history = Arc::new(HttpHistorySink::new(config.services.history_api_url.clone()));
        let resolver = Arc::new(PriceResolver::new(config.price.clone()));

        Self::with_collaborators(config, resolver, community, model, history)
    }

    /// 注入协作方构建（测试与复用路径）
    pub fn with_collaborators(
        config: RiskConfig,
        resolver: Arc<PriceResolver>,
        community: Arc<dyn CommunityOracle>,
        model: Arc<dyn ScoringModel>,
        history: Arc<dyn HistorySink>,
    ) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { config, http, resolver, community, model, history }
    }

    /// 价格解析器（低层复用入口）
    pub fn price_resolver(&self) -> &PriceResolver {
        &self.resolver
    }

    /// 分析一个address，产出最终verdict
    pub async fn analyze_address(&self, address: &str) -> Result<AnalysisVerdict> {
        // State: Start —— 输入校验
        let address = validate_target_address(address)?;
        info!("Starting risk analysis for address: {}", address);

        // State: CommunityCheck
        let community_report = self.community.check_address(&address).await?;

        if !community_report.is_safe {
            info!("Community flagged {} as unsafe, stopping analysis", address);
            let verdict = AnalysisVerdict {
                address: address.clone(),
                chain: detect_chain(&address).ok(),
                is_safe: false,
                confidence: COMMUNITY_CONFIDENCE,
                risk_level: RiskLevel::High,
                source: VerdictSource::Community,
                raw_model_result: None,
                raw_community_result: Some(community_report),
            };
            self.persist(&verdict).await;
            return Ok(verdict);
        }

        // State: ModelScore —— 链检测failed是终态error
        let chain = detect_chain(&address)?;
        let features = self.extract_features(&address, chain).await?;
        let score = self
            .model
            .score(&features, &address, features.transaction_count())
            .await?;

        // Fusion："社区 unsafe"分支已在上面返回，这里只剩社区 safe 的两种组合
        let confidence = (score.confidence * 100.0).round().clamp(0.0, 100.0) as u8;
        let verdict = if score.is_ransomware {
            AnalysisVerdict {
                address: address.clone(),
                chain: Some(chain),
                is_safe: false,
                confidence,
                risk_level: AnalysisVerdict::risk_level_from_probability(
                    score.ransomware_probability,
                ),
                source: VerdictSource::Model,
                raw_model_result: Some(score),
                raw_community_result: Some(community_report),
            }
        } else {
            AnalysisVerdict {
                address: address.clone(),
                chain: Some(chain),
                is_safe: true,
                confidence,
                risk_level: AnalysisVerdict::risk_level_from_probability(
                    score.ransomware_probability,
                ),
                source: VerdictSource::CommunityAndModel,
                raw_model_result: Some(score),
                raw_community_result: Some(community_report),
            }
        };

        // State: Persisted
        self.persist(&verdict).await;
        Ok(verdict)
    }

    /// 低层入口：拉取历史并计算特征向量
    pub async fn extract_features(&self, address: &str, chain: ChainType) -> Result<FeatureVector> {
        let address = validate_target_address(address)?;
        let transactions =
            normalizer::fetch_transactions(&self.http, &self.config, &address, chain).await?;
        Ok(features::compute_features(&address, chain, &transactions, &self.resolver).await)
    }

    /// fire-and-forget 持久化：failed只记日志，不影响verdict
    async fn persist(&self, verdict: &AnalysisVerdict) {
        let entry = AnalyzeHistoryEntry::from_verdict(verdict);
        if let Err(e) = self.history.record(entry).await {
            warn!("Failed to persist analysis history for {}: {}", verdict.address, e);
        }
    }
}
