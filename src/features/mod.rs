//! Feature Engineering Engine
//!
//! 把标准化transaction序列折算成固定顺序的数值特征向量。
//! 顺序契约见 `layout`；统计口径见 `stats`；两条链的提取
//! 逻辑分别在 `bitcoin` / `ethereum`。

pub mod bitcoin;
pub mod ethereum;
pub mod layout;
pub mod stats;

use serde::{Deserialize, Serialize};

use crate::core::domain::{ChainType, NormalizedTransaction};
use crate::price::PriceResolver;
use stats::FeatureMap;

/// 固定顺序的特征向量
///
/// 每次分析请求新建，构造后不可变；只有verdict会被持久化，
/// 向量本身在单次分析调用之外没有生命周期。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    chain: ChainType,
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    /// 按链布局from工作集组装向量
    ///
    /// 这是"未知特征 → 0.0"规则唯一生效的地方：布局中每个名字
    /// 查一次工作集，缺失即取 0.0，可审计、不散落。
    pub fn from_map(chain: ChainType, features: &FeatureMap) -> Self {
        let entries = layout::feature_order(chain)
            .iter()
            .map(|name| (name.to_string(), features.get(*name).copied().unwrap_or(0.0)))
            .collect();
        Self { chain, entries }
    }

    pub fn chain(&self) -> ChainType {
        self.chain
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按名取值
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, value)| *value)
    }

    /// 特征名序列（布局顺序）
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// 数值序列（布局顺序）
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, value)| *value).collect()
    }

    /// (名, 值) 对序列（布局顺序），模型调用的 wire 形式
    pub fn pairs(&self) -> &[(String, f64)] {
        &self.entries
    }

    /// 模型参数用的transaction计数
    ///
    /// Ethereum 模型取 `total_txs` 特征取整；Bitcoin 模型沿用
    /// 向量维度（历史契约如此）。
    pub fn transaction_count(&self) -> u32 {
        match self.chain {
            ChainType::Ethereum => self.get("total_txs").unwrap_or(0.0).round().max(0.0) as u32,
            ChainType::Bitcoin => self.len() as u32,
        }
    }
}

/// 计算某address的特征向量
pub async fn compute_features(
    address: &str,
    chain: ChainType,
    transactions: &[NormalizedTransaction],
    resolver: &PriceResolver,
) -> FeatureVector {
    match chain {
        ChainType::Ethereum => ethereum::extract_features(address, transactions, resolver).await,
        ChainType::Bitcoin => bitcoin::extract_features(address, transactions),
    }
}
