//! 数值序列统计 helpers
//!
//! 约定：空序列产出全零统计（而不是 NaN），median 用标准的
//! 奇/偶中点规则；区间统计只在去重 + 排序后的区块号上计算。

use std::collections::HashMap;

/// 派生比率特征的分母保护项
pub const EPSILON: f64 = 1e-8;

/// 特征名 → 数值的工作集；最终顺序由 layout 决定
pub type FeatureMap = HashMap<String, f64>;

/// 单序列统计量
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SeriesStats {
    pub total: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

/// 计算序列统计；空序列返回全零
pub fn series_stats(values: &[f64]) -> SeriesStats {
    if values.is_empty() {
        return SeriesStats::default();
    }

    let total: f64 = values.iter().sum();
    let mean = total / values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    SeriesStats { total, min, max, mean, median }
}

/// 把一个序列的统计量写入特征集
///
/// `include_total` 为 false 时只写 min/max/mean/median，
/// 由调用方另行决定 `_total` 的语义（例如 ETH 的对端address数）。
pub fn add_stats(features: &mut FeatureMap, prefix: &str, values: &[f64], include_total: bool) {
    let stats = series_stats(values);
    if include_total {
        features.insert(format!("{}_total", prefix), stats.total);
    }
    features.insert(format!("{}_min", prefix), stats.min);
    features.insert(format!("{}_max", prefix), stats.max);
    features.insert(format!("{}_mean", prefix), stats.mean);
    features.insert(format!("{}_median", prefix), stats.median);
}

/// 去重 + 排序后的相邻区块间隔
///
/// 唯一区块数 ≤ 1 时返回空集（统计随之全零）。
pub fn block_intervals(blocks: &[u64]) -> Vec<f64> {
    let mut unique: Vec<u64> = blocks.to_vec();
    unique.sort_unstable();
    unique.dedup();

    if unique.len() <= 1 {
        return Vec::new();
    }

    unique.windows(2).map(|pair| (pair[1] - pair[0]) as f64).collect()
}

/// 区间统计量写入特征集（总是带 `_total`）
pub fn add_interval_stats(features: &mut FeatureMap, prefix: &str, blocks: &[u64]) {
    let intervals = block_intervals(blocks);
    add_stats(features, prefix, &intervals, true);
}
