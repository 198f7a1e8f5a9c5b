//! Transaction Normalizer
//!
//! from链indexer拉取原始transaction历史，折算成链无关的
//! `NormalizedTransaction` 记录序列：
//!
//! - 按时间/区块升序
//! - 硬上限 100 条（截断时保留最近的记录）
//! - 哈希不重复
//!
//! "查无历史"不是error（返回空序列）；network/APIfailed以
//! `DataSourceError` 向上传播，分页中途failed使整个操作failed，
//! 不会悄悄返回部分结果。

pub mod bitcoin;
pub mod ethereum;

use reqwest::Client;
use tracing::info;

use crate::core::config::RiskConfig;
use crate::core::domain::{ChainType, NormalizedTransaction};
use crate::core::errors::Result;

/// 拉取并标准化某address在指定链上的transaction历史
pub async fn fetch_transactions(
    client: &Client,
    config: &RiskConfig,
    address: &str,
    chain: ChainType,
) -> Result<Vec<NormalizedTransaction>> {
    let records = match chain {
        ChainType::Ethereum => ethereum::fetch_transactions(client, config, address).await?,
        ChainType::Bitcoin => bitcoin::fetch_transactions(client, config, address).await?,
    };

    info!("Normalized {} transactions for {} address {}", records.len(), chain, address);
    Ok(records)
}
