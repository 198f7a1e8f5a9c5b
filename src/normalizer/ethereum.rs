//! Ethereum transaction历史标准化（Etherscan API）
//!
//! 合并两条原始流：原生转账（`txlist`）与 ERC-20 转账（`tokentx`）。
//! 同一哈希同时出现在两条流中时，代币记录吸收父原生transaction的
//! gas 信息，父记录本身被去重丢弃，避免重复计数。

use std::collections::{HashMap, HashSet};

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::config::RiskConfig;
use crate::core::domain::{NormalizedTransaction, TransactionFlow, TransferKind};
use crate::core::errors::{Result, RiskError};

/// Etherscan 单页最大记录数；返回不足此数说明历史已取完
const ETHERSCAN_MAX_RECORDS: usize = 10_000;

const WEI_PER_ETH: f64 = 1e18;

/// Etherscan 响应信封
///
/// `result` 在成功时是数组、出错时是字符串，先按 Value 接收。
#[derive(Debug, Deserialize)]
struct EtherscanEnvelope {
    status: String,
    message: String,
    result: Value,
}

/// Etherscan transaction记录（txlist 与 tokentx 的公共字段）
#[derive(Debug, Clone, Deserialize)]
struct RawEtherscanTx {
    #[serde(rename = "blockNumber", default)]
    block_number: String,
    #[serde(rename = "timeStamp", default)]
    time_stamp: String,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    value: String,
    #[serde(rename = "gasUsed", default)]
    gas_used: String,
    #[serde(rename = "gasPrice", default)]
    gas_price: String,
    /// tokentx 独有：代币合约address
    #[serde(rename = "contractAddress", default)]
    contract_address: String,
}

impl RawEtherscanTx {
    fn block_height(&self) -> u64 {
        self.block_number.parse().unwrap_or(0)
    }

    fn timestamp(&self) -> Option<u64> {
        match self.time_stamp.parse::<u64>() {
            Ok(ts) if ts > 0 => Some(ts),
            _ => None,
        }
    }
}

/// 拉取一页transaction
async fn fetch_page(
    client: &Client,
    config: &RiskConfig,
    address: &str,
    action: &str,
    start_block: u64,
) -> Result<Vec<RawEtherscanTx>> {
    let start = start_block.to_string();
    let response = client
        .get(&config.indexer.etherscan_api_url)
        .query(&[
            ("module", "account"),
            ("action", action),
            ("address", address),
            ("startblock", start.as_str()),
            ("endblock", "99999999"),
            ("sort", "asc"),
            ("apikey", config.indexer.etherscan_api_key.as_str()),
        ])
        .send()
        .await
        // without_url: apikey 在查询串里，error信息不能携带完整 URL
        .map_err(|e| RiskError::data_source("etherscan", e.without_url()))?;

    if !response.status().is_success() {
        return Err(RiskError::data_source("etherscan", format!("HTTP {}", response.status())));
    }

    let envelope: EtherscanEnvelope = response
        .json()
        .await
        .map_err(|e| RiskError::data_source("etherscan", format!("bad JSON: {}", e.without_url())))?;

    if envelope.status == "1" {
        let txs: Vec<RawEtherscanTx> = serde_json::from_value(envelope.result)
            .map_err(|e| RiskError::data_source("etherscan", format!("bad result array: {}", e)))?;
        return Ok(txs);
    }

    // "查无历史"是正常情形，返回空页
    if envelope.message.contains("No transactions found") {
        return Ok(Vec::new());
    }

    Err(RiskError::data_source("etherscan", format!("API error: {}", envelope.message)))
}

/// 按 startblock 游标翻页，直到历史取完或达到硬上限
async fn fetch_all_pages(
    client: &Client,
    config: &RiskConfig,
    address: &str,
    action: &str,
) -> Result<Vec<RawEtherscanTx>> {
    let mut all: Vec<RawEtherscanTx> = Vec::new();
    let mut start_block = 0u64;

    loop {
        let page = fetch_page(client, config, address, action, start_block).await?;
        if page.is_empty() {
            break;
        }
        let page_len = page.len();
        all.extend(page);

        if all.len() >= config.max_transactions || page_len < ETHERSCAN_MAX_RECORDS {
            break;
        }

        // 游标推进到最后一条记录的下一个区块
        let last_block = all.last().map(RawEtherscanTx::block_height).unwrap_or(0);
        if last_block == 0 {
            break;
        }
        start_block = last_block + 1;
    }

    debug!("Etherscan {} pagination returned {} records for {}", action, all.len(), address);
    Ok(all)
}

fn gas_fee_eth(gas_used: &str, gas_price: &str) -> f64 {
    let used: f64 = gas_used.parse().unwrap_or(0.0);
    let price: f64 = gas_price.parse().unwrap_or(0.0);
    used * price / WEI_PER_ETH
}

fn normalize(tx: &RawEtherscanTx, fee: f64, transfer_kind: TransferKind) -> NormalizedTransaction {
    NormalizedTransaction {
        hash: tx.hash.clone(),
        block_height: tx.block_height(),
        timestamp: tx.timestamp(),
        fee,
        flow: TransactionFlow::Account {
            from: tx.from.to_lowercase(),
            to: tx.to.to_lowercase(),
            value_raw: tx.value.clone(),
        },
        transfer_kind,
    }
}

/// 拉取并合并某address的原生 + ERC-20 transaction历史
pub async fn fetch_transactions(
    client: &Client,
    config: &RiskConfig,
    address: &str,
) -> Result<Vec<NormalizedTransaction>> {
    let address = address.to_lowercase();

    let native_txs = fetch_all_pages(client, config, &address, "txlist").await?;
    let token_txs = fetch_all_pages(client, config, &address, "tokentx").await?;

    // 哈希 → 父原生transaction，代币记录from这里回填 gas 信息
    let native_by_hash: HashMap<&str, &RawEtherscanTx> =
        native_txs.iter().map(|tx| (tx.hash.as_str(), tx)).collect();

    let mut records = Vec::with_capacity(native_txs.len() + token_txs.len());
    let mut token_parent_hashes: HashSet<&str> = HashSet::new();

    for tx in &token_txs {
        token_parent_hashes.insert(tx.hash.as_str());
        let fee = match native_by_hash.get(tx.hash.as_str()) {
            Some(parent) => gas_fee_eth(&parent.gas_used, &parent.gas_price),
            None => gas_fee_eth(&tx.gas_used, &tx.gas_price),
        };
        records.push(normalize(
            tx,
            fee,
            TransferKind::FungibleToken { contract_address: tx.contract_address.to_lowercase() },
        ));
    }

    for tx in &native_txs {
        // 去重：代币转账的父原生transaction不再单独计数
        if token_parent_hashes.contains(tx.hash.as_str()) {
            continue;
        }
        records.push(normalize(tx, gas_fee_eth(&tx.gas_used, &tx.gas_price), TransferKind::Native));
    }

    // 按时间升序；截断时保留最近的记录
    records.sort_by_key(|r| (r.timestamp.unwrap_or(0), r.block_height));
    if records.len() > config.max_transactions {
        let excess = records.len() - config.max_transactions;
        warn!(
            "Limiting to {} transactions for {} (found {})",
            config.max_transactions,
            address,
            records.len()
        );
        records.drain(..excess);
    }

    Ok(records)
}
