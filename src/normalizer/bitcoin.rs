//! Bitcoin transaction历史标准化（mempool.space API）
//!
//! mempool.space 按最新优先返回，单次调用即覆盖上限以内的历史；
//! 把 vin/vout 适配成 UTXO 输入/输出列表，金额from satoshi 折算为 BTC。

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::core::config::RiskConfig;
use crate::core::domain::{NormalizedTransaction, TransactionFlow, TransferKind, TxoRef};
use crate::core::errors::{Result, RiskError};

const SATOSHI_PER_BTC: f64 = 100_000_000.0;

#[derive(Debug, Deserialize)]
struct MempoolTransaction {
    txid: String,
    #[serde(default)]
    fee: u64,
    status: MempoolStatus,
    #[serde(default)]
    vin: Vec<MempoolInput>,
    #[serde(default)]
    vout: Vec<MempoolOutput>,
}

#[derive(Debug, Deserialize)]
struct MempoolStatus {
    #[serde(default)]
    block_height: Option<u64>,
    #[serde(default)]
    block_time: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MempoolInput {
    #[serde(default)]
    prevout: Option<MempoolPrevout>,
}

#[derive(Debug, Deserialize)]
struct MempoolPrevout {
    scriptpubkey_address: Option<String>,
    #[serde(default)]
    value: u64,
}

#[derive(Debug, Deserialize)]
struct MempoolOutput {
    scriptpubkey_address: Option<String>,
    #[serde(default)]
    value: u64,
}

fn adapt(tx: MempoolTransaction) -> NormalizedTransaction {
    let inputs = tx
        .vin
        .into_iter()
        .filter_map(|input| input.prevout)
        .map(|prevout| TxoRef { address: prevout.scriptpubkey_address, value: prevout.value })
        .collect();

    let outputs = tx
        .vout
        .into_iter()
        .map(|output| TxoRef { address: output.scriptpubkey_address, value: output.value })
        .collect();

    NormalizedTransaction {
        hash: tx.txid,
        block_height: tx.status.block_height.unwrap_or(0),
        timestamp: tx.status.block_time,
        fee: tx.fee as f64 / SATOSHI_PER_BTC,
        flow: TransactionFlow::Utxo { inputs, outputs },
        transfer_kind: TransferKind::Native,
    }
}

/// 拉取并标准化某 Bitcoin address的transaction历史
pub async fn fetch_transactions(
    client: &Client,
    config: &RiskConfig,
    address: &str,
) -> Result<Vec<NormalizedTransaction>> {
    let url = format!("{}/api/address/{}/txs", config.indexer.mempool_api_url, address);

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| RiskError::data_source("mempool", e))?;

    if !response.status().is_success() {
        return Err(RiskError::data_source("mempool", format!("HTTP {}", response.status())));
    }

    let mut raw: Vec<MempoolTransaction> = response
        .json()
        .await
        .map_err(|e| RiskError::data_source("mempool", format!("bad JSON: {}", e)))?;

    // 最新优先返回：截断即保留最近的记录
    if raw.len() > config.max_transactions {
        warn!(
            "Limiting to {} transactions for {} (found {})",
            config.max_transactions,
            address,
            raw.len()
        );
        raw.truncate(config.max_transactions);
    }

    let mut records: Vec<NormalizedTransaction> = raw.into_iter().map(adapt).collect();
    // 升序输出；未确认transaction（高度 0）排在最前
    records.sort_by_key(|r| r.block_height);

    Ok(records)
}
