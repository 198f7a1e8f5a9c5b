//! Ethereum 特征提取
//!
//! 原生转账按 wei→ETH 折算；代币转账先查元数据换算代币数量，
//! 再经价格解析子系统换算为 ETH。随后全部乘以月度 ETH/BTC 比率，
//! 统一到模型训练时的 BTC 计价。无法定价的转账以 0 价值参与
//! 统计，但不会from计数中剔除。

use std::collections::HashMap;

use tracing::debug;

use crate::core::domain::{ChainType, NormalizedTransaction, TransactionFlow, TransferKind};
use crate::features::stats::{add_interval_stats, add_stats, FeatureMap};
use crate::features::FeatureVector;
use crate::price::PriceResolver;

const WEI_PER_ETH: f64 = 1e18;

struct SentRecord {
    value_btc: f64,
    fee_btc: f64,
    block: u64,
}

struct ReceivedRecord {
    value_btc: f64,
    block: u64,
}

fn push_counterparty(counterparties: &mut HashMap<String, u64>, key: &str) {
    if key.is_empty() {
        return;
    }
    *counterparties.entry(key.to_string()).or_insert(0) += 1;
}

/// from标准化transaction序列提取 Ethereum 特征向量
pub async fn extract_features(
    target_address: &str,
    transactions: &[NormalizedTransaction],
    resolver: &PriceResolver,
) -> FeatureVector {
    let address = target_address.to_lowercase();

    let mut sent: Vec<SentRecord> = Vec::new();
    let mut received: Vec<ReceivedRecord> = Vec::new();
    let mut all_values_btc: Vec<f64> = Vec::new();
    let mut all_fees_btc: Vec<f64> = Vec::new();
    let mut blocks: Vec<u64> = Vec::new();
    let mut counterparties: HashMap<String, u64> = HashMap::new();

    for tx in transactions {
        // 没有可用时间戳的记录无法定价，跳过
        let Some(timestamp) = tx.timestamp else { continue };
        let TransactionFlow::Account { from, to, value_raw } = &tx.flow else { continue };

        let value_eth = match &tx.transfer_kind {
            TransferKind::Native => {
                let wei: f64 = value_raw.parse().unwrap_or(0.0);
                if wei.is_finite() {
                    wei / WEI_PER_ETH
                } else {
                    0.0
                }
            }
            TransferKind::FungibleToken { contract_address } => {
                let info = resolver.token_info(contract_address).await;
                let raw: f64 = value_raw.parse().unwrap_or(0.0);
                let token_amount = raw / 10f64.powi(info.decimals as i32);
                if token_amount > 0.0 {
                    let ratio = resolver.resolve_ratio(contract_address, timestamp).await;
                    let value = token_amount * ratio;
                    if value > 0.0 {
                        debug!(
                            "Converted {:.4} {} * {:.8} = {:.8} ETH",
                            token_amount, info.symbol, ratio, value
                        );
                    }
                    value
                } else {
                    0.0
                }
            }
        };

        let eth_btc = resolver.eth_btc_ratio(timestamp).await;
        let value_btc = value_eth * eth_btc;
        let fee_btc = tx.fee * eth_btc;

        if tx.block_height > 0 {
            blocks.push(tx.block_height);
        }

        if *from == address {
            // 发送方总是承担手续费，即使转账价值无法确定
            all_fees_btc.push(fee_btc);
            if value_btc > 0.0 {
                sent.push(SentRecord { value_btc, fee_btc, block: tx.block_height });
                all_values_btc.push(value_btc);
                push_counterparty(&mut counterparties, to);
            }
        }
        if *to == address && value_btc > 0.0 {
            received.push(ReceivedRecord { value_btc, block: tx.block_height });
            all_values_btc.push(value_btc);
            push_counterparty(&mut counterparties, from);
        }
    }

    let mut features: FeatureMap = HashMap::new();

    features.insert("num_txs_as_sender".to_string(), sent.len() as f64);
    features.insert("num_txs_as_receiver".to_string(), received.len() as f64);
    features.insert("total_txs".to_string(), (sent.len() + received.len()) as f64);

    if !blocks.is_empty() {
        let first = *blocks.iter().min().unwrap_or(&0);
        let last = *blocks.iter().max().unwrap_or(&0);
        let mut unique = blocks.clone();
        unique.sort_unstable();
        unique.dedup();
        features.insert("first_block_appeared_in".to_string(), first as f64);
        features.insert("last_block_appeared_in".to_string(), last as f64);
        features.insert("lifetime_in_blocks".to_string(), (last - first) as f64);
        features.insert("num_timesteps_appeared_in".to_string(), unique.len() as f64);
    }

    let sent_blocks: Vec<u64> = sent.iter().filter(|t| t.block > 0).map(|t| t.block).collect();
    let received_blocks: Vec<u64> =
        received.iter().filter(|t| t.block > 0).map(|t| t.block).collect();
    if let Some(first) = sent_blocks.iter().min() {
        features.insert("first_sent_block".to_string(), *first as f64);
    }
    if let Some(first) = received_blocks.iter().min() {
        features.insert("first_received_block".to_string(), *first as f64);
    }

    add_stats(&mut features, "btc_transacted", &all_values_btc, true);
    let sent_values: Vec<f64> = sent.iter().map(|t| t.value_btc).collect();
    add_stats(&mut features, "btc_sent", &sent_values, true);
    let received_values: Vec<f64> = received.iter().map(|t| t.value_btc).collect();
    add_stats(&mut features, "btc_received", &received_values, true);
    add_stats(&mut features, "fees", &all_fees_btc, true);

    // 手续费占转账价值的百分比，只在有价值的发送transaction上有定义
    let fee_shares: Vec<f64> = sent
        .iter()
        .filter(|t| t.value_btc > 0.0)
        .map(|t| t.fee_btc / t.value_btc * 100.0)
        .collect();
    add_stats(&mut features, "fees_as_share", &fee_shares, true);

    add_interval_stats(&mut features, "blocks_btwn_txs", &blocks);
    add_interval_stats(&mut features, "blocks_btwn_input_txs", &sent_blocks);
    add_interval_stats(&mut features, "blocks_btwn_output_txs", &received_blocks);

    // ETH 模型：_total 是去重后的对端address数
    features.insert("transacted_w_address_total".to_string(), counterparties.len() as f64);
    features.insert(
        "num_addr_transacted_multiple".to_string(),
        counterparties.values().filter(|count| **count > 1).count() as f64,
    );
    let interaction_counts: Vec<f64> = counterparties.values().map(|count| *count as f64).collect();
    add_stats(&mut features, "transacted_w_address", &interaction_counts, false);

    FeatureVector::from_map(ChainType::Ethereum, &features)
}
