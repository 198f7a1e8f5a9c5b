//! Bitcoin 特征提取
//!
//! UTXO 语义：目标address出现在任一输入的 prevout 即视为发送方，
//! 发送价值 = 这些输入之和；接收价值 = 指向目标address的输出之和。
//! 金额天然以 BTC 计价，无需价格解析。

use std::collections::HashMap;

use crate::core::domain::{ChainType, NormalizedTransaction, TransactionFlow};
use crate::features::stats::{add_interval_stats, add_stats, FeatureMap, EPSILON};
use crate::features::FeatureVector;

const SATOSHI_PER_BTC: f64 = 100_000_000.0;

/// from标准化transaction序列提取 Bitcoin 特征向量
pub fn extract_features(
    target_address: &str,
    transactions: &[NormalizedTransaction],
) -> FeatureVector {
    let mut block_heights: Vec<u64> = Vec::new();
    let mut sent_blocks: Vec<u64> = Vec::new();
    let mut received_blocks: Vec<u64> = Vec::new();
    let mut sent_values: Vec<f64> = Vec::new();
    let mut received_values: Vec<f64> = Vec::new();
    let mut all_values: Vec<f64> = Vec::new();
    let mut all_fees: Vec<f64> = Vec::new();
    let mut interaction_counts: HashMap<String, u64> = HashMap::new();

    for tx in transactions {
        let TransactionFlow::Utxo { inputs, outputs } = &tx.flow else { continue };

        if tx.block_height > 0 {
            block_heights.push(tx.block_height);
        }
        all_fees.push(tx.fee);

        let mut is_sender = false;
        let mut total_sent_satoshi: u64 = 0;
        for input in inputs {
            match input.address.as_deref() {
                Some(addr) if addr == target_address => {
                    is_sender = true;
                    total_sent_satoshi += input.value;
                }
                Some(addr) => {
                    *interaction_counts.entry(addr.to_string()).or_insert(0) += 1;
                }
                None => {}
            }
        }

        let mut total_received_satoshi: u64 = 0;
        for output in outputs {
            match output.address.as_deref() {
                Some(addr) if addr == target_address => {
                    total_received_satoshi += output.value;
                }
                Some(addr) => {
                    *interaction_counts.entry(addr.to_string()).or_insert(0) += 1;
                }
                None => {}
            }
        }

        if is_sender {
            let sent_btc = total_sent_satoshi as f64 / SATOSHI_PER_BTC;
            sent_values.push(sent_btc);
            all_values.push(sent_btc);
            if tx.block_height > 0 {
                sent_blocks.push(tx.block_height);
            }
        }

        if total_received_satoshi > 0 {
            let received_btc = total_received_satoshi as f64 / SATOSHI_PER_BTC;
            received_values.push(received_btc);
            all_values.push(received_btc);
            if tx.block_height > 0 {
                received_blocks.push(tx.block_height);
            }
        }
    }

    let mut features: FeatureMap = HashMap::new();

    features.insert("num_txs_as_sender".to_string(), sent_values.len() as f64);
    features.insert("num_txs_as_receiver".to_string(), received_values.len() as f64);
    features.insert("total_txs".to_string(), transactions.len() as f64);

    let mut unique_blocks = block_heights.clone();
    unique_blocks.sort_unstable();
    unique_blocks.dedup();

    if !block_heights.is_empty() {
        let first = *block_heights.iter().min().unwrap_or(&0);
        let last = *block_heights.iter().max().unwrap_or(&0);
        features.insert("first_block_appeared_in".to_string(), first as f64);
        features.insert("last_block_appeared_in".to_string(), last as f64);
        features.insert("lifetime_in_blocks".to_string(), (last - first) as f64);
        features.insert("num_timesteps_appeared_in".to_string(), unique_blocks.len() as f64);
    }

    if let Some(first) = sent_blocks.iter().min() {
        features.insert("first_sent_block".to_string(), *first as f64);
    }
    if let Some(first) = received_blocks.iter().min() {
        features.insert("first_received_block".to_string(), *first as f64);
    }

    add_stats(&mut features, "btc_transacted", &all_values, true);
    add_stats(&mut features, "btc_sent", &sent_values, true);
    add_stats(&mut features, "btc_received", &received_values, true);
    add_stats(&mut features, "fees", &all_fees, true);

    // 手续费序列与价值序列按transaction顺序配对
    let fee_shares: Vec<f64> = all_fees
        .iter()
        .enumerate()
        .map(|(i, fee)| match all_values.get(i) {
            Some(value) if *value > 0.0 => fee / value * 100.0,
            _ => 0.0,
        })
        .collect();
    add_stats(&mut features, "fees_as_share", &fee_shares, true);

    add_interval_stats(&mut features, "blocks_btwn_txs", &block_heights);
    add_interval_stats(&mut features, "blocks_btwn_input_txs", &sent_blocks);
    add_interval_stats(&mut features, "blocks_btwn_output_txs", &received_blocks);

    // BTC 模型：_total 是交互次数之和（与 ETH 的去重address数语义不同）
    let counts: Vec<f64> = interaction_counts.values().map(|count| *count as f64).collect();
    add_stats(&mut features, "transacted_w_address", &counts, true);
    features.insert(
        "num_addr_transacted_multiple".to_string(),
        counts.iter().filter(|count| **count > 1.0).count() as f64,
    );

    features.insert("Time step".to_string(), unique_blocks.len() as f64);

    add_pattern_features(&mut features);

    FeatureVector::from_map(ChainType::Bitcoin, &features)
}

/// 派生模式特征（仅 Bitcoin 模型消费）
///
/// 所有分母统一加 EPSILON，零分母与真实零值不作特殊区分。
fn add_pattern_features(features: &mut FeatureMap) {
    let get = |features: &FeatureMap, key: &str| features.get(key).copied().unwrap_or(0.0);

    let partner_transaction_ratio =
        get(features, "transacted_w_address_total") / (get(features, "total_txs") + EPSILON);
    let activity_density =
        get(features, "total_txs") / (get(features, "lifetime_in_blocks") + EPSILON);
    let transaction_size_variance = (get(features, "btc_transacted_max")
        - get(features, "btc_transacted_min"))
        / (get(features, "btc_transacted_mean") + EPSILON);
    let flow_imbalance = (get(features, "btc_sent_total") - get(features, "btc_received_total"))
        / (get(features, "btc_transacted_total") + EPSILON);
    let temporal_spread = (get(features, "last_block_appeared_in")
        - get(features, "first_block_appeared_in"))
        / (get(features, "num_timesteps_appeared_in") + EPSILON);
    let fee_percentile =
        get(features, "fees_total") / (get(features, "btc_transacted_total") + EPSILON);
    let interaction_intensity = get(features, "num_addr_transacted_multiple")
        / (get(features, "transacted_w_address_total") + EPSILON);
    let value_per_transaction =
        get(features, "btc_transacted_total") / (get(features, "total_txs") + EPSILON);
    let burst_activity = get(features, "total_txs") * activity_density;
    let mixing_intensity = partner_transaction_ratio * interaction_intensity;

    features.insert("partner_transaction_ratio".to_string(), partner_transaction_ratio);
    features.insert("activity_density".to_string(), activity_density);
    features.insert("transaction_size_variance".to_string(), transaction_size_variance);
    features.insert("flow_imbalance".to_string(), flow_imbalance);
    features.insert("temporal_spread".to_string(), temporal_spread);
    features.insert("fee_percentile".to_string(), fee_percentile);
    features.insert("interaction_intensity".to_string(), interaction_intensity);
    features.insert("value_per_transaction".to_string(), value_per_transaction);
    features.insert("burst_activity".to_string(), burst_activity);
    features.insert("mixing_intensity".to_string(), mixing_intensity);
}
