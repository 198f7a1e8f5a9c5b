//! 特征向量布局
//!
//! 名称到位置的映射是外部评分模型训练时固定下来的契约，
//! 必须逐字节复现——顺序、拼写、大小写都不能动。
//! 两条链各有自己的模型，因此各有一份布局；Bitcoin 模型
//! 额外消费 `Time step` 与十个派生模式特征。

use crate::core::domain::ChainType;

/// Bitcoin 模型的特征顺序（66 维）
pub const BITCOIN_FEATURE_ORDER: [&str; 66] = [
    "Time step",
    "num_txs_as_sender",
    "num_txs_as_receiver",
    "first_block_appeared_in",
    "last_block_appeared_in",
    "lifetime_in_blocks",
    "total_txs",
    "first_sent_block",
    "first_received_block",
    "num_timesteps_appeared_in",
    "btc_transacted_total",
    "btc_transacted_min",
    "btc_transacted_max",
    "btc_transacted_mean",
    "btc_transacted_median",
    "btc_sent_total",
    "btc_sent_min",
    "btc_sent_max",
    "btc_sent_mean",
    "btc_sent_median",
    "btc_received_total",
    "btc_received_min",
    "btc_received_max",
    "btc_received_mean",
    "btc_received_median",
    "fees_total",
    "fees_min",
    "fees_max",
    "fees_mean",
    "fees_median",
    "fees_as_share_total",
    "fees_as_share_min",
    "fees_as_share_max",
    "fees_as_share_mean",
    "fees_as_share_median",
    "blocks_btwn_txs_total",
    "blocks_btwn_txs_min",
    "blocks_btwn_txs_max",
    "blocks_btwn_txs_mean",
    "blocks_btwn_txs_median",
    "blocks_btwn_input_txs_total",
    "blocks_btwn_input_txs_min",
    "blocks_btwn_input_txs_max",
    "blocks_btwn_input_txs_mean",
    "blocks_btwn_input_txs_median",
    "blocks_btwn_output_txs_total",
    "blocks_btwn_output_txs_min",
    "blocks_btwn_output_txs_max",
    "blocks_btwn_output_txs_mean",
    "blocks_btwn_output_txs_median",
    "num_addr_transacted_multiple",
    "transacted_w_address_total",
    "transacted_w_address_min",
    "transacted_w_address_max",
    "transacted_w_address_mean",
    "transacted_w_address_median",
    "partner_transaction_ratio",
    "activity_density",
    "transaction_size_variance",
    "flow_imbalance",
    "temporal_spread",
    "fee_percentile",
    "interaction_intensity",
    "value_per_transaction",
    "burst_activity",
    "mixing_intensity",
];

/// Ethereum 模型的特征顺序（55 维）
///
/// 价值序列同样以 BTC 计价（训练集如此），故沿用 `btc_*` 名称。
pub const ETHEREUM_FEATURE_ORDER: [&str; 55] = [
    "num_txs_as_sender",
    "num_txs_as_receiver",
    "total_txs",
    "first_block_appeared_in",
    "last_block_appeared_in",
    "lifetime_in_blocks",
    "num_timesteps_appeared_in",
    "first_sent_block",
    "first_received_block",
    "btc_transacted_total",
    "btc_transacted_min",
    "btc_transacted_max",
    "btc_transacted_mean",
    "btc_transacted_median",
    "btc_sent_total",
    "btc_sent_min",
    "btc_sent_max",
    "btc_sent_mean",
    "btc_sent_median",
    "btc_received_total",
    "btc_received_min",
    "btc_received_max",
    "btc_received_mean",
    "btc_received_median",
    "fees_total",
    "fees_min",
    "fees_max",
    "fees_mean",
    "fees_median",
    "fees_as_share_total",
    "fees_as_share_min",
    "fees_as_share_max",
    "fees_as_share_mean",
    "fees_as_share_median",
    "blocks_btwn_txs_total",
    "blocks_btwn_txs_min",
    "blocks_btwn_txs_max",
    "blocks_btwn_txs_mean",
    "blocks_btwn_txs_median",
    "blocks_btwn_input_txs_total",
    "blocks_btwn_input_txs_min",
    "blocks_btwn_input_txs_max",
    "blocks_btwn_input_txs_mean",
    "blocks_btwn_input_txs_median",
    "blocks_btwn_output_txs_total",
    "blocks_btwn_output_txs_min",
    "blocks_btwn_output_txs_max",
    "blocks_btwn_output_txs_mean",
    "blocks_btwn_output_txs_median",
    "transacted_w_address_total",
    "num_addr_transacted_multiple",
    "transacted_w_address_min",
    "transacted_w_address_max",
    "transacted_w_address_mean",
    "transacted_w_address_median",
];

/// 某条链的特征顺序
pub fn feature_order(chain: ChainType) -> &'static [&'static str] {
    match chain {
        ChainType::Bitcoin => &BITCOIN_FEATURE_ORDER,
        ChainType::Ethereum => &ETHEREUM_FEATURE_ORDER,
    }
}
