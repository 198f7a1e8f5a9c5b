//! 风险分析核心领域类型
//!
//! 定义链无关的transaction记录、特征向量与分析verdict。
//! 所有类型一经构造即不可变。

use serde::{Deserialize, Serialize};

/// 支持分析的区块链类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainType {
    Bitcoin,
    Ethereum,
}

impl ChainType {
    /// 链名称（用于日志与历史记录）
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainType::Bitcoin => "Bitcoin",
            ChainType::Ethereum => "Ethereum",
        }
    }
}

impl std::fmt::Display for ChainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 转账类别：原生币或同质化代币
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    /// 原生币转账（ETH / BTC）
    Native,
    /// ERC-20 等同质化代币转账
    FungibleToken {
        /// 代币合约address（小写）
        contract_address: String,
    },
}

/// UTXO 输入/输出引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxoRef {
    /// 对端address；coinbase 或脚本输出可能没有address
    pub address: Option<String>,
    /// 金额（satoshi）
    pub value: u64,
}

/// transaction资金流形状（账户模型 vs UTXO 模型）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransactionFlow {
    /// 账户链（Ethereum）：from/to + 原始金额字符串
    Account {
        from: String,
        to: String,
        /// 原始金额：原生转账为 wei，代币转账为代币最小单位。
        /// 保留字符串形式，精度换算推迟到特征计算阶段。
        value_raw: String,
    },
    /// UTXO 链（Bitcoin）
    Utxo {
        inputs: Vec<TxoRef>,
        outputs: Vec<TxoRef>,
    },
}

/// 链无关的标准化transaction记录
///
/// 每条记录只属于一条链、一个被分析的目标address，构造后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    /// transaction哈希
    pub hash: String,
    /// 区块高度，未知（未确认）时为 0
    pub block_height: u64,
    /// unix 秒时间戳；UTXO 链未确认transaction可能缺失
    pub timestamp: Option<u64>,
    /// 手续费，以链原生币计（ETH / BTC）
    pub fee: f64,
    /// 资金流
    pub flow: TransactionFlow,
    /// 转账类别
    pub transfer_kind: TransferKind,
}

/// 代币元数据（symbol + decimals），按合约address解析一次后进程内缓存
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u32,
}

impl TokenInfo {
    /// 元数据解析failed时的兜底值
    pub fn unknown() -> Self {
        Self { symbol: "UNKNOWN".to_string(), decimals: 18 }
    }
}

/// 风险级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// verdict来源（fusion溯源）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// 社区投票单独判定
    Community,
    /// 评分模型单独判定
    Model,
    /// 社区与模型一致判定
    CommunityAndModel,
}

/// 评分模型返回的原始结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub transactions_analyzed: u32,
    pub threshold_used: f64,
    pub data_source: String,
    pub is_ransomware: bool,
    pub address: String,
    pub chain_type: String,
    pub confidence: f64,
    pub confidence_level: String,
    pub ransomware_probability: f64,
}

/// 社区报告详情（投票计数等）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityReportDetail {
    pub report_id: u64,
    pub votes_yes: u64,
    pub votes_no: u64,
    pub category: String,
    pub description: String,
}

/// 社区oracle返回的原始结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityReport {
    pub is_safe: bool,
    pub report: Option<CommunityReportDetail>,
}

/// 最终分析verdict
///
/// 由 Orchestrator 按fusion规则构造，构造后不可变；
/// 交给外部历史持久化服务的是这一结构，而不是特征向量。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisVerdict {
    /// 被分析的address（已 trim）
    pub address: String,
    /// 检测到的链；社区路径提前终止时可能未检测成功
    pub chain: Option<ChainType>,
    pub is_safe: bool,
    /// 置信度 0-100
    pub confidence: u8,
    pub risk_level: RiskLevel,
    pub source: VerdictSource,
    pub raw_model_result: Option<ModelScore>,
    pub raw_community_result: Option<CommunityReport>,
}

impl AnalysisVerdict {
    /// 由模型概率映射风险级别：>0.7 HIGH，>0.3 MEDIUM，其余 LOW
    pub fn risk_level_from_probability(probability: f64) -> RiskLevel {
        if probability > 0.7 {
            RiskLevel::High
        } else if probability > 0.3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_from_probability() {
        assert_eq!(AnalysisVerdict::risk_level_from_probability(0.95), RiskLevel::High);
        assert_eq!(AnalysisVerdict::risk_level_from_probability(0.5), RiskLevel::Medium);
        assert_eq!(AnalysisVerdict::risk_level_from_probability(0.3), RiskLevel::Low);
        assert_eq!(AnalysisVerdict::risk_level_from_probability(0.0), RiskLevel::Low);
    }

    #[test]
    fn test_token_info_unknown_defaults() {
        let info = TokenInfo::unknown();
        assert_eq!(info.symbol, "UNKNOWN");
        assert_eq!(info.decimals, 18);
    }

    #[test]
    fn test_chain_type_display() {
        assert_eq!(ChainType::Bitcoin.to_string(), "Bitcoin");
        assert_eq!(ChainType::Ethereum.to_string(), "Ethereum");
    }
}
