//! 风险分析error类型
//!
//! 统一的errors分类：无效输入、不支持的network、外部数据源failed。
//! 价格tier内部的failed不会出现在这里——tier瀑布将其降级为"尝试下一层"。

use thiserror::Error;

/// 风险分析pipeline的error类型
#[derive(Debug, Error)]
pub enum RiskError {
    /// 无效address输入（终态，不重试）
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// 链类型未接入特征提取器（终态）
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// 外部数据源（indexer / 价格源 / 模型 / oracle）调用failed
    ///
    /// error文本只携带端点名与阶段上下文，绝不包含 API key。
    #[error("Data source error ({source_name}): {message}")]
    DataSource { source_name: String, message: String },

    /// 配置error（缺少必需的端点或密钥）
    #[error("Configuration error: {0}")]
    Config(String),
}

/// 风险分析结果类型
pub type Result<T> = std::result::Result<T, RiskError>;

impl RiskError {
    /// 构造数据源error（统一入口，便于携带端点名）
    pub fn data_source(source_name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::DataSource { source_name: source_name.into(), message: message.to_string() }
    }

    /// 判断是否为终态error（重试无意义）
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InvalidAddress(_) | Self::UnsupportedNetwork(_) | Self::Config(_))
    }
}
