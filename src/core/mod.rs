pub mod config;
pub mod domain;
pub mod errors;
pub mod validation;

// 重新导出关键结构
pub use config::RiskConfig;
pub use domain::{AnalysisVerdict, ChainType, NormalizedTransaction, RiskLevel, VerdictSource};
pub use errors::{Result, RiskError};
