// src/lib.rs

pub mod analysis;
pub mod core;
pub mod features;
pub mod normalizer;
pub mod price;

// 顶层再导出，方便 `defi_address_risk::RiskAnalyzer` 直接使用
pub use crate::analysis::RiskAnalyzer;
pub use crate::core::config::RiskConfig;
pub use crate::core::domain::{AnalysisVerdict, ChainType, RiskLevel, VerdictSource};
pub use crate::core::errors::{Result, RiskError};
pub use crate::features::FeatureVector;
pub use crate::price::PriceResolver;
