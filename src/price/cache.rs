//! 价格与代币元数据缓存
//!
//! 显式缓存对象，由 `PriceResolver` 持有而不是模块级全局状态，
//! 便于测试隔离。并发写同一 key 允许 last-write-wins（相同输入幂等）。

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::core::domain::TokenInfo;

/// 月度价格比率缓存
///
/// key 形如 `USDT_2023-05-01_0xdac1...` 或 `ETH_USD_2023-05-01`。
/// 只缓存已解析的非零比率；0 表示"未解析"，不会进入缓存。
#[derive(Debug, Default)]
pub struct RatioCache {
    inner: RwLock<HashMap<String, f64>>,
}

impl RatioCache {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.inner.read().get(key).copied()
    }

    pub fn insert(&self, key: impl Into<String>, ratio: f64) {
        self.inner.write().insert(key.into(), ratio);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// 代币元数据缓存（按合约address，小写）
///
/// 元数据不随区块变化，进程生命周期内解析一次；解析failed的
/// `UNKNOWN` 兜底值同样缓存，避免对坏合约反复发起远程查询。
#[derive(Debug, Default)]
pub struct TokenInfoCache {
    inner: RwLock<HashMap<String, TokenInfo>>,
}

impl TokenInfoCache {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    pub fn get(&self, address: &str) -> Option<TokenInfo> {
        self.inner.read().get(address).cloned()
    }

    pub fn insert(&self, address: impl Into<String>, info: TokenInfo) {
        self.inner.write().insert(address.into(), info);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
