//! Address validation and chain detection.
//!
//! Detection is shape-based (prefix + length + character class), matching the
//! heuristics wallets use before routing an address to a chain-specific
//! analyzer. Solana addresses are recognized but rejected as unsupported.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::domain::ChainType;
use crate::core::errors::{Result, RiskError};

static ETH_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("Hardcoded regex should always compile")
});

static BASE58_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[1-9A-HJ-NP-Za-km-z]+$").expect("Hardcoded regex should always compile")
});

/// Trims and validates the raw analysis input.
///
/// Empty and whitespace-only inputs are terminal `InvalidAddress` errors; no
/// shape checking happens here — that is `detect_chain`'s job.
pub fn validate_target_address(address: &str) -> Result<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(RiskError::InvalidAddress(
            "Address must be a non-empty string".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Detects the chain an address belongs to.
///
/// Recognized but unsupported networks (Solana) and unknown shapes both fail
/// with `UnsupportedNetwork` so the orchestrator reports which network the
/// caller tried to analyze.
pub fn detect_chain(address: &str) -> Result<ChainType> {
    // Ethereum: 0x + 40 hex digits
    if ETH_ADDRESS_RE.is_match(address) {
        return Ok(ChainType::Ethereum);
    }

    let lower = address.to_lowercase();

    // Bitcoin mainnet legacy (1/3) and testnet legacy (m/n/2)
    let legacy_prefix = address.starts_with('1')
        || address.starts_with('3')
        || address.starts_with('m')
        || address.starts_with('n')
        || address.starts_with('2');
    if legacy_prefix && address.len() >= 26 && address.len() <= 35 {
        return Ok(ChainType::Bitcoin);
    }

    // Bitcoin bech32 (mainnet bc1q/bc1p, testnet tb1q/tb1p)
    if lower.starts_with("bc1q")
        || lower.starts_with("bc1p")
        || lower.starts_with("tb1q")
        || lower.starts_with("tb1p")
    {
        return Ok(ChainType::Bitcoin);
    }

    // Solana: base58, 36-44 chars. Recognized so the error names the network.
    if address.len() >= 36 && address.len() <= 44 && BASE58_RE.is_match(address) {
        return Err(RiskError::UnsupportedNetwork(
            "Solana addresses are not yet supported for analysis".to_string(),
        ));
    }

    Err(RiskError::UnsupportedNetwork(format!(
        "Could not detect a supported network for address: {}",
        address
    )))
}
