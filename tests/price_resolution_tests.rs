//! tests/price_resolution_tests.rs
//!
//! Tests for `src/price/`:
//! - tier waterfall order and first-positive-wins
//! - monthly ratio caching (second call performs no network call)
//! - stablecoin path via the shared ETH/USD monthly ratio
//! - token metadata fallback is memoized even on failure

use httpmock::{Method, MockServer};
use serde_json::json;

use defi_address_risk::core::config::PriceApiConfig;
use defi_address_risk::price::{month_timestamp, PriceResolver};

// 2023-05-17 12:34:56 UTC
const TIMESTAMP: u64 = 1_684_326_896;
const TOKEN: &str = "0x1234567890abcdef1234567890abcdef12345678";

fn test_config(server: &MockServer) -> PriceApiConfig {
    PriceApiConfig {
        cryptocompare_api_url: format!("{}/data/pricehistorical", server.base_url()),
        cryptocompare_api_key: "test-key".to_string(),
        defillama_api_url: format!("{}/prices/historical", server.base_url()),
        moralis_metadata_url: format!("{}/erc20/metadata", server.base_url()),
        moralis_price_url: format!("{}/erc20", server.base_url()),
        moralis_api_key: "test-key".to_string(),
    }
}

fn mock_metadata<'a>(server: &'a MockServer, symbol: &str) -> httpmock::Mock<'a> {
    server.mock(|when, then| {
        when.method(Method::GET).path("/erc20/metadata").query_param("addresses", TOKEN);
        then.status(200).json_body(json!([{ "symbol": symbol, "decimals": "18" }]));
    })
}

#[tokio::test(flavor = "current_thread")]
async fn test_tier2_symbol_direct_hit() {
    let server = MockServer::start();
    mock_metadata(&server, "ABC");

    let tier2 = server.mock(|when, then| {
        when.method(Method::GET)
            .path("/data/pricehistorical")
            .query_param("fsym", "ABC")
            .query_param("tsyms", "ETH")
            .query_param("ts", &month_timestamp(TIMESTAMP).to_string());
        then.status(200).json_body(json!({ "ABC": { "ETH": 0.004 } }));
    });

    let resolver = PriceResolver::new(test_config(&server));
    let ratio = resolver.resolve_ratio(TOKEN, TIMESTAMP).await;

    tier2.assert();
    assert!((ratio - 0.004).abs() < 1e-12);
}

#[tokio::test(flavor = "current_thread")]
async fn test_tier3_fallback_when_tier2_returns_zero() {
    let server = MockServer::start();
    mock_metadata(&server, "ABC");

    // Tier 2 answers but has no price
    server.mock(|when, then| {
        when.method(Method::GET).path("/data/pricehistorical").query_param("fsym", "ABC");
        then.status(200).json_body(json!({ "ABC": { "ETH": 0.0 } }));
    });
    // Tier 3 has a USD price
    let tier3 = server.mock(|when, then| {
        when.method(Method::GET)
            .path(format!("/prices/historical/{}/ethereum:{}", TIMESTAMP, TOKEN));
        then.status(200).json_body(json!({
            "coins": { (format!("ethereum:{}", TOKEN)): { "price": 2.0 } }
        }));
    });
    // ETH/USD ratio used to anchor the USD price
    server.mock(|when, then| {
        when.method(Method::GET).path("/data/pricehistorical").query_param("fsym", "ETH");
        then.status(200).json_body(json!({ "ETH": { "USD": 2000.0 } }));
    });

    let resolver = PriceResolver::new(test_config(&server));
    let ratio = resolver.resolve_ratio(TOKEN, TIMESTAMP).await;

    tier3.assert();
    // 2 USD * (1/2000) ETH/USD
    assert!((ratio - 0.001).abs() < 1e-12);
}

#[tokio::test(flavor = "current_thread")]
async fn test_tier4_fallback_when_tier3_unavailable() {
    let server = MockServer::start();
    mock_metadata(&server, "ABC");

    server.mock(|when, then| {
        when.method(Method::GET).path("/data/pricehistorical").query_param("fsym", "ABC");
        then.status(200).json_body(json!({}));
    });
    server.mock(|when, then| {
        when.method(Method::GET)
            .path(format!("/prices/historical/{}/ethereum:{}", TIMESTAMP, TOKEN));
        then.status(200).json_body(json!({ "coins": {} }));
    });
    let tier4 = server.mock(|when, then| {
        when.method(Method::GET).path(format!("/erc20/{}/price", TOKEN));
        then.status(200).json_body(json!({ "usd_price": 4.0 }));
    });
    server.mock(|when, then| {
        when.method(Method::GET).path("/data/pricehistorical").query_param("fsym", "ETH");
        then.status(200).json_body(json!({ "ETH": { "USD": 2000.0 } }));
    });

    let resolver = PriceResolver::new(test_config(&server));
    let ratio = resolver.resolve_ratio(TOKEN, TIMESTAMP).await;

    tier4.assert();
    assert!((ratio - 0.002).abs() < 1e-12);
}

#[tokio::test(flavor = "current_thread")]
async fn test_all_tiers_failing_is_soft_zero() {
    let server = MockServer::start();
    mock_metadata(&server, "ABC");

    server.mock(|when, then| {
        when.method(Method::GET).path("/data/pricehistorical");
        then.status(500);
    });
    server.mock(|when, then| {
        when.method(Method::GET)
            .path(format!("/prices/historical/{}/ethereum:{}", TIMESTAMP, TOKEN));
        then.status(500);
    });
    server.mock(|when, then| {
        when.method(Method::GET).path(format!("/erc20/{}/price", TOKEN));
        then.status(500);
    });

    let resolver = PriceResolver::new(test_config(&server));
    // Soft failure: 0.0, no error
    assert_eq!(resolver.resolve_ratio(TOKEN, TIMESTAMP).await, 0.0);
}

#[tokio::test(flavor = "current_thread")]
async fn test_cached_ratio_hits_no_network_on_second_call() {
    let server = MockServer::start();
    let metadata = mock_metadata(&server, "ABC");

    let tier2 = server.mock(|when, then| {
        when.method(Method::GET).path("/data/pricehistorical").query_param("fsym", "ABC");
        then.status(200).json_body(json!({ "ABC": { "ETH": 0.004 } }));
    });

    let resolver = PriceResolver::new(test_config(&server));
    let first = resolver.resolve_ratio(TOKEN, TIMESTAMP).await;
    // Same token, same calendar month (one day later)
    let second = resolver.resolve_ratio(TOKEN, TIMESTAMP + 86_400).await;

    assert_eq!(first, second);
    tier2.assert_hits(1);
    metadata.assert_hits(1);
    assert_eq!(resolver.cached_ratio_count(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn test_zero_ratio_is_not_cached() {
    let server = MockServer::start();
    mock_metadata(&server, "ABC");

    let tier2 = server.mock(|when, then| {
        when.method(Method::GET).path("/data/pricehistorical").query_param("fsym", "ABC");
        then.status(200).json_body(json!({ "ABC": { "ETH": 0.0 } }));
    });
    server.mock(|when, then| {
        when.method(Method::GET)
            .path(format!("/prices/historical/{}/ethereum:{}", TIMESTAMP, TOKEN));
        then.status(200).json_body(json!({ "coins": {} }));
    });
    server.mock(|when, then| {
        when.method(Method::GET).path(format!("/erc20/{}/price", TOKEN));
        then.status(200).json_body(json!({ "usd_price": 0.0 }));
    });

    let resolver = PriceResolver::new(test_config(&server));
    assert_eq!(resolver.resolve_ratio(TOKEN, TIMESTAMP).await, 0.0);
    assert_eq!(resolver.resolve_ratio(TOKEN, TIMESTAMP).await, 0.0);

    // Unresolved ratios must retry the waterfall, not serve a cached zero
    tier2.assert_hits(2);
}

#[tokio::test(flavor = "current_thread")]
async fn test_stablecoin_path_shares_monthly_base_ratio() {
    let server = MockServer::start();

    let eth_usd = server.mock(|when, then| {
        when.method(Method::GET)
            .path("/data/pricehistorical")
            .query_param("fsym", "ETH")
            .query_param("tsyms", "USD");
        then.status(200).json_body(json!({ "ETH": { "USD": 2000.0 } }));
    });

    let resolver = PriceResolver::new(test_config(&server));

    // USDT and USDC are both in the hard-coded contract table: no metadata call
    let usdt = resolver
        .resolve_ratio("0xdAC17F958D2ee523a2206206994597C13D831ec7", TIMESTAMP)
        .await;
    let usdc = resolver
        .resolve_ratio("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", TIMESTAMP)
        .await;

    assert!((usdt - 0.0005).abs() < 1e-12);
    assert_eq!(usdt, usdc);
    // The ETH/USD monthly quote is fetched once and shared
    eth_usd.assert_hits(1);
}

#[tokio::test(flavor = "current_thread")]
async fn test_wrapped_native_short_circuits() {
    let server = MockServer::start();
    let resolver = PriceResolver::new(test_config(&server));

    let ratio = resolver
        .resolve_ratio("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", TIMESTAMP)
        .await;

    assert_eq!(ratio, 1.0);
}

#[tokio::test(flavor = "current_thread")]
async fn test_metadata_failure_is_memoized() {
    let server = MockServer::start();

    let metadata = server.mock(|when, then| {
        when.method(Method::GET).path("/erc20/metadata");
        then.status(500);
    });

    let resolver = PriceResolver::new(test_config(&server));
    let first = resolver.token_info(TOKEN).await;
    let second = resolver.token_info(TOKEN).await;

    assert_eq!(first.symbol, "UNKNOWN");
    assert_eq!(first.decimals, 18);
    assert_eq!(first, second);
    // Failure result is cached to bound retry cost
    metadata.assert_hits(1);
}

#[tokio::test(flavor = "current_thread")]
async fn test_unknown_symbol_skips_symbol_direct_tier() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(Method::GET).path("/erc20/metadata");
        then.status(500);
    });
    // Tier 2 would be fsym=UNKNOWN: it must never be called
    let tier2 = server.mock(|when, then| {
        when.method(Method::GET).path("/data/pricehistorical").query_param("fsym", "UNKNOWN");
        then.status(200).json_body(json!({ "UNKNOWN": { "ETH": 9.9 } }));
    });
    server.mock(|when, then| {
        when.method(Method::GET)
            .path(format!("/prices/historical/{}/ethereum:{}", TIMESTAMP, TOKEN));
        then.status(200).json_body(json!({
            "coins": { (format!("ethereum:{}", TOKEN)): { "price": 1.0 } }
        }));
    });
    server.mock(|when, then| {
        when.method(Method::GET)
            .path("/data/pricehistorical")
            .query_param("fsym", "ETH")
            .query_param("tsyms", "USD");
        then.status(200).json_body(json!({ "ETH": { "USD": 2000.0 } }));
    });

    let resolver = PriceResolver::new(test_config(&server));
    let ratio = resolver.resolve_ratio(TOKEN, TIMESTAMP).await;

    tier2.assert_hits(0);
    assert!((ratio - 0.0005).abs() < 1e-12);
}

#[tokio::test(flavor = "current_thread")]
async fn test_eth_btc_ratio_caches_and_falls_back() {
    let server = MockServer::start();

    let eth_btc = server.mock(|when, then| {
        when.method(Method::GET)
            .path("/data/pricehistorical")
            .query_param("fsym", "ETH")
            .query_param("tsyms", "BTC");
        then.status(200).json_body(json!({ "ETH": { "BTC": 0.067 } }));
    });

    let resolver = PriceResolver::new(test_config(&server));
    let first = resolver.eth_btc_ratio(TIMESTAMP).await;
    let second = resolver.eth_btc_ratio(TIMESTAMP + 3600).await;

    assert!((first - 0.067).abs() < 1e-12);
    assert_eq!(first, second);
    eth_btc.assert_hits(1);
}

#[tokio::test(flavor = "current_thread")]
async fn test_eth_btc_year_based_fallback() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(Method::GET).path("/data/pricehistorical");
        then.status(500);
    });

    let resolver = PriceResolver::new(test_config(&server));
    // 2016-06-01 → fallback 0.02
    assert_eq!(resolver.eth_btc_ratio(1_464_739_200).await, 0.02);
    // 2023 → fallback 0.067
    assert_eq!(resolver.eth_btc_ratio(TIMESTAMP).await, 0.067);
}
