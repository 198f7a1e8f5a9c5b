//! tests/collaborators_tests.rs
//!
//! Tests for the HTTP collaborator clients in `src/analysis/`:
//! - scoring model Ok/Err union parsing and per-chain endpoints
//! - community oracle report payloads
//! - history sink request shape

use httpmock::{Method, MockServer};
use serde_json::json;
use std::collections::HashMap;

use defi_address_risk::analysis::{
    AnalyzeHistoryEntry, AnalyzedType, CommunityOracle, HistorySink, HttpCommunityOracle,
    HttpHistorySink, HttpScoringModel, ScoringModel,
};
use defi_address_risk::core::domain::ChainType;
use defi_address_risk::core::errors::RiskError;
use defi_address_risk::features::FeatureVector;

fn model_ok_body() -> serde_json::Value {
    json!({
        "Ok": {
            "transactions_analyzed": 42,
            "threshold_used": 0.5,
            "data_source": "etherscan",
            "is_ransomware": false,
            "address": "0xabc",
            "chain_type": "Ethereum",
            "confidence": 0.9,
            "confidence_level": "HIGH",
            "ransomware_probability": 0.12
        }
    })
}

#[tokio::test(flavor = "current_thread")]
async fn test_model_eth_endpoint_and_payload() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(Method::POST)
            .path("/analyze_eth_address")
            .json_body_partial(r#"{ "transaction_count": 7 }"#);
        then.status(200).json_body(model_ok_body());
    });

    let model = HttpScoringModel::new(server.base_url());
    let features = FeatureVector::from_map(ChainType::Ethereum, &HashMap::new());
    let score = model.score(&features, "0xabc", 7).await.unwrap();

    mock.assert();
    assert!(!score.is_ransomware);
    assert_eq!(score.transactions_analyzed, 42);
    assert!((score.ransomware_probability - 0.12).abs() < 1e-12);
}

#[tokio::test(flavor = "current_thread")]
async fn test_model_btc_endpoint_sends_plain_vector() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(Method::POST)
            .path("/analyze_btc_address")
            .json_body_partial(r#"{ "feature_count": 66 }"#);
        then.status(200).json_body(model_ok_body());
    });

    let model = HttpScoringModel::new(server.base_url());
    let features = FeatureVector::from_map(ChainType::Bitcoin, &HashMap::new());
    model.score(&features, "1abc", 66).await.unwrap();

    mock.assert();
}

#[tokio::test(flavor = "current_thread")]
async fn test_model_err_union_becomes_data_source_error() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(Method::POST).path("/analyze_eth_address");
        then.status(200).json_body(json!({ "Err": "model not loaded" }));
    });

    let model = HttpScoringModel::new(server.base_url());
    let features = FeatureVector::from_map(ChainType::Ethereum, &HashMap::new());
    let err = model.score(&features, "0xabc", 0).await.unwrap_err();

    match err {
        RiskError::DataSource { source_name, message } => {
            assert_eq!(source_name, "model");
            assert!(message.contains("model not loaded"));
        }
        other => panic!("expected DataSource error, got {:?}", other),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_community_report_payload() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(Method::POST)
            .path("/analyze_address")
            .json_body(json!({ "address": "0xabc" }));
        then.status(200).json_body(json!({
            "Ok": {
                "is_safe": false,
                "report": {
                    "report_id": 17,
                    "votes_yes": 12,
                    "votes_no": 3,
                    "category": "scam",
                    "description": "reported drainer"
                }
            }
        }));
    });

    let oracle = HttpCommunityOracle::new(server.base_url());
    let report = oracle.check_address("0xabc").await.unwrap();

    mock.assert();
    assert!(!report.is_safe);
    let detail = report.report.unwrap();
    assert_eq!(detail.report_id, 17);
    assert_eq!(detail.votes_yes, 12);
}

#[tokio::test(flavor = "current_thread")]
async fn test_community_safe_without_report() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(Method::POST).path("/analyze_address");
        then.status(200).json_body(json!({ "Ok": { "is_safe": true, "report": null } }));
    });

    let oracle = HttpCommunityOracle::new(server.base_url());
    let report = oracle.check_address("0xabc").await.unwrap();

    assert!(report.is_safe);
    assert!(report.report.is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn test_history_sink_posts_entry() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(Method::POST)
            .path("/create_analyze_history")
            .json_body_partial(r#"{ "address": "0xabc", "token_type": "Ethereum" }"#);
        then.status(200).json_body(json!({ "Ok": null }));
    });

    let sink = HttpHistorySink::new(server.base_url());
    let entry = AnalyzeHistoryEntry {
        address: "0xabc".to_string(),
        is_safe: true,
        analyzed_type: AnalyzedType::AIAnalysis,
        token_type: "Ethereum".to_string(),
        created_at: 1_684_326_896,
        metadata: "{}".to_string(),
    };

    sink.record(entry).await.unwrap();
    mock.assert();
}

#[tokio::test(flavor = "current_thread")]
async fn test_history_sink_http_error() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(Method::POST).path("/create_analyze_history");
        then.status(503);
    });

    let sink = HttpHistorySink::new(server.base_url());
    let entry = AnalyzeHistoryEntry {
        address: "0xabc".to_string(),
        is_safe: true,
        analyzed_type: AnalyzedType::CommunityVote,
        token_type: "Bitcoin".to_string(),
        created_at: 0,
        metadata: "{}".to_string(),
    };

    assert!(sink.record(entry).await.is_err());
}
