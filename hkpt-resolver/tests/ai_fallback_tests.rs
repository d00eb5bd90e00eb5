//! AI layer tests: retry policy, live-search requests, text translation

mod helpers;

use helpers::*;
use hkpt_resolver::services::{AiFailure, OracleError, OracleReply};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_rate_limit_backs_off_then_succeeds() {
    let oracle = Arc::new(MockOracle::new(vec![
        Err(OracleError::RateLimited),
        Err(OracleError::RateLimited),
        Ok(reply(&structured_reply("Ocean Pride", 0.9, "knowledge_base"))),
    ]));
    let ai = ai_fallback(oracle.clone());

    let started = Instant::now();
    let result = ai.resolve_via_ai("海之戀", None).await;

    assert_eq!(result.english_name, "Ocean Pride");
    assert_eq!(oracle.calls(), 3);
    // 1s after the first rate limit, 2s after the second
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_rate_limits_do_not_sleep_after_last_attempt() {
    let oracle = Arc::new(MockOracle::new(vec![
        Err(OracleError::RateLimited),
        Err(OracleError::RateLimited),
        Err(OracleError::RateLimited),
    ]));
    let ai = ai_fallback(oracle.clone());

    let started = Instant::now();
    let request = hkpt_resolver::services::OracleRequest::new("sys", "prompt");
    let outcome = ai.invoke_with_retry(&request).await;

    assert_eq!(
        outcome,
        Err(AiFailure::Transient {
            attempts: 3,
            last: OracleError::RateLimited
        })
    );
    assert_eq!(oracle.calls(), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_retry_without_backoff() {
    let oracle = Arc::new(MockOracle::new(vec![
        Err(OracleError::Timeout),
        Err(OracleError::Timeout),
        Err(OracleError::Timeout),
    ]));
    let ai = ai_fallback(oracle.clone());

    let started = Instant::now();
    let result = ai.resolve_via_ai("無名苑", None).await;

    assert_eq!(result.english_name, "無名苑 Residence");
    assert_eq!(result.confidence, 0.3);
    assert_eq!(oracle.calls(), 3);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_auth_error_aborts_immediately() {
    let oracle = Arc::new(MockOracle::new(vec![
        Err(OracleError::Auth("invalid key".to_string())),
        Ok(reply("unused")),
    ]));
    let ai = fast_ai_fallback(oracle.clone());

    let request = hkpt_resolver::services::OracleRequest::new("sys", "prompt");
    let outcome = ai.invoke_with_retry(&request).await;

    assert_eq!(
        outcome,
        Err(AiFailure::Fatal(OracleError::Auth("invalid key".to_string())))
    );
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let oracle = Arc::new(MockOracle::new(vec![Err(OracleError::Server(
        503,
        "overloaded".to_string(),
    ))]));
    let ai = fast_ai_fallback(oracle.clone());

    let result = ai.resolve_via_ai("無名苑", None).await;

    assert_eq!(result.method, "fallback");
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_unparseable_reply_uses_synthetic_fallback() {
    let oracle = Arc::new(MockOracle::replying("抱歉，我不確定。"));
    let ai = fast_ai_fallback(oracle);

    let result = ai.resolve_via_ai("無名苑", None).await;

    assert_eq!(result.english_name, "無名苑 Residence");
    assert_eq!(result.layer, 3);
}

#[tokio::test]
async fn test_free_text_reply_is_extracted() {
    let oracle = Arc::new(MockOracle::replying(
        "English name: Harbour Green (official developer listing)",
    ));
    let ai = fast_ai_fallback(oracle);

    let result = ai.resolve_via_ai("君臨天下", None).await;

    assert_eq!(result.english_name, "Harbour Green");
    assert_eq!(result.method, "text_extraction");
    assert_eq!(result.confidence, 0.9);
}

#[tokio::test]
async fn test_knowledge_request_carries_no_search() {
    let oracle = Arc::new(MockOracle::unreachable());
    let ai = fast_ai_fallback(oracle.clone());

    let mut context = hkpt_resolver::types::Context::new();
    context.insert("developer".to_string(), serde_json::json!("Sun Hung Kai"));
    ai.resolve_via_ai("峻弦", Some(&context)).await;

    let request = oracle.last_request().unwrap();
    assert!(request.search.is_none());
    assert!(request.prompt.contains("峻弦"));
    assert!(request.prompt.contains("Sun Hung Kai"));
    assert_eq!(request.temperature, 0.0);
}

#[tokio::test]
async fn test_live_request_restricts_sources() {
    let oracle = Arc::new(MockOracle::unreachable().with_live_search());
    let ai = fast_ai_fallback(oracle.clone());

    ai.resolve_via_ai("峻弦", None).await;

    let search = oracle.last_request().unwrap().search.unwrap();
    assert_eq!(search.allowed_websites, vec!["midland.com.hk", "gov.hk"]);
    assert!(search.include_news);
    assert!(search.return_citations);
    assert_eq!(search.from_date.to_string(), "2023-01-01");
    assert!(search.to_date >= search.from_date);
}

#[tokio::test]
async fn test_citations_are_attached_to_search_analysis() {
    let oracle = Arc::new(
        MockOracle::new(vec![Ok(OracleReply {
            content: structured_reply("The Austin", 0.8, "live_search_official"),
            citations: vec!["https://www.theaustin.com.hk".to_string()],
        })])
        .with_live_search(),
    );
    let ai = fast_ai_fallback(oracle);

    let result = ai.resolve_via_ai("天璽", None).await;

    let analysis = result.search_analysis.unwrap();
    assert_eq!(analysis["citations"][0], "https://www.theaustin.com.hk");
    assert_eq!(analysis["official_found"], true);
    assert!((result.confidence - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn test_translate_text_returns_trimmed_reply() {
    let oracle = Arc::new(MockOracle::replying("  @@PRO1@@ is a sea-view flat in Tai Koo.\n"));
    let ai = fast_ai_fallback(oracle.clone());

    let translated = ai.translate_text("@@PRO1@@ 係太古嘅海景單位").await.unwrap();

    assert_eq!(translated, "@@PRO1@@ is a sea-view flat in Tai Koo.");
    let request = oracle.last_request().unwrap();
    assert!(request.prompt.contains("@@PRO1@@ 係太古嘅海景單位"));
    assert!(request.search.is_none());
}

#[tokio::test]
async fn test_translate_text_rejects_empty_reply() {
    let oracle = Arc::new(MockOracle::replying("   "));
    let ai = fast_ai_fallback(oracle);

    assert_eq!(
        ai.translate_text("你好").await,
        Err(AiFailure::EmptyReply)
    );
}

#[tokio::test]
async fn test_translate_text_surfaces_oracle_failure() {
    let ai = fast_ai_fallback(Arc::new(MockOracle::unreachable()));

    let outcome = ai.translate_text("你好").await;

    assert!(matches!(outcome, Err(AiFailure::Transient { attempts: 3, .. })));
}
