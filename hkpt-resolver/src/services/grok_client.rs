//! xAI Grok chat-completions client
//!
//! Sends one OpenAI-style chat request per call. When the request carries a
//! [`SearchConfig`] and live search is enabled, `search_parameters` restrict
//! the consulted web sources and ask for citations.
//!
//! Calls pass through a client-side `governor` quota before hitting the API.
//! Retries are not done here; the AI layer owns the retry policy.

use crate::services::oracle::{
    OracleError, OracleReply, OracleRequest, SearchConfig, TranslationOracle,
};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use hkpt_common::config::OracleConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

const ORACLE_NAME: &str = "grok";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SearchSource<'a> {
    Web { allowed_websites: &'a [String] },
    News,
}

#[derive(Debug, Serialize)]
struct SearchParameters<'a> {
    mode: &'a str,
    sources: Vec<SearchSource<'a>>,
    from_date: String,
    to_date: String,
    return_citations: bool,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_parameters: Option<SearchParameters<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Grok oracle client
pub struct GrokClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    live_search: bool,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl GrokClient {
    /// Build a client from the oracle section of the config
    ///
    /// A missing key is accepted; every call then fails with
    /// [`OracleError::Auth`].
    pub fn new(api_key: Option<String>, config: &OracleConfig) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| OracleError::Connection(e.to_string()))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            live_search: config.live_search,
            rate_limiter,
        })
    }

    fn build_body<'a>(&'a self, request: &'a OracleRequest) -> ChatRequest<'a> {
        let search_parameters = request
            .search
            .as_ref()
            .filter(|_| self.live_search)
            .map(build_search_parameters);

        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            stream: false,
            search_parameters,
        }
    }
}

fn build_search_parameters(search: &SearchConfig) -> SearchParameters<'_> {
    let mut sources = vec![SearchSource::Web {
        allowed_websites: &search.allowed_websites,
    }];
    if search.include_news {
        sources.push(SearchSource::News);
    }

    SearchParameters {
        mode: "on",
        sources,
        from_date: search.from_date.format("%Y-%m-%d").to_string(),
        to_date: search.to_date.format("%Y-%m-%d").to_string(),
        return_citations: search.return_citations,
    }
}

/// Map a non-success HTTP status onto the oracle error taxonomy
fn classify_status(status: StatusCode, body: String) -> OracleError {
    match status.as_u16() {
        401 | 403 => OracleError::Auth(body),
        429 => OracleError::RateLimited,
        408 => OracleError::Timeout,
        code if status.is_server_error() => OracleError::Server(code, body),
        _ => OracleError::BadRequest(format!("HTTP {}: {}", status.as_u16(), body)),
    }
}

fn classify_transport(err: reqwest::Error) -> OracleError {
    if err.is_timeout() {
        OracleError::Timeout
    } else {
        OracleError::Connection(err.to_string())
    }
}

#[async_trait]
impl TranslationOracle for GrokClient {
    fn name(&self) -> &str {
        ORACLE_NAME
    }

    fn supports_live_search(&self) -> bool {
        self.live_search
    }

    async fn complete(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| OracleError::Auth("Grok API key not configured".to_string()))?;

        self.rate_limiter.until_ready().await;

        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(request);

        tracing::debug!(
            model = %self.model,
            live_search = body.search_parameters.is_some(),
            "Calling Grok chat completions"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, error_text));
        }

        let body = response.text().await.map_err(classify_transport)?;
        decode_reply(&body)
    }
}

/// Decode a successful chat-completions body
///
/// An undecodable body is a `BadRequest`: resending the same request would
/// get the same answer.
fn decode_reply(body: &str) -> Result<OracleReply, OracleError> {
    let chat: ChatResponse = serde_json::from_str(body)
        .map_err(|e| OracleError::BadRequest(format!("Undecodable response body: {}", e)))?;
    let content = chat
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    Ok(OracleReply {
        content,
        citations: chat.citations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn search() -> SearchConfig {
        SearchConfig {
            allowed_websites: vec!["midland.com.hk".to_string(), "gov.hk".to_string()],
            include_news: true,
            from_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            to_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            return_citations: true,
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, "no".into()),
            OracleError::Auth("no".into())
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            OracleError::RateLimited
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY, "down".into()),
            OracleError::Server(502, "down".into())
        );
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, String::new()),
            OracleError::BadRequest(_)
        ));
    }

    #[test]
    fn test_body_includes_search_parameters() {
        let client = GrokClient::new(Some("xai-test".into()), &OracleConfig::default()).unwrap();
        let request = OracleRequest::new("system", "prompt").with_search(search());

        let json = serde_json::to_value(client.build_body(&request)).unwrap();

        assert_eq!(json["model"], "grok-3");
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "prompt");
        let params = &json["search_parameters"];
        assert_eq!(params["mode"], "on");
        assert_eq!(params["sources"][0]["type"], "web");
        assert_eq!(params["sources"][0]["allowed_websites"][1], "gov.hk");
        assert_eq!(params["sources"][1]["type"], "news");
        assert_eq!(params["from_date"], "2023-01-01");
        assert_eq!(params["to_date"], "2025-06-30");
        assert_eq!(params["return_citations"], true);
    }

    #[test]
    fn test_body_omits_search_when_disabled() {
        let config = OracleConfig {
            live_search: false,
            ..OracleConfig::default()
        };
        let client = GrokClient::new(Some("xai-test".into()), &config).unwrap();
        let request = OracleRequest::new("system", "prompt").with_search(search());

        let json = serde_json::to_value(client.build_body(&request)).unwrap();

        assert!(json.get("search_parameters").is_none());
        assert!(!client.supports_live_search());
    }

    #[test]
    fn test_decode_reply() {
        let reply = decode_reply(
            r#"{"choices":[{"message":{"content":"{\"ok\":1}"}}],"citations":["https://gov.hk"]}"#,
        )
        .unwrap();
        assert_eq!(reply.content, "{\"ok\":1}");
        assert_eq!(reply.citations, vec!["https://gov.hk".to_string()]);

        let empty = decode_reply(r#"{"choices":[]}"#).unwrap();
        assert_eq!(empty, OracleReply::default());
    }

    #[test]
    fn test_undecodable_body_is_not_retryable() {
        let err = decode_reply("<html>502 Bad Gateway</html>").unwrap_err();

        assert!(matches!(err, OracleError::BadRequest(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_key_reports_auth() {
        let client = GrokClient::new(None, &OracleConfig::default()).unwrap();
        let result = client.complete(&OracleRequest::new("s", "p")).await;

        assert!(matches!(result, Err(OracleError::Auth(_))));
    }
}
