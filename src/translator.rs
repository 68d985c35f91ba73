use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::toast::Severity;

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const TEMPERATURE: f64 = 0.7;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("no OpenRouter API key configured")]
    MissingCredential,
    #[error("nothing to translate")]
    EmptyInput,
    #[error("custom model selected but no model name given")]
    MissingCustomModel,
    #[error("a translation is already running")]
    Busy,
    #[error("API error: {status} {reason}")]
    Remote { status: u16, reason: String },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    MalformedResponse(String),
}

impl TranslationError {
    pub fn severity(&self) -> Severity {
        match self {
            TranslationError::MissingCredential
            | TranslationError::EmptyInput
            | TranslationError::Busy => Severity::Warning,
            TranslationError::MissingCustomModel
            | TranslationError::Remote { .. }
            | TranslationError::Transport(_)
            | TranslationError::MalformedResponse(_) => Severity::Error,
        }
    }
}

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(serde::Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub fn build_prompt(source_lang: &str, target_lang: &str, text: &str) -> String {
    format!(
        "Translate the following text from {} to {}. Keep the meaning intact and maintain the original formatting. Do not add any explanations or additional text.\n\nText to translate:\n{}",
        source_lang, target_lang, text
    )
}

/// OpenRouter chat-completion client. At most one request per instance is in flight.
pub struct Translator {
    client: reqwest::Client,
    endpoint: String,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Translator {
    pub fn new(timeout: Option<Duration>) -> Result<Self, TranslationError> {
        Self::with_endpoint(OPENROUTER_URL, timeout)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, TranslationError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.into(),
            in_flight: AtomicBool::new(false),
        })
    }

    fn acquire(&self) -> Result<InFlight<'_>, TranslationError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(&self.in_flight))
            .map_err(|_| TranslationError::Busy)
    }

    pub async fn translate(
        &self,
        source_text: &str,
        source_lang: &str,
        target_lang: &str,
        credential: &str,
        model_id: &str,
    ) -> Result<String, TranslationError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(TranslationError::MissingCredential);
        }
        let text = source_text.trim();
        if text.is_empty() {
            return Err(TranslationError::EmptyInput);
        }
        let model = model_id.trim();
        if model.is_empty() {
            return Err(TranslationError::MissingCustomModel);
        }
        let _guard = self.acquire()?;

        let prompt = build_prompt(source_lang, target_lang, text);
        let req = ChatRequest {
            model,
            messages: vec![ChatMessage { role: "user", content: &prompt }],
            temperature: TEMPERATURE,
        };

        tracing::info!(
            "translating {} chars {} -> {} with model {}",
            text.chars().count(),
            source_lang,
            target_lang,
            model
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!("OpenRouter returned {}: {}", status, body);
            return Err(TranslationError::Remote {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = resp.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| TranslationError::MalformedResponse(e.to_string()))?;
        let out = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                TranslationError::MalformedResponse("missing choices[0].message.content".into())
            })?;
        Ok(out.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PATH: &str = "/api/v1/chat/completions";

    impl Translator {
        fn is_busy(&self) -> bool {
            self.in_flight.load(Ordering::Acquire)
        }
    }

    fn translator_for(server: &MockServer) -> Translator {
        Translator::with_endpoint(format!("{}{}", server.uri(), PATH), None).unwrap()
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.map(|r| r.len()).unwrap_or(0)
    }

    #[test]
    fn prompt_embeds_languages_and_text() {
        let prompt = build_prompt("Japanese", "German", "こんにちは\n  世界");
        assert!(prompt.contains("from Japanese to German"));
        assert!(prompt.ends_with("Text to translate:\nこんにちは\n  世界"));
        assert!(prompt.contains("Do not add any explanations or additional text."));
    }

    #[tokio::test]
    async fn sends_expected_request_and_trims_reply() {
        let server = MockServer::start().await;
        let prompt = build_prompt("English", "French", "Hello");
        Mock::given(method("POST"))
            .and(path(PATH))
            .and(header("authorization", "Bearer sk-or-test"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "model": "openai/gpt-4o-mini",
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": 0.7
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "  Bonjour  " } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = translator_for(&server)
            .translate("  Hello \n", "English", "French", "sk-or-test", "openai/gpt-4o-mini")
            .await
            .unwrap();
        assert_eq!(out, "Bonjour");
    }

    #[tokio::test]
    async fn unauthorized_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":\"bad key\"}"))
            .mount(&server)
            .await;

        let err = translator_for(&server)
            .translate("Hello", "English", "French", "sk-or-bad", "openai/gpt-4o-mini")
            .await
            .unwrap_err();
        match &err {
            TranslationError::Remote { status, reason } => {
                assert_eq!(*status, 401);
                assert_eq!(reason, "Unauthorized");
            }
            other => panic!("expected Remote, got {:?}", other),
        }
        assert_eq!(err.to_string(), "API error: 401 Unauthorized");
        assert_eq!(err.severity(), Severity::Error);
    }

    #[tokio::test]
    async fn body_without_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "gen-1" })))
            .mount(&server)
            .await;

        let err = translator_for(&server)
            .translate("Hello", "English", "French", "sk-or-test", "openai/gpt-4o-mini")
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn empty_choices_and_null_content_are_malformed() {
        for body in [
            json!({ "choices": [] }),
            json!({ "choices": [{ "message": { "content": null } }] }),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;

            let err = translator_for(&server)
                .translate("Hello", "English", "French", "sk-or-test", "openai/gpt-4o-mini")
                .await
                .unwrap_err();
            assert!(matches!(err, TranslationError::MalformedResponse(_)));
        }
    }

    #[tokio::test]
    async fn preconditions_fail_without_network() {
        let server = MockServer::start().await;
        let t = translator_for(&server);

        let err = t.translate("Hello", "English", "French", "", "m").await.unwrap_err();
        assert!(matches!(err, TranslationError::MissingCredential));
        assert_eq!(err.severity(), Severity::Warning);

        let err = t.translate(" \n\t ", "English", "French", "key", "m").await.unwrap_err();
        assert!(matches!(err, TranslationError::EmptyInput));

        let err = t.translate("Hello", "English", "French", "key", "  ").await.unwrap_err();
        assert!(matches!(err, TranslationError::MissingCustomModel));

        assert_eq!(request_count(&server).await, 0);
        assert!(!t.is_busy());
    }

    #[tokio::test]
    async fn second_concurrent_call_is_busy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "choices": [{ "message": { "content": "Hallo" } }] }))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let t = translator_for(&server);
        let (first, second) = tokio::join!(
            t.translate("Hello", "English", "German", "key", "m"),
            t.translate("Hello", "English", "German", "key", "m"),
        );
        assert_eq!(first.unwrap(), "Hallo");
        assert!(matches!(second, Err(TranslationError::Busy)));
        assert!(!t.is_busy());
        assert_eq!(request_count(&server).await, 1);

        // the flag is released after completion
        let again = t.translate("Hello", "English", "German", "key", "m").await;
        assert_eq!(again.unwrap(), "Hallo");
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let t = Translator::with_endpoint("http://127.0.0.1:9/v1/chat", Some(Duration::from_secs(5)))
            .unwrap();
        let err = t
            .translate("Hello", "English", "French", "key", "m")
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::Transport(_)));
        assert!(!t.is_busy());
    }
}
