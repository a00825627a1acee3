//! OpenAI-compatible chat completion classifier.

use super::{Classification, Classifier, ClassifierError, parse_classification};
use crate::models::{PaymentMethod, TransactionCategory, TransactionType};
use crate::services::metrics::record_classifier_result;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Secret<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

pub struct OpenAiClassifier {
    config: OpenAiConfig,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiClassifier {
    pub fn new(config: OpenAiConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn system_prompt() -> String {
        let list = |codes: Vec<&str>| codes.join(", ");
        format!(
            "You classify personal bank transactions. Reply with JSON only, shaped as \
             {{\"type\": ..., \"category\": ..., \"paymentMethod\": ..., \"categoryName\": ...}}. \
             type is one of: {}. category is one of: {}. paymentMethod is one of: {}. \
             categoryName is a short human label for the merchant's category.",
            list(TransactionType::ALL.iter().map(|v| v.as_str()).collect()),
            list(TransactionCategory::ALL.iter().map(|v| v.as_str()).collect()),
            list(PaymentMethod::ALL.iter().map(|v| v.as_str()).collect()),
        )
    }

    fn user_prompt(title: &str, category_hint: Option<&str>) -> String {
        match category_hint {
            Some(hint) => format!("Transaction: \"{}\"\nSuggested category: {}", title, hint),
            None => format!("Transaction: \"{}\"", title),
        }
    }

    async fn request(
        &self,
        title: &str,
        category_hint: Option<&str>,
    ) -> Result<Classification, ClassifierError> {
        let body = ChatRequest {
            model: &self.config.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Self::system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::user_prompt(title, category_hint),
                },
            ],
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        tracing::debug!(model = %self.config.model, title_len = title.len(), "Requesting classification");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(format!("{}: {}", status, text)));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifierError::Malformed("empty choices".to_string()))?;

        parse_classification(&content)
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, title: &str, category_hint: Option<&str>) -> Classification {
        match self.request(title, category_hint).await {
            Ok(classification) => {
                record_classifier_result("model");
                classification
            }
            Err(e) => {
                tracing::warn!(error = %e, "Classifier failed, using fallback classification");
                record_classifier_result("fallback");
                Classification::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn classifier(server: &MockServer) -> OpenAiClassifier {
        OpenAiClassifier::new(OpenAiConfig {
            api_key: Secret::new("test-key".to_string()),
            model: "gpt-3.5-turbo".to_string(),
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn reply(content: &str) -> serde_json::Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[tokio::test]
    async fn returns_model_classification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                "```json\n{\"type\":\"EXPENSE\",\"category\":\"FOOD_DELIVERY\",\"paymentMethod\":\"PIX\"}\n```",
            )))
            .mount(&server)
            .await;

        let result = classifier(&server).classify("ifood *pedido", Some("FOOD")).await;

        assert_eq!(result.category, TransactionCategory::FoodDelivery);
        assert_eq!(result.payment_method, PaymentMethod::Pix);
    }

    #[tokio::test]
    async fn falls_back_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = classifier(&server).classify("padaria", None).await;
        assert_eq!(result, Classification::fallback());
    }

    #[tokio::test]
    async fn falls_back_on_unknown_enum_value() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                r#"{"type":"SPENDING","category":"FOOD","paymentMethod":"PIX"}"#,
            )))
            .mount(&server)
            .await;

        let result = classifier(&server).classify("padaria", None).await;
        assert_eq!(result, Classification::fallback());
    }

    #[tokio::test]
    async fn falls_back_when_unreachable() {
        let config = OpenAiConfig {
            api_key: Secret::new("test-key".to_string()),
            model: "gpt-3.5-turbo".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(500),
        };
        let result = OpenAiClassifier::new(config)
            .unwrap()
            .classify("padaria", None)
            .await;

        assert_eq!(result, Classification::fallback());
    }
}
