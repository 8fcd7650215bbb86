use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::config::Config;
use crate::error::{GatewayFault, GenerationTarget, RemoteServiceError};
use crate::gateway::{ContentService, Evaluation, Flashcard, PyqAnalysis, Question, prompts, response};
use crate::store::schema::MockTestOptions;

/// Blocking client for the Gemini `generateContent` REST endpoint.
///
/// Calls run on worker threads, so blocking I/O here never stalls the UI.
/// No request timeout is set; the remote service's own limits apply.
pub struct GeminiClient {
    #[cfg(feature = "network")]
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    fast_model: String,
    reasoning_model: String,
    notes_temperature: f64,
}

impl GeminiClient {
    pub fn from_config(config: &Config, api_key: Option<String>) -> Result<Self, GatewayFault> {
        #[cfg(feature = "network")]
        let http = reqwest::blocking::Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| GatewayFault::Transport(e.to_string()))?;

        Ok(Self {
            #[cfg(feature = "network")]
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            fast_model: config.fast_model.clone(),
            reasoning_model: config.reasoning_model.clone(),
            notes_temperature: config.notes_temperature,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    fn api_key(&self) -> Result<&str, GatewayFault> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GatewayFault::MissingApiKey(self.api_key_env.clone()))
    }

    #[cfg(feature = "network")]
    fn post(&self, model: &str, body: &Value) -> Result<Value, GatewayFault> {
        let key = self.api_key()?;
        tracing::debug!(model, "sending generateContent request");

        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", key)
            .json(body)
            .send()
            .map_err(|e| GatewayFault::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayFault::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .map_err(|e| GatewayFault::Transport(e.to_string()))
    }

    #[cfg(not(feature = "network"))]
    fn post(&self, _model: &str, _body: &Value) -> Result<Value, GatewayFault> {
        self.api_key()?;
        Err(GatewayFault::NetworkDisabled)
    }
}

fn generation_failed(target: GenerationTarget, fault: GatewayFault) -> RemoteServiceError {
    tracing::error!(?target, error = %fault, "generation request failed");
    RemoteServiceError::Generation {
        target,
        source: fault,
    }
}

impl ContentService for GeminiClient {
    fn generate_notes(&self, text: &str) -> Result<String, RemoteServiceError> {
        let body = prompts::notes_request(text, self.notes_temperature);
        self.post(&self.fast_model, &body)
            .and_then(|r| response::candidate_text(&r))
            .map_err(|fault| generation_failed(GenerationTarget::Notes, fault))
    }

    fn generate_flashcards(&self, text: &str) -> Result<Vec<Flashcard>, RemoteServiceError> {
        let body = prompts::flashcards_request(text);
        self.post(&self.fast_model, &body)
            .and_then(|r| response::parse_structured(&r))
            .map_err(|fault| generation_failed(GenerationTarget::Flashcards, fault))
    }

    fn analyze_document(
        &self,
        content: &[u8],
        mime_type: &str,
    ) -> Result<PyqAnalysis, RemoteServiceError> {
        let body = prompts::analysis_request(&STANDARD.encode(content), mime_type);
        self.post(&self.reasoning_model, &body)
            .and_then(|r| response::parse_structured(&r))
            .map_err(|fault| {
                tracing::error!(mime_type, bytes = content.len(), error = %fault, "question paper analysis failed");
                RemoteServiceError::Analysis(fault)
            })
    }

    fn generate_test(
        &self,
        options: &MockTestOptions,
    ) -> Result<Vec<Question>, RemoteServiceError> {
        let body = prompts::test_request(options);
        self.post(&self.reasoning_model, &body)
            .and_then(|r| response::parse_structured(&r))
            .map_err(|fault| generation_failed(GenerationTarget::MockTest, fault))
    }

    fn evaluate_answer(
        &self,
        question: &str,
        user_answer: &str,
        model_answer: &str,
        max_marks: f64,
    ) -> Result<Evaluation, RemoteServiceError> {
        let body = prompts::evaluation_request(question, user_answer, model_answer, max_marks);
        self.post(&self.fast_model, &body)
            .and_then(|r| response::parse_structured(&r))
            .map_err(|fault| {
                tracing::error!(error = %fault, "answer evaluation failed");
                RemoteServiceError::Evaluation(fault)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uses_model_and_trims_base_url() {
        let mut config = Config::default();
        config.api_base_url = "http://localhost:8080/".to_string();
        let client = GeminiClient::from_config(&config, Some("k".to_string())).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.5-flash"),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn missing_key_fails_with_call_specific_message() {
        let client = GeminiClient::from_config(&Config::default(), None).unwrap();
        assert!(!client.has_api_key());

        let err = client.evaluate_answer("Q", "A", "M", 2.0).unwrap_err();
        assert!(matches!(err, RemoteServiceError::Evaluation(GatewayFault::MissingApiKey(_))));
        assert_eq!(
            err.to_string(),
            "The AI could not evaluate your answer at this time. Please try again."
        );

        let err = client.generate_notes("text").unwrap_err();
        assert!(err.to_string().starts_with("Failed to generate revision notes"));
    }
}
