//! AI enhancement gate.
//!
//! Optional cleanup of ambiguous scraped text through an OpenAI-compatible
//! completion service. The gate is a per-run circuit breaker: the first
//! quota or billing failure latches it for the rest of the run and every
//! later call returns its input untouched without going to the network.
//! Non-quota failures degrade that one call only.

use std::sync::atomic::{AtomicBool, Ordering};

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::config::Config;

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 1024;

pub struct AiGate {
    client: Option<Client<OpenAIConfig>>,
    model_name: String,
    quota_latched: AtomicBool,
}

impl AiGate {
    /// One gate per run. A missing key or `ai_enabled = false` builds a
    /// permanently pass-through gate.
    pub fn new(config: &Config) -> Self {
        let client = if config.ai_enabled && !config.ai_api_key.is_empty() {
            let openai_config = OpenAIConfig::new()
                .with_api_key(&config.ai_api_key)
                .with_api_base(&config.ai_api_base_url);
            Some(Client::with_config(openai_config))
        } else {
            debug!("AI enhancement disabled by configuration");
            None
        };

        Self {
            client,
            model_name: config.ai_model_name.clone(),
            quota_latched: AtomicBool::new(false),
        }
    }

    /// True once a quota/billing failure has been seen this run.
    pub fn is_latched(&self) -> bool {
        self.quota_latched.load(Ordering::Relaxed)
    }

    /// Rewrite a scraped summary into clean prose. Falls back to the input.
    pub async fn enhance_summary(&self, summary: &str) -> String {
        if summary.trim().is_empty() {
            return summary.to_string();
        }
        self.complete_or(
            "You clean scraped text from funding-program websites. Rewrite the user's text as \
             one or two plain sentences describing the program. Remove navigation fragments and \
             marketing language. Respond with the cleaned text only.",
            summary,
            false,
        )
        .await
        .unwrap_or_else(|| summary.to_string())
    }

    /// Rewrite scraped eligibility criteria. Falls back to the input.
    pub async fn enhance_eligibility(&self, eligibility: &str) -> String {
        if eligibility.trim().is_empty() {
            return eligibility.to_string();
        }
        self.complete_or(
            "You clean scraped eligibility criteria from funding-program websites. Rewrite the \
             user's text as a short plain-prose list of who qualifies. Respond with the cleaned \
             text only.",
            eligibility,
            false,
        )
        .await
        .unwrap_or_else(|| eligibility.to_string())
    }

    /// Assign sector tags to a program description. Falls back to the
    /// current tags.
    pub async fn categorize(&self, description: &str, current_sectors: &str) -> String {
        if description.trim().is_empty() {
            return current_sectors.to_string();
        }
        self.complete_or(
            "Given a funding-program description, reply with a comma-separated list of lowercase \
             industry sectors it targets, and nothing else.",
            description,
            false,
        )
        .await
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| current_sectors.to_string())
    }

    /// Full structured extraction from ambiguous page text. `None` means
    /// the caller keeps the record it already has.
    pub async fn extract_structured(&self, page_text: &str) -> Option<JsonValue> {
        let response = self
            .complete_or(
                "Extract funding-program fields from the user's page text. Respond with a single \
                 JSON object with the keys: name, summary, eligibility, fundingAmount, deadlines, \
                 contactEmail, contactPhone, applicationProcess, sectors. Use empty strings for \
                 anything absent.",
                page_text,
                true,
            )
            .await?;
        serde_json::from_str(&response).ok()
    }

    /// One completion round-trip, or `None`. Checks the latch before any
    /// network I/O; classifies the failure afterwards.
    async fn complete_or(
        &self,
        system_message: &str,
        user_message: &str,
        json_mode: bool,
    ) -> Option<String> {
        if self.is_latched() {
            return None;
        }
        let client = self.client.as_ref()?;

        let request = {
            let system = ChatCompletionRequestSystemMessageArgs::default()
                .content(system_message)
                .build()
                .ok()?;
            let user = ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .ok()?;
            let messages = vec![
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ];

            let mut builder = CreateChatCompletionRequestArgs::default();
            builder
                .model(&self.model_name)
                .messages(messages)
                .temperature(TEMPERATURE)
                .max_tokens(MAX_TOKENS);
            if json_mode {
                builder.response_format(ResponseFormat::JsonObject);
            }
            builder.build().ok()?
        };

        match client.chat().create(request).await {
            Ok(response) => {
                let content = response
                    .choices
                    .first()
                    .and_then(|choice| choice.message.content.clone())?;
                let content = content.trim();
                if content.is_empty() {
                    None
                } else {
                    Some(content.to_string())
                }
            }
            Err(e) => {
                self.record_failure(&e.to_string());
                None
            }
        }
    }

    /// Latch on quota/billing signals; anything else degrades one call.
    fn record_failure(&self, message: &str) {
        if is_quota_failure(message) {
            warn!("AI quota/billing failure, enhancement disabled for this run: {}", message);
            self.quota_latched.store(true, Ordering::Relaxed);
        } else {
            warn!("AI call failed, passing text through unchanged: {}", message);
        }
    }
}

/// HTTP 429 or a message mentioning quota/billing.
fn is_quota_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("429") || lower.contains("quota") || lower.contains("billing")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough_gate() -> AiGate {
        let config = Config {
            ai_enabled: true,
            ai_api_key: String::new(),
            ..Config::default()
        };
        AiGate::new(&config)
    }

    #[test]
    fn quota_signals_are_recognised() {
        assert!(is_quota_failure("HTTP 429 Too Many Requests"));
        assert!(is_quota_failure("You exceeded your current quota"));
        assert!(is_quota_failure("Billing hard limit reached"));
        assert!(!is_quota_failure("connection reset by peer"));
    }

    #[test]
    fn quota_failure_latches_other_failures_do_not() {
        let gate = passthrough_gate();
        gate.record_failure("connection reset by peer");
        assert!(!gate.is_latched());
        gate.record_failure("HTTP 429 Too Many Requests");
        assert!(gate.is_latched());
        // Monotonic within a run.
        gate.record_failure("connection reset by peer");
        assert!(gate.is_latched());
    }

    #[tokio::test]
    async fn latched_gate_returns_input_unchanged() {
        let gate = passthrough_gate();
        gate.record_failure("insufficient_quota: please check billing");
        assert!(gate.is_latched());

        let original = "Grants for rural agro-processing businesses.";
        assert_eq!(gate.enhance_summary(original).await, original);
        assert_eq!(gate.enhance_eligibility(original).await, original);
        assert_eq!(gate.categorize(original, "agriculture").await, "agriculture");
        assert!(gate.extract_structured(original).await.is_none());
    }

    #[tokio::test]
    async fn keyless_gate_passes_text_through() {
        let gate = passthrough_gate();
        let original = "Support for township manufacturers.";
        assert_eq!(gate.enhance_summary(original).await, original);
        assert!(!gate.is_latched());
    }

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let gate = passthrough_gate();
        assert_eq!(gate.enhance_summary("  ").await, "  ");
    }
}
