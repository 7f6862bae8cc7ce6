//! Translation provider boundary.
//!
//! The pipeline hands a provider one flat `key -> text` map per item and gets
//! back one map per target language. Keys must come back untouched; they are
//! the only link between a translated string and the element it belongs to.

use crate::config::Config;
use crate::model::{Language, TextMap};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Translated maps keyed by target language id.
pub type TranslatedTexts = HashMap<String, TextMap>;

/// External translation step.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(
        &self,
        texts: &TextMap,
        source_language: &Language,
        target_languages: &[Language],
    ) -> Result<TranslatedTexts>;

    /// Used in logs.
    fn provider_name(&self) -> &str;
}

/// Pick the provider named by `TRANSLATION_PROVIDER`.
pub fn provider_from_config(config: &Config, http: reqwest::Client) -> Result<Arc<dyn TranslationProvider>> {
    match config.translation_provider.as_str() {
        "stub" => Ok(Arc::new(StubTranslator::new(StubMode::Placeholder))),
        "openai" => {
            let api_key = config
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY not set (required by TRANSLATION_PROVIDER=openai)")?;
            Ok(Arc::new(OpenAiTranslator {
                http,
                api_key,
                api_url: config.openai_api_url.clone(),
                model: config.openai_model.clone(),
            }))
        }
        other => anyhow::bail!("Unknown TRANSLATION_PROVIDER '{}' (expected 'stub' or 'openai')", other),
    }
}

// ==================== Stub ====================

pub const PLACEHOLDER_TRANSLATION: &str = "Translated";

#[derive(Debug, Clone)]
pub enum StubMode {
    /// Every value becomes [`PLACEHOLDER_TRANSLATION`].
    Placeholder,
    /// Append the target codename: "Hello" → "Hello (es)"
    Suffix,
    /// Fail every call with this message
    Error(String),
}

/// Provider that does not translate, for wiring and tests.
#[derive(Debug, Clone)]
pub struct StubTranslator {
    mode: StubMode,
}

impl StubTranslator {
    pub fn new(mode: StubMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl TranslationProvider for StubTranslator {
    async fn translate(
        &self,
        texts: &TextMap,
        source_language: &Language,
        target_languages: &[Language],
    ) -> Result<TranslatedTexts> {
        info!(
            "Stub translation of {} texts from {} into [{}]",
            texts.len(),
            source_language.codename,
            target_languages
                .iter()
                .map(|l| l.codename.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        debug!("Texts to translate: {:?}", texts);

        if let StubMode::Error(message) = &self.mode {
            anyhow::bail!("Translation provider error: {}", message);
        }

        Ok(target_languages
            .iter()
            .map(|language| {
                let translated = texts
                    .iter()
                    .map(|(key, text)| {
                        let value = match &self.mode {
                            StubMode::Suffix => format!("{} ({})", text, language.codename),
                            _ => PLACEHOLDER_TRANSLATION.to_string(),
                        };
                        (key.clone(), value)
                    })
                    .collect();
                (language.id.clone(), translated)
            })
            .collect())
    }

    fn provider_name(&self) -> &str {
        "Stub Translator"
    }
}

// ==================== OpenAI ====================

/// OpenAI Chat Completion request for translation
#[derive(Debug, Serialize)]
struct TranslationRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Translates through an OpenAI-compatible chat completions endpoint, one
/// request per target language.
#[derive(Debug, Clone)]
pub struct OpenAiTranslator {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiTranslator {
    pub fn new(http: reqwest::Client, api_key: String, api_url: String, model: String) -> Self {
        Self {
            http,
            api_key,
            api_url,
            model,
        }
    }

    async fn translate_into(&self, texts: &TextMap, source: &Language, target: &Language) -> Result<TextMap> {
        let payload = serde_json::to_string_pretty(texts).context("Failed to serialize texts for translation")?;

        let request = TranslationRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_translation_system_prompt(language_label(source), language_label(target)),
                },
                Message {
                    role: "user".to_string(),
                    content: payload,
                },
            ],
            temperature: 0.3,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .context("Failed to send translation request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!("OpenAI API error during translation ({}): {}", status, body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI translation response")?;

        let content = chat_response
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .context("OpenAI translation response contained no choices")?;

        serde_json::from_str(content).context("OpenAI translation was not a JSON object of strings")
    }
}

fn language_label(language: &Language) -> &str {
    language.name.as_deref().unwrap_or(&language.codename)
}

/// Build the system prompt for translation
fn build_translation_system_prompt(source_language: &str, target_language: &str) -> String {
    format!(
        r#"You are a professional translator. The user message is a JSON object whose values are CMS texts in {}. Translate every value to {}.

## Rules
- Answer with a JSON object only, no commentary.
- Keep every key exactly as given. Do not add, drop or rename keys.
- Values may contain HTML. Keep all tags and attributes unchanged; translate only the text between them.
- Values that look like URL slugs (lowercase words joined by hyphens) must stay URL slugs in {}.
- Keep proper names, product names and code untranslated."#,
        source_language, target_language, target_language
    )
}

#[async_trait]
impl TranslationProvider for OpenAiTranslator {
    async fn translate(
        &self,
        texts: &TextMap,
        source_language: &Language,
        target_languages: &[Language],
    ) -> Result<TranslatedTexts> {
        let mut translated = TranslatedTexts::new();

        for target in target_languages {
            // Nothing to send; an empty map still produces a write of linked content.
            if texts.is_empty() {
                translated.insert(target.id.clone(), TextMap::new());
                continue;
            }

            let result = self
                .translate_into(texts, source_language, target)
                .await
                .with_context(|| format!("Translation to {} failed", target.codename))?;
            translated.insert(target.id.clone(), result);
        }

        Ok(translated)
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}
