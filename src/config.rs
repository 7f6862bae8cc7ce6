use anyhow::{Context, Result};

use crate::cms::DEFAULT_MANAGEMENT_API_URL;

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,

    // Management API (project id and key come with each request)
    pub management_api_url: String,

    // Translation
    pub translation_provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: std::env::var("PORT")
                .ok()
                .map(|v| v.parse::<u16>().context("PORT must be a port number"))
                .transpose()?
                .unwrap_or(8080),

            management_api_url: std::env::var("MANAGEMENT_API_URL")
                .unwrap_or_else(|_| DEFAULT_MANAGEMENT_API_URL.to_string()),

            translation_provider: std::env::var("TRANSLATION_PROVIDER")
                .unwrap_or_else(|_| "stub".to_string()),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
        })
    }
}
