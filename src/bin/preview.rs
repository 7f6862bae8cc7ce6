//! Preview binary - resolves the linked content closure and prints the texts
//! that would be sent for translation, without translating or writing anything
//!
//! Usage:
//!   cargo run --bin preview -- <item-id> [<item-id> ...]
//!   cargo run --bin preview -- --save <item-id>   # Also write run-history/preview.json
//!
//! Required environment variables:
//! - KONTENT_PROJECT_ID
//! - KONTENT_MANAGEMENT_API_KEY
//! - SOURCE_LANGUAGE_ID
//!
//! Optional:
//! - MANAGEMENT_API_URL (defaults to the public Management API)

use anyhow::{Context, Result};
use linked_content_translation::closure::resolve_closure;
use linked_content_translation::cms::{ManagementClient, DEFAULT_MANAGEMENT_API_URL};
use linked_content_translation::extract::prepare_for_translation;
use linked_content_translation::model::{TextMap, TypesById};
use linked_content_translation::normalize::load_content_types;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

/// Minimal config for preview (no translation provider required)
struct PreviewConfig {
    project_id: String,
    api_key: String,
    source_language_id: String,
    management_api_url: String,
}

impl PreviewConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            project_id: std::env::var("KONTENT_PROJECT_ID").context("KONTENT_PROJECT_ID not set")?,
            api_key: std::env::var("KONTENT_MANAGEMENT_API_KEY")
                .context("KONTENT_MANAGEMENT_API_KEY not set")?,
            source_language_id: std::env::var("SOURCE_LANGUAGE_ID")
                .context("SOURCE_LANGUAGE_ID not set")?,
            management_api_url: std::env::var("MANAGEMENT_API_URL")
                .unwrap_or_else(|_| DEFAULT_MANAGEMENT_API_URL.to_string()),
        })
    }
}

/// Save the preview to the run history directory
fn save_preview(preview: &BTreeMap<String, TextMap>) -> Result<()> {
    let dir = Path::new("run-history");
    fs::create_dir_all(dir).context("Failed to create run-history directory")?;

    let path = dir.join("preview.json");
    let json = serde_json::to_string_pretty(preview)?;
    fs::write(&path, json).context("Failed to write preview")?;

    info!("Saved preview of {} items to {}", preview.len(), path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("linked_content_translation=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let save = args.iter().any(|arg| arg == "--save");
    let item_ids: Vec<String> = args.into_iter().filter(|arg| !arg.starts_with("--")).collect();

    if item_ids.is_empty() {
        anyhow::bail!("Usage: preview [--save] <item-id> [<item-id> ...]");
    }

    let config = PreviewConfig::from_env()?;
    let cms = ManagementClient::new(
        reqwest::Client::new(),
        config.management_api_url,
        config.project_id,
        config.api_key,
    );

    info!("Loading content types...");
    let types_by_id: TypesById = load_content_types(&cms)
        .await?
        .into_iter()
        .map(|t| (t.id.clone(), t))
        .collect();

    info!("Resolving linked content of {} items...", item_ids.len());
    let closure = resolve_closure(
        &cms,
        &item_ids,
        &config.source_language_id,
        &types_by_id,
        &HashSet::new(),
    )
    .await?;

    let mut preview = BTreeMap::new();
    for (item_id, entry) in closure.iter() {
        let content_type = &entry.content_type;
        let texts = prepare_for_translation(&entry.variant, content_type);
        info!(
            "Item {} ({}): {} texts",
            item_id,
            content_type.codename.as_deref().unwrap_or(&content_type.id),
            texts.len()
        );
        preview.insert(item_id.to_string(), texts);
    }

    println!("{}", serde_json::to_string_pretty(&preview)?);
    info!("{} items in closure", closure.len());

    if save {
        save_preview(&preview)?;
    }

    Ok(())
}
