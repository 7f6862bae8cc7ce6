//! Full translation run: schema → closure → extraction → translation →
//! write-back.

use crate::closure::resolve_closure;
use crate::cms::ContentManagement;
use crate::error::{Error, Result};
use crate::extract::prepare_for_translation;
use crate::model::{Language, LinkedReferences, TextMap, TypesById};
use crate::normalize::load_content_types;
use crate::translation::{TranslatedTexts, TranslationProvider};
use crate::validator::TranslationValidator;
use crate::write_back::convert_translations;
use anyhow::Context;
use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{error, info, warn};

/// What to translate, and into which languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationJob {
    pub item_ids: Vec<String>,
    pub from_language_id: String,
    pub to_language_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenVariant {
    pub item_id: String,
    pub language_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedWrite {
    pub item_id: String,
    pub language_id: String,
    pub error: String,
}

/// Outcome of the write-back phase, per (item, language) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranslationReport {
    pub written: Vec<WrittenVariant>,
    pub failed: Vec<FailedWrite>,
}

impl TranslationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Translatable texts of one item of the closure.
struct PreparedItem<'a> {
    item_id: &'a str,
    texts: TextMap,
    linked: &'a LinkedReferences,
}

/// Run a whole translation job.
///
/// Everything up to and including the translation call is all-or-nothing;
/// write-back failures are collected in the report instead.
pub async fn run_translation(
    cms: &dyn ContentManagement,
    translator: &dyn TranslationProvider,
    job: &TranslationJob,
) -> Result<TranslationReport> {
    info!(
        "Starting translation of {} items from {} into {} languages",
        job.item_ids.len(),
        job.from_language_id,
        job.to_language_ids.len()
    );

    // Step 1: schema snapshot
    let types_by_id: TypesById = load_content_types(cms)
        .await?
        .into_iter()
        .map(|t| (t.id.clone(), t))
        .collect();

    // Step 2: linked content closure
    let closure = resolve_closure(
        cms,
        &job.item_ids,
        &job.from_language_id,
        &types_by_id,
        &HashSet::new(),
    )
    .await?;

    // Step 3: extraction
    let prepared: Vec<PreparedItem> = closure
        .iter()
        .map(|(item_id, entry)| PreparedItem {
            item_id,
            texts: prepare_for_translation(&entry.variant, &entry.content_type),
            linked: &entry.linked,
        })
        .collect();

    info!(
        "Prepared {} texts across {} items",
        prepared.iter().map(|p| p.texts.len()).sum::<usize>(),
        prepared.len()
    );

    let (source_language, target_languages) = resolve_languages(cms, job).await?;

    // Step 4: translation, one provider call per item
    let translations: Vec<TranslatedTexts> = try_join_all(prepared.iter().map(|item| {
        let source_language = &source_language;
        let target_languages = &target_languages;
        async move {
            translator
                .translate(&item.texts, source_language, target_languages)
                .await
                .with_context(|| {
                    format!(
                        "{} failed to translate item {}",
                        translator.provider_name(),
                        item.item_id
                    )
                })
                .map_err(Error::from)
        }
    }))
    .await?;

    // Step 5: write-back, one upsert per (item, language)
    let writes = prepared
        .iter()
        .zip(translations.iter())
        .flat_map(|(item, translated)| {
            target_languages.iter().map(move |language| async move {
                let result = write_variant(cms, item, language, translated.get(&language.id)).await;
                (item.item_id, language.id.as_str(), result)
            })
        });

    let mut report = TranslationReport::default();
    for (item_id, language_id, result) in join_all(writes).await {
        match result {
            Ok(()) => report.written.push(WrittenVariant {
                item_id: item_id.to_string(),
                language_id: language_id.to_string(),
            }),
            Err(e) => {
                error!("Failed to write variant {}/{}: {}", item_id, language_id, e);
                report.failed.push(FailedWrite {
                    item_id: item_id.to_string(),
                    language_id: language_id.to_string(),
                    error: format!("{:#}", anyhow::Error::from(e)),
                });
            }
        }
    }

    info!(
        "Translation finished: {} variants written, {} failed",
        report.written.len(),
        report.failed.len()
    );

    Ok(report)
}

/// Look up the source language and the requested targets among the project
/// languages. Unknown targets are dropped; an unknown source is an error.
async fn resolve_languages(
    cms: &dyn ContentManagement,
    job: &TranslationJob,
) -> Result<(Language, Vec<Language>)> {
    let languages = cms.list_languages().await?;

    let source = languages
        .iter()
        .find(|l| l.id == job.from_language_id)
        .cloned()
        .ok_or_else(|| Error::UnknownLanguage {
            language_id: job.from_language_id.clone(),
        })?;

    let mut targets = Vec::with_capacity(job.to_language_ids.len());
    for language_id in &job.to_language_ids {
        match languages.iter().find(|l| &l.id == language_id) {
            Some(language) if targets.iter().all(|t: &Language| t.id != language.id) => {
                targets.push(language.clone())
            }
            Some(_) => {}
            None => warn!("Ignoring unknown target language {}", language_id),
        }
    }

    Ok((source, targets))
}

async fn write_variant(
    cms: &dyn ContentManagement,
    item: &PreparedItem<'_>,
    language: &Language,
    translated: Option<&TextMap>,
) -> Result<()> {
    let translated = translated.with_context(|| {
        format!(
            "Translation provider returned nothing for language {}",
            language.codename
        )
    })?;

    let validation = TranslationValidator::validate(&item.texts, translated);
    if !validation.is_clean() {
        warn!(
            "Translation validation for {}/{}: errors {:?}, warnings {:?}",
            item.item_id, language.codename, validation.errors, validation.warnings
        );
    }

    let elements = convert_translations(item.item_id, &item.texts, translated, item.linked)?;
    cms.upsert_item_variant(item.item_id, &language.id, elements)
        .await
        .with_context(|| format!("Failed to upsert variant {}/{}", item.item_id, language.id))?;

    info!("Written variant {}/{}", item.item_id, language.codename);
    Ok(())
}
