use thiserror::Error;

/// Failures of the translation preparation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The item's type is not in the schema snapshot taken at the start of the run.
    #[error("Failed to find content type with id {type_id} for variant {item_id}/{language_id}")]
    MissingType {
        type_id: String,
        item_id: String,
        language_id: String,
    },

    /// A snippet referenced by a content type could not be loaded.
    #[error("Failed to find content type snippet with id '{snippet_id}' used by type {type_id}")]
    MissingSnippet { snippet_id: String, type_id: String },

    /// A key coming back from the translation provider cannot be written.
    #[error("Invalid key from translations '{key}': {reason}")]
    MalformedKey { key: String, reason: String },

    /// A language id in the request is not a language of the project.
    #[error("Unknown language id '{language_id}'")]
    UnknownLanguage { language_id: String },

    /// Any failed call to the CMS or the translation provider.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl Error {
    pub fn malformed_key(key: &str, reason: impl Into<String>) -> Self {
        Error::MalformedKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Schema errors mean the snapshot is stale or incomplete.
    pub fn is_schema_inconsistency(&self) -> bool {
        matches!(self, Error::MissingType { .. } | Error::MissingSnippet { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
