//! Content type normalization: snippet elements are replaced in place by the
//! elements of the snippet they point to.

use crate::cms::ContentManagement;
use crate::error::{Error, Result};
use crate::model::{ContentType, ContentTypeElement, ElementKind, NormalizedContentType, NormalizedElement};
use futures::future::try_join_all;
use tracing::{info, warn};

/// List every content type of the project and normalize them.
pub async fn load_content_types(cms: &dyn ContentManagement) -> Result<Vec<NormalizedContentType>> {
    let types = cms.list_content_types().await?;
    info!("Loaded {} content types", types.len());

    try_join_all(types.into_iter().map(|t| normalize_content_type(cms, t))).await
}

/// Inline the snippets of a single content type.
///
/// Each snippet element costs one remote call, even when several types (or
/// one type twice) use the same snippet.
pub async fn normalize_content_type(
    cms: &dyn ContentManagement,
    content_type: ContentType,
) -> Result<NormalizedContentType> {
    let mut elements = Vec::with_capacity(content_type.elements.len());

    for element in content_type.elements {
        match element.kind {
            ElementKind::Field(element_type) => elements.push(NormalizedElement {
                id: element.id,
                codename: element.codename,
                element_type,
            }),
            ElementKind::Snippet { snippet_id } => {
                let snippet_elements = load_snippet_elements(cms, &snippet_id, &content_type.id).await?;
                elements.extend(snippet_elements);
            }
        }
    }

    Ok(NormalizedContentType {
        id: content_type.id,
        codename: content_type.codename,
        name: content_type.name,
        elements,
    })
}

async fn load_snippet_elements(
    cms: &dyn ContentManagement,
    snippet_id: &str,
    type_id: &str,
) -> Result<Vec<NormalizedElement>> {
    let missing = || Error::MissingSnippet {
        snippet_id: snippet_id.to_string(),
        type_id: type_id.to_string(),
    };

    if snippet_id.is_empty() {
        return Err(missing());
    }

    let snippet_elements = cms
        .get_content_type_snippet(snippet_id)
        .await?
        .ok_or_else(missing)?;

    Ok(snippet_elements
        .into_iter()
        .filter_map(|element| without_snippet(element, snippet_id))
        .collect())
}

// Snippets cannot nest; anything claiming otherwise is dropped.
fn without_snippet(element: ContentTypeElement, snippet_id: &str) -> Option<NormalizedElement> {
    match element.kind {
        ElementKind::Field(element_type) => Some(NormalizedElement {
            id: element.id,
            codename: element.codename,
            element_type,
        }),
        ElementKind::Snippet { .. } => {
            warn!(
                "Dropping nested snippet element {} from snippet {}",
                element.id, snippet_id
            );
            None
        }
    }
}
