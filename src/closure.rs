//! Linked-content closure resolution.
//!
//! Starting from a set of seed items, every item reachable through linked
//! content (`modular_content`) elements is fetched exactly once, together with
//! its type and the ids it links to. The walk is depth-first and serialized:
//! one remote read is in flight at a time, and an item's children are fully
//! explored before its next sibling.

use crate::cms::ContentManagement;
use crate::error::{Error, Result};
use crate::model::{
    ClosureEntry, ClosureResult, ElementType, FieldValue, ItemVariant, LinkedReferences,
    NormalizedContentType, TypesById,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// Resolve the closure of `seed_item_ids` over linked content, reading
/// variants in `language_id`.
///
/// Items in `already_visited` are neither fetched nor returned. Any failure
/// (transport or missing type) aborts the whole resolution.
pub async fn resolve_closure(
    cms: &dyn ContentManagement,
    seed_item_ids: &[String],
    language_id: &str,
    types_by_id: &TypesById,
    already_visited: &HashSet<String>,
) -> Result<ClosureResult> {
    let mut visited = already_visited.clone();
    let mut result = ClosureResult::new();

    // Reversed so the first seed is popped first; same for children below.
    let mut stack: Vec<String> = seed_item_ids.iter().rev().cloned().collect();

    while let Some(item_id) = stack.pop() {
        if !visited.insert(item_id.clone()) {
            continue;
        }

        let entry = load_entry(cms, &item_id, language_id, types_by_id).await?;
        let children = entry.linked.referenced_item_ids();
        debug!(
            "Item {} links to {} items ({} unvisited)",
            item_id,
            children.len(),
            children.iter().filter(|id| !visited.contains(*id)).count()
        );

        stack.extend(children.into_iter().rev().filter(|id| !visited.contains(id)));
        result.insert(item_id, entry);
    }

    info!(
        "Resolved {} items from {} seeds in language {}",
        result.len(),
        seed_item_ids.len(),
        language_id
    );

    Ok(result)
}

async fn load_entry(
    cms: &dyn ContentManagement,
    item_id: &str,
    language_id: &str,
    types_by_id: &TypesById,
) -> Result<ClosureEntry> {
    let variant = cms.read_item_variant(item_id, language_id).await?;
    let item = cms.read_item(&variant.item.id).await?;
    let type_id = item.type_ref.id;

    let content_type = types_by_id.get(&type_id).ok_or_else(|| Error::MissingType {
        type_id: type_id.clone(),
        item_id: item_id.to_string(),
        language_id: language_id.to_string(),
    })?;

    let linked = extract_linked_item_ids(&variant, content_type);

    Ok(ClosureEntry {
        variant,
        content_type: content_type.clone(),
        linked,
    })
}

/// Linked content element id → referenced item ids.
///
/// Only elements typed `modular_content` in `content_type` whose value is a
/// list of references count; every other element is ignored.
pub fn extract_linked_item_ids(
    variant: &ItemVariant,
    content_type: &NormalizedContentType,
) -> LinkedReferences {
    let mut linked = LinkedReferences::new();

    for element in &variant.elements {
        if content_type.element_type(&element.element.id) != Some(ElementType::ModularContent) {
            continue;
        }
        if let Some(FieldValue::References(refs)) = &element.value {
            linked.insert(
                element.element.id.clone(),
                refs.iter().map(|r| r.id.clone()).collect(),
            );
        }
    }

    linked
}
