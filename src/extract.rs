//! Extraction of translatable text from an item variant into a flat map
//! keyed by translation keys.

use crate::model::{ElementType, FieldValue, ItemVariant, NormalizedContentType, TextMap};
use crate::translation_key::{self, TranslationKey};
use tracing::debug;

pub const CUSTOM_SLUG_MODE: &str = "custom";

/// Collect every translatable text of `variant` under its translation key.
///
/// Text and rich text values are always sent; url slugs only when their mode
/// is `custom`, since autogenerated slugs follow the translated title.
/// Lists of strings get one key per entry, with the entry index as sub-path.
pub fn prepare_for_translation(variant: &ItemVariant, content_type: &NormalizedContentType) -> TextMap {
    let item_id = &variant.item.id;
    let mut texts = TextMap::new();

    for element in &variant.elements {
        let element_id = &element.element.id;
        let Some(element_type) = content_type.element_type(element_id) else {
            debug!(
                "Element {} of item {} is not part of type {}, skipping",
                element_id, item_id, content_type.id
            );
            continue;
        };

        if !element_type.is_translatable() {
            continue;
        }
        if element_type == ElementType::UrlSlug && element.mode.as_deref() != Some(CUSTOM_SLUG_MODE) {
            continue;
        }

        match &element.value {
            Some(FieldValue::Text(text)) if !text.is_empty() => {
                let key = translation_key::encode::<&str>(element_id, item_id, element_type, &[]);
                texts.insert(key, text.clone());
            }
            Some(FieldValue::Texts(entries)) => {
                for (index, text) in entries.iter().enumerate().filter(|(_, t)| !t.is_empty()) {
                    let key = TranslationKey::new(item_id.as_str(), element_id.as_str(), element_type)
                        .with_sub_path(vec![index.to_string()]);
                    texts.insert(key.encode(), text.clone());
                }
            }
            _ => {}
        }
    }

    texts
}
