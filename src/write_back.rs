//! Conversion of translated text back into element values ready to upsert.

use crate::error::{Error, Result};
use crate::extract::CUSTOM_SLUG_MODE;
use crate::model::{ElementType, ElementValue, FieldValue, LinkedReferences, Reference, TextMap};
use crate::translation_key;
use std::collections::{BTreeMap, HashMap};

/// Translated parts of a single element, collected before conversion.
enum Parts {
    Scalar(String),
    Indexed(BTreeMap<usize, String>),
}

/// Build the element values to write for `item_id` from a translated map,
/// re-attaching the untranslated linked content references.
///
/// Every key must decode, belong to `item_id` and point at a text-carrying
/// element; the first key that does not fails the whole item. List indices
/// must fall inside the list that was sent in `source`.
pub fn convert_translations(
    item_id: &str,
    source: &TextMap,
    translations: &TextMap,
    linked: &LinkedReferences,
) -> Result<Vec<ElementValue>> {
    let list_lengths = source_list_lengths(source);

    // Element id → (type, parts), in first-seen order.
    let mut elements: Vec<(String, ElementType, Parts)> = Vec::new();

    for (key, text) in translations {
        let parsed = translation_key::decode(key)
            .ok_or_else(|| Error::malformed_key(key, "not a valid translation key"))?;

        if parsed.item_id != item_id {
            return Err(Error::malformed_key(
                key,
                format!("belongs to item {}, not {}", parsed.item_id, item_id),
            ));
        }
        if !parsed.element_type.is_translatable() {
            return Err(Error::malformed_key(
                key,
                format!("{} elements do not carry translated text", parsed.element_type),
            ));
        }

        let index = match parsed.sub_path.as_slice() {
            [] => None,
            [segment] => {
                let index = parse_index(segment).ok_or_else(|| {
                    Error::malformed_key(key, format!("'{}' is not a list index", segment))
                })?;
                let len = list_lengths.get(parsed.element_id.as_str()).copied().unwrap_or(0);
                if index >= len {
                    return Err(Error::malformed_key(
                        key,
                        format!("index {} is outside the {} entries sent", index, len),
                    ));
                }
                Some(index)
            }
            _ => return Err(Error::malformed_key(key, "sub-path is too deep")),
        };

        let position = elements
            .iter()
            .position(|(id, _, _)| *id == parsed.element_id);

        match (position, index) {
            (None, None) => elements.push((
                parsed.element_id,
                parsed.element_type,
                Parts::Scalar(text.clone()),
            )),
            (None, Some(i)) => elements.push((
                parsed.element_id,
                parsed.element_type,
                Parts::Indexed(BTreeMap::from([(i, text.clone())])),
            )),
            (Some(p), index) => {
                let (_, element_type, parts) = &mut elements[p];
                if *element_type != parsed.element_type {
                    return Err(Error::malformed_key(
                        key,
                        format!("element already translated as {}", element_type),
                    ));
                }
                match (parts, index) {
                    (Parts::Indexed(entries), Some(i)) => {
                        entries.insert(i, text.clone());
                    }
                    _ => {
                        return Err(Error::malformed_key(
                            key,
                            "element mixes whole-value and list entries",
                        ))
                    }
                }
            }
        }
    }

    let mut values: Vec<ElementValue> = elements
        .into_iter()
        .map(|(element_id, element_type, parts)| {
            let value = match parts {
                Parts::Scalar(text) => FieldValue::Text(text),
                Parts::Indexed(entries) => FieldValue::Texts(fill_gaps(entries)),
            };
            let mut element = ElementValue::new(element_id, value);
            if element_type == ElementType::UrlSlug {
                element.mode = Some(CUSTOM_SLUG_MODE.to_string());
            }
            element
        })
        .collect();

    values.extend(linked.iter().map(|(element_id, item_ids)| {
        ElementValue::new(
            element_id,
            FieldValue::References(item_ids.iter().map(Reference::new).collect()),
        )
    }));

    Ok(values)
}

// Digits only; `str::parse` would also take a leading '+'.
fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Element id → length of the list sent for it (highest index + 1).
fn source_list_lengths(source: &TextMap) -> HashMap<String, usize> {
    let mut lengths = HashMap::new();
    for parsed in source.keys().filter_map(|key| translation_key::decode(key)) {
        let [segment] = parsed.sub_path.as_slice() else {
            continue;
        };
        if let Some(len) = parse_index(segment).and_then(|i| i.checked_add(1)) {
            let entry = lengths.entry(parsed.element_id).or_insert(0);
            *entry = len.max(*entry);
        }
    }
    lengths
}

// Entries skipped during extraction (empty strings) come back as empty strings.
fn fill_gaps(entries: BTreeMap<usize, String>) -> Vec<String> {
    let len = entries
        .keys()
        .next_back()
        .and_then(|last| last.checked_add(1))
        .unwrap_or(0);
    let mut list = vec![String::new(); len];
    for (index, text) in entries {
        if let Some(slot) = list.get_mut(index) {
            *slot = text;
        }
    }
    list
}
