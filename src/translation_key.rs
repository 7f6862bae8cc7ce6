//! Translation key codec.
//!
//! A translatable field location (item, element, element type and an optional
//! structural sub-path) is flattened into one string so it survives a round
//! trip through a translation provider that only sees `key -> text` pairs:
//!
//! ```text
//! <item id>;<element id>;<element type>[;<segment>...]
//! ```
//!
//! Item and element ids are platform-assigned and never contain `;`. The codec
//! relies on that and does not escape anything; an id containing the
//! delimiter would break the round trip.

use crate::model::ElementType;
use std::fmt;

pub const DELIMITER: char = ';';

/// Decoded form of a translation key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationKey {
    pub item_id: String,
    pub element_id: String,
    pub element_type: ElementType,
    pub sub_path: Vec<String>,
}

impl TranslationKey {
    pub fn new(
        item_id: impl Into<String>,
        element_id: impl Into<String>,
        element_type: ElementType,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            element_id: element_id.into(),
            element_type,
            sub_path: Vec::new(),
        }
    }

    pub fn with_sub_path(mut self, sub_path: Vec<String>) -> Self {
        self.sub_path = sub_path;
        self
    }

    pub fn encode(&self) -> String {
        encode(
            &self.element_id,
            &self.item_id,
            self.element_type,
            self.sub_path.as_slice(),
        )
    }
}

impl fmt::Display for TranslationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Encode a field location as a flat key.
///
/// The trailing delimiter before the sub-path is only written when there is a
/// sub-path, so `item;element;text` and `item;element;text;` stay distinct.
pub fn encode<S: AsRef<str>>(
    element_id: &str,
    item_id: &str,
    element_type: ElementType,
    sub_path: &[S],
) -> String {
    let mut key = format!(
        "{}{d}{}{d}{}",
        item_id,
        element_id,
        element_type.as_str(),
        d = DELIMITER
    );
    for segment in sub_path {
        key.push(DELIMITER);
        key.push_str(segment.as_ref());
    }
    key
}

/// Decode a flat key. Returns `None` for anything this codec would not have
/// produced: fewer than three segments, an empty item or element id, or an
/// element type outside [`ElementType::ALL`].
pub fn decode(key: &str) -> Option<TranslationKey> {
    let mut parts = key.split(DELIMITER);

    let item_id = parts.next().filter(|s| !s.is_empty())?;
    let element_id = parts.next().filter(|s| !s.is_empty())?;
    let element_type = parts.next().and_then(ElementType::from_tag)?;
    let sub_path = parts.map(str::to_string).collect();

    Some(TranslationKey {
        item_id: item_id.to_string(),
        element_id: element_id.to_string(),
        element_type,
        sub_path,
    })
}
