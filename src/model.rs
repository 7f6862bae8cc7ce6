//! CMS data model: content types, item variants and the closure produced
//! while walking linked content.
//!
//! Everything here is a read-only snapshot of remote state, fetched once per
//! run and dropped when the run ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Flat translatable text keyed by translation key.
pub type TextMap = BTreeMap<String, String>;

/// Field-type tag of a (normalized) content type element.
///
/// The `snippet` tag is deliberately absent: snippets only exist in the raw
/// schema and are inlined by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Asset,
    Custom,
    Number,
    DateTime,
    Guidelines,
    ModularContent,
    MultipleChoice,
    RichText,
    Text,
    Subpages,
    Taxonomy,
    UrlSlug,
}

impl ElementType {
    /// Every tag accepted in a translation key, in wire order.
    pub const ALL: [ElementType; 12] = [
        ElementType::Asset,
        ElementType::Custom,
        ElementType::Number,
        ElementType::DateTime,
        ElementType::Guidelines,
        ElementType::ModularContent,
        ElementType::MultipleChoice,
        ElementType::RichText,
        ElementType::Text,
        ElementType::Subpages,
        ElementType::Taxonomy,
        ElementType::UrlSlug,
    ];

    /// Wire tag as used by the management API and inside translation keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Asset => "asset",
            ElementType::Custom => "custom",
            ElementType::Number => "number",
            ElementType::DateTime => "date_time",
            ElementType::Guidelines => "guidelines",
            ElementType::ModularContent => "modular_content",
            ElementType::MultipleChoice => "multiple_choice",
            ElementType::RichText => "rich_text",
            ElementType::Text => "text",
            ElementType::Subpages => "subpages",
            ElementType::Taxonomy => "taxonomy",
            ElementType::UrlSlug => "url_slug",
        }
    }

    /// Look up a tag in [`ElementType::ALL`].
    pub fn from_tag(tag: &str) -> Option<ElementType> {
        Self::ALL.iter().copied().find(|t| t.as_str() == tag)
    }

    /// Whether values of this type carry text that goes to the translator.
    pub fn is_translatable(&self) -> bool {
        matches!(
            self,
            ElementType::Text | ElementType::RichText | ElementType::UrlSlug
        )
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to another CMS object by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// What a raw schema element is: an inlined snippet or a regular field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Snippet { snippet_id: String },
    Field(ElementType),
}

/// Element definition as returned by the management API, snippets included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawElement", into = "RawElement")]
pub struct ContentTypeElement {
    pub id: String,
    pub codename: Option<String>,
    pub kind: ElementKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawElement {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    codename: Option<String>,
    #[serde(rename = "type")]
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snippet: Option<Reference>,
}

impl TryFrom<RawElement> for ContentTypeElement {
    type Error = String;

    fn try_from(raw: RawElement) -> Result<Self, Self::Error> {
        let kind = if raw.tag == "snippet" {
            // A snippet element without a target cannot be resolved later;
            // keep it with an empty id so the normalizer reports it.
            ElementKind::Snippet {
                snippet_id: raw.snippet.map(|s| s.id).unwrap_or_default(),
            }
        } else {
            let element_type = ElementType::from_tag(&raw.tag)
                .ok_or_else(|| format!("unknown element type '{}' for element {}", raw.tag, raw.id))?;
            ElementKind::Field(element_type)
        };

        Ok(Self {
            id: raw.id,
            codename: raw.codename,
            kind,
        })
    }
}

impl From<ContentTypeElement> for RawElement {
    fn from(element: ContentTypeElement) -> Self {
        let (tag, snippet) = match element.kind {
            ElementKind::Snippet { snippet_id } => ("snippet".to_string(), Some(Reference::new(snippet_id))),
            ElementKind::Field(t) => (t.as_str().to_string(), None),
        };
        RawElement {
            id: element.id,
            codename: element.codename,
            tag,
            snippet,
        }
    }
}

/// Content type as listed by the management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub id: String,
    #[serde(default)]
    pub codename: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub elements: Vec<ContentTypeElement>,
}

/// Element of a normalized content type. Cannot be a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedElement {
    pub id: String,
    pub codename: Option<String>,
    pub element_type: ElementType,
}

/// Content type whose snippet elements have been inlined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedContentType {
    pub id: String,
    pub codename: Option<String>,
    pub name: Option<String>,
    pub elements: Vec<NormalizedElement>,
}

impl NormalizedContentType {
    pub fn element_type(&self, element_id: &str) -> Option<ElementType> {
        self.elements
            .iter()
            .find(|e| e.id == element_id)
            .map(|e| e.element_type)
    }
}

/// Normalized types indexed by type id.
pub type TypesById = HashMap<String, NormalizedContentType>;

/// Value of a single element in a language variant.
///
/// Order matters for untagged deserialization: references are tried before
/// plain string lists so `[{"id": ..}]` never lands in `Texts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    References(Vec<Reference>),
    Texts(Vec<String>),
    Text(String),
    Number(f64),
}

/// One element value inside an item variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementValue {
    pub element: Reference,
    #[serde(default)]
    pub value: Option<FieldValue>,
    /// Only set for url slugs (`autogenerated` or `custom`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl ElementValue {
    pub fn new(element_id: impl Into<String>, value: FieldValue) -> Self {
        Self {
            element: Reference::new(element_id),
            value: Some(value),
            mode: None,
        }
    }
}

/// Language-specific field values of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemVariant {
    pub item: Reference,
    pub language: Reference,
    pub elements: Vec<ElementValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Content item metadata; only the type is needed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub codename: Option<String>,
    #[serde(rename = "type")]
    pub type_ref: Reference,
}

/// Project language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub codename: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Linked-content element id → referenced item ids, in variant order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkedReferences {
    by_element: Vec<(String, Vec<String>)>,
}

impl LinkedReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element_id: impl Into<String>, item_ids: Vec<String>) {
        let element_id = element_id.into();
        match self.by_element.iter_mut().find(|(id, _)| *id == element_id) {
            Some((_, existing)) => *existing = item_ids,
            None => self.by_element.push((element_id, item_ids)),
        }
    }

    pub fn get(&self, element_id: &str) -> Option<&[String]> {
        self.by_element
            .iter()
            .find(|(id, _)| id == element_id)
            .map(|(_, ids)| ids.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.by_element
            .iter()
            .map(|(id, ids)| (id.as_str(), ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.by_element.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_element.is_empty()
    }

    /// De-duplicated union of all referenced ids, first occurrence wins.
    pub fn referenced_item_ids(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.by_element
            .iter()
            .flat_map(|(_, ids)| ids.iter())
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }
}

/// One item discovered during closure resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureEntry {
    pub variant: ItemVariant,
    /// Resolved from the schema snapshot while walking.
    pub content_type: NormalizedContentType,
    pub linked: LinkedReferences,
}

/// Item id → [`ClosureEntry`], each item exactly once, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ClosureResult {
    entries: Vec<(String, ClosureEntry)>,
    index: HashMap<String, usize>,
}

impl ClosureResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Returns `false` (and keeps the first entry) when the
    /// item is already present.
    pub fn insert(&mut self, item_id: String, entry: ClosureEntry) -> bool {
        if self.index.contains_key(&item_id) {
            return false;
        }
        self.index.insert(item_id.clone(), self.entries.len());
        self.entries.push((item_id, entry));
        true
    }

    pub fn get(&self, item_id: &str) -> Option<&ClosureEntry> {
        self.index.get(item_id).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.index.contains_key(item_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClosureEntry)> {
        self.entries.iter().map(|(id, e)| (id.as_str(), e))
    }
}
