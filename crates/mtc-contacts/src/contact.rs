//! Contact records and segment names.
//!
//! Mautic is inconsistent about collection shapes: `lists`, `tags` and
//! `contacts` arrive either as JSON arrays or as objects keyed by id. Both
//! shapes decode to a `Vec` here.

use std::collections::BTreeSet;

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A contact as returned by `contacts/{id}` or a contact search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Contact id. Numbers and strings are both accepted.
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,

    /// Segment memberships.
    #[serde(default, deserialize_with = "array_or_keyed")]
    pub lists: Vec<SegmentMembership>,

    /// Tags attached to the contact.
    #[serde(default, deserialize_with = "array_or_keyed")]
    pub tags: Vec<ContactTag>,

    /// Everything else (`fields`, `points`, `dateIdentified`, ...).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ContactRecord {
    /// Decode a contact from a response fragment.
    ///
    /// `null`, an empty object and an empty array are "no contact".
    pub fn from_value(value: &Value) -> Option<Self> {
        if is_empty_value(value) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Whether the id can be used in a `contacts/{id}` path.
    pub fn has_numeric_id(&self) -> bool {
        is_numeric_id(&self.id)
    }
}

/// One entry of a contact's `lists`, or of a `segments` listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentMembership {
    #[serde(default, deserialize_with = "optional_id_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of a contact's `tags`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `segments` and `contacts/{id}/segments`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentListing {
    #[serde(default)]
    pub total: Option<Value>,
    #[serde(default, deserialize_with = "array_or_keyed")]
    pub lists: Vec<SegmentMembership>,
}

impl SegmentListing {
    /// Decode a listing, treating anything unexpected as empty.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

/// De-duplicated segment and tag names for one visitor.
///
/// Iteration is sorted; callers should not depend on the order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentSet(BTreeSet<String>);

impl SegmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name. Empty names are ignored.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.is_empty() {
            return false;
        }
        self.0.insert(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Names from a `lists` collection.
    pub fn extend_lists<'a>(&mut self, lists: impl IntoIterator<Item = &'a SegmentMembership>) {
        for list in lists {
            if let Some(name) = list.name.as_deref() {
                self.insert(name);
            }
        }
    }
}

impl Extend<String> for SegmentSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name);
        }
    }
}

impl FromIterator<String> for SegmentSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = SegmentSet::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for SegmentSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// `lists[].name` ∪ `tags[].tag`, skipping empty names.
pub fn extract_segment_names(contact: &ContactRecord) -> SegmentSet {
    let mut segments = SegmentSet::new();
    segments.extend_lists(&contact.lists);
    for tag in &contact.tags {
        if let Some(name) = tag.tag.as_deref() {
            segments.insert(name);
        }
    }
    segments
}

/// Non-empty and all ASCII digits.
pub fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// First element of an array-or-keyed collection.
pub(crate) fn first_of(collection: &Value) -> Option<&Value> {
    match collection {
        Value::Array(items) => items.first(),
        Value::Object(map) => map.values().next(),
        _ => None,
    }
}

/// Elements of an array-or-keyed collection.
pub(crate) fn items_of(collection: &Value) -> Vec<&Value> {
    match collection {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    }
}

/// Render an id (number or string) as a string.
pub(crate) fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_id_string(deserializer)?.unwrap_or_default())
}

fn optional_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_id))
}

fn array_or_keyed<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?.unwrap_or(Value::Null);
    items_of(&value)
        .into_iter()
        .map(|item| serde_json::from_value(item.clone()).map_err(serde::de::Error::custom))
        .collect()
}
