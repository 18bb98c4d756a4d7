//! Resource — the top-level HAL+JSON envelope.
//!
//! A [`Resource`] keeps its reserved sections (`_links`, `_embedded`) apart
//! from caller-defined top-level fields ("extras") and only merges them into
//! one flat JSON object when it is written out:
//!
//! ```json
//! {
//!   "_links": { "self": { "href": "/orders?page=2" } },
//!   "_embedded": { "orders": [ { "id": 5 } ] },
//!   "count": 1
//! }
//! ```
//!
//! Empty sections are omitted rather than written as `{}`. Reading a document
//! back routes the two reserved keys to their structured stores and keeps
//! every other top-level key as a raw extra.

use std::fmt;
use std::str::FromStr;

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::embedded::{EmbedItem, EmbeddedStore};
use crate::error::{HalError, Result};
use crate::link::{LinkOption, LinkSet, RequestUri};

/// Reserved top-level key for navigational links.
pub const LINKS_KEY: &str = "_links";

/// Reserved top-level key for embedded sub-resources.
pub const EMBEDDED_KEY: &str = "_embedded";

fn is_reserved(key: &str) -> bool {
    key == LINKS_KEY || key == EMBEDDED_KEY
}

/// A HAL+JSON resource representation.
///
/// `Resource::default()` has neither links nor an embedded store; that is the
/// state decoding starts from. [`Resource::new`] and the other constructors
/// start with both initialized but empty. Either way, empty sections are left
/// out of the serialized document.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    links: Option<LinkSet>,
    embedded: Option<EmbeddedStore>,
    extras: Map<String, Value>,
}

impl Resource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            links: Some(LinkSet::default()),
            embedded: Some(EmbeddedStore::new()),
            extras: Map::new(),
        }
    }

    /// A resource whose `self` link is the URI of the request being answered.
    pub fn from_request<R>(request: &R, link_overrides: impl IntoIterator<Item = LinkOption>) -> Self
    where
        R: RequestUri + ?Sized,
    {
        Self {
            links: Some(LinkSet::from_request(request, link_overrides)),
            ..Self::new()
        }
    }

    /// A resource with no `self` link and the given link overrides.
    pub fn with_links(link_overrides: impl IntoIterator<Item = LinkOption>) -> Self {
        Self {
            links: Some(LinkSet::from_overrides(link_overrides)),
            ..Self::new()
        }
    }

    /// Start from an already-populated embedded store.
    #[must_use]
    pub fn with_embedded(mut self, seed: EmbeddedStore) -> Self {
        self.embedded = Some(seed);
        self
    }

    /// Encode `value` and embed it under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Encode`] if `value` cannot be represented as JSON.
    /// Non-finite floats are not an error; see [`EmbeddedStore::set`].
    pub fn embed<T>(&mut self, key: impl Into<String>, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.embedded.get_or_insert_with(EmbeddedStore::new).set(key, value)
    }

    /// Embed several values in order. Entries embedded before a failure are
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::EmbedItem`] identifying the 1-based position of the
    /// first item that failed to encode.
    pub fn embed_many<'a>(&mut self, items: impl IntoIterator<Item = EmbedItem<'a>>) -> Result<()> {
        self.embedded
            .get_or_insert_with(EmbeddedStore::new)
            .set_many(items)
    }

    /// Apply link overrides, later ones winning per relation.
    pub fn add_link(&mut self, overrides: impl IntoIterator<Item = LinkOption>) {
        self.links.get_or_insert_with(LinkSet::default).apply(overrides);
    }

    /// Set a top-level field, replacing any previous value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::ReservedKey`] for `_links` or `_embedded`, and
    /// [`HalError::Encode`] if `value` cannot be represented as JSON.
    pub fn add_extra<T>(&mut self, key: impl Into<String>, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let (key, value) = encode_extra(key.into(), value)?;
        self.extras.insert(key, value);
        Ok(())
    }

    /// Set several top-level fields. Later duplicates win.
    ///
    /// Every entry is checked and encoded before any is inserted, so a
    /// failure leaves the extras unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`Resource::add_extra`].
    pub fn add_extras<K, V>(&mut self, extras: impl IntoIterator<Item = (K, V)>) -> Result<()>
    where
        K: Into<String>,
        V: Serialize,
    {
        let encoded = extras
            .into_iter()
            .map(|(key, value)| encode_extra(key.into(), &value))
            .collect::<Result<Vec<_>>>()?;
        self.extras.extend(encoded);
        Ok(())
    }

    /// Merge the top-level fields of any value that encodes to a JSON object,
    /// typically a response struct such as `{ count, total }`.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::NotAnObject`] if `value` does not encode to an
    /// object, plus the errors of [`Resource::add_extras`].
    pub fn add_extras_from<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_value(value).map_err(|source| HalError::Encode {
            key: "<extras>".to_string(),
            source,
        })?;
        match encoded {
            Value::Object(fields) => self.add_extras(fields),
            other => Err(HalError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }

    /// The link set, if one was initialized or decoded.
    #[must_use]
    pub fn links(&self) -> Option<&LinkSet> {
        self.links.as_ref()
    }

    /// The embedded store, if one was initialized or decoded.
    #[must_use]
    pub fn embedded(&self) -> Option<&EmbeddedStore> {
        self.embedded.as_ref()
    }

    /// Decode the embedded entry under `key` into `T`. A missing store reads
    /// the same as a missing key.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Decode`] if the fragment does not fit `T`.
    pub fn get_embedded<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match &self.embedded {
            Some(store) => store.get(key),
            None => Ok(None),
        }
    }

    #[must_use]
    pub fn extras(&self) -> &Map<String, Value> {
        &self.extras
    }

    /// Raw access to a non-reserved top-level field.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    /// Decode a non-reserved top-level field into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Decode`] if the field does not fit `T`.
    pub fn extra_as<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.extras
            .get(key)
            .map(|value| {
                T::deserialize(value).map_err(|source| HalError::Decode {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Serialize to compact JSON bytes.
    ///
    /// # Errors
    ///
    /// Only fails if serde_json itself fails to write the document.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(encode_document_error)
    }

    /// Serialize to a compact JSON string.
    ///
    /// # Errors
    ///
    /// Same as [`Resource::to_vec`].
    pub fn to_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(encode_document_error)
    }

    /// Serialize to an indented JSON string.
    ///
    /// # Errors
    ///
    /// Same as [`Resource::to_vec`].
    pub fn to_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(encode_document_error)
    }

    /// Decode a HAL+JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Parse`] if the input is not a JSON object or a
    /// reserved section is malformed.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            tracing::debug!(error = %e, "failed to decode HAL document");
            HalError::Parse(e)
        })
    }
}

impl FromStr for Resource {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_slice(s.as_bytes())
    }
}

fn encode_extra<T>(key: String, value: &T) -> Result<(String, Value)>
where
    T: Serialize + ?Sized,
{
    if is_reserved(&key) {
        return Err(HalError::ReservedKey(key));
    }
    match serde_json::to_value(value) {
        Ok(value) => Ok((key, value)),
        Err(source) => Err(HalError::Encode { key, source }),
    }
}

fn encode_document_error(source: serde_json::Error) -> HalError {
    HalError::Encode {
        key: "<document>".to_string(),
        source,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let links = self.links.as_ref().filter(|links| !links.is_empty());
        let embedded = self.embedded.as_ref().filter(|store| !store.is_empty());
        let len = self.extras.len() + usize::from(links.is_some()) + usize::from(embedded.is_some());

        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(links) = links {
            map.serialize_entry(LINKS_KEY, links)?;
        }
        if let Some(embedded) = embedded {
            map.serialize_entry(EMBEDDED_KEY, embedded)?;
        }
        for (key, value) in &self.extras {
            // Extras never hold reserved keys; see `encode_extra`.
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(ResourceVisitor)
    }
}

struct ResourceVisitor;

impl<'de> Visitor<'de> for ResourceVisitor {
    type Value = Resource;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a HAL+JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Resource, A::Error> {
        let mut resource = Resource::default();
        while let Some(key) = access.next_key::<String>()? {
            match key.as_str() {
                // `null` sections read as absent.
                LINKS_KEY => resource.links = access.next_value::<Option<LinkSet>>()?,
                EMBEDDED_KEY => resource.embedded = access.next_value::<Option<EmbeddedStore>>()?,
                _ => {
                    let value: Value = access.next_value()?;
                    resource.extras.insert(key, value);
                }
            }
        }
        tracing::trace!(
            links = resource.links.is_some(),
            embedded = resource.embedded.as_ref().map_or(0, EmbeddedStore::len),
            extras = resource.extras.len(),
            "decoded HAL document"
        );
        Ok(resource)
    }
}
