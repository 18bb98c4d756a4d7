//! Embedded store — the `_embedded` section of a HAL document.
//!
//! Each relation maps to a JSON fragment that is encoded when it is set and
//! kept verbatim until a caller asks for it back with a concrete type. The
//! store never interprets fragment contents, so a document can be decoded
//! before anyone knows what shapes its embedded resources have.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{HalError, Result};

/// Relation name to undecoded JSON fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddedStore {
    items: BTreeMap<String, Box<RawValue>>,
}

impl EmbeddedStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `value` and store it under `key`, replacing any previous
    /// fragment. The store is left untouched if encoding fails.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Encode`] if `value` cannot be represented as JSON.
    ///
    /// Non-finite floats (`NaN`, `±inf`) are not rejected: serde_json writes
    /// them as `null`, so they read back as `None` through an `Option<f64>`
    /// and fail to decode as a bare `f64`.
    pub fn set<T>(&mut self, key: impl Into<String>, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = key.into();
        match serde_json::value::to_raw_value(value) {
            Ok(fragment) => {
                tracing::trace!(key = %key, bytes = fragment.get().len(), "embedded fragment stored");
                self.items.insert(key, fragment);
                Ok(())
            }
            Err(source) => Err(HalError::Encode { key, source }),
        }
    }

    /// Store every item in order, stopping at the first one that fails to
    /// encode. Items stored before the failure stay stored.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::EmbedItem`] carrying the 1-based position and key
    /// of the failing item.
    pub fn set_many<'a>(&mut self, items: impl IntoIterator<Item = EmbedItem<'a>>) -> Result<()> {
        for (i, item) in items.into_iter().enumerate() {
            let fragment = item.value.encode_fragment().map_err(|source| {
                tracing::debug!(index = i + 1, key = %item.key, error = %source, "batch embed failed");
                HalError::EmbedItem {
                    index: i + 1,
                    key: item.key.clone(),
                    source,
                }
            })?;
            self.items.insert(item.key, fragment);
        }
        Ok(())
    }

    /// Decode the fragment stored under `key` into `T`.
    ///
    /// Returns `Ok(None)` when the key is absent; absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Decode`] if the fragment does not fit `T`.
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let Some(fragment) = self.items.get(key) else {
            return Ok(None);
        };

        serde_json::from_str(fragment.get())
            .map(Some)
            .map_err(|source| {
                tracing::debug!(key, error = %source, "embedded fragment did not match requested type");
                HalError::Decode {
                    key: key.to_string(),
                    source,
                }
            })
    }

    /// Decode the fragment under `key` into a caller-owned target.
    ///
    /// Returns whether the key was found. `target` is only written when
    /// decoding succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Decode`] if the fragment does not fit `T`.
    pub fn get_into<T>(&self, key: &str, target: &mut T) -> Result<bool>
    where
        T: DeserializeOwned,
    {
        match self.get(key)? {
            Some(value) => {
                *target = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The stored fragment, exactly as it will be written out.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&RawValue> {
        self.items.get(key).map(|fragment| &**fragment)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Box<RawValue>> {
        self.items.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.items.iter().map(|(k, v)| (k.as_str(), &**v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Encodes a value into a standalone fragment. Lets a batch hold values of
/// different types behind one reference type.
trait EncodeFragment {
    fn encode_fragment(&self) -> serde_json::Result<Box<RawValue>>;
}

impl<T: Serialize> EncodeFragment for T {
    fn encode_fragment(&self) -> serde_json::Result<Box<RawValue>> {
        serde_json::value::to_raw_value(self)
    }
}

/// A relation name paired with the value to embed under it.
pub struct EmbedItem<'a> {
    key: String,
    value: &'a dyn EncodeFragment,
}

impl<'a> EmbedItem<'a> {
    pub fn new<T: Serialize>(key: impl Into<String>, value: &'a T) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for EmbedItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedItem")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Shorthand for [`EmbedItem::new`].
pub fn embedded_item<'a, T: Serialize>(key: impl Into<String>, value: &'a T) -> EmbedItem<'a> {
    EmbedItem::new(key, value)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde::ser::Error as _;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub(crate) struct Foo {
        pub(crate) id: i64,
        pub(crate) name: String,
    }

    /// A value serde_json refuses to encode.
    pub(crate) struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot encode this value"))
        }
    }

    fn foo(id: i64, name: &str) -> Foo {
        Foo {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn set_then_get_returns_value() {
        let mut store = EmbeddedStore::new();
        store.set("foo", &foo(99, "singlefoo")).unwrap();

        let got: Option<Foo> = store.get("foo").unwrap();
        assert_eq!(got, Some(foo(99, "singlefoo")));
    }

    #[test]
    fn get_missing_key_is_not_an_error() {
        let store = EmbeddedStore::new();
        let got: Option<Vec<Foo>> = store.get("nonexistent").unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn get_with_mismatched_shape_fails() {
        let mut store = EmbeddedStore::new();
        store.set("foos", &vec!["notafoo"]).unwrap();

        let err = store.get::<Vec<Foo>>("foos").unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("foos"));
    }

    #[test]
    fn get_into_leaves_target_alone_on_mismatch() {
        let mut store = EmbeddedStore::new();
        store.set("foo", &"just a string").unwrap();

        let mut target = foo(1, "original");
        assert!(store.get_into("foo", &mut target).is_err());
        assert_eq!(target, foo(1, "original"));

        assert!(!store.get_into("absent", &mut target).unwrap());
        assert_eq!(target, foo(1, "original"));

        store.set("foo", &foo(2, "replaced")).unwrap();
        assert!(store.get_into("foo", &mut target).unwrap());
        assert_eq!(target, foo(2, "replaced"));
    }

    #[test]
    fn set_overwrites_previous_fragment() {
        let mut store = EmbeddedStore::new();
        store.set("foo", &foo(1, "first")).unwrap();
        store.set("other", &42).unwrap();
        store.set("foo", &foo(2, "second")).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get::<Foo>("foo").unwrap(), Some(foo(2, "second")));
    }

    #[test]
    fn failed_set_leaves_store_unmodified() {
        let mut store = EmbeddedStore::new();
        store.set("foo", &foo(1, "kept")).unwrap();

        let err = store.set("foo", &Unencodable).unwrap_err();
        assert!(err.is_encode());
        assert_eq!(store.get::<Foo>("foo").unwrap(), Some(foo(1, "kept")));

        // serde_json only accepts string-like map keys.
        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple key");
        assert!(store.set("bad", &bad).is_err());
        assert!(!store.contains_key("bad"));
    }

    #[test]
    fn non_finite_floats_are_stored_as_null() {
        let mut store = EmbeddedStore::new();
        store.set("nan", &f64::NAN).unwrap();
        store.set("inf", &[1.5, f64::INFINITY]).unwrap();

        assert_eq!(store.raw("nan").map(RawValue::get), Some("null"));
        assert_eq!(store.get::<Option<f64>>("nan").unwrap(), Some(None));
        assert!(store.get::<f64>("nan").is_err());
        assert_eq!(
            store.get::<Vec<Option<f64>>>("inf").unwrap(),
            Some(vec![Some(1.5), None])
        );
    }

    #[test]
    fn raw_fragment_is_stored_verbatim() {
        let mut store = EmbeddedStore::new();
        store.set("nothing", &Option::<Foo>::None).unwrap();
        store.set("list", &[1, 2, 3]).unwrap();

        assert_eq!(store.raw("nothing").map(RawValue::get), Some("null"));
        assert_eq!(store.raw("list").map(RawValue::get), Some("[1,2,3]"));
        assert!(store.raw("missing").is_none());
    }

    #[test]
    fn set_many_stores_heterogeneous_values() {
        let mut store = EmbeddedStore::new();
        let list = vec![foo(76, "footest")];
        let single = foo(53, "footest2");

        store
            .set_many([
                embedded_item("foo1", &list),
                embedded_item("foo2", &single),
            ])
            .unwrap();

        assert_eq!(store.get::<Vec<Foo>>("foo1").unwrap(), Some(list));
        assert_eq!(store.get::<Foo>("foo2").unwrap(), Some(single));
    }

    #[test]
    fn set_many_fails_fast_and_keeps_earlier_items() {
        let mut store = EmbeddedStore::new();
        let first = foo(1, "first");
        let last = foo(3, "never stored");

        let err = store
            .set_many([
                EmbedItem::new("first", &first),
                EmbedItem::new("broken", &Unencodable),
                EmbedItem::new("last", &last),
            ])
            .unwrap_err();

        match err {
            HalError::EmbedItem { index, ref key, .. } => {
                assert_eq!(index, 2);
                assert_eq!(key, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.contains_key("first"));
        assert!(!store.contains_key("broken"));
        assert!(!store.contains_key("last"));
    }

    #[test]
    fn keys_iterate_in_sorted_order() {
        let mut store = EmbeddedStore::new();
        store.set("zeta", &1).unwrap();
        store.set("alpha", &2).unwrap();
        store.set("mid", &3).unwrap();

        let keys: Vec<&str> = store.keys().collect();
        assert_eq!(keys, ["alpha", "mid", "zeta"]);

        assert!(store.remove("mid").is_some());
        assert_eq!(store.iter().count(), 2);
    }
}
