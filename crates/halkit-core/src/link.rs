//! Link types — the `_links` section of a HAL document.

use std::borrow::Cow;
use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// A single navigational reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Link {
    href: String,
}

impl Link {
    /// Create a link pointing at `href`. The value is stored verbatim.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    /// The link target.
    #[must_use]
    pub fn href(&self) -> &str {
        &self.href
    }
}

/// Source of the current request URI, used to derive the `self` relation.
///
/// Implement this for whatever request type your HTTP layer hands out. The
/// URI is copied into `self.href` as-is; no parsing or normalization happens.
pub trait RequestUri {
    fn request_uri(&self) -> &str;
}

impl RequestUri for str {
    fn request_uri(&self) -> &str {
        self
    }
}

impl RequestUri for String {
    fn request_uri(&self) -> &str {
        self
    }
}

impl RequestUri for Cow<'_, str> {
    fn request_uri(&self) -> &str {
        self
    }
}

/// One override applied to a [`LinkSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOption {
    Next(String),
    Prev(String),
}

/// Set the `next` relation.
pub fn next(href: impl Into<String>) -> LinkOption {
    LinkOption::Next(href.into())
}

/// Set the `prev` relation.
pub fn prev(href: impl Into<String>) -> LinkOption {
    LinkOption::Prev(href.into())
}

/// The fixed set of relations a resource can carry.
///
/// An empty set (every relation absent) is treated as "no links" and is left
/// out of serialized output entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkSet {
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_link: Option<Link>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Link>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<Link>,
}

impl LinkSet {
    /// Build a set whose `self` relation is the request URI, then apply
    /// `overrides` in order.
    pub fn from_request<R>(request: &R, overrides: impl IntoIterator<Item = LinkOption>) -> Self
    where
        R: RequestUri + ?Sized,
    {
        let mut links = Self {
            self_link: Some(Link::new(request.request_uri())),
            ..Self::default()
        };
        links.apply(overrides);
        links
    }

    /// Build a set from overrides alone; `self` stays absent.
    pub fn from_overrides(overrides: impl IntoIterator<Item = LinkOption>) -> Self {
        let mut links = Self::default();
        links.apply(overrides);
        links
    }

    /// Apply overrides left to right. A later override of the same relation
    /// replaces the earlier one.
    pub fn apply(&mut self, overrides: impl IntoIterator<Item = LinkOption>) {
        for option in overrides {
            match option {
                LinkOption::Next(href) => self.next = Some(Link::new(href)),
                LinkOption::Prev(href) => self.prev = Some(Link::new(href)),
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn self_link(&self) -> Option<&Link> {
        self.self_link.as_ref()
    }

    #[must_use]
    pub fn next(&self) -> Option<&Link> {
        self.next.as_ref()
    }

    #[must_use]
    pub fn prev(&self) -> Option<&Link> {
        self.prev.as_ref()
    }
}

// Link sets and links are JSON objects only; array forms are rejected.

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(LinkVisitor)
    }
}

struct LinkVisitor;

impl<'de> Visitor<'de> for LinkVisitor {
    type Value = Link;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a link object with an \"href\" string")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Link, A::Error> {
        let mut href: Option<String> = None;
        while let Some(key) = access.next_key::<String>()? {
            if key == "href" {
                if href.is_some() {
                    return Err(de::Error::duplicate_field("href"));
                }
                href = Some(access.next_value()?);
            } else {
                // title, type, templated and friends are not modelled.
                access.next_value::<IgnoredAny>()?;
            }
        }
        href.map(Link::new)
            .ok_or_else(|| de::Error::missing_field("href"))
    }
}

impl<'de> Deserialize<'de> for LinkSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(LinkSetVisitor)
    }
}

struct LinkSetVisitor;

impl<'de> Visitor<'de> for LinkSetVisitor {
    type Value = LinkSet;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of link relations")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<LinkSet, A::Error> {
        let mut links = LinkSet::default();
        while let Some(key) = access.next_key::<String>()? {
            match key.as_str() {
                "self" => links.self_link = access.next_value()?,
                "next" => links.next = access.next_value()?,
                "prev" => links.prev = access.next_value()?,
                _ => {
                    access.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(links)
    }
}
