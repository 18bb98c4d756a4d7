//! # halkit-core
//!
//! Build and parse HAL+JSON resource representations.
//!
//! A HAL document is a JSON object with two reserved top-level keys next to
//! any number of ordinary fields:
//! - `_links` — navigational relations ([`LinkSet`]: `self`, `next`, `prev`)
//! - `_embedded` — named sub-resources ([`EmbeddedStore`]), kept as raw JSON
//!   until a caller decodes them into a concrete type
//!
//! [`Resource`] composes both sections with caller-defined extras and owns
//! the wire format. Errors are reported through [`HalError`].

pub mod embedded;
pub mod error;
pub mod link;
pub mod resource;

pub use embedded::{embedded_item, EmbedItem, EmbeddedStore};
pub use error::{HalError, Result};
pub use link::{next, prev, Link, LinkOption, LinkSet, RequestUri};
pub use resource::{Resource, EMBEDDED_KEY, LINKS_KEY};
