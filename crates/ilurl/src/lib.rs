//! Addressing layer for the ilastik viewer client.
//!
//! This crate holds the value types every other layer builds on: normalized
//! url paths, the opaque token codec used to nest one url (or a JSON blob)
//! inside another url's path, and the [`Url`] type itself with its optional
//! virtual-protocol tag and its three canonical renderings.
//!
//! Everything here is synchronous and immutable; network concerns live in
//! the `ilview` crate.

pub mod error;
pub mod path;
pub mod token;
pub mod url;

pub use error::{Result, UrlError};
pub use path::UrlPath;
pub use url::{Transport, Url, UrlUpdate, VirtualTag};
