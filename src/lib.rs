//! A library for finding a representative image for catalog records.
//!
//! Most records only come with a link to an article about them. The
//! [`Resolver`] fetches that article through a [`Relay`], digs the most
//! likely image out of its markup with [`extract_image()`], and falls back to
//! an image search when that doesn't work. Results are remembered in a
//! [`Cache`] so each link is only looked up once.

#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod cache;
mod extract;
mod options;
mod relay;
mod resolve;
mod search;

pub use cache::{Cache, LruCache, MemoryCache};
pub use extract::*;
pub use options::Options;
pub use relay::{get, Fetcher, Reason, Relay};
pub use resolve::Resolver;
pub use search::{
    escape_html, highlight, placeholder_data_url, search, source_name,
};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use std::fmt::{self, Display, Formatter};

/// Everything `encodeURIComponent()` would escape.
///
/// Only use this where the encoded text is inserted verbatim, because
/// [`url::Url`] setters escape some of the characters it leaves alone.
pub(crate) const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// One entry in the catalog.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    /// The vehicle's name.
    #[cfg_attr(feature = "serde-1", serde(alias = "carro", default))]
    pub name: String,
    /// When the vehicle was made.
    #[cfg_attr(feature = "serde-1", serde(alias = "ano", default))]
    pub year: Year,
    /// A short blurb.
    #[cfg_attr(feature = "serde-1", serde(alias = "descrição", default))]
    pub description: String,
    /// An article about the vehicle, used to find an image.
    #[cfg_attr(
        feature = "serde-1",
        serde(alias = "link_reportagem", default)
    )]
    pub source_link: Option<String>,
    /// An image to use directly, skipping any lookups.
    #[cfg_attr(feature = "serde-1", serde(alias = "imagem", default))]
    pub direct_image: Option<String>,
}

impl Record {
    /// Create a [`Record`] with no links.
    pub fn new<N, D>(name: N, year: Year, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Record {
            name: name.into(),
            year,
            description: description.into(),
            source_link: None,
            direct_image: None,
        }
    }

    /// Set the [`Record::source_link`].
    pub fn with_source_link<S: Into<String>>(self, source_link: S) -> Self {
        Record {
            source_link: Some(source_link.into()),
            ..self
        }
    }

    /// Set the [`Record::direct_image`].
    pub fn with_direct_image<S: Into<String>>(self, direct_image: S) -> Self {
        Record {
            direct_image: Some(direct_image.into()),
            ..self
        }
    }
}

/// A year, which datasets write either as a number or as free text (e.g.
/// `"1967-1973"`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-1", serde(untagged))]
pub enum Year {
    /// A single year.
    Number(i64),
    /// Anything else.
    Text(String),
}

impl Default for Year {
    fn default() -> Self { Year::Text(String::new()) }
}

impl From<i64> for Year {
    fn from(year: i64) -> Self { Year::Number(year) }
}

impl From<&str> for Year {
    fn from(year: &str) -> Self { Year::Text(year.to_string()) }
}

impl Display for Year {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Year::Number(n) => write!(f, "{}", n),
            Year::Text(s) => write!(f, "{}", s),
        }
    }
}
