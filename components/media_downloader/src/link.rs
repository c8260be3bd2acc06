// components/media_downloader/src/link.rs
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix every canonical link starts with
pub const LONG_FORM_PREFIX: &str = "https://www.youtube.com/watch?v=";

const LONG_FORM_MARKER: &str = "watch?v=";
const SHORT_FORM_MARKER: &str = "youtu.be/";

/// Input that carries neither a `watch?v=` nor a `youtu.be/` identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a recognised video link: {0}")]
pub struct Rejected(pub String);

/// A video link in its single long form, `https://www.youtube.com/watch?v=<id>`.
///
/// Two links to the same video are byte-identical once normalised.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalLink(String);

impl CanonicalLink {
    /// Normalise a long form or short form link.
    ///
    /// The identifier ends at the first query, fragment or path boundary, so
    /// normalising an already canonical link returns it unchanged.
    pub fn normalize(raw: &str) -> Result<Self, Rejected> {
        let raw = raw.trim();
        let rest = if let Some(pos) = raw.find(LONG_FORM_MARKER) {
            &raw[pos + LONG_FORM_MARKER.len()..]
        } else if let Some(pos) = raw.find(SHORT_FORM_MARKER) {
            &raw[pos + SHORT_FORM_MARKER.len()..]
        } else {
            return Err(Rejected(raw.to_string()));
        };

        let id = rest
            .split(|c: char| matches!(c, '?' | '&' | '#' | '/'))
            .next()
            .unwrap_or_default();

        Self::from_id(id).map_err(|_| Rejected(raw.to_string()))
    }

    /// Build the canonical link for a bare video identifier
    pub fn from_id(id: &str) -> Result<Self, Rejected> {
        let id = id.trim();
        let valid = !id.is_empty()
            && !id
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '?' | '&' | '#' | '/' | '='));
        if !valid {
            return Err(Rejected(id.to_string()));
        }
        Ok(Self(format!("{}{}", LONG_FORM_PREFIX, id)))
    }

    pub fn id(&self) -> &str {
        &self.0[LONG_FORM_PREFIX.len()..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CanonicalLink> for String {
    fn from(link: CanonicalLink) -> Self {
        link.0
    }
}

impl TryFrom<String> for CanonicalLink {
    type Error = Rejected;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::normalize(&raw)
    }
}

/// Outcome of normalising a collection of raw identifiers
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizedLinks {
    /// Unique links, in the order they were first seen
    pub links: Vec<CanonicalLink>,
    pub rejected: Vec<Rejected>,
    pub duplicates: usize,
}

/// Normalise every entry and drop repeats of the same video
pub fn normalize_all<I, S>(raw: I) -> NormalizedLinks
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut result = NormalizedLinks::default();

    for entry in raw {
        match CanonicalLink::normalize(entry.as_ref()) {
            Ok(link) => {
                if seen.insert(link.clone()) {
                    result.links.push(link);
                } else {
                    result.duplicates += 1;
                }
            }
            Err(rejected) => result.rejected.push(rejected),
        }
    }

    result
}
