//! Read-only registry of recognized MIME types and subtypes.
//!
//! The registry is built once at startup and injected into the parsers, so
//! parsing stays a pure function of (input, registry). An unrecognized
//! type or subtype is a construction failure for [`crate::canon::MediaType`],
//! which keeps made-up media types from slipping past the canonicalizer.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail, ensure};

use crate::canon::grammar::is_tchar;

#[derive(Debug, Clone, Default)]
pub struct MimeRegistry {
    subtypes: HashMap<Vec<u8>, HashSet<Vec<u8>>>,
}

/// IANA top-level media types.
const TOP_LEVEL_TYPES: &[&str] = &[
    "application",
    "audio",
    "example",
    "font",
    "haptics",
    "image",
    "message",
    "model",
    "multipart",
    "text",
    "video",
];

const BUILTIN_SUBTYPES: &[(&str, &[&str])] = &[
    (
        "application",
        &[
            "gzip",
            "javascript",
            "json",
            "octet-stream",
            "pdf",
            "x-www-form-urlencoded",
            "xml",
            "zip",
        ],
    ),
    ("audio", &["mpeg", "ogg", "wav"]),
    ("font", &["otf", "ttf", "woff", "woff2"]),
    ("image", &["gif", "jpeg", "png", "svg+xml", "webp"]),
    ("message", &["http"]),
    (
        "multipart",
        &["alternative", "byteranges", "form-data", "mixed", "related"],
    ),
    (
        "text",
        &["css", "csv", "html", "javascript", "markdown", "plain", "xml"],
    ),
    ("video", &["mp4", "mpeg", "ogg", "webm"]),
];

impl MimeRegistry {
    /// Registry with no subtypes; every top-level type is still known.
    pub fn empty() -> Self {
        let subtypes = TOP_LEVEL_TYPES
            .iter()
            .map(|name| (name.as_bytes().to_vec(), HashSet::new()))
            .collect();
        Self { subtypes }
    }

    /// Registry seeded with the common IANA types.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (type_, subtypes) in BUILTIN_SUBTYPES {
            for subtype in *subtypes {
                registry
                    .register(type_.as_bytes(), subtype.as_bytes())
                    .expect("builtin MIME table entries are valid");
            }
        }
        registry
    }

    /// Add a subtype under a known top-level type. Both halves must be
    /// lowercase tokens; anything else is a configuration error.
    pub fn register(&mut self, type_: &[u8], subtype: &[u8]) -> Result<()> {
        ensure!(
            is_lowercase_token(type_) && is_lowercase_token(subtype),
            "MIME names must be lowercase tokens: '{}/{}'",
            String::from_utf8_lossy(type_),
            String::from_utf8_lossy(subtype),
        );
        let Some(entries) = self.subtypes.get_mut(type_) else {
            bail!(
                "unknown top-level MIME type '{}'",
                String::from_utf8_lossy(type_)
            );
        };
        entries.insert(subtype.to_vec());
        Ok(())
    }

    /// Add an entry given as `type/subtype` (settings syntax).
    pub fn register_str(&mut self, entry: &str) -> Result<()> {
        let Some((type_, subtype)) = entry.split_once('/') else {
            bail!("MIME entry '{entry}' must be of the form type/subtype");
        };
        self.register(type_.as_bytes(), subtype.as_bytes())
    }

    pub fn contains_type(&self, type_: &[u8]) -> bool {
        self.subtypes.contains_key(type_)
    }

    pub fn contains_subtype(&self, type_: &[u8], subtype: &[u8]) -> bool {
        self.subtypes
            .get(type_)
            .is_some_and(|entries| entries.contains(subtype))
    }
}

fn is_lowercase_token(name: &[u8]) -> bool {
    !name.is_empty()
        && name
            .iter()
            .all(|byte| is_tchar(*byte) && !byte.is_ascii_uppercase())
}
