//! Mime type detection and filtering.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Display icon hint for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Icon {
    Image,
    Video,
    Audio,
    Text,
    Document,
    Archive,
    Default,
}

impl Icon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Icon::Image => "media-image",
            Icon::Video => "media-video",
            Icon::Audio => "media-audio",
            Icon::Text => "media-text",
            Icon::Document => "media-document",
            Icon::Archive => "media-archive",
            Icon::Default => "media-default",
        }
    }
}

/// Guess the mime type of a file name from its extension.
///
/// Returns `None` when the name has no known extension.
pub fn mime_for_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    mime_guess::from_path(name)
        .first_raw()
        .map(|mime| mime.to_string())
}

/// Pick the icon for a mime type.
pub fn icon_for_mime(mime: &str) -> Icon {
    let (kind, subtype) = mime.split_once('/').unwrap_or((mime, ""));
    match kind {
        "image" => Icon::Image,
        "video" => Icon::Video,
        "audio" => Icon::Audio,
        "text" => Icon::Text,
        "application" => match subtype {
            "zip" | "gzip" | "x-tar" | "x-7z-compressed" | "x-rar-compressed" => Icon::Archive,
            "pdf" | "msword" | "rtf" => Icon::Document,
            s if s.starts_with("vnd.openxmlformats") || s.starts_with("vnd.oasis") => {
                Icon::Document
            }
            _ => Icon::Default,
        },
        _ => Icon::Default,
    }
}

/// Decides which objects are visible in a listing.
///
/// Consulted once per file with a non-empty mime type.
pub trait MimeFilter: Send + Sync {
    fn allows(&self, key: &str, mime: &str) -> bool;
}

/// Accept every object with a known mime type.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl MimeFilter for AllowAll {
    fn allows(&self, _key: &str, _mime: &str) -> bool {
        true
    }
}

/// Accept only the listed mime types.
///
/// Entries may be exact (`image/png`) or wildcards over the top-level type
/// (`image/*`).
#[derive(Debug, Default, Clone)]
pub struct AllowList {
    exact: HashSet<String>,
    kinds: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for mime in types {
            let mime = mime.as_ref().trim().to_ascii_lowercase();
            match mime.strip_suffix("/*") {
                Some(kind) => {
                    list.kinds.insert(kind.to_string());
                }
                None => {
                    list.exact.insert(mime);
                }
            }
        }
        list
    }

    /// Common web media types: images, audio, video and office documents.
    pub fn media() -> Self {
        Self::new([
            "image/*",
            "audio/*",
            "video/*",
            "text/plain",
            "text/csv",
            "application/pdf",
            "application/msword",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            "application/zip",
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.kinds.is_empty()
    }
}

impl MimeFilter for AllowList {
    fn allows(&self, _key: &str, mime: &str) -> bool {
        let mime = mime.to_ascii_lowercase();
        if self.exact.contains(&mime) {
            return true;
        }
        mime.split_once('/')
            .is_some_and(|(kind, _)| self.kinds.contains(kind))
    }
}
