//! Source Loader
//!
//! Best-effort decoding of Python source files. Decoding never fails:
//! a UTF-8 byte-order mark wins, then an encoding declaration on the first
//! two lines, then strict UTF-8, and finally lossy UTF-8 with the
//! `used_fallback` flag set. Only reading the file can fail.

use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use encoding_rs::Encoding;
use regex::Regex;
use tracing::debug;

use crate::constants::source::{
    ENCODING_DECLARATION_LINES, UTF8_LABEL, UTF8_SIG_LABEL,
};
use crate::types::{Result, SourceInfo};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// `# -*- coding: <name> -*-` / `# vim: set fileencoding=<name> :`
static CODING_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\x0c]*#.*?coding[:=][ \t]*([-\w.]+)")
        .expect("encoding declaration pattern is valid")
});

/// Decoded source text plus how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub text: String,
    /// Declared label as written (`cp1251`), `utf-8-sig` or `utf-8`
    pub encoding: String,
    pub used_fallback: bool,
    pub truncated: bool,
}

impl SourceText {
    pub fn info(&self) -> SourceInfo {
        SourceInfo {
            encoding: self.encoding.clone(),
            used_fallback: self.used_fallback,
            truncated: self.truncated,
        }
    }
}

/// Reads and decodes source files, optionally capped at a byte ceiling
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceLoader {
    max_bytes: Option<u64>,
}

impl SourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap reads at `max_bytes`; zero means unlimited
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = (max_bytes > 0).then_some(max_bytes);
        self
    }

    /// Read and decode a file. Only I/O failures are reported.
    pub fn load(&self, path: &Path) -> Result<SourceText> {
        let file = File::open(path)?;
        let mut raw = Vec::new();
        let mut truncated = false;

        match self.max_bytes {
            Some(max) => {
                file.take(max.saturating_add(1)).read_to_end(&mut raw)?;
                let limit = usize::try_from(max).unwrap_or(usize::MAX);
                if raw.len() > limit {
                    raw.truncate(limit);
                    truncated = true;
                    debug!("Truncated {} to {} bytes", path.display(), max);
                }
            }
            None => {
                let mut file = file;
                file.read_to_end(&mut raw)?;
            }
        }

        Ok(decode_source(&raw, truncated))
    }
}

/// Decode raw bytes into text. Never fails.
///
/// `truncated` tells the decoder the buffer may end mid-character, in which
/// case an incomplete trailing UTF-8 sequence is dropped instead of
/// triggering the lossy fallback.
pub fn decode_source(raw: &[u8], truncated: bool) -> SourceText {
    if let Some(body) = raw.strip_prefix(UTF8_BOM) {
        let (text, used_fallback) = decode_utf8(body, truncated);
        return SourceText {
            text: text.trim_start_matches('\u{feff}').to_string(),
            encoding: UTF8_SIG_LABEL.to_string(),
            used_fallback,
            truncated,
        };
    }

    if let Some(declared) = detect_declared_encoding(raw) {
        match decode_with_label(raw, &declared) {
            Some(text) => {
                return SourceText {
                    text,
                    encoding: declared,
                    used_fallback: false,
                    truncated,
                };
            }
            None => debug!("Declared encoding '{}' unusable, trying utf-8", declared),
        }
    }

    let (text, used_fallback) = decode_utf8(raw, truncated);
    SourceText {
        text,
        encoding: UTF8_LABEL.to_string(),
        used_fallback,
        truncated,
    }
}

/// Find an encoding declaration on the first two lines.
///
/// Header bytes are mapped one-to-one onto chars (latin-1) so the scan works
/// whatever the file's real encoding is.
pub fn detect_declared_encoding(raw: &[u8]) -> Option<String> {
    raw.split(|b| *b == b'\n')
        .take(ENCODING_DECLARATION_LINES)
        .find_map(|line| {
            let line: String = line.iter().map(|&b| b as char).collect();
            CODING_DECLARATION
                .captures(&line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
        .filter(|name| !name.is_empty())
}

/// Strict decode with a declared encoding; `None` for unknown labels or bad bytes
fn decode_with_label(raw: &[u8], label: &str) -> Option<String> {
    let lowered = label.trim().to_ascii_lowercase();
    let normalized = lowered.replace('_', "-");

    match normalized.as_str() {
        "utf-8" | "utf8" | "utf-8-sig" | "u8" => {
            return std::str::from_utf8(raw).ok().map(str::to_string);
        }
        "ascii" | "us-ascii" | "646" => {
            return raw
                .is_ascii()
                .then(|| String::from_utf8_lossy(raw).into_owned());
        }
        // WHATWG maps these labels onto windows-1252; Python means the real thing
        "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "l1" => {
            return Some(raw.iter().map(|&b| b as char).collect());
        }
        _ => {}
    }

    let encoding = Encoding::for_label(lowered.as_bytes())
        .or_else(|| Encoding::for_label(normalized.as_bytes()))?;
    encoding
        .decode_without_bom_handling_and_without_replacement(raw)
        .map(Cow::into_owned)
}

/// UTF-8 decode, returning the text and whether the lossy fallback was used
fn decode_utf8(raw: &[u8], truncated: bool) -> (String, bool) {
    match std::str::from_utf8(raw) {
        Ok(text) => (text.to_string(), false),
        Err(e) if truncated && e.error_len().is_none() => {
            // Cut inside the last character: keep the valid prefix
            let valid = &raw[..e.valid_up_to()];
            (String::from_utf8_lossy(valid).into_owned(), false)
        }
        Err(_) => (String::from_utf8_lossy(raw).into_owned(), true),
    }
}
