//! Message catalog loading and template rendering
//!
//! The catalog is an XML message table (`uistring.xml`):
//!
//! ```xml
//! <messages>
//!   <message mid="42"><![CDATA[Sword]]></message>
//!   <message mid="43"><![CDATA[{0} deals {1} damage]]></message>
//! </messages>
//! ```
//!
//! Templates carry positional `{0}`, `{1}`, ... placeholders. Multiple message
//! ids can be packed into one text field as a bracketed list, `{12}^{34}`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, ParsingOptions};
use tracing::{debug, info, warn};

use crate::{LoadError, CATALOG_FILE_NAME, INVALID_PARAM_MARKER};

/// Delimiter between tokens of a bracketed parameter list
pub const PARAM_DELIMITER: &str = "}^{";

/// Message element name
const MESSAGE_TAG: &str = "message";

/// Message id attribute name
const MESSAGE_ID_ATTR: &str = "mid";

/// Immutable id → template mapping
#[derive(Debug, Clone, Default)]
pub struct StringCatalog {
    messages: HashMap<i32, String>,
}

/// Counters gathered while loading a catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// `<message>` elements seen
    pub declared: usize,
    /// Messages stored in the catalog
    pub loaded: usize,
    /// Messages skipped for a missing id or text
    pub incomplete: usize,
    /// Messages ignored because their id was already loaded
    pub duplicates: usize,
}

impl StringCatalog {
    /// Load a catalog from an XML file, or from `uistring.xml` inside a directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = resolve_catalog_path(path.as_ref());
        if !path.is_file() {
            return Err(LoadError::NotFound(path));
        }

        let bytes = fs::read(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let text = std::str::from_utf8(&bytes).map_err(|_| LoadError::Encoding(path.clone()))?;

        let (catalog, stats) = Self::parse_with_stats(text)?;
        info!(
            path = %path.display(),
            declared = stats.declared,
            loaded = stats.loaded,
            "Loaded message catalog"
        );
        if stats.incomplete > 0 || stats.duplicates > 0 {
            warn!(
                incomplete = stats.incomplete,
                duplicates = stats.duplicates,
                "Some catalog messages were not loaded"
            );
        }

        Ok(catalog)
    }

    /// Parse a catalog from XML text
    pub fn parse(xml: &str) -> Result<Self, LoadError> {
        Self::parse_with_stats(xml).map(|(catalog, _)| catalog)
    }

    /// Parse a catalog from XML text, returning load counters
    pub fn parse_with_stats(xml: &str) -> Result<(Self, LoadStats), LoadError> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let options = ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = Document::parse_with_options(xml, options)?;
        let root = doc.root_element();
        debug!(root = root.tag_name().name(), "Parsing message catalog");

        let mut catalog = Self::default();
        let mut stats = LoadStats::default();

        for node in root.children().filter(|n| n.has_tag_name(MESSAGE_TAG)) {
            stats.declared += 1;

            let mid = node.attribute(MESSAGE_ID_ATTR);
            let text = node.first_child().filter(|c| c.is_text()).and_then(|c| c.text());

            let (Some(mid), Some(text)) = (mid, text) else {
                stats.incomplete += 1;
                continue;
            };

            let id = mid
                .trim()
                .parse::<i32>()
                .map_err(|_| LoadError::InvalidMessageId(mid.to_string()))?;

            if catalog.insert(id, text.to_string()) {
                stats.loaded += 1;
            } else {
                stats.duplicates += 1;
            }
        }

        Ok((catalog, stats))
    }

    /// Build a catalog from `(id, text)` pairs; the first text for an id wins
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i32, S)>,
        S: Into<String>,
    {
        let mut catalog = Self::default();
        for (id, text) in entries {
            catalog.insert(id, text.into());
        }
        catalog
    }

    /// Insert unless the id is already present
    fn insert(&mut self, id: i32, text: String) -> bool {
        match self.messages.entry(id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(text);
                true
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: i32) -> bool {
        self.messages.contains_key(&id)
    }

    /// Template for `id`, or an empty string when the id is unknown
    pub fn resolve(&self, id: i32) -> &str {
        match self.messages.get(&id) {
            Some(text) => text,
            None => {
                debug!(id, "Message id not in catalog");
                ""
            }
        }
    }

    /// Template for `id` with `{i}` replaced by `params[i]`
    pub fn render<S: AsRef<str>>(&self, id: i32, params: &[S]) -> String {
        fill_placeholders(self.resolve(id), params)
    }

    /// Resolve every token of a bracketed list through the catalog
    ///
    /// Tokens that are not integers become [`INVALID_PARAM_MARKER`].
    pub fn resolve_bracketed_params(&self, raw: &str) -> Vec<String> {
        split_bracketed_params(raw)
            .into_iter()
            .map(|token| match token.trim().parse::<i32>() {
                Ok(id) => self.resolve(id).to_string(),
                Err(_) => {
                    warn!(token, "Unparseable message parameter");
                    INVALID_PARAM_MARKER.to_string()
                }
            })
            .collect()
    }
}

/// A directory means the default catalog file inside it
fn resolve_catalog_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(CATALOG_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

/// Replace `{i}` with `params[i]` in one left-to-right pass over `template`
///
/// Inserted text is never scanned again. Placeholders without a parameter
/// are kept.
pub fn fill_placeholders<S: AsRef<str>>(template: &str, params: &[S]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let param = placeholder_index(after)
            .and_then(|(index, len)| Some((params.get(index)?, len)));
        match param {
            Some((param, len)) => {
                out.push_str(param.as_ref());
                rest = &after[len + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Parse `12}` at the start of `text` into `(12, 2)`
fn placeholder_index(text: &str) -> Option<(usize, usize)> {
    let len = text.bytes().take_while(u8::is_ascii_digit).count();
    let digits = &text[..len];
    if len == 0 || (len > 1 && digits.starts_with('0')) || !text[len..].starts_with('}') {
        return None;
    }
    digits.parse().ok().map(|index| (index, len))
}

/// Split `{12}^{34}^{56}` into `["12", "34", "56"]`
///
/// The first token loses one leading `{`, the last one trailing `}`.
pub fn split_bracketed_params(raw: &str) -> Vec<&str> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut tokens: Vec<&str> = raw.split(PARAM_DELIMITER).collect();

    if let Some(first) = tokens.first_mut() {
        let token = *first;
        *first = token.strip_prefix('{').unwrap_or(token);
    }
    if let Some(last) = tokens.last_mut() {
        let token = *last;
        *last = token.strip_suffix('}').unwrap_or(token);
    }

    tokens
}
