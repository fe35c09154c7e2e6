//! Sanitization of untrusted strings
//!
//! Pure, total functions: none of them fail and none of them touch I/O.
//! Escaping is not idempotent (`&` becomes `&amp;` on every pass), so callers
//! must escape exactly once, at the output boundary.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Upper bound on entity-decoding rounds in [`Sanitizer::sanitize_advanced_xss`].
///
/// Payloads wrapped in more layers than this are escaped as they stand after
/// the last round.
pub const MAX_DECODE_ROUNDS: usize = 5;

// Attribute values are matched in their escaped form because the strippers run
// after `escape_html`.
static EVENT_HANDLER_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bon\w+\s*=\s*(?:&quot;.*?&quot;|&#x27;.*?&#x27;|[^\s&]*)")
        .expect("Invalid event handler regex")
});

static DATA_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bdata-[\w-]+\s*=\s*(?:&quot;.*?&quot;|&#x27;.*?&#x27;|[^\s&]*)")
        .expect("Invalid data attribute regex")
});

static JAVASCRIPT_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript\s*:").expect("Invalid javascript scheme regex"));

static CSS_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)expression\s*\(.*?\)").expect("Invalid CSS expression regex"));

/// Sanitization strategy selector for [`Sanitizer::sanitize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizeKind {
    #[default]
    Html,
    HtmlStrip,
    HtmlAttr,
    AdvancedXss,
    PlainText,
    Url,
    Email,
    Filename,
    CssIdentifier,
}

impl std::str::FromStr for SanitizeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "html_strip" => Ok(Self::HtmlStrip),
            "html_attr" => Ok(Self::HtmlAttr),
            "xss" | "advanced_xss" => Ok(Self::AdvancedXss),
            "plain_text" => Ok(Self::PlainText),
            "url" => Ok(Self::Url),
            "email" => Ok(Self::Email),
            "filename" => Ok(Self::Filename),
            "css_id" | "css_class" | "css_identifier" => Ok(Self::CssIdentifier),
            other => Err(format!("Unknown sanitization kind: {}", other)),
        }
    }
}

/// Core sanitization functions
pub struct Sanitizer;

impl Sanitizer {
    /// Apply the sanitizer selected by `kind`
    pub fn sanitize(input: &str, kind: SanitizeKind) -> String {
        match kind {
            SanitizeKind::Html | SanitizeKind::HtmlAttr => Self::escape_html(input),
            SanitizeKind::HtmlStrip => Self::strip_tags(input),
            SanitizeKind::AdvancedXss => Self::sanitize_advanced_xss(input),
            SanitizeKind::PlainText => Self::plain_text(input),
            SanitizeKind::Url => Self::url(input),
            SanitizeKind::Email => Self::email(input),
            SanitizeKind::Filename => Self::normalize_filename(input),
            SanitizeKind::CssIdentifier => Self::css_identifier(input),
        }
    }

    /// Encode `< > & " '` as HTML entities, safe inside quoted attributes too
    pub fn escape_html(input: &str) -> String {
        html_escape::encode_quoted_attribute(input).into_owned()
    }

    /// Remove markup (tags, comments, processing instructions) and keep text content
    pub fn strip_tags(input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(pos) = rest.find('<') {
            result.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("<!--") {
                rest = match tail.find("-->") {
                    Some(end) => &tail[end + 3..],
                    None => "",
                };
                continue;
            }

            let opens_tag = tail[1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'));

            if !opens_tag {
                result.push('<');
                rest = &tail[1..];
                continue;
            }

            rest = match Self::tag_end(tail) {
                Some(end) => &tail[end + 1..],
                None => "",
            };
        }

        result.push_str(rest);
        result
    }

    /// Strip tags and surrounding whitespace
    pub fn plain_text(input: &str) -> String {
        Self::strip_tags(input).trim().to_string()
    }

    /// Collapse layered entity encoding, escape, then remove attribute and
    /// scheme based attack vectors.
    ///
    /// The output contains no `on*=` attribute, no `data-*=` attribute, no
    /// `javascript:` scheme and no CSS `expression(...)`.
    pub fn sanitize_advanced_xss(input: &str) -> String {
        let decoded = Self::decode_entities(input, MAX_DECODE_ROUNDS);
        let mut current = Self::escape_html(&decoded);

        // Removing one match can splice a new one together ("ononclick=x=").
        loop {
            let next = Self::strip_attack_vectors(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    /// Decode HTML entities repeatedly until the value is stable or `max_rounds` is reached
    pub fn decode_entities(input: &str, max_rounds: usize) -> String {
        let mut current = input.to_string();
        for _ in 0..max_rounds {
            let next = html_escape::decode_html_entities(&current).into_owned();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// Replace anything outside `[A-Za-z0-9_.-]` with `_` and never return a dot-file name
    pub fn normalize_filename(input: &str) -> String {
        let mut sanitized: String = input
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if sanitized.starts_with('.') {
            sanitized.insert(0, '_');
        }

        sanitized
    }

    /// Make a string usable as a CSS id or class name
    pub fn css_identifier(input: &str) -> String {
        input
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Keep only characters legal in a URL
    pub fn url(input: &str) -> String {
        input
            .chars()
            .filter(|c| {
                c.is_ascii_alphanumeric() || "$-_.+!*'(),{}|\\^~[]`<>#%\";/?:@&=".contains(*c)
            })
            .collect()
    }

    /// Keep only characters legal in an e-mail address
    pub fn email(input: &str) -> String {
        input
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-=?^_`{|}~@.[]".contains(*c))
            .collect()
    }

    /// Loose boolean coercion used for checkbox-like inputs
    pub fn boolean(input: &str) -> bool {
        matches!(
            input.trim().to_lowercase().as_str(),
            "true" | "1" | "yes" | "y" | "on"
        )
    }

    fn strip_attack_vectors(input: &str) -> String {
        let result = EVENT_HANDLER_ATTR.replace_all(input, "");
        let result = DATA_ATTR.replace_all(&result, "");
        let result = JAVASCRIPT_SCHEME.replace_all(&result, "");
        CSS_EXPRESSION.replace_all(&result, "").into_owned()
    }

    /// Byte index of the `>` closing the tag that starts at `tag[0]`
    fn tag_end(tag: &str) -> Option<usize> {
        let mut quote: Option<char> = None;
        for (idx, c) in tag.char_indices().skip(1) {
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '"' || c == '\'' => quote = Some(c),
                None if c == '>' => return Some(idx),
                None => {}
            }
        }
        None
    }
}
