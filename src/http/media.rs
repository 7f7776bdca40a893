//! Media type module
//!
//! A small parsed `type/subtype; param=value` value used for `Content-Type`
//! headers and Accept negotiation.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Parsed media type, e.g. `application/json` or `text/plain; charset=utf-8`
///
/// Type, subtype and parameter names are stored lowercase.
///
/// # Examples
/// ```
/// use rest_reply::http::MediaType;
/// let mt: MediaType = "Text/Plain; charset=UTF-8".parse().unwrap();
/// assert_eq!(mt.essence(), "text/plain");
/// assert_eq!(mt.param("charset"), Some("UTF-8"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    kind: String,
    subtype: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    pub fn new(kind: &str, subtype: &str) -> Self {
        Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    pub fn application_json() -> Self {
        Self::new("application", "json")
    }

    #[must_use]
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// `type/subtype` without parameters
    pub fn essence(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_wildcard_type(&self) -> bool {
        self.kind == "*"
    }

    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == "*"
    }

    /// Whether `self` and `other` describe overlapping media ranges
    ///
    /// Parameters are ignored; `*` matches anything in its position.
    pub fn is_compatible(&self, other: &Self) -> bool {
        let kind_ok =
            self.is_wildcard_type() || other.is_wildcard_type() || self.kind == other.kind;
        let sub_ok = self.is_wildcard_subtype()
            || other.is_wildcard_subtype()
            || self.subtype == other.subtype;
        kind_ok && sub_ok
    }

    /// `application/json` or any `+json` structured syntax suffix
    pub fn is_json(&self) -> bool {
        self.kind == "application" && (self.subtype == "json" || self.subtype.ends_with("+json"))
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMediaType(s.to_string());
        if s.chars().any(char::is_control) {
            return Err(invalid());
        }

        let mut parts = s.split(';');
        let essence = parts.next().map(str::trim).ok_or_else(invalid)?;
        let (kind, subtype) = essence.split_once('/').ok_or_else(invalid)?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if !is_token(kind) || !is_token(subtype) {
            return Err(invalid());
        }

        let mut media_type = Self::new(kind, subtype);
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (name, value) = param.split_once('=').ok_or_else(invalid)?;
            let name = name.trim();
            if !is_token(name) {
                return Err(invalid());
            }
            let value = value.trim().trim_matches('"');
            media_type = media_type.with_param(name, value);
        }
        Ok(media_type)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (name, value) in &self.params {
            write!(f, ";{name}={value}")?;
        }
        Ok(())
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}
