//! Content negotiation module
//!
//! Picks the response media type from an endpoint's `produces` list and the
//! client's `Accept` header.

use crate::error::{Error, Result};
use crate::http::MediaType;

/// One media range from an `Accept` header
#[derive(Debug, Clone, PartialEq)]
struct AcceptRange {
    media_type: MediaType,
    quality: f32,
}

/// Parse an `Accept` header, skipping malformed ranges
///
/// Ranges come back sorted by descending quality; equal qualities keep header order.
fn parse_accept(header: &str) -> Vec<AcceptRange> {
    let mut ranges: Vec<AcceptRange> = header
        .split(',')
        .filter_map(|range| {
            let media_type: MediaType = range.trim().parse().ok()?;
            let quality = media_type
                .param("q")
                .map_or(Some(1.0), |q| q.trim().parse::<f32>().ok())?;
            Some(AcceptRange {
                media_type,
                quality: quality.clamp(0.0, 1.0),
            })
        })
        .collect();
    ranges.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    ranges
}

/// `*/*` < `type/*` < `type/subtype`
fn specificity(media_type: &MediaType) -> u8 {
    if media_type.is_wildcard_type() {
        0
    } else if media_type.is_wildcard_subtype() {
        1
    } else {
        2
    }
}

/// Choose a media type for the response
///
/// # Returns
/// - `Ok(None)` when the endpoint declares no media types
/// - the first declared type when the client sent no `Accept`
/// - otherwise the declared type matching the best-quality range, declared
///   order breaking ties
/// - `Err(Error::NotAcceptable)` when nothing matches
///
/// A `q=0` range refuses the types it matches unless a more specific range
/// accepts them.
///
/// A matching wildcard declaration yields the concrete type from the range,
/// so the result is never a wildcard when the client asked for something
/// specific.
pub fn negotiate(accept: Option<&str>, produces: &[MediaType]) -> Result<Option<MediaType>> {
    let Some(first) = produces.first() else {
        return Ok(None);
    };
    let accept = match accept.map(str::trim) {
        None | Some("") => return Ok(Some(first.clone())),
        Some(accept) => accept,
    };

    let ranges = parse_accept(accept);
    if ranges.is_empty() {
        return Ok(Some(first.clone()));
    }

    let refused: Vec<&AcceptRange> = ranges.iter().filter(|r| r.quality <= 0.0).collect();
    // a q=0 range refuses a type unless a more specific range accepts it
    let is_refused = |produced: &MediaType, accepted_by: &AcceptRange| {
        refused.iter().any(|z| {
            z.media_type.is_compatible(produced)
                && specificity(&z.media_type) > specificity(&accepted_by.media_type)
        })
    };

    for range in ranges.iter().filter(|r| r.quality > 0.0) {
        let found = produces
            .iter()
            .find(|p| p.is_compatible(&range.media_type) && !is_refused(*p, range));
        if let Some(found) = found {
            let wildcard_declared = found.is_wildcard_type() || found.is_wildcard_subtype();
            let requested =
                !range.media_type.is_wildcard_type() && !range.media_type.is_wildcard_subtype();
            if wildcard_declared && requested {
                return Ok(Some(MediaType::new(
                    range.media_type.kind(),
                    range.media_type.subtype(),
                )));
            }
            return Ok(Some(found.clone()));
        }
    }
    Err(Error::NotAcceptable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn produces() -> Vec<MediaType> {
        vec![MediaType::application_json(), MediaType::text_plain()]
    }

    #[test]
    fn test_no_produces() {
        assert_eq!(negotiate(Some("text/plain"), &[]).unwrap(), None);
    }

    #[test]
    fn test_missing_accept_uses_first() {
        assert_eq!(
            negotiate(None, &produces()).unwrap(),
            Some(MediaType::application_json())
        );
        assert_eq!(
            negotiate(Some("  "), &produces()).unwrap(),
            Some(MediaType::application_json())
        );
    }

    #[test]
    fn test_quality_ordering() {
        let chosen = negotiate(Some("application/json;q=0.5, text/plain"), &produces()).unwrap();
        assert_eq!(chosen, Some(MediaType::text_plain()));
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(
            negotiate(Some("*/*"), &produces()).unwrap(),
            Some(MediaType::application_json())
        );
        assert_eq!(
            negotiate(Some("text/*"), &produces()).unwrap(),
            Some(MediaType::text_plain())
        );
    }

    #[test]
    fn test_wildcard_declaration_takes_requested_type() {
        let any_text = vec!["text/*".parse().unwrap()];
        assert_eq!(
            negotiate(Some("text/csv"), &any_text).unwrap(),
            Some("text/csv".parse().unwrap())
        );
    }

    #[test]
    fn test_zero_quality_excludes() {
        let err = negotiate(Some("application/json;q=0"), &[MediaType::application_json()]);
        assert!(matches!(err, Err(Error::NotAcceptable)));
    }

    #[test]
    fn test_zero_quality_overrides_broader_range() {
        let declared = [MediaType::text_plain(), MediaType::application_json()];
        assert_eq!(
            negotiate(Some("text/plain;q=0, */*"), &declared).unwrap(),
            Some(MediaType::application_json())
        );
        assert_eq!(
            negotiate(Some("text/*;q=0, */*;q=0.5"), &declared).unwrap(),
            Some(MediaType::application_json())
        );
        // a more specific range still accepts what a broad q=0 refuses
        assert_eq!(
            negotiate(Some("*/*;q=0, text/plain"), &declared).unwrap(),
            Some(MediaType::text_plain())
        );
        assert!(matches!(
            negotiate(Some("text/plain;q=0, text/*"), &[MediaType::text_plain()]),
            Err(Error::NotAcceptable)
        ));
    }

    #[test]
    fn test_not_acceptable() {
        assert!(matches!(
            negotiate(Some("image/png"), &produces()),
            Err(Error::NotAcceptable)
        ));
    }
}
