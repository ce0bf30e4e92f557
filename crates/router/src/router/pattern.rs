//! Splitting of route patterns and request paths into segments.

use crate::error::RouteError;
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use tracing::debug;

/// Name under which a trailing wildcard stores the rest of the path.
pub const WILDCARD: &str = "*";

/// One segment of a parsed route pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'p> {
    Static(&'p str),
    Param(&'p str),
    Wildcard,
}

/// Parses a pattern such as `/users/:id/files/*` into its segments.
///
/// Empty segments are ignored, so `/users/` and `/users` are the same pattern.
pub(crate) fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::invalid_pattern(pattern, "must start with '/'"));
    }

    let mut segments = Vec::new();
    for raw in split_path(pattern) {
        if matches!(segments.last(), Some(Segment::Wildcard)) {
            return Err(RouteError::invalid_pattern(pattern, "'*' must be the last segment"));
        }

        let segment = match raw {
            WILDCARD => Segment::Wildcard,
            _ => match raw.strip_prefix(':') {
                Some("") => return Err(RouteError::invalid_pattern(pattern, "parameter name must not be empty")),
                Some(name) => Segment::Param(name),
                None => Segment::Static(raw),
            },
        };
        segments.push(segment);
    }

    Ok(segments)
}

/// Splits a path on `/`, skipping empty segments.
pub(crate) fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// The raw text of `path` that holds its last `count` non-empty segments, without trailing
/// slashes. Empty segments between them are kept.
pub(crate) fn tail(path: &str, count: usize) -> &str {
    let path = path.trim_end_matches('/');
    let skip = split_path(path).count().saturating_sub(count);

    let mut offset = 0;
    let mut seen = 0;
    for segment in path.split('/') {
        if !segment.is_empty() {
            if seen == skip {
                return &path[offset..];
            }
            seen += 1;
        }
        offset += segment.len() + 1;
    }
    ""
}

/// Percent-decodes a captured value. Values that do not decode to UTF-8 are kept raw.
pub(crate) fn decode(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(Cow::Borrowed(decoded)) => decoded.to_owned(),
        Ok(Cow::Owned(decoded)) => decoded,
        Err(e) => {
            debug!(cause = %e, raw, "keep undecodable path parameter as is");
            raw.to_owned()
        }
    }
}
