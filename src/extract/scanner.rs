//! Locating embedded artifact objects in free-form text

use crate::protocol::schema::{ARTIFACT_KIND, KIND_KEY, LEGACY_KIND_KEY};

const DISCRIMINATOR_KEYS: [&str; 2] = [KIND_KEY, LEGACY_KIND_KEY];
const NEEDLE: &[u8] = b"artifact";

/// Case-insensitive check for the word "artifact"
pub(crate) fn mentions_artifact(text: &str) -> bool {
    text.as_bytes()
        .windows(NEEDLE.len())
        .any(|window| window.eq_ignore_ascii_case(NEEDLE))
}

/// Byte offset of the first `{` that opens an artifact discriminator
///
/// Both `{"kind": "artifact"` and `{'kind': 'artifact'` openings are
/// accepted, as well as the legacy `type` key. Whitespace may appear between
/// the tokens. Objects whose discriminator holds another value are skipped;
/// a value cut off by the end of the text still counts.
pub(crate) fn candidate_start(text: &str) -> Option<usize> {
    text.match_indices('{')
        .map(|(index, _)| index)
        .find(|&index| opens_discriminator(&text[index + 1..]))
}

fn opens_discriminator(rest: &str) -> bool {
    let rest = rest.trim_start();
    ['"', '\''].into_iter().any(|quote| {
        let Some(after_quote) = rest.strip_prefix(quote) else {
            return false;
        };
        DISCRIMINATOR_KEYS.iter().any(|key| {
            after_quote
                .strip_prefix(key)
                .and_then(|r| r.strip_prefix(quote))
                .and_then(|r| r.trim_start().strip_prefix(':'))
                .is_some_and(|value| names_artifact(value.trim_start()))
        })
    })
}

/// Check if a discriminator value is, or may still become, `"artifact"`
fn names_artifact(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }
    ['"', '\''].into_iter().any(|quote| {
        let Some(inner) = value.strip_prefix(quote) else {
            return false;
        };
        match inner.strip_prefix(ARTIFACT_KIND) {
            Some(rest) => rest.is_empty() || rest.starts_with(quote),
            None => ARTIFACT_KIND.starts_with(inner),
        }
    })
}

/// Exclusive end offset of the object opened at `start`
///
/// Braces inside string literals are ignored and backslash escapes are
/// honoured. Returns `None` while the object is still unterminated.
pub(crate) fn object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string: Option<u8> = None;
    let mut escaped = false;

    for (offset, &byte) in text.as_bytes()[start..].iter().enumerate() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == quote {
                in_string = None;
            }
            continue;
        }

        match byte {
            b'"' | b'\'' => in_string = Some(byte),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }

    None
}
