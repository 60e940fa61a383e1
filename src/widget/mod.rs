//! Widget controllers gluing external editor/renderer dependencies to the
//! sandbox core, plus the declarative mount contract.
//!
//! Widgets receive their source text through a `code` attribute carrying
//! URL-percent-encoded text; [`decode_code_attr`] reverses that exact
//! encoding before the source is used.

pub mod diagram;
pub mod playground;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{PlaygroundError, Result};

/// Characters left intact by the attribute encoding, mirroring
/// `encodeURIComponent`'s unreserved set.
const CODE_ATTR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Encode source text for embedding in a widget's `code` attribute.
pub fn encode_code_attr(source: &str) -> String {
    utf8_percent_encode(source, CODE_ATTR).to_string()
}

/// Decode a widget's `code` attribute back into source text.
pub fn decode_code_attr(encoded: &str) -> Result<String> {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|err| PlaygroundError::Decode(err.to_string()))
}
