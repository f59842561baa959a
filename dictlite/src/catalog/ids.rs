// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Object identifiers and the stable XML id encoding

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an object held in a catalog arena. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub(crate) u64);

impl ObjectId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Build `<prefix><escaped raw>`
///
/// ASCII alphanumerics pass through, `_` is doubled and every other byte is
/// written as `_XX` in upper-case hex.
pub fn encode_id(prefix: &str, raw: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + raw.len());
    out.push_str(prefix);
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() {
            out.push(byte as char);
        } else if byte == b'_' {
            out.push_str("__");
        } else {
            out.push_str(&format!("_{:02X}", byte));
        }
    }
    out
}

/// Reverse of [`encode_id`]; `None` if the prefix or escaping is wrong
pub fn decode_id(prefix: &str, encoded: &str) -> Option<String> {
    let body = encoded.strip_prefix(prefix)?;
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'_' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(b'_') => {
                out.push(b'_');
                i += 2;
            }
            Some(_) => {
                let hex = body.get(i + 1..i + 3)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            None => return None,
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_pass_through() {
        assert_eq!(encode_id("DT", "int4"), "DTint4");
        assert_eq!(decode_id("DT", "DTint4"), Some("int4".to_string()));
    }

    #[test]
    fn test_escaping() {
        let encoded = encode_id("DT", "double precision_x");
        assert_eq!(encoded, "DTdouble_20precision__x");
        assert_eq!(
            decode_id("DT", &encoded),
            Some("double precision_x".to_string())
        );

        let unicode = encode_id("PR", "größe");
        assert_eq!(decode_id("PR", &unicode), Some("größe".to_string()));
    }

    #[test]
    fn test_bad_input() {
        assert_eq!(decode_id("DT", "PRabs"), None);
        assert_eq!(decode_id("DT", "DTab_"), None);
        assert_eq!(decode_id("DT", "DTab_Z"), None);
    }
}
