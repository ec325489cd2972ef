/*
 * vPEC certified mail agent
 *
 * Copyright (C) 2003 - viridIT SAS
 * Licensed under the Elastic License 2.0
 *
 * You should have received a copy of the Elastic License 2.0 along with
 * this program. If not, see https://www.elastic.co/licensing/elastic-license.
 *
 */

use base64::{engine::general_purpose::STANDARD, Engine};

const BASE64_LINE_LENGTH: usize = 76;

/// Normalize line endings to CRLF: every bare LF gains a CR, existing CRLF
/// sequences are left untouched.
///
/// The output of this function is what the PKCS#7 hash covers, and must be
/// byte-identical to the signed part on the wire.
#[must_use]
pub fn canonicalize_crlf(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut previous = 0u8;

    for byte in data.iter().copied() {
        if byte == b'\n' && previous != b'\r' {
            out.push(b'\r');
        }
        out.push(byte);
        previous = byte;
    }

    out
}

/// Base64-encode a DER blob, lines wrapped at 76 characters with CRLF
/// separators, final line terminated.
#[must_use]
pub fn wrap_base64(der: &[u8]) -> String {
    let encoded = STANDARD.encode(der);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LENGTH * 2 + 2);

    for chunk in encoded.as_bytes().chunks(BASE64_LINE_LENGTH) {
        // base64 output is always ascii.
        #[allow(clippy::unwrap_used)]
        out.push_str(std::str::from_utf8(chunk).unwrap());
        out.push_str("\r\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_lf_gains_cr() {
        assert_eq!(canonicalize_crlf(b"a\nb\n"), b"a\r\nb\r\n");
    }

    #[test]
    fn crlf_is_untouched() {
        assert_eq!(canonicalize_crlf(b"a\r\nb\r\n"), b"a\r\nb\r\n");
    }

    #[test]
    fn mixed_endings() {
        assert_eq!(canonicalize_crlf(b"a\r\nb\nc"), b"a\r\nb\r\nc");
    }

    #[test]
    fn canonical_output_has_no_bare_lf() {
        let out = canonicalize_crlf(b"uno\ndue\r\ntre\n\n");
        for (idx, byte) in out.iter().enumerate() {
            if *byte == b'\n' {
                assert_eq!(out[idx - 1], b'\r');
            }
        }
    }

    #[test]
    fn base64_wrap_at_76() {
        let wrapped = wrap_base64(&vec![0u8; 200]);
        for line in wrapped.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(line.len() <= 76);
        }
        assert!(wrapped.ends_with("\r\n"));
    }
}
