//! C `bool` and fixed-size string fields

use std::fmt;

/// One-byte C `bool`.
///
/// Shared memory can hold any byte value, so this keeps the raw byte instead of a Rust
/// `bool` and treats every non-zero byte as `true`.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CBool(pub u8);

impl CBool {
    pub const FALSE: CBool = CBool(0);
    pub const TRUE: CBool = CBool(1);

    pub fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for CBool {
    fn from(value: bool) -> Self {
        CBool(value as u8)
    }
}

impl From<CBool> for bool {
    fn from(value: CBool) -> Self {
        value.get()
    }
}

impl fmt::Debug for CBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.get(), f)
    }
}

/// Decode a NUL-terminated ISO-8859-1 field.
///
/// Bytes after the first NUL are ignored. A field without a terminator is decoded in full.
pub fn decode_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..end].iter().map(|&b| char::from(b)).collect()
}

/// Copy `text` into a fixed-size field, truncating and NUL-terminating it.
#[cfg(any(test, feature = "benchmark"))]
pub(crate) fn encode_text<const N: usize>(text: &str) -> [u8; N] {
    let mut field = [0u8; N];
    let len = text.len().min(N.saturating_sub(1));
    field[..len].copy_from_slice(&text.as_bytes()[..len]);
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_up_to_first_nul() {
        assert_eq!(decode_text(b"Sebring\0garbage"), "Sebring");
        assert_eq!(decode_text(b"\0Sebring"), "");
        assert_eq!(decode_text(b"no terminator"), "no terminator");
    }

    #[test]
    fn decodes_latin1_bytes() {
        assert_eq!(decode_text(&[b'N', 0xfc, b'r', 0]), "Nür");
    }

    #[test]
    fn encoded_fields_are_terminated() {
        let field: [u8; 4] = encode_text("Spa-Francorchamps");
        assert_eq!(&field, b"Spa\0");
        assert_eq!(decode_text(&encode_text::<32>("Le Mans")), "Le Mans");
    }

    #[test]
    fn any_nonzero_byte_is_true() {
        assert!(!CBool(0).get());
        assert!(CBool(1).get());
        assert!(CBool(0xff).get());
        assert_eq!(CBool::from(true), CBool::TRUE);
    }
}
