//! Structural file classification by leading magic bytes.
//!
//! Release archives routinely ship extensionless binaries and launcher
//! scripts without a `.sh` suffix, so classification reads the first bytes
//! of the file and never consults the filename.

/// Magic bytes opening every ELF object file (`0x7f 'E' 'L' 'F'`).
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Two-byte prefix marking an interpreter script.
pub const SHEBANG: [u8; 2] = *b"#!";

/// What a staged file structurally is, judged by its opening bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// ELF object -- starts with [`ELF_MAGIC`].
    Binary,
    /// Interpreter script -- starts with `#!`.
    Script,
    /// Anything else: licenses, readmes, completion files, man pages.
    Unrecognized,
}

impl FileKind {
    /// Classify a file from its opening bytes.
    ///
    /// Four bytes are enough to decide; shorter slices classify by
    /// whatever prefix they can still prove.
    ///
    /// # Example
    ///
    /// ```
    /// use binstage_schema::FileKind;
    ///
    /// assert_eq!(FileKind::from_prefix(&[0x7f, b'E', b'L', b'F']), FileKind::Binary);
    /// assert_eq!(FileKind::from_prefix(b"#!/bin/sh"), FileKind::Script);
    /// assert_eq!(FileKind::from_prefix(b"MIT License"), FileKind::Unrecognized);
    /// ```
    pub fn from_prefix(prefix: &[u8]) -> Self {
        if prefix.starts_with(&ELF_MAGIC) {
            Self::Binary
        } else if prefix.starts_with(&SHEBANG) {
            Self::Script
        } else {
            Self::Unrecognized
        }
    }

    /// Whether files of this kind should carry executable permission bits.
    pub fn wants_exec_bits(&self) -> bool {
        matches!(self, Self::Binary | Self::Script)
    }

    /// Label used in log lines (`binary` / `script` / `unrecognized`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Script => "script",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elf_prefix_is_binary() {
        // Name and extension are irrelevant; only bytes count.
        let mut bytes = ELF_MAGIC.to_vec();
        bytes.extend_from_slice(&[0x02, 0x01, 0x01, 0x00]);
        assert_eq!(FileKind::from_prefix(&bytes), FileKind::Binary);
    }

    #[test]
    fn test_shebang_prefix_is_script() {
        assert_eq!(FileKind::from_prefix(b"#!/usr/bin/env bash\n"), FileKind::Script);
        assert_eq!(FileKind::from_prefix(b"#!"), FileKind::Script);
    }

    #[test]
    fn test_everything_else_unrecognized() {
        assert_eq!(FileKind::from_prefix(b"MIT License"), FileKind::Unrecognized);
        assert_eq!(FileKind::from_prefix(b"#"), FileKind::Unrecognized);
        assert_eq!(FileKind::from_prefix(b""), FileKind::Unrecognized);
        // Truncated ELF magic is not an ELF.
        assert_eq!(FileKind::from_prefix(&[0x7f, b'E', b'L']), FileKind::Unrecognized);
    }

    #[test]
    fn test_exec_bit_policy() {
        assert!(FileKind::Binary.wants_exec_bits());
        assert!(FileKind::Script.wants_exec_bits());
        assert!(!FileKind::Unrecognized.wants_exec_bits());
    }
}
