//! Decide whether an O file is binary or formatted from its first bytes.

/// The two on-disk encodings of an O datablock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Fortran unformatted records in big-endian storage order. `dotted`
    /// is true for the usual variant whose fifth byte is a `.` (the first
    /// datablock name starts with one); only the dgnl data files lack it.
    Binary { dotted: bool },
    /// Plain text laid out by FORMAT descriptors.
    Formatted,
}

impl FileKind {
    pub fn is_binary(self) -> bool {
        matches!(self, FileKind::Binary { .. })
    }
}

/// Classify a file from its first bytes; five are enough, and anything
/// shorter is formatted.
///
/// A binary O file opens with its first header record, whose 30-byte
/// length marker occupies the first word, hence the `[0, 0, 0, 30]`
/// pattern (the legacy check masks the first three bytes together rather
/// than comparing each with zero; kept as-is).
pub fn sniff(prefix: &[u8]) -> FileKind {
    if prefix.len() >= 5 && (prefix[0] & prefix[1] & prefix[2]) == 0 && prefix[3] == 30 {
        FileKind::Binary {
            dotted: prefix[4] == b'.',
        }
    } else {
        FileKind::Formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_prefixes() {
        assert_eq!(
            sniff(&[0, 0, 0, 30, b'.']),
            FileKind::Binary { dotted: true }
        );
        // dgnl data files: binary but no dot in the fifth byte
        assert_eq!(
            sniff(&[0, 0, 0, 30, b'd']),
            FileKind::Binary { dotted: false }
        );
        assert!(sniff(&[0, 0, 0, 30, b'.', 99, 99, 99]).is_binary());
    }

    #[test]
    fn test_formatted_prefixes() {
        assert_eq!(sniff(b"! an O"), FileKind::Formatted);
        assert_eq!(sniff(b".cell"), FileKind::Formatted);
        assert_eq!(sniff(&[0, 0, 0, 31, b'.']), FileKind::Formatted);
    }

    #[test]
    fn test_short_prefix_is_formatted() {
        assert_eq!(sniff(&[]), FileKind::Formatted);
        assert_eq!(sniff(&[0, 0, 0, 30]), FileKind::Formatted);
    }
}
