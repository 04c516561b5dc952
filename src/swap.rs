//! Byte-order normalization for binary O files.
//!
//! O files store 4-byte words in big-endian order regardless of the machine
//! that wrote them. Hosts with a different native order reverse each word
//! after reading; whether to do so is an explicit flag threaded through
//! every binary read call, so the engine itself is host-order-agnostic.

/// Reverse the byte order of every aligned 4-byte word in `buf`, in place.
///
/// A trailing partial word is left untouched. Applying this twice restores
/// the original buffer.
pub fn swap_words(buf: &mut [u8]) {
    for word in buf.chunks_exact_mut(4) {
        word.swap(0, 3);
        word.swap(1, 2);
    }
}

/// Whether this host needs [`swap_words`] applied to data read from an O
/// binary file (that is, whether the host is not big-endian).
pub fn host_needs_swap() -> bool {
    cfg!(target_endian = "little")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverses_each_word() {
        let mut buf = [0u8, 0, 0, 30, 1, 2, 3, 4];
        swap_words(&mut buf);
        assert_eq!(buf, [30, 0, 0, 0, 4, 3, 2, 1]);
    }

    #[test]
    fn test_involution() {
        let original: Vec<u8> = (0..32).collect();
        let mut buf = original.clone();
        swap_words(&mut buf);
        assert_ne!(buf, original);
        swap_words(&mut buf);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_partial_word_untouched() {
        let mut buf = [1u8, 2, 3, 4, 9, 9];
        swap_words(&mut buf);
        assert_eq!(buf, [4, 3, 2, 1, 9, 9]);
    }

    #[test]
    fn test_empty() {
        let mut buf: [u8; 0] = [];
        swap_words(&mut buf);
    }
}
