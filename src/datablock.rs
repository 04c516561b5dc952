//! The decoded value model: one named, typed datablock per unit of stored
//! data in an O file.

use std::fmt::Display;

/// The four storage types an O datablock can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DatablockType {
    /// 32-bit signed integers, tag `I`.
    Integer,
    /// 32-bit floats, tag `R`.
    Real,
    /// Fixed six-character strings, tag `C`. Used pervasively for labels
    /// such as atom and residue names.
    Character,
    /// Free-length text lines, tag `T`.
    Text,
}

impl DatablockType {
    /// Map a one-byte type tag to its type, or `None` for an unknown tag.
    ///
    /// Tags are matched exactly; binary headers always carry them in upper
    /// case. Formatted headers are folded to upper case before the lookup,
    /// as the legacy reader did.
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'I' => Some(Self::Integer),
            'R' => Some(Self::Real),
            'C' => Some(Self::Character),
            'T' => Some(Self::Text),
            _ => None,
        }
    }

    /// The one-byte tag for this type.
    pub fn tag(self) -> char {
        match self {
            Self::Integer => 'I',
            Self::Real => 'R',
            Self::Character => 'C',
            Self::Text => 'T',
        }
    }
}

impl Display for DatablockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// The payload of a decoded datablock, variant by type.
///
/// Character elements are six-byte strings and text elements are whole
/// lines; both have trailing blanks stripped.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DatablockData {
    Integer(Vec<i32>),
    Real(Vec<f32>),
    Character(Vec<String>),
    Text(Vec<String>),
}

/// One named, typed unit of data decoded from an O file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Datablock {
    /// Datablock name, folded to lower case with trailing blanks stripped.
    pub name: String,
    /// The decoded elements.
    pub data: DatablockData,
}

impl Datablock {
    /// The storage type of this datablock.
    pub fn kind(&self) -> DatablockType {
        match self.data {
            DatablockData::Integer(_) => DatablockType::Integer,
            DatablockData::Real(_) => DatablockType::Real,
            DatablockData::Character(_) => DatablockType::Character,
            DatablockData::Text(_) => DatablockType::Text,
        }
    }

    /// Number of decoded elements (records, for a text datablock).
    pub fn len(&self) -> usize {
        match &self.data {
            DatablockData::Integer(v) => v.len(),
            DatablockData::Real(v) => v.len(),
            DatablockData::Character(v) => v.len(),
            DatablockData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Strip trailing blanks and control bytes (anything at or below ASCII
/// space) from the end of a decoded string. Idempotent.
pub(crate) fn strip_trailing(s: &str) -> &str {
    s.trim_end_matches(|c: char| c <= ' ')
}

/// Fold a raw datablock name to the canonical form: ASCII lower case with
/// trailing blanks stripped. Idempotent.
pub(crate) fn fold_name(raw: &[u8]) -> String {
    let lowered: Vec<u8> = raw.iter().map(u8::to_ascii_lowercase).collect();
    strip_trailing(&String::from_utf8_lossy(&lowered)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for tag in ['I', 'R', 'C', 'T'] {
            let kind = DatablockType::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(DatablockType::from_tag('Q'), None);
        // binary headers match tags exactly, lower case is not a valid tag there
        assert_eq!(DatablockType::from_tag('i'), None);
    }

    #[test]
    fn test_strip_trailing_idempotent() {
        assert_eq!(strip_trailing("ca    "), "ca");
        assert_eq!(strip_trailing("ca"), "ca");
        assert_eq!(strip_trailing("a b \r\0"), "a b");
        assert_eq!(strip_trailing("      "), "");
        let once = strip_trailing("cell  ");
        assert_eq!(strip_trailing(once), once);
    }

    #[test]
    fn test_fold_name_idempotent() {
        let name = fold_name(b".Cell_Volume             ");
        assert_eq!(name, ".cell_volume");
        assert_eq!(fold_name(name.as_bytes()), name);
    }

    #[test]
    fn test_datablock_len() {
        let block = Datablock {
            name: "cell".to_string(),
            data: DatablockData::Integer(vec![1, 2, 3]),
        };
        assert_eq!(block.kind(), DatablockType::Integer);
        assert_eq!(block.len(), 3);
        assert!(!block.is_empty());
    }
}
