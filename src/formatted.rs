//! Read datablocks from formatted (plain text) O files.
//!
//! A formatted O file interleaves header lines and payload text. A header
//! line carries four whitespace-separated fields — datablock name, type
//! tag, element count, FORMAT descriptor — and may be preceded by blank
//! lines or `!` comment lines. The payload that follows is whitespace-
//! tokenized numbers for Integer/Real datablocks, descriptor-driven fixed
//! columns for Character datablocks, and fixed-length lines for Text
//! datablocks.
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use odbparse::formatted::FormattedReader;
//!
//! let file = File::open("formatted.odb").unwrap();
//! let mut reader = FormattedReader::new(BufReader::new(file));
//! while let Some(block) = reader.next_datablock().unwrap() {
//!     println!("{} ({} elements)", block.name, block.len());
//! }
//! ```
use std::io::BufRead;

use log::debug;

use crate::datablock::{strip_trailing, Datablock, DatablockData, DatablockType};
use crate::error::{unexpected_eof, OdbError, Result};
use crate::format::{FormatTemplate, TemplateCell};

/// Pad stored in columns 1-5 of a field cut short by end of line.
const PAD_TRUNCATED: u8 = b'#';

/// Pad stored in column 6 of a truncated field. The legacy decoder stored
/// the literal digit from its template here rather than a blank; preserved
/// verbatim for compatibility with existing consumers.
const PAD_TRUNCATED_FINAL: u8 = b'6';

/// Line terminator of the formatted encoding.
const LINE_TERMINATOR: u8 = b'\n';

/// Decoded fields of one formatted header line.
struct BlockHeader {
    name: String,
    kind: DatablockType,
    count: usize,
    descriptor: String,
}

/// Reader for the datablock sequence of a formatted O file.
pub struct FormattedReader<R: BufRead> {
    inner: R,
}

impl<R: BufRead> FormattedReader<R> {
    /// Wrap a text stream positioned at the first header line (or at
    /// comment or blank lines preceding it).
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next datablock, or `Ok(None)` at the end of the file.
    ///
    /// Header and payload errors abort the current datablock; unlike the
    /// binary encoding there is no framing to lose, so the caller may try
    /// to continue with the next header if the stream position is still
    /// meaningful.
    pub fn next_datablock(&mut self) -> Result<Option<Datablock>> {
        let header = match self.read_header()? {
            Some(header) => header,
            None => return Ok(None),
        };
        debug!(
            "datablock '{}' type {} count {} format {}",
            header.name, header.kind, header.count, header.descriptor
        );

        let data = match header.kind {
            DatablockType::Integer => DatablockData::Integer(self.read_integers(header.count)?),
            DatablockType::Real => DatablockData::Real(self.read_reals(header.count)?),
            DatablockType::Character => {
                DatablockData::Character(self.read_characters(header.count, &header.descriptor)?)
            }
            DatablockType::Text => {
                DatablockData::Text(self.read_text(header.count, &header.descriptor)?)
            }
        };
        Ok(Some(Datablock {
            name: header.name,
            data,
        }))
    }

    /// Find and tokenize the next header line, skipping comment and blank
    /// lines. `Ok(None)` when the file ends while seeking.
    fn read_header(&mut self) -> Result<Option<BlockHeader>> {
        let line = loop {
            let mut line = String::new();
            if self.inner.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            // skip blank lines and lines whose first token is a comment
            let is_header = match line.split_whitespace().next() {
                None => false,
                Some(token) => !token.starts_with('!'),
            };
            if is_header {
                break line;
            }
        };

        let (name_token, rest) = split_word(&line);
        let name: String = name_token.to_ascii_lowercase().chars().take(25).collect();

        let (tag_token, rest) = split_word(rest);
        let tag = match tag_token.chars().next() {
            Some(c) => c.to_ascii_uppercase(),
            None => return Err(OdbError::MissingTypeTag),
        };
        let kind = DatablockType::from_tag(tag).ok_or(OdbError::UnknownType(tag))?;

        let (count_token, rest) = split_word(rest);
        if count_token.is_empty() {
            return Err(OdbError::MissingCount);
        }
        let count: usize = count_token
            .parse()
            .map_err(|_| OdbError::BadCount(count_token.to_string()))?;

        // the descriptor is the remainder of the line and may contain spaces
        let descriptor = rest.trim();
        if descriptor.is_empty() {
            return Err(OdbError::MissingFormat);
        }

        Ok(Some(BlockHeader {
            name,
            kind,
            count,
            descriptor: descriptor.to_string(),
        }))
    }

    fn read_integers(&mut self, count: usize) -> Result<Vec<i32>> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let word = self.require_word()?;
            let value = word
                .parse::<i32>()
                .map_err(|_| OdbError::MalformedNumber(word))?;
            values.push(value);
        }
        Ok(values)
    }

    fn read_reals(&mut self, count: usize) -> Result<Vec<f32>> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let word = self.require_word()?;
            let value = word
                .parse::<f32>()
                .map_err(|_| OdbError::MalformedNumber(word))?;
            values.push(value);
        }
        Ok(values)
    }

    /// Decode `count` six-character fields laid out by `descriptor`.
    ///
    /// The compiled template describes one physical line and is replayed
    /// across as many lines as the datablock needs. Walking it consumes
    /// one input byte per cell until the line terminator is seen; from
    /// then until the next replay, filler cells consume nothing and data
    /// cells store the pad bytes `#` (columns 1-5) and `6` (column 6).
    /// On replay, whatever remains of the current physical line is
    /// discarded and the next line starts fresh. Reaching `count` fields
    /// stops immediately, wherever the template and line stand.
    fn read_characters(&mut self, count: usize, descriptor: &str) -> Result<Vec<String>> {
        let template = FormatTemplate::parse(descriptor)?;
        if template.fields_per_pass() == 0 && count > 0 {
            return Err(OdbError::MalformedFormat {
                descriptor: descriptor.to_owned(),
                reason: "descriptor holds no character fields".to_string(),
            });
        }
        let cells = template.cells();

        let mut raw = Vec::with_capacity(6 * count);
        let mut decoded = 0;
        let mut pos = 0;
        let mut at_eol = false;

        while decoded < count {
            if pos == cells.len() {
                // template exhausted: discard the rest of the physical
                // line (unless its terminator was already consumed) and
                // replay from the top
                pos = 0;
                if !at_eol {
                    self.discard_line()?;
                }
                at_eol = false;
                continue;
            }
            // one input byte per cell, none once the line has ended
            let byte = if at_eol {
                None
            } else {
                let byte = self
                    .next_byte()?
                    .ok_or_else(|| unexpected_eof("a character datablock"))?;
                if byte == LINE_TERMINATOR {
                    at_eol = true;
                    None
                } else {
                    Some(byte)
                }
            };
            match cells[pos] {
                TemplateCell::Filler => {}
                TemplateCell::Data(6) => {
                    raw.push(byte.unwrap_or(PAD_TRUNCATED_FINAL));
                    decoded += 1;
                }
                TemplateCell::Data(_) => {
                    raw.push(byte.unwrap_or(PAD_TRUNCATED));
                }
            }
            pos += 1;
        }

        let values = raw
            .chunks_exact(6)
            .map(|unit| strip_trailing(&String::from_utf8_lossy(unit)).to_owned())
            .collect();
        Ok(values)
    }

    /// Read `count` fixed-length text records, one per physical line. The
    /// record length is the leading decimal value of the descriptor field,
    /// which for text datablocks holds a plain number rather than a FORMAT
    /// string.
    fn read_text(&mut self, count: usize, descriptor: &str) -> Result<Vec<String>> {
        let size = leading_int(descriptor);
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            let mut line = String::new();
            if self.inner.read_line(&mut line)? == 0 {
                return Err(unexpected_eof("a text datablock"));
            }
            let record: String = line.chars().take(size).collect();
            records.push(strip_trailing(&record).to_string());
        }
        Ok(records)
    }

    /// Next whitespace-delimited word, or `Ok(None)` at end of file before
    /// any word character.
    fn next_word(&mut self) -> Result<Option<String>> {
        let mut word = Vec::new();
        loop {
            match self.next_byte()? {
                None => return Ok(None),
                Some(byte) if byte.is_ascii_whitespace() => continue,
                Some(byte) => {
                    word.push(byte);
                    break;
                }
            }
        }
        loop {
            match self.next_byte()? {
                None => break,
                Some(byte) if byte.is_ascii_whitespace() => break,
                Some(byte) => word.push(byte),
            }
        }
        Ok(Some(String::from_utf8_lossy(&word).into_owned()))
    }

    fn require_word(&mut self) -> Result<String> {
        self.next_word()?
            .ok_or_else(|| unexpected_eof("a numeric datablock"))
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        let buf = self.inner.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        let byte = buf[0];
        self.inner.consume(1);
        Ok(Some(byte))
    }

    /// Consume input through the next line terminator.
    fn discard_line(&mut self) -> Result<()> {
        loop {
            match self.next_byte()? {
                None => return Err(unexpected_eof("a character datablock")),
                Some(LINE_TERMINATOR) => return Ok(()),
                Some(_) => {}
            }
        }
    }
}

/// First whitespace-delimited word of `s` and the remainder after it.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], &s[end..]),
        None => (s, ""),
    }
}

/// Leading decimal value of `s` with `strtol` semantics: skip leading
/// whitespace, read digits, and yield 0 when there are none.
fn leading_int(s: &str) -> usize {
    let digits: String = s
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;
    use stringreader::StringReader;

    fn reader(text: &str) -> FormattedReader<BufReader<StringReader>> {
        FormattedReader::new(BufReader::new(StringReader::new(text)))
    }

    #[test]
    fn test_skips_comments_and_blank_lines() -> Result<()> {
        let text = "\
! an O datablock file
   ! indented comment

.cell_volume I 3 (3i5)
 1 2 3
";
        let block = reader(text).next_datablock()?.unwrap();
        assert_eq!(block.name, ".cell_volume");
        assert_eq!(block.data, DatablockData::Integer(vec![1, 2, 3]));
        Ok(())
    }

    #[test]
    fn test_reals_and_lowercase_tag() -> Result<()> {
        // the legacy reader folds formatted type tags to upper case
        let text = "refl_scale r 3 (3f8.3)\n 1.500 -2.250 0.000\n";
        let block = reader(text).next_datablock()?.unwrap();
        assert_eq!(block.kind(), DatablockType::Real);
        assert_eq!(block.data, DatablockData::Real(vec![1.5, -2.25, 0.0]));
        Ok(())
    }

    #[test]
    fn test_name_is_folded_and_limited() -> Result<()> {
        let text = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123 I 1 (i5)\n 7\n";
        let block = reader(text).next_datablock()?.unwrap();
        assert_eq!(block.name, "abcdefghijklmnopqrstuvwxy");
        assert_eq!(block.name.len(), 25);
        Ok(())
    }

    #[test]
    fn test_header_field_errors_are_distinct() {
        assert!(matches!(
            reader("name\n").next_datablock(),
            Err(OdbError::MissingTypeTag)
        ));
        assert!(matches!(
            reader("name I\n").next_datablock(),
            Err(OdbError::MissingCount)
        ));
        assert!(matches!(
            reader("name I 12q4 (i5)\n").next_datablock(),
            Err(OdbError::BadCount(t)) if t == "12q4"
        ));
        assert!(matches!(
            reader("name I 3\n").next_datablock(),
            Err(OdbError::MissingFormat)
        ));
        assert!(matches!(
            reader("name Z 3 (i5)\n").next_datablock(),
            Err(OdbError::UnknownType('Z'))
        ));
    }

    #[test]
    fn test_malformed_number_aborts_datablock() {
        let mut rdr = reader("counts I 3 (3i5)\n 1 2x3 4\n");
        let err = rdr.next_datablock().unwrap_err();
        assert!(matches!(err, OdbError::MalformedNumber(t) if t == "2x3"));
    }

    #[test]
    fn test_characters_single_line() -> Result<()> {
        let text = "atom_name C 3 (3(1x,a6))\n ca     cb     n1    \n";
        let block = reader(text).next_datablock()?.unwrap();
        assert_eq!(
            block.data,
            DatablockData::Character(vec!["ca".into(), "cb".into(), "n1".into()])
        );
        Ok(())
    }

    #[test]
    fn test_characters_replay_template_across_lines() -> Result<()> {
        let text = "residues C 4 (2a)\nalaa  glyy  \ntrpp  hiss  \n";
        let block = reader(text).next_datablock()?.unwrap();
        assert_eq!(
            block.data,
            DatablockData::Character(vec![
                "alaa".into(),
                "glyy".into(),
                "trpp".into(),
                "hiss".into()
            ])
        );
        Ok(())
    }

    #[test]
    fn test_truncated_line_pads_fields() -> Result<()> {
        // the third field starts after the line ends: columns 1-5 pad with
        // '#' and column 6 with the literal '6' of the legacy decoder
        let text = "labels C 3 (3a)\nabcdefghijkl\n";
        let block = reader(text).next_datablock()?.unwrap();
        assert_eq!(
            block.data,
            DatablockData::Character(vec!["abcdef".into(), "ghijkl".into(), "#####6".into()])
        );
        Ok(())
    }

    #[test]
    fn test_truncated_field_never_stores_the_terminator() -> Result<()> {
        let text = "labels C 1 (a)\nab\n";
        let block = reader(text).next_datablock()?.unwrap();
        // 'a', 'b', then eol: pads, not newline bytes
        assert_eq!(block.data, DatablockData::Character(vec!["ab###6".into()]));
        Ok(())
    }

    #[test]
    fn test_text_records_truncate_to_record_length() -> Result<()> {
        let text = "remarks T 2 15\nfirst remark line      \nsecond, cut her|this part is dropped\n";
        let block = reader(text).next_datablock()?.unwrap();
        assert_eq!(
            block.data,
            DatablockData::Text(vec!["first remark li".into(), "second, cut her".into()])
        );
        Ok(())
    }

    #[test]
    fn test_text_records_strip_trailing_blanks() -> Result<()> {
        let text = "remarks T 2 75\nfirst remark line      \nsecond remark\n";
        let block = reader(text).next_datablock()?.unwrap();
        assert_eq!(
            block.data,
            DatablockData::Text(vec!["first remark line".into(), "second remark".into()])
        );
        Ok(())
    }

    #[test]
    fn test_sequence_of_datablocks_then_eof() -> Result<()> {
        let text = "\
! two datablocks
a I 2 (2i5)
 10 20
b R 1 (f8.3)
 0.500
";
        let mut rdr = reader(text);
        assert_eq!(rdr.next_datablock()?.unwrap().name, "a");
        assert_eq!(rdr.next_datablock()?.unwrap().name, "b");
        assert!(rdr.next_datablock()?.is_none());
        Ok(())
    }

    #[test]
    fn test_eof_inside_payload() {
        let mut rdr = reader("a I 3 (3i5)\n 1 2\n");
        let err = rdr.next_datablock().unwrap_err();
        assert!(matches!(err, OdbError::Io(_)));
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("75"), 75);
        assert_eq!(leading_int("  80 "), 80);
        assert_eq!(leading_int("(80a1)"), 0);
        assert_eq!(leading_int(""), 0);
    }

    #[test]
    fn test_split_word() {
        assert_eq!(split_word("  one two three"), ("one", " two three"));
        assert_eq!(split_word("one"), ("one", ""));
        assert_eq!(split_word(""), ("", ""));
    }
}
