//! Read datablocks from binary O files.
//!
//! A binary O file is a sequence of Fortran-style unformatted records:
//! each record is a payload bracketed by two equal 4-byte length markers,
//! as written by sequential unformatted Fortran I/O. A datablock is one
//! fixed-layout header record (25-byte name, one-byte type tag, 4-byte
//! element count) followed by one payload record sized to the type.
//!
//! Storage order on disk is always big-endian. Pass `swap: true` when the
//! host's native order differs (see [`crate::swap::host_needs_swap`]), and
//! every 4-byte length marker and Integer/Real element is normalized on
//! read. Character and text payloads are byte-oriented and never swapped.
//!
//! ```no_run
//! use std::fs::File;
//! use odbparse::binary::BinaryReader;
//!
//! let file = File::open("binary.o").unwrap();
//! let mut reader = BinaryReader::for_host(file);
//! while let Some(block) = reader.next_datablock().unwrap() {
//!     println!("{} ({} elements)", block.name, block.len());
//! }
//! ```
use std::io::Read;

use byteorder::{NativeEndian, ReadBytesExt};
use log::{debug, warn};

use crate::datablock::{fold_name, strip_trailing, Datablock, DatablockData, DatablockType};
use crate::error::{unexpected_eof, OdbError, Result};
use crate::swap::{host_needs_swap, swap_words};

/// Payload length of a datablock header record: 25-byte name, one-byte
/// type tag, 4-byte element count.
const HEADER_LEN: usize = 30;

/// Record terminator inside binary text datablocks.
const TEXT_TERMINATOR: u8 = b'\r';

/// Decoded fields of one datablock header record.
struct BlockHeader {
    name: String,
    kind: DatablockType,
    count: usize,
}

/// Reader for the datablock sequence of a binary O file.
///
/// The reader owns the stream cursor exclusively. After a framing or I/O
/// error the record boundaries are lost, so the reader latches into a
/// failed state and every later call returns [`OdbError::StreamFailed`].
pub struct BinaryReader<R: Read> {
    inner: R,
    swap: bool,
    failed: bool,
}

impl<R: Read> BinaryReader<R> {
    /// Wrap a stream positioned at the first datablock header.
    pub fn new(inner: R, swap: bool) -> Self {
        Self {
            inner,
            swap,
            failed: false,
        }
    }

    /// Wrap a stream, choosing the swap flag from the host byte order.
    pub fn for_host(inner: R) -> Self {
        Self::new(inner, host_needs_swap())
    }

    /// Read the next datablock, or `Ok(None)` at the end of the sequence.
    ///
    /// The sequence ends at physical end of file, or at a header record
    /// declaring zero elements (the documented terminator convention for
    /// this file kind; no datablock is produced for such a header).
    ///
    /// A disagreement between a record's framing length and the declared
    /// element count is logged as a warning and the data actually framed
    /// is returned; the framing length is authoritative.
    pub fn next_datablock(&mut self) -> Result<Option<Datablock>> {
        if self.failed {
            return Err(OdbError::StreamFailed);
        }
        match self.next_datablock_inner() {
            Ok(block) => Ok(block),
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    fn next_datablock_inner(&mut self) -> Result<Option<Datablock>> {
        let header = match self.read_header()? {
            Some(header) => header,
            None => return Ok(None),
        };
        debug!(
            "datablock '{}' type {} count {}",
            header.name, header.kind, header.count
        );

        let data = match header.kind {
            DatablockType::Integer => DatablockData::Integer(self.read_integers(header.count)?),
            DatablockType::Real => DatablockData::Real(self.read_reals(header.count)?),
            DatablockType::Character => {
                DatablockData::Character(self.read_characters(header.count)?)
            }
            DatablockType::Text => DatablockData::Text(self.read_text(header.count)?),
        };
        Ok(Some(Datablock {
            name: header.name,
            data,
        }))
    }

    /// Read one framed record: leading length marker, payload, trailing
    /// marker. `Ok(None)` on clean end of file at the leading marker.
    fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        let leading = match self.read_leading_marker()? {
            Some(marker) => marker,
            None => return Ok(None),
        };
        let len = usize::try_from(leading).map_err(|_| {
            OdbError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("negative record length marker {leading}"),
            ))
        })?;
        let mut payload = vec![0u8; len];
        self.inner.read_exact(&mut payload)?;
        let trailing = self.read_marker()?;
        if leading != trailing {
            return Err(OdbError::RecordFraming { leading, trailing });
        }
        Ok(Some(payload))
    }

    /// Read the leading length marker of a record, distinguishing clean
    /// end of file (no bytes at all) from a truncated marker.
    fn read_leading_marker(&mut self) -> Result<Option<i32>> {
        let mut raw = [0u8; 4];
        let first = self.inner.read(&mut raw)?;
        if first == 0 {
            return Ok(None);
        }
        self.inner.read_exact(&mut raw[first..])?;
        if self.swap {
            raw.reverse();
        }
        Ok(Some(i32::from_ne_bytes(raw)))
    }

    fn read_marker(&mut self) -> Result<i32> {
        let mut marker = self.inner.read_i32::<NativeEndian>()?;
        if self.swap {
            marker = marker.swap_bytes();
        }
        Ok(marker)
    }

    /// Read and decode one header record. `Ok(None)` at end of file or on
    /// the zero-count terminator header.
    fn read_header(&mut self) -> Result<Option<BlockHeader>> {
        let payload = match self.read_record()? {
            Some(payload) => payload,
            None => return Ok(None),
        };
        if payload.len() < HEADER_LEN {
            return Err(unexpected_eof("a datablock header record"));
        }
        if payload.len() != HEADER_LEN {
            warn!(
                "datablock header: expected {HEADER_LEN} bytes, got {}",
                payload.len()
            );
        }

        let mut count_bytes = &payload[26..30];
        let mut count = count_bytes.read_i32::<NativeEndian>()?;
        if self.swap {
            count = count.swap_bytes();
        }
        if count == 0 {
            return Ok(None);
        }
        let count = usize::try_from(count).map_err(|_| {
            OdbError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("negative element count {count}"),
            ))
        })?;

        let name = fold_name(&payload[..25]);
        let tag = payload[25] as char;
        let kind = DatablockType::from_tag(tag).ok_or(OdbError::UnknownType(tag))?;
        Ok(Some(BlockHeader { name, kind, count }))
    }

    /// Read the payload record that must follow a header.
    fn require_record(&mut self) -> Result<Vec<u8>> {
        self.read_record()?
            .ok_or_else(|| unexpected_eof("a datablock payload record"))
    }

    fn read_integers(&mut self, count: usize) -> Result<Vec<i32>> {
        let mut payload = self.require_record()?;
        if self.swap {
            swap_words(&mut payload);
        }
        check_size(payload.len(), 4 * count, "integer");
        let mut cursor = payload.as_slice();
        let mut values = Vec::with_capacity(payload.len() / 4);
        for _ in 0..payload.len() / 4 {
            values.push(cursor.read_i32::<NativeEndian>()?);
        }
        Ok(values)
    }

    fn read_reals(&mut self, count: usize) -> Result<Vec<f32>> {
        let mut payload = self.require_record()?;
        if self.swap {
            swap_words(&mut payload);
        }
        check_size(payload.len(), 4 * count, "real");
        let mut cursor = payload.as_slice();
        let mut values = Vec::with_capacity(payload.len() / 4);
        for _ in 0..payload.len() / 4 {
            values.push(cursor.read_f32::<NativeEndian>()?);
        }
        Ok(values)
    }

    fn read_characters(&mut self, count: usize) -> Result<Vec<String>> {
        let payload = self.require_record()?;
        check_size(payload.len(), 6 * count, "character");
        let values = payload
            .chunks_exact(6)
            .map(|unit| strip_trailing(&String::from_utf8_lossy(unit)).to_owned())
            .collect();
        Ok(values)
    }

    /// A text payload is one record holding `count` bytes of text divided
    /// into lines by carriage returns. Anything after the last terminator
    /// is dropped, as only terminated records count.
    fn read_text(&mut self, count: usize) -> Result<Vec<String>> {
        let payload = self.require_record()?;
        check_size(payload.len(), count, "text");
        let mut records = Vec::new();
        for chunk in payload.split_inclusive(|&b| b == TEXT_TERMINATOR) {
            if chunk.last() == Some(&TEXT_TERMINATOR) {
                let line = &chunk[..chunk.len() - 1];
                records.push(strip_trailing(&String::from_utf8_lossy(line)).to_owned());
            }
        }
        Ok(records)
    }
}

/// Declared-versus-framed size disagreement is a diagnostic, never an
/// error; the framing length decides how much data exists.
fn check_size(actual: usize, expected: usize, what: &str) {
    if actual != expected {
        warn!("{what} block: expected {expected} bytes, got {actual}");
    }
}
