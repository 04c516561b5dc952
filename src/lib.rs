//! Decode datablocks from files written by the O molecular modeling
//! package.
//!
//! O stores its state as named, typed datablocks in one of two
//! interchangeable encodings: a binary form of Fortran-style
//! length-delimited records in big-endian order, and a formatted text form
//! laid out by Fortran FORMAT descriptors. This crate reads both and hands
//! back each datablock as ordinary typed values; it never writes O files.
//!
//! The simplest entry point sniffs the encoding and decodes a whole file:
//!
//! ```no_run
//! let blocks = odbparse::read_file("menu.odb").unwrap();
//! for block in &blocks {
//!     println!("{} {} ({} elements)", block.name, block.kind(), block.len());
//! }
//! ```
//!
//! For finer control, [`binary::BinaryReader`] and
//! [`formatted::FormattedReader`] decode one datablock per call from any
//! stream.
extern crate pest;
#[macro_use]
extern crate pest_derive;

pub mod binary;
pub mod datablock;
pub mod error;
pub mod format;
pub mod formatted;
pub mod sniff;
pub mod swap;

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

pub use crate::binary::BinaryReader;
pub use crate::datablock::{Datablock, DatablockData, DatablockType};
pub use crate::error::{OdbError, Result};
pub use crate::formatted::FormattedReader;
pub use crate::sniff::{sniff, FileKind};

/// Read every datablock of an O file, binary or formatted, in file order.
///
/// The encoding is sniffed from the first bytes of the file and the swap
/// flag for binary files is chosen from the host byte order. Stops at the
/// end of the datablock sequence; any decode error is returned as-is.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<Datablock>> {
    let mut file = File::open(path)?;
    let mut prefix = [0u8; 8];
    let mut got = 0;
    while got < prefix.len() {
        let n = file.read(&mut prefix[got..])?;
        if n == 0 {
            break;
        }
        got += n;
    }
    file.seek(SeekFrom::Start(0))?;

    let mut blocks = Vec::new();
    match sniff(&prefix[..got]) {
        FileKind::Binary { .. } => {
            let mut reader = BinaryReader::for_host(file);
            while let Some(block) = reader.next_datablock()? {
                blocks.push(block);
            }
        }
        FileKind::Formatted => {
            let mut reader = FormattedReader::new(BufReader::new(file));
            while let Some(block) = reader.next_datablock()? {
                blocks.push(block);
            }
        }
    }
    Ok(blocks)
}
