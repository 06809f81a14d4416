//! ZIP archive parsing and entry extraction.
//!
//! - [`structures`]: records of the ZIP format (EOCD, ZIP64, entry metadata)
//! - [`parser`]: reads those records through [`ReadAt`](crate::io::ReadAt)
//! - [`archive`]: opened archive with name lookup and inflating reads
//!
//! The Central Directory is located from the archive's tail, which keeps
//! listing a remote archive down to a couple of Range requests.
//!
//! Supported: standard ZIP and ZIP64, STORED and DEFLATE, CRC-32 checks.
//! Not supported: encryption, multi-disk archives, other compression methods.

mod archive;
mod parser;
mod structures;

pub use archive::ZipArchive;
pub use parser::ZipParser;
pub use structures::*;
