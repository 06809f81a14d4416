//! # zipwebp
//!
//! Import images from a ZIP archive, convert them to WebP and hand them to a
//! storage backend, with per-entry progress and error accounting.
//!
//! The archive may be a local file, an in-memory upload or a remote file
//! reached with HTTP Range requests. Image formats are detected from content,
//! never from the entry name.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zipwebp::{ImportConfig, ImportPipeline, LocalFileReader, Selections, build_sink};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ImportConfig::default();
//!     let pipeline = ImportPipeline::new(build_sink(&config.sink)?, &config);
//!
//!     let reader = Arc::new(LocalFileReader::new("assets.zip".as_ref())?);
//!     let selections = Selections::Prefix {
//!         fragment: "/VehicleImages/".to_string(),
//!         extension: Some("png".to_string()),
//!     };
//!
//!     let report = pipeline.run(reader, &selections, &config.destination_folder).await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod path;
pub mod pipeline;
pub mod report;
pub mod selection;
pub mod session;
pub mod sniff;
pub mod upload;
pub mod zip;

#[cfg(test)]
mod test_support;

pub use cli::Cli;
pub use config::{ImportConfig, SinkConfig};
pub use convert::{ConvertedImage, SourceImage, convert};
pub use error::{ErrorKind, ImportError, UploadError};
pub use io::{HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use path::resolve;
pub use pipeline::{CancelFlag, ImportObserver, ImportPipeline, NoopObserver};
pub use report::{EntryOutcome, EntryStatus, ImportReport, Progress, RunState};
pub use selection::{Selection, Selections};
pub use session::ImportSession;
pub use sniff::{ImageKind, sniff};
pub use upload::{UploadSink, build_sink};
pub use zip::{ZipArchive, ZipFileEntry};
