use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// An opened ZIP archive: the Central Directory is parsed once up front and
/// entry payloads are fetched on demand.
pub struct ZipArchive<R: ReadAt> {
    parser: ZipParser<R>,
    entries: Vec<ZipFileEntry>,
    by_name: HashMap<String, usize>,
}

impl<R: ReadAt> ZipArchive<R> {
    /// Parse the archive directory. Fails if the bytes are not a ZIP container.
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let entries = parser.list_files().await?;

        // First occurrence wins when a name is repeated.
        let mut by_name = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            by_name.entry(entry.file_name.clone()).or_insert(index);
        }

        Ok(Self {
            parser,
            entries,
            by_name,
        })
    }

    /// All entries in Central Directory order.
    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    /// Look an entry up by its exact, case-sensitive name.
    pub fn entry(&self, name: &str) -> Option<&ZipFileEntry> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn archive_size(&self) -> u64 {
        self.parser.archive_size()
    }

    /// Read and inflate an entry, verifying its CRC-32.
    ///
    /// Inflation stops one byte past the size the Central Directory declares,
    /// so an entry can never expand beyond what its header promises.
    pub async fn read_entry(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_directory {
            bail!("{} is a directory", entry.file_name);
        }
        if let CompressionMethod::Unknown(method) = entry.compression_method {
            bail!(
                "Unsupported compression method {} for {}",
                method,
                entry.file_name
            );
        }

        let raw = self.parser.read_payload(entry).await?;
        let entry = entry.clone();
        tokio::task::spawn_blocking(move || decode_payload(&entry, raw))
            .await
            .context("Inflate task failed")?
    }
}

/// Inflate (if needed) and verify a raw payload. CPU bound.
fn decode_payload(entry: &ZipFileEntry, raw: Vec<u8>) -> Result<Vec<u8>> {
    let data = match entry.compression_method {
        CompressionMethod::Deflate => {
            let limit = entry.uncompressed_size.saturating_add(1);
            let mut out = Vec::with_capacity(entry.uncompressed_size.min(64 << 20) as usize);
            DeflateDecoder::new(raw.as_slice())
                .take(limit)
                .read_to_end(&mut out)
                .with_context(|| format!("Failed to inflate {}", entry.file_name))?;
            out
        }
        _ => raw,
    };

    if data.len() as u64 > entry.uncompressed_size {
        bail!(
            "{} inflates past its declared size of {} bytes",
            entry.file_name,
            entry.uncompressed_size
        );
    }
    if (data.len() as u64) < entry.uncompressed_size {
        bail!(
            "Size mismatch for {}: expected {} bytes, got {}",
            entry.file_name,
            entry.uncompressed_size,
            data.len()
        );
    }

    let mut crc = Crc::new();
    crc.update(&data);
    if crc.sum() != entry.crc32 {
        bail!("CRC mismatch for {}", entry.file_name);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use crate::zip::CDFH_SIGNATURE;
    use std::io::{Cursor, Write};
    use ::zip::write::SimpleFileOptions;
    use ::zip::{CompressionMethod as ZipMethod, ZipWriter};

    fn build_zip() -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.add_directory("Data/", SimpleFileOptions::default()).unwrap();
        writer
            .start_file(
                "Data/stored.txt",
                SimpleFileOptions::default().compression_method(ZipMethod::Stored),
            )
            .unwrap();
        writer.write_all(b"stored payload").unwrap();
        writer
            .start_file(
                "Data/Deflated.TXT",
                SimpleFileOptions::default().compression_method(ZipMethod::Deflated),
            )
            .unwrap();
        writer.write_all(&b"deflate me ".repeat(64)).unwrap();
        writer.finish().unwrap().into_inner()
    }

    async fn open(data: Vec<u8>) -> ZipArchive<MemoryReader> {
        ZipArchive::open(Arc::new(MemoryReader::new(data))).await.unwrap()
    }

    #[tokio::test]
    async fn lists_entries_in_order() {
        let archive = open(build_zip()).await;
        let names: Vec<_> = archive.entries().iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, ["Data/", "Data/stored.txt", "Data/Deflated.TXT"]);
        assert!(archive.entries()[0].is_directory);
    }

    #[tokio::test]
    async fn reads_stored_and_deflated() {
        let archive = open(build_zip()).await;

        let stored = archive.entry("Data/stored.txt").unwrap();
        assert_eq!(archive.read_entry(stored).await.unwrap(), b"stored payload");

        let deflated = archive.entry("Data/Deflated.TXT").unwrap();
        assert_eq!(deflated.compression_method, CompressionMethod::Deflate);
        assert_eq!(
            archive.read_entry(deflated).await.unwrap(),
            b"deflate me ".repeat(64)
        );
    }

    #[tokio::test]
    async fn names_are_case_sensitive() {
        let archive = open(build_zip()).await;
        assert!(archive.entry("data/stored.txt").is_none());
        assert!(archive.entry("Data/Deflated.TXT").is_some());
    }

    #[tokio::test]
    async fn detects_corrupted_payload() {
        let mut data = build_zip();
        let pos = data
            .windows(b"stored payload".len())
            .position(|w| w == b"stored payload")
            .unwrap();
        data[pos] = b'S';

        let archive = open(data).await;
        let entry = archive.entry("Data/stored.txt").unwrap();
        let err = archive.read_entry(entry).await.unwrap_err();
        assert!(err.to_string().contains("CRC mismatch"));
    }

    #[tokio::test]
    async fn inflation_stops_at_declared_size() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(
                "bomb.png",
                SimpleFileOptions::default().compression_method(ZipMethod::Deflated),
            )
            .unwrap();
        writer.write_all(&vec![0u8; 4 << 20]).unwrap();
        let mut data = writer.finish().unwrap().into_inner();

        // Shrink the uncompressed size recorded in the Central Directory.
        let cdfh = data
            .windows(4)
            .rposition(|w| w == CDFH_SIGNATURE)
            .unwrap();
        data[cdfh + 24..cdfh + 28].copy_from_slice(&10u32.to_le_bytes());

        let archive = open(data).await;
        let entry = archive.entry("bomb.png").unwrap();
        assert_eq!(entry.uncompressed_size, 10);

        let err = archive.read_entry(entry).await.unwrap_err();
        assert!(err.to_string().contains("past its declared size of 10 bytes"));
    }

    #[tokio::test]
    async fn refuses_directories() {
        let archive = open(build_zip()).await;
        let dir = archive.entry("Data/").unwrap();
        assert!(archive.read_entry(dir).await.is_err());
    }
}
