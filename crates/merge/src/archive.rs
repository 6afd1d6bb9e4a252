//! Archives: ordered trees of named entries with modification times.
//!
//! The on-disk form is a sequential entry stream, read linearly in one
//! pass and fully materialized before any transform. A `.gz` path wraps
//! the stream in gzip; everything else is plain framing.
//!
//! Frame layout after the `SARC` magic and a u16 format version, per
//! entry: `u16 path_len | path | u64 mtime | u32 data_len | data`.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::MergeError;

const ARCHIVE_MAGIC: &[u8; 4] = b"SARC";
const ARCHIVE_VERSION: u16 = 1;

/// One archive entry: path, payload and modification time (seconds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub mtime: u64,
    pub data: Vec<u8>,
}

/// Ordered path -> entry map, built by one linear read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    entries: BTreeMap<String, ArchiveEntry>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: ArchiveEntry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    pub fn get(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> btree_map::Values<'_, String, ArchiveEntry> {
        self.entries.values()
    }

    /// Reads an archive stream to completion.
    pub fn read_from(reader: impl Read) -> Result<Self, MergeError> {
        let mut reader = BufReader::new(reader);
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != ARCHIVE_MAGIC {
            return Err(MergeError::Decode("bad archive magic".into()));
        }
        let version = read_u16(&mut reader)?;
        if version != ARCHIVE_VERSION {
            return Err(MergeError::Decode(format!(
                "unsupported archive format {version}"
            )));
        }

        let mut archive = Archive::new();
        loop {
            let path_len = match read_u16_or_eof(&mut reader)? {
                Some(len) => len as usize,
                None => break,
            };
            let mut path = vec![0u8; path_len];
            reader.read_exact(&mut path)?;
            let path = String::from_utf8(path)
                .map_err(|_| MergeError::Decode("non-utf8 entry path".into()))?;
            let mtime = read_u64(&mut reader)?;
            let data_len = read_u32(&mut reader)? as usize;
            let mut data = vec![0u8; data_len];
            reader.read_exact(&mut data)?;
            archive.insert(ArchiveEntry { path, mtime, data });
        }
        Ok(archive)
    }

    /// Writes the archive as one linear stream, entries in path order.
    pub fn write_to(&self, writer: impl Write) -> Result<(), MergeError> {
        let mut writer = BufWriter::new(writer);
        writer.write_all(ARCHIVE_MAGIC)?;
        writer.write_all(&ARCHIVE_VERSION.to_le_bytes())?;
        for entry in self.entries.values() {
            writer.write_all(&(entry.path.len() as u16).to_le_bytes())?;
            writer.write_all(entry.path.as_bytes())?;
            writer.write_all(&entry.mtime.to_le_bytes())?;
            writer.write_all(&(entry.data.len() as u32).to_le_bytes())?;
            writer.write_all(&entry.data)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Opens an archive file; `.gz` paths are gzip-decoded on the fly.
    /// The existence check runs before any decode.
    pub fn open(path: &Path) -> Result<Self, MergeError> {
        if !path.is_file() {
            return Err(MergeError::MissingInput(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let reader: Box<dyn Read> = if is_gz(path) {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Self::read_from(reader)
    }

    /// Writes the archive to a file, gzip-encoded for `.gz` paths.
    pub fn save(&self, path: &Path) -> Result<(), MergeError> {
        let file = File::create(path)?;
        if is_gz(path) {
            let mut encoder = GzEncoder::new(file, Compression::default());
            self.write_to(&mut encoder)?;
            // Finish explicitly: dropping the encoder would write the
            // gzip trailer too, but discard any I/O error from it.
            encoder.finish()?;
            Ok(())
        } else {
            self.write_to(file)
        }
    }
}

fn is_gz(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

fn read_u16(reader: &mut impl Read) -> Result<u16, MergeError> {
    let mut b = [0u8; 2];
    reader.read_exact(&mut b)?;
    Ok(u16::from_le_bytes(b))
}

/// Like `read_u16`, but a clean EOF at the first byte ends the stream.
fn read_u16_or_eof(reader: &mut impl Read) -> Result<Option<u16>, MergeError> {
    let mut b = [0u8; 2];
    let mut filled = 0;
    while filled < 2 {
        let n = reader.read(&mut b[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(MergeError::Decode("archive truncated mid-entry".into()));
        }
        filled += n;
    }
    Ok(Some(u16::from_le_bytes(b)))
}

fn read_u32(reader: &mut impl Read) -> Result<u32, MergeError> {
    let mut b = [0u8; 4];
    reader.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn read_u64(reader: &mut impl Read) -> Result<u64, MergeError> {
    let mut b = [0u8; 8];
    reader.read_exact(&mut b)?;
    Ok(u64::from_le_bytes(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Archive {
        let mut a = Archive::new();
        a.insert(ArchiveEntry {
            path: "a/Foo.class".into(),
            mtime: 1234,
            data: vec![1, 2, 3],
        });
        a.insert(ArchiveEntry {
            path: "assets/lang.json".into(),
            mtime: 99,
            data: b"{}".to_vec(),
        });
        a
    }

    #[test]
    fn test_stream_roundtrip_plain() {
        let archive = sample();
        let mut buf = Vec::new();
        archive.write_to(&mut buf).unwrap();
        let read = Archive::read_from(buf.as_slice()).unwrap();
        assert_eq!(read, archive);
    }

    #[test]
    fn test_file_roundtrip_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.sarc.gz");
        let archive = sample();
        archive.save(&path).unwrap();
        let read = Archive::open(&path).unwrap();
        assert_eq!(read, archive);
    }

    #[test]
    fn test_gzip_save_writes_complete_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.sarc.gz");
        sample().save(&path).unwrap();

        // Decode the raw bytes to the end: a stream missing its gzip
        // trailer fails here with an unexpected EOF.
        let raw = std::fs::read(&path).unwrap();
        let mut decoded = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(Archive::read_from(decoded.as_slice()).unwrap(), sample());
    }

    #[test]
    fn test_open_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Archive::open(&dir.path().join("nope.sarc")).unwrap_err();
        assert!(matches!(err, MergeError::MissingInput(_)));
    }

    #[test]
    fn test_truncated_stream_is_decode_error() {
        let mut buf = Vec::new();
        sample().write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);
        assert!(Archive::read_from(buf.as_slice()).is_err());
    }

    #[test]
    fn test_bad_magic() {
        let err = Archive::read_from(&b"NOPE\x01\x00"[..]).unwrap_err();
        assert!(matches!(err, MergeError::Decode(_)));
    }

    #[test]
    fn test_entries_iterate_in_path_order() {
        let archive = sample();
        let paths: Vec<&str> = archive.paths().collect();
        assert_eq!(paths, vec!["a/Foo.class", "assets/lang.json"]);
    }
}
