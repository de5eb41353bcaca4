// src/repository/index.rs

//! Reading package index files from disk
//!
//! APT keeps `Packages` indices compressed or plain depending on the
//! mirror; dpkg's `status` file is always plain text.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;
use xz2::read::XzDecoder;

/// Which kind of index a file is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// dpkg status database: what is installed
    Status,
    /// APT Packages index: what could be installed
    Packages,
}

impl IndexKind {
    pub fn as_str(&self) -> &str {
        match self {
            IndexKind::Status => "status",
            IndexKind::Packages => "packages",
        }
    }
}

impl std::str::FromStr for IndexKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "status" => Ok(IndexKind::Status),
            "packages" => Ok(IndexKind::Packages),
            other => Err(Error::ParseError(format!("Unknown index kind: {}", other))),
        }
    }
}

/// Read an index file, decompressing `.gz`, `.xz` and `.zst` files
pub fn read_index(path: &Path) -> Result<String> {
    let file = BufReader::new(File::open(path)?);
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let mut reader: Box<dyn Read> = match extension {
        "gz" => Box::new(GzDecoder::new(file)),
        "xz" => Box::new(XzDecoder::new(file)),
        "zst" => Box::new(zstd::stream::read::Decoder::new(file)?),
        _ => Box::new(file),
    };

    let mut content = String::new();
    reader.read_to_string(&mut content).map_err(|e| {
        Error::ParseError(format!("Failed to read index {}: {}", path.display(), e))
    })?;

    debug!("Read index {}: {} bytes", path.display(), content.len());
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    const PACKAGES: &str = "Package: bar\nVersion: 1.2\nArchitecture: amd64\n";

    #[test]
    fn test_read_plain_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Packages");
        std::fs::write(&path, PACKAGES).unwrap();

        assert_eq!(read_index(&path).unwrap(), PACKAGES);
    }

    #[test]
    fn test_read_gzip_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Packages.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(PACKAGES.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        assert_eq!(read_index(&path).unwrap(), PACKAGES);
    }

    #[test]
    fn test_index_kind_from_str() {
        assert_eq!("status".parse::<IndexKind>().unwrap(), IndexKind::Status);
        assert_eq!("packages".parse::<IndexKind>().unwrap(), IndexKind::Packages);
        assert!("sources".parse::<IndexKind>().is_err());
    }
}
