// src/packages/deb.rs

//! Debian archive reader
//!
//! A .deb is an AR archive holding `debian-binary`, a control tarball and a
//! data tarball. The control file drives installability; the data tarball
//! only supplies the list of files a package ships.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tar::Archive;
use tracing::debug;
use xz2::read::XzDecoder;

const CONTROL_MEMBERS: [&str; 4] = [
    "control.tar.gz",
    "control.tar.xz",
    "control.tar.zst",
    "control.tar",
];

const DATA_MEMBERS: [&str; 4] = ["data.tar.gz", "data.tar.xz", "data.tar.zst", "data.tar"];

/// Read every AR member into memory, keyed by identifier
fn read_members(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let file = File::open(path)?;
    let mut archive = ar::Archive::new(file);
    let mut members = Vec::new();

    while let Some(entry) = archive.next_entry() {
        let mut entry = entry
            .map_err(|e| Error::ParseError(format!("Failed to read AR entry: {}", e)))?;
        let name = String::from_utf8_lossy(entry.header().identifier())
            .trim_end_matches('/')
            .to_string();
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        members.push((name, content));
    }

    Ok(members)
}

/// Wrap member bytes in the decoder matching its extension
fn decoder<'a>(member: &str, data: &'a [u8]) -> Result<Box<dyn Read + 'a>> {
    let reader: Box<dyn Read + 'a> = if member.ends_with(".gz") {
        Box::new(GzDecoder::new(data))
    } else if member.ends_with(".xz") {
        Box::new(XzDecoder::new(data))
    } else if member.ends_with(".zst") {
        Box::new(zstd::Decoder::new(data).map_err(|e| {
            Error::ParseError(format!("Failed to create zstd decoder: {}", e))
        })?)
    } else {
        Box::new(data)
    };
    Ok(reader)
}

/// Read a .deb's members, rejecting archives without `debian-binary`
fn open_deb(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let members = read_members(path)?;
    if !members.iter().any(|(name, _)| name == "debian-binary") {
        return Err(Error::ParseError(format!(
            "{} is not a valid DEB archive, missing 'debian-binary' member",
            path.display()
        )));
    }
    Ok(members)
}

/// First member named in `wanted`, in preference order
fn find_member<'m>(
    members: &'m [(String, Vec<u8>)],
    wanted: &[&str],
) -> Option<(&'m str, &'m [u8])> {
    wanted.iter().find_map(|wanted| {
        members
            .iter()
            .find(|(name, _)| name == wanted)
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    })
}

fn entry_path<R: Read>(entry: &tar::Entry<'_, R>) -> Result<String> {
    Ok(entry
        .path()
        .map_err(|e| Error::ParseError(format!("Failed to get entry path: {}", e)))?
        .to_string_lossy()
        .to_string())
}

/// Extract the text of the `control` file from a .deb archive
pub fn read_control(path: &Path) -> Result<String> {
    debug!("Reading control data from {}", path.display());
    let members = open_deb(path)?;
    let (member, data) = find_member(&members, &CONTROL_MEMBERS).ok_or_else(|| {
        Error::ParseError(format!("No control tarball in {}", path.display()))
    })?;

    let mut archive = Archive::new(decoder(member, data)?);
    for entry in archive
        .entries()
        .map_err(|e| Error::ParseError(format!("Failed to read {}: {}", member, e)))?
    {
        let mut entry =
            entry.map_err(|e| Error::ParseError(format!("Failed to read entry: {}", e)))?;
        let name = entry_path(&entry)?;

        if name == "./control" || name == "control" {
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            return Ok(content);
        }
    }

    Err(Error::ParseError(format!(
        "Could not find control file in {}",
        member
    )))
}

/// Absolute path an archive entry installs to, `None` for the root
fn installed_path(entry_path: &str) -> Option<String> {
    let trimmed = entry_path
        .trim_start_matches("./")
        .trim_start_matches('/')
        .trim_end_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        return None;
    }
    Some(format!("/{}", trimmed))
}

/// List every file and directory the package installs, in archive order
pub fn read_file_list(path: &Path) -> Result<Vec<String>> {
    debug!("Listing files of {}", path.display());
    let members = open_deb(path)?;
    let (member, data) = find_member(&members, &DATA_MEMBERS).ok_or_else(|| {
        Error::ParseError(format!(
            "No supported data tarball in {} (gz, xz, zst or uncompressed)",
            path.display()
        ))
    })?;

    let mut archive = Archive::new(decoder(member, data)?);
    let mut files = Vec::new();
    for entry in archive
        .entries()
        .map_err(|e| Error::ParseError(format!("Failed to read {}: {}", member, e)))?
    {
        let entry =
            entry.map_err(|e| Error::ParseError(format!("Failed to read entry: {}", e)))?;
        if let Some(file) = installed_path(&entry_path(&entry)?) {
            files.push(file);
        }
    }

    debug!("{} lists {} entries", member, files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn tar_with_control(control: &str) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(control.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "./control", control.as_bytes())
            .unwrap();
        builder.into_inner().unwrap()
    }

    fn write_deb(members: &[(&str, Vec<u8>)]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::with_suffix(".deb").unwrap();
        let mut builder = ar::Builder::new(File::create(file.path()).unwrap());
        for (name, data) in members {
            let header = ar::Header::new(name.as_bytes().to_vec(), data.len() as u64);
            builder.append(&header, data.as_slice()).unwrap();
        }
        file
    }

    #[test]
    fn test_read_control_gzip() {
        let control = "Package: foo\nVersion: 1.0\nArchitecture: all\n";
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&tar_with_control(control)).unwrap();
        let deb = write_deb(&[
            ("debian-binary", b"2.0\n".to_vec()),
            ("control.tar.gz", gz.finish().unwrap()),
        ]);

        assert_eq!(read_control(deb.path()).unwrap(), control);
    }

    #[test]
    fn test_read_control_uncompressed() {
        let control = "Package: bar\nVersion: 2\nArchitecture: amd64\n";
        let deb = write_deb(&[
            ("debian-binary", b"2.0\n".to_vec()),
            ("control.tar", tar_with_control(control)),
        ]);

        assert_eq!(read_control(deb.path()).unwrap(), control);
    }

    fn data_tar(paths: &[&str]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for path in paths {
            let mut header = tar::Header::new_gnu();
            if path.ends_with('/') {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                header.set_cksum();
                builder.append_data(&mut header, path, std::io::empty()).unwrap();
            } else {
                header.set_size(5);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append_data(&mut header, path, &b"hello"[..]).unwrap();
            }
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_file_list_from_gzip_data() {
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&data_tar(&["./", "./usr/", "./usr/bin/", "./usr/bin/hello"]))
            .unwrap();
        let deb = write_deb(&[
            ("debian-binary", b"2.0\n".to_vec()),
            ("control.tar", tar_with_control("Package: hello\n")),
            ("data.tar.gz", gz.finish().unwrap()),
        ]);

        assert_eq!(
            read_file_list(deb.path()).unwrap(),
            vec!["/usr", "/usr/bin", "/usr/bin/hello"]
        );
    }

    #[test]
    fn test_file_list_unsupported_compression() {
        let deb = write_deb(&[
            ("debian-binary", b"2.0\n".to_vec()),
            ("control.tar", tar_with_control("Package: hello\n")),
            ("data.tar.bz2", b"BZh91AY&SY".to_vec()),
        ]);
        assert!(matches!(read_file_list(deb.path()), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_missing_debian_binary() {
        let deb = write_deb(&[("control.tar", tar_with_control("Package: x\n"))]);
        assert!(matches!(read_control(deb.path()), Err(Error::ParseError(_))));
    }
}
