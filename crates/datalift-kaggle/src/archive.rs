//! Dataset archive extraction

use std::fs::{self, File};
use std::io;
use std::path::Path;

use datalift_core::DownloadError;

/// Unpack `archive` into `dest`, returning the number of files written.
///
/// Entries whose path would escape `dest` (absolute paths, `..`
/// components) are skipped with a warning.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize, DownloadError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| DownloadError::Archive(format!("{}: {e}", archive.display())))?;

    let mut extracted = 0;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| DownloadError::Archive(format!("entry {i}: {e}")))?;

        let Some(relative) = entry.enclosed_name() else {
            log::warn!("Skipping unsafe archive entry {:?}", entry.name());
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        extracted += 1;
    }

    log::debug!("Extracted {extracted} file(s) from {}", archive.display());
    Ok(extracted)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build a zip holding `entries` (name, content) at `path`.
    pub(crate) fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn extracts_nested_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("ds.zip");
        write_zip(&archive, &[("a.csv", "1"), ("sub/b.csv", "2")]);

        let out = dir.path().join("out");
        assert_eq!(extract_zip(&archive, &out).unwrap(), 2);
        assert_eq!(fs::read_to_string(out.join("a.csv")).unwrap(), "1");
        assert_eq!(fs::read_to_string(out.join("sub/b.csv")).unwrap(), "2");
    }

    #[test]
    fn skips_traversal_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(&archive, &[("../escape.txt", "x"), ("ok.txt", "y")]);

        let out = dir.path().join("out");
        assert_eq!(extract_zip(&archive, &out).unwrap(), 1);
        assert!(out.join("ok.txt").exists());
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("not.zip");
        fs::write(&archive, "plain text").unwrap();
        assert!(matches!(
            extract_zip(&archive, dir.path()),
            Err(DownloadError::Archive(_))
        ));
    }
}
