//! Per-job scratch directory lifecycle
//!
//! Each run gets `<workspace>/<job_id>`. Preparation creates the directory or
//! empties it; nothing is removed after a run so the files stay inspectable
//! until the next run with the same job id.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::IngestionError;
use crate::model::IngestionJob;

/// Create `path` (and parents) if missing.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Remove every immediate child of `path`, creating it if absent.
pub fn clean_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return fs::create_dir_all(path);
    }
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let child = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&child)?;
        } else {
            fs::remove_file(&child)?;
        }
    }
    Ok(())
}

/// All regular files under `path`, recursively, sorted by path.
///
/// A missing directory yields an empty list.
pub fn list_files(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !path.exists() {
        return Ok(files);
    }
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Keep files whose base name exactly matches a trimmed, non-empty allow-list
/// entry. No allow-list (or one with only blanks) keeps everything.
pub fn filter_files(files: Vec<PathBuf>, allow_list: Option<&[String]>) -> Vec<PathBuf> {
    files
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| is_allowed(name, allow_list))
        })
        .collect()
}

/// Whether a file called `name` passes the allow-list, with the same rules
/// as [`filter_files`].
pub fn is_allowed(name: &str, allow_list: Option<&[String]>) -> bool {
    let mut desired = allow_list
        .unwrap_or_default()
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .peekable();
    desired.peek().is_none() || desired.any(|n| n == name)
}

/// Create or empty the job's scratch directory and return its path.
pub fn prepare_workspace(job: &IngestionJob) -> Result<PathBuf, IngestionError> {
    let workspace = job.workspace_path();
    ensure_dir(&workspace).map_err(|e| IngestionError::workspace(&workspace, e))?;
    clean_dir(&workspace).map_err(|e| IngestionError::workspace(&workspace, e))?;
    log::debug!("{}: workspace ready at {}", job.job_id(), workspace.display());
    Ok(workspace)
}

/// Path of `file` relative to `workspace`.
///
/// Both sides are canonicalized first so a downloader returning absolute or
/// `./`-style paths still maps onto the same relative name.
pub fn relative_to(file: &Path, workspace: &Path) -> Result<PathBuf, IngestionError> {
    let root = workspace
        .canonicalize()
        .map_err(|e| IngestionError::workspace(workspace, e))?;
    let full = file
        .canonicalize()
        .map_err(|e| IngestionError::workspace(file, e))?;
    full.strip_prefix(&root)
        .map(Path::to_path_buf)
        .map_err(|_| {
            IngestionError::workspace(
                file,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("file is outside workspace {}", root.display()),
                ),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Destination, KaggleSource};

    fn job(root: &Path, id: &str) -> IngestionJob {
        IngestionJob::new(
            id,
            KaggleSource::new("owner", "slug", None::<Vec<String>>).into(),
            Destination::new("lake", ""),
        )
        .with_workspace(root)
    }

    #[test]
    fn prepare_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = prepare_workspace(&job(tmp.path(), "j1")).unwrap();
        assert!(ws.is_dir());
        assert_eq!(ws, tmp.path().join("j1"));
    }

    #[test]
    fn prepare_is_idempotent_and_destructive() {
        let tmp = tempfile::tempdir().unwrap();
        let job = job(tmp.path(), "j1");

        let ws = prepare_workspace(&job).unwrap();
        fs::write(ws.join("stale.csv"), b"old").unwrap();
        fs::create_dir_all(ws.join("nested/deeper")).unwrap();
        fs::write(ws.join("nested/deeper/f.txt"), b"old").unwrap();

        let ws = prepare_workspace(&job).unwrap();
        assert!(ws.is_dir());
        assert_eq!(fs::read_dir(&ws).unwrap().count(), 0);

        let ws = prepare_workspace(&job).unwrap();
        assert_eq!(fs::read_dir(&ws).unwrap().count(), 0);
    }

    #[test]
    fn prepare_leaves_sibling_jobs_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let other = prepare_workspace(&job(tmp.path(), "other")).unwrap();
        fs::write(other.join("keep.csv"), b"x").unwrap();

        prepare_workspace(&job(tmp.path(), "mine")).unwrap();
        assert!(other.join("keep.csv").exists());
    }

    #[test]
    fn list_files_recursive_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("b.csv"), b"").unwrap();
        fs::write(tmp.path().join("a.csv"), b"").unwrap();
        fs::write(tmp.path().join("sub/c.csv"), b"").unwrap();

        let files = list_files(tmp.path()).unwrap();
        assert_eq!(
            files,
            vec![
                tmp.path().join("a.csv"),
                tmp.path().join("b.csv"),
                tmp.path().join("sub/c.csv"),
            ]
        );
    }

    #[test]
    fn list_files_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(list_files(&tmp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn filter_matches_base_name_exactly() {
        let files = vec![
            PathBuf::from("ws/a.csv"),
            PathBuf::from("ws/sub/b.csv"),
            PathBuf::from("ws/a.csv.bak"),
        ];
        let allow = vec![" a.csv".to_string(), "b.csv ".to_string(), "".to_string()];
        let kept = filter_files(files, Some(&allow));
        assert_eq!(
            kept,
            vec![PathBuf::from("ws/a.csv"), PathBuf::from("ws/sub/b.csv")]
        );
    }

    #[test]
    fn filter_without_allow_list_keeps_all() {
        let files = vec![PathBuf::from("a"), PathBuf::from("b")];
        assert_eq!(filter_files(files.clone(), None), files);
        assert_eq!(filter_files(files.clone(), Some(&[" ".to_string()])), files);
    }

    #[test]
    fn is_allowed_trims_entries() {
        let allow = vec![" 2401.00001v1.pdf ".to_string(), "".to_string()];
        assert!(is_allowed("2401.00001v1.pdf", Some(&allow)));
        assert!(!is_allowed("2401.00002v1.pdf", Some(&allow)));
        assert!(is_allowed("anything.pdf", None));
    }

    #[test]
    fn relative_to_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        let file = tmp.path().join("sub/x.csv");
        fs::write(&file, b"").unwrap();
        assert_eq!(
            relative_to(&file, tmp.path()).unwrap(),
            PathBuf::from("sub/x.csv")
        );
    }

    #[test]
    fn relative_to_rejects_outside_file() {
        let ws = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let file = elsewhere.path().join("x.csv");
        fs::write(&file, b"").unwrap();
        assert!(matches!(
            relative_to(&file, ws.path()),
            Err(IngestionError::Workspace { .. })
        ));
    }
}
