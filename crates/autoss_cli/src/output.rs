//! Committing the generated text.

use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `text` to `target`, or to stdout when `target` is `-`.
///
/// Files are written to a temporary file in the destination directory and
/// renamed over `target`, so a failed run never leaves partial output.
pub fn commit(target: &str, text: &str) -> io::Result<()> {
    if target == "-" {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        return stdout.flush();
    }

    let path = Path::new(target);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "wrote output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_new_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.v");
        commit(target.to_str().unwrap(), "module m;\nendmodule\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "module m;\nendmodule\n"
        );
    }

    #[test]
    fn replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.v");
        std::fs::write(&target, "old contents that are longer").unwrap();
        commit(target.to_str().unwrap(), "new").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("no/such/dir/out.v");
        assert!(commit(target.to_str().unwrap(), "x").is_err());
    }
}
