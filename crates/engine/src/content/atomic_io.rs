use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes `text` to a sibling temp file, flushes it to disk and renames it
/// over `path`, so readers never observe a half-written file.
pub fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path(path);
    let result = File::create(&staging)
        .and_then(|mut file| {
            file.write_all(text.as_bytes())?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&staging, path));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

fn staging_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "write".to_string());
    path.with_file_name(format!(".{file_name}.partial"))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn creates_parent_dirs_and_replaces_existing_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("config").join("preferences.json");

        write_text_atomic(&path, "{\"a\":1}").expect("first write");
        write_text_atomic(&path, "{\"a\":2}").expect("second write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "{\"a\":2}");
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn staging_file_is_a_hidden_sibling() {
        let staged = staging_path(Path::new("/tmp/config/prefs.json"));
        assert_eq!(staged, PathBuf::from("/tmp/config/.prefs.json.partial"));
    }
}
