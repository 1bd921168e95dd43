//! Locates a Chrome or Chromium binary for the launcher.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable that overrides discovery entirely.
pub const CHROME_ENV: &str = "KESTREL_CHROME";

/// Find a Chrome binary: an explicit path wins, then `KESTREL_CHROME`,
/// then the platform default locations.
pub fn find_chrome(custom: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = custom {
        return validate(path);
    }
    if let Ok(path) = std::env::var(CHROME_ENV) {
        return validate(Path::new(&path));
    }
    for candidate in default_paths() {
        if let Ok(found) = validate(&candidate) {
            return Ok(found);
        }
    }
    Err(Error::Launch(format!(
        "Chrome not found. Checked: {}. Set {CHROME_ENV} or LaunchOptions::chrome_path to specify a location.",
        default_paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

fn default_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    return vec![
        PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
        PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
    ];

    #[cfg(target_os = "linux")]
    return vec![
        PathBuf::from("/usr/bin/google-chrome"),
        PathBuf::from("/usr/bin/chromium"),
        PathBuf::from("/usr/bin/chromium-browser"),
    ];

    #[cfg(target_os = "windows")]
    return vec![
        PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
        PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
    ];

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    return vec![];
}

/// A usable binary exists and carries an executable bit.
fn validate(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(Error::Launch(format!(
            "Chrome not found at: {}",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path).map_err(Error::Io)?;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(Error::Launch(format!(
                "Chrome binary not executable: {}",
                path.display()
            )));
        }
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let path = temp.path();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let found = find_chrome(Some(path)).unwrap();
        assert_eq!(found, path);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let result = find_chrome(Some(Path::new("/nonexistent/chrome")));
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_path_is_rejected() {
        use std::os::unix::fs::PermissionsExt;
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::set_permissions(temp.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

        let result = find_chrome(Some(temp.path()));
        assert!(result.unwrap_err().to_string().contains("not executable"));
    }
}
