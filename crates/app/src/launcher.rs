//! Mode launcher: named URL groups opened in a new browser window.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{error, info};

pub const MODES_FILE: &str = "modes.json";

/// `{ "<mode>": ["<url>", ...] }`
pub type Modes = BTreeMap<String, Vec<String>>;

pub fn load_modes(path: &Path) -> Result<Modes> {
    let bytes =
        fs::read(path).with_context(|| format!("reading modes from {}", path.display()))?;
    let modes: Modes = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing modes from {}", path.display()))?;
    Ok(modes
        .into_iter()
        .map(|(name, urls)| {
            let urls = urls
                .into_iter()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect();
            (name, urls)
        })
        .collect())
}

#[derive(Debug, PartialEq, Eq)]
pub enum LaunchOutcome {
    Launched { pid: u32 },
    NoUrls,
    FocusLocked,
}

/// `[browser, "--new-window", urls...]`, or `None` when there is nothing to open.
pub fn launch_command(browser: &str, urls: &[String]) -> Option<Vec<String>> {
    if urls.is_empty() {
        return None;
    }
    let mut cmd = vec![browser.to_string(), "--new-window".to_string()];
    cmd.extend(urls.iter().cloned());
    Some(cmd)
}

pub fn launch_mode(browser: &str, urls: &[String], focus_running: bool) -> Result<LaunchOutcome> {
    if focus_running {
        return Ok(LaunchOutcome::FocusLocked);
    }
    let Some(argv) = launch_command(browser, urls) else {
        return Ok(LaunchOutcome::NoUrls);
    };

    let child = Command::new(&argv[0])
        .args(&argv[1..])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            error!(browser, error = %e, "failed to launch browser");
            e
        })
        .with_context(|| format!("failed to launch browser '{}'", browser))?;

    info!(browser, urls = urls.len(), pid = child.id(), "browser launched");
    Ok(LaunchOutcome::Launched { pid: child.id() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_command_shape() {
        let cmd = launch_command("firefox", &urls(&["https://a.test", "https://b.test"])).unwrap();
        assert_eq!(
            cmd,
            urls(&["firefox", "--new-window", "https://a.test", "https://b.test"])
        );
    }

    #[test]
    fn test_empty_group_is_skipped() {
        assert!(launch_command("firefox", &[]).is_none());
        assert_eq!(
            launch_mode("firefox", &[], false).unwrap(),
            LaunchOutcome::NoUrls
        );
    }

    #[test]
    fn test_focus_locks_launches() {
        let outcome =
            launch_mode("definitely-not-a-browser", &urls(&["https://a.test"]), true).unwrap();
        assert_eq!(outcome, LaunchOutcome::FocusLocked);
    }

    #[test]
    fn test_missing_browser_is_error() {
        let result = launch_mode(
            "roboswish-no-such-browser-binary",
            &urls(&["https://a.test"]),
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_modes_trims_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MODES_FILE);
        fs::write(
            &path,
            r#"{"Research": [" https://scholar.test ", ""], "Empty": []}"#,
        )
        .unwrap();

        let modes = load_modes(&path).unwrap();
        assert_eq!(modes["Research"], urls(&["https://scholar.test"]));
        assert!(modes["Empty"].is_empty());
    }

    #[test]
    fn test_load_modes_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MODES_FILE);
        fs::write(&path, "[1, 2").unwrap();
        let err = load_modes(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing modes"));
    }
}
