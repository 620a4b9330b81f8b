use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An immutable set of application or command names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameSet(BTreeSet<String>);

impl NameSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

impl<S: Into<String>> FromIterator<S> for NameSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Tunables for the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Terminal emulator app names as reported by yabai
    pub terminal_apps: NameSet,
    /// Browser app names whose window titles carry the page title
    pub browser_apps: NameSet,
    /// tmux pane commands that count as interactive work. Only these get
    /// staleness coloring; everything else renders dim.
    pub productive_commands: NameSet,
    pub poll_interval_ms: u64,
    pub spaces_timeout_ms: u64,
    pub query_timeout_ms: u64,
    pub serve_port: u16,
    pub yabai_path: String,
    pub tmux_path: String,
    pub ps_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            terminal_apps: [
                "kitty",
                "iTerm2",
                "Terminal",
                "Alacritty",
                "WezTerm",
                "Hyper",
                "Rio",
                "Tabby",
            ]
            .into_iter()
            .collect(),
            browser_apps: [
                "Firefox",
                "Google Chrome",
                "Safari",
                "Arc",
                "Brave Browser",
                "Microsoft Edge",
                "Chromium",
            ]
            .into_iter()
            .collect(),
            productive_commands: ["opencode", "claude", "codex", "crush", "gemini"]
                .into_iter()
                .collect(),
            poll_interval_ms: 2000,
            spaces_timeout_ms: 3000,
            query_timeout_ms: 2000,
            serve_port: 8385,
            yabai_path: "yabai".to_string(),
            tmux_path: "tmux".to_string(),
            ps_path: "ps".to_string(),
        }
    }
}

impl Config {
    /// Load config from an explicit path, or from the default location if it
    /// exists, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn spaces_timeout(&self) -> Duration {
        Duration::from_millis(self.spaces_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// `<config dir>/stop/config.json`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stop").join("config.json"))
}
