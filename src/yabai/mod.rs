mod client;

pub use client::YabaiClient;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// A macOS space (virtual desktop) as reported by `yabai -m query --spaces`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Space {
    pub id: u64,
    /// Global space index across all displays
    pub index: u32,
    #[serde(default)]
    pub label: String,
    /// Index of the physical display owning this space
    pub display: u32,
    #[serde(default)]
    pub windows: Vec<u64>,
    #[serde(default)]
    pub has_focus: bool,
    #[serde(default)]
    pub is_visible: bool,
}

/// An application window as reported by `yabai -m query --windows`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Window {
    pub id: u64,
    pub pid: u32,
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub title: String,
    /// Owning space index; 0 when yabai does not know the space
    #[serde(default)]
    pub space: u32,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub is_minimized: bool,
    #[serde(default)]
    pub is_hidden: bool,
}

impl Window {
    /// Whether the window counts toward its space's contents
    pub fn is_shown(&self) -> bool {
        self.space > 0 && !self.is_hidden && !self.is_minimized
    }
}

static RE_EM_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^(.+) — ").unwrap());
static RE_DASH_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^(.+) - ").unwrap());

/// Strip the app name suffix browsers append to window titles.
///
/// `"GitHub — Mozilla Firefox"` becomes `"GitHub"`, and
/// `"How to X - Stack Overflow - Google Chrome"` becomes
/// `"How to X - Stack Overflow"`.
pub fn clean_browser_title(title: &str) -> &str {
    for re in [&*RE_EM_SUFFIX, &*RE_DASH_SUFFIX] {
        if let Some(caps) = re.captures(title) {
            if let Some(m) = caps.get(1) {
                return &title[..m.end()];
            }
        }
    }
    title
}
