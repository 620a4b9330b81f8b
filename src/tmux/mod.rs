mod client;

pub use client::TmuxClient;

use chrono::{DateTime, Utc};

/// Represents a single tmux pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    pub session_name: String,
    pub window_index: u32,
    pub window_name: String,
    pub pane_index: u32,
    /// Foreground command running in the pane
    pub current_command: String,
    /// Last output in the pane's window
    pub last_activity: DateTime<Utc>,
    /// Lines in the scrollback buffer
    pub history_size: u64,
}

/// A tmux client attached to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub pid: u32,
    pub session_name: String,
}

/// Panes of one tmux window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGroup<'a> {
    pub index: u32,
    pub name: &'a str,
    pub panes: Vec<&'a Pane>,
}

/// Windows of one tmux session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionGroup<'a> {
    pub name: &'a str,
    pub windows: Vec<WindowGroup<'a>>,
}

/// Group panes into a session → window → pane hierarchy, preserving the
/// order tmux reported at each level.
pub fn group_by_session<'a, I>(panes: I) -> Vec<SessionGroup<'a>>
where
    I: IntoIterator<Item = &'a Pane>,
{
    let mut sessions: Vec<(&'a str, Vec<&'a Pane>)> = Vec::new();
    for pane in panes {
        match sessions.iter_mut().find(|(name, _)| *name == pane.session_name) {
            Some((_, members)) => members.push(pane),
            None => sessions.push((pane.session_name.as_str(), vec![pane])),
        }
    }
    sessions
        .into_iter()
        .map(|(name, members)| SessionGroup {
            name,
            windows: group_by_window(members),
        })
        .collect()
}

/// Split one session's panes into per-window groups
pub fn group_by_window<'a, I>(panes: I) -> Vec<WindowGroup<'a>>
where
    I: IntoIterator<Item = &'a Pane>,
{
    let mut windows: Vec<WindowGroup<'a>> = Vec::new();
    for pane in panes {
        match windows.iter_mut().find(|w| w.index == pane.window_index) {
            Some(window) => {
                window.name = pane.window_name.as_str();
                window.panes.push(pane);
            }
            None => windows.push(WindowGroup {
                index: pane.window_index,
                name: pane.window_name.as_str(),
                panes: vec![pane],
            }),
        }
    }
    windows
}


#[cfg(test)]
mod tests {
    use super::fixtures::pane;
    use super::*;

    #[test]
    fn grouping_preserves_first_seen_order() {
        let panes = vec![
            pane("work", 1, 0, "claude", 10),
            pane("misc", 0, 0, "bash", 10),
            pane("work", 0, 0, "zsh", 10),
            pane("work", 1, 1, "btop", 10),
        ];
        let sessions = group_by_session(&panes);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].name, "work");
        assert_eq!(sessions[1].name, "misc");

        let work = &sessions[0].windows;
        assert_eq!(work.len(), 2);
        assert_eq!(work[0].index, 1);
        assert_eq!(work[0].panes.len(), 2);
        assert_eq!(work[0].panes[1].current_command, "btop");
        assert_eq!(work[1].index, 0);
    }

    #[test]
    fn grouping_empty_input() {
        assert!(group_by_session(&Vec::<Pane>::new()).is_empty());
    }
}
