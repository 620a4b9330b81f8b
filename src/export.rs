//! JSON payload for the companion app and `stop json`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::staleness::{freshest_space_activity, worst_space_activity, Tier};
use crate::tmux::group_by_session;

#[derive(Debug, Serialize)]
pub struct SpacesResponse {
    /// Unix milliseconds when the payload was built
    pub timestamp: i64,
    pub displays: Vec<DisplayJson>,
    pub tmux_sessions: Vec<SessionJson>,
    /// Sessions whose panes could not be placed on any display
    pub unresolved_sessions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DisplayJson {
    pub index: u32,
    pub spaces: Vec<SpaceJson>,
    pub free_count: usize,
    pub term_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SpaceJson {
    /// 1-based position within the display
    pub index: usize,
    pub yabai_index: u32,
    pub label: String,
    pub has_focus: bool,
    pub is_visible: bool,
    pub windows: Vec<WindowJson>,
    /// 0 when no productive session runs on the space
    pub freshest_activity_ms: i64,
    pub stalest_activity_ms: i64,
    pub tier: Option<Tier>,
}

#[derive(Debug, Serialize)]
pub struct WindowJson {
    pub app: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct SessionJson {
    pub name: String,
    pub windows: Vec<TmuxWindowJson>,
}

#[derive(Debug, Serialize)]
pub struct TmuxWindowJson {
    pub index: u32,
    pub name: String,
    pub panes: Vec<PaneJson>,
}

#[derive(Debug, Serialize)]
pub struct PaneJson {
    pub command: String,
    pub last_activity_ms: i64,
    pub history_size: u64,
    pub productive: bool,
    /// Only productive panes carry a tier
    pub tier: Option<Tier>,
}

fn millis(t: Option<DateTime<Utc>>) -> i64 {
    t.map(|t| t.timestamp_millis()).unwrap_or(0)
}

impl SpacesResponse {
    pub fn build(dashboard: &Dashboard, config: &Config, now: DateTime<Utc>) -> Self {
        let displays = dashboard
            .groups
            .iter()
            .map(|group| DisplayJson {
                index: group.index,
                free_count: group.free_count,
                term_count: group.terminal_count,
                spaces: group
                    .spaces
                    .iter()
                    .enumerate()
                    .map(|(i, row)| {
                        let freshest = freshest_space_activity(
                            &row.windows,
                            &dashboard.activity,
                            &config.terminal_apps,
                        );
                        let stalest = worst_space_activity(
                            &row.windows,
                            &dashboard.activity,
                            &config.terminal_apps,
                        );
                        SpaceJson {
                            index: i + 1,
                            yabai_index: row.space.index,
                            label: row.space.label.clone(),
                            has_focus: row.space.has_focus,
                            is_visible: row.space.is_visible,
                            windows: row
                                .windows
                                .iter()
                                .map(|w| WindowJson {
                                    app: w.app.clone(),
                                    title: w.title.clone(),
                                })
                                .collect(),
                            freshest_activity_ms: millis(freshest),
                            stalest_activity_ms: millis(stalest),
                            tier: stalest.map(|t| Tier::at(t, now)),
                        }
                    })
                    .collect(),
            })
            .collect();

        let tmux_sessions = group_by_session(&dashboard.snapshot.panes)
            .into_iter()
            .map(|session| SessionJson {
                name: session.name.to_string(),
                windows: session
                    .windows
                    .into_iter()
                    .map(|window| TmuxWindowJson {
                        index: window.index,
                        name: window.name.to_string(),
                        panes: window
                            .panes
                            .into_iter()
                            .map(|p| {
                                let productive =
                                    config.productive_commands.contains(&p.current_command);
                                PaneJson {
                                    command: p.current_command.clone(),
                                    last_activity_ms: p.last_activity.timestamp_millis(),
                                    history_size: p.history_size,
                                    productive,
                                    tier: productive.then(|| Tier::at(p.last_activity, now)),
                                }
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        let unresolved_sessions = group_by_session(&dashboard.partition.unresolved)
            .into_iter()
            .map(|s| s.name.to_string())
            .collect();

        Self {
            timestamp: now.timestamp_millis(),
            displays,
            tmux_sessions,
            unresolved_sessions,
        }
    }
}
