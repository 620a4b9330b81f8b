//! Staleness tiers derived from the time since a pane last produced output.
//!
//! Only panes running a productive command (see [`Config::productive_commands`])
//! take part. A shell or `btop` sitting idle for hours is not interesting.
//!
//! [`Config::productive_commands`]: crate::config::Config::productive_commands

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::NameSet;
use crate::tmux::Pane;
use crate::yabai::Window;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Urgency bucket, ordered from freshest to stalest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// under a minute
    Fresh,
    /// 1 to 5 minutes
    Warm,
    /// 5 to 15 minutes
    Cooling,
    /// 15 minutes to an hour
    Cold,
    /// an hour or more
    Stale,
}

impl Tier {
    pub fn for_age(age: Duration) -> Self {
        if age < MINUTE {
            Tier::Fresh
        } else if age < 5 * MINUTE {
            Tier::Warm
        } else if age < 15 * MINUTE {
            Tier::Cooling
        } else if age < HOUR {
            Tier::Cold
        } else {
            Tier::Stale
        }
    }

    pub fn at(last_activity: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::for_age(age(last_activity, now))
    }
}

/// Time elapsed since `last_activity`. Activity reported in the future
/// (clock skew) counts as zero.
pub fn age(last_activity: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - last_activity).to_std().unwrap_or(Duration::ZERO)
}

/// Session name → most recent activity among its productive panes.
/// Sessions with no productive pane are absent.
pub fn best_productive_activity(
    panes: &[Pane],
    productive: &NameSet,
) -> HashMap<String, DateTime<Utc>> {
    let mut best: HashMap<String, DateTime<Utc>> = HashMap::new();
    for pane in panes.iter().filter(|p| productive.contains(&p.current_command)) {
        best.entry(pane.session_name.clone())
            .and_modify(|t| *t = (*t).max(pane.last_activity))
            .or_insert(pane.last_activity);
    }
    best
}

/// Most recent activity among the productive panes of one tmux window
pub fn window_activity<'a, I>(panes: I, productive: &NameSet) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = &'a Pane>,
{
    panes
        .into_iter()
        .filter(|p| productive.contains(&p.current_command))
        .map(|p| p.last_activity)
        .max()
}

/// Productive session activity of every terminal window on a space, found
/// by matching the window title exactly to the session name, the same rule
/// the display correlation uses.
fn space_activities<'a>(
    windows: &'a [Window],
    activity: &'a HashMap<String, DateTime<Utc>>,
    terminals: &'a NameSet,
) -> impl Iterator<Item = DateTime<Utc>> + 'a {
    windows
        .iter()
        .filter(|w| terminals.contains(&w.app))
        .filter_map(|w| activity.get(w.title.as_str()).copied())
}

/// The stalest productive session on a space. A space is only as fresh as
/// its stalest session, so this is what colors the space.
pub fn worst_space_activity(
    windows: &[Window],
    activity: &HashMap<String, DateTime<Utc>>,
    terminals: &NameSet,
) -> Option<DateTime<Utc>> {
    space_activities(windows, activity, terminals).min()
}

/// The freshest productive session on a space
pub fn freshest_space_activity(
    windows: &[Window],
    activity: &HashMap<String, DateTime<Utc>>,
    terminals: &NameSet,
) -> Option<DateTime<Utc>> {
    space_activities(windows, activity, terminals).max()
}

/// Compact age: `now`, `42s`, `7m`, `3h`, `2d`
pub fn format_relative_time(last_activity: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = age(last_activity, now);
    if age < Duration::from_secs(5) {
        "now".to_string()
    } else if age < MINUTE {
        format!("{}s", age.as_secs())
    } else if age < HOUR {
        format!("{}m", age.as_secs() / 60)
    } else if age < DAY {
        format!("{}h", age.as_secs() / 3600)
    } else {
        format!("{}d", age.as_secs() / 86400)
    }
}

/// Scrollback line count, compact
pub fn format_history_size(lines: u64) -> String {
    if lines < 1000 {
        lines.to_string()
    } else if lines < 10_000 {
        format!("{:.1}k", lines as f64 / 1000.0)
    } else {
        format!("{}k", lines / 1000)
    }
}
