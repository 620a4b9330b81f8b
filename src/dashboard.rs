use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::config::Config;
use crate::correlate::{partition_by_display, Partition};
use crate::fetch::Snapshot;
use crate::grouping::{build_display_groups, DisplayGroup};
use crate::staleness::best_productive_activity;

/// A snapshot plus everything derived from it. Rebuilt wholesale on every
/// fetch; nothing carries over between cycles.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub snapshot: Snapshot,
    pub groups: Vec<DisplayGroup>,
    pub partition: Partition,
    /// Session name → freshest productive pane activity
    pub activity: HashMap<String, DateTime<Utc>>,
}

impl Dashboard {
    pub fn build(snapshot: Snapshot, config: &Config) -> Self {
        let groups = build_display_groups(&snapshot.spaces, &snapshot.windows, &config.terminal_apps);
        let partition = partition_by_display(
            &snapshot.panes,
            &snapshot.clients,
            &snapshot.process_tree,
            &snapshot.windows,
            &groups,
            &config.terminal_apps,
        );
        let activity = best_productive_activity(&snapshot.panes, &config.productive_commands);
        Self {
            snapshot,
            groups,
            partition,
            activity,
        }
    }
}
