use std::collections::{BTreeMap, HashMap};

use crate::config::NameSet;
use crate::yabai::{Space, Window};

/// A space with the windows shown on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceRow {
    pub space: Space,
    pub windows: Vec<Window>,
}

impl SpaceRow {
    pub fn has_terminal(&self, terminals: &NameSet) -> bool {
        self.windows.iter().any(|w| terminals.contains(&w.app))
    }
}

/// All spaces on one physical display plus summary counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayGroup {
    pub index: u32,
    /// Sorted by space index
    pub spaces: Vec<SpaceRow>,
    /// Spaces with no shown windows
    pub free_count: usize,
    /// Spaces hosting at least one terminal window
    pub terminal_count: usize,
}

/// Organize spaces by display and attach their shown windows.
///
/// Displays come out sorted by display index and spaces by space index,
/// independent of input order.
pub fn build_display_groups(
    spaces: &[Space],
    windows: &[Window],
    terminals: &NameSet,
) -> Vec<DisplayGroup> {
    let mut windows_by_space: HashMap<u32, Vec<Window>> = HashMap::new();
    for window in windows.iter().filter(|w| w.is_shown()) {
        windows_by_space
            .entry(window.space)
            .or_default()
            .push(window.clone());
    }

    let mut by_display: BTreeMap<u32, Vec<SpaceRow>> = BTreeMap::new();
    for space in spaces {
        by_display.entry(space.display).or_default().push(SpaceRow {
            space: space.clone(),
            windows: windows_by_space.get(&space.index).cloned().unwrap_or_default(),
        });
    }

    by_display
        .into_iter()
        .map(|(index, mut rows)| {
            rows.sort_by_key(|row| row.space.index);
            let free_count = rows.iter().filter(|row| row.windows.is_empty()).count();
            let terminal_count = rows.iter().filter(|row| row.has_terminal(terminals)).count();
            DisplayGroup {
                index,
                spaces: rows,
                free_count,
                terminal_count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::yabai::fixtures::{space, window};

    fn terminals() -> NameSet {
        Config::default().terminal_apps
    }

    #[test]
    fn groups_sorted_by_display_then_space() {
        let spaces = vec![space(5, 2), space(2, 1), space(4, 2), space(1, 1), space(3, 1)];
        let groups = build_display_groups(&spaces, &[], &terminals());

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].index, 1);
        assert_eq!(groups[1].index, 2);
        let first: Vec<u32> = groups[0].spaces.iter().map(|r| r.space.index).collect();
        let second: Vec<u32> = groups[1].spaces.iter().map(|r| r.space.index).collect();
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, vec![4, 5]);
    }

    #[test]
    fn counts_free_and_terminal_spaces() {
        let spaces = vec![space(1, 1), space(2, 1), space(3, 1)];
        let windows = vec![
            window(10, 100, "kitty", "work", 1),
            window(11, 100, "kitty", "play", 1),
            window(12, 200, "Safari", "docs", 2),
        ];
        let groups = build_display_groups(&spaces, &windows, &terminals());
        let group = &groups[0];

        assert_eq!(group.free_count, 1);
        // two kitty windows on one space count once
        assert_eq!(group.terminal_count, 1);
        assert_eq!(group.spaces[0].windows.len(), 2);
    }

    #[test]
    fn hidden_minimized_and_spaceless_windows_are_excluded() {
        let spaces = vec![space(1, 1)];
        let mut hidden = window(10, 1, "kitty", "", 1);
        hidden.is_hidden = true;
        let mut minimized = window(11, 1, "Mail", "", 1);
        minimized.is_minimized = true;
        let spaceless = window(12, 1, "Finder", "", 0);

        let groups = build_display_groups(&spaces, &[hidden, minimized, spaceless], &terminals());
        assert!(groups[0].spaces[0].windows.is_empty());
        assert_eq!(groups[0].free_count, 1);
        assert_eq!(groups[0].terminal_count, 0);
    }

    #[test]
    fn windows_on_unknown_spaces_are_dropped() {
        let groups = build_display_groups(
            &[space(1, 1)],
            &[window(10, 1, "kitty", "", 9)],
            &terminals(),
        );
        assert_eq!(groups.len(), 1);
        assert!(groups[0].spaces[0].windows.is_empty());
    }

    #[test]
    fn grouping_is_idempotent() {
        let spaces = vec![space(3, 2), space(1, 1), space(2, 1)];
        let windows = vec![window(10, 1, "kitty", "a", 3), window(11, 2, "Slack", "", 1)];
        let first = build_display_groups(&spaces, &windows, &terminals());
        let second = build_display_groups(&spaces, &windows, &terminals());
        assert_eq!(first, second);
    }

    #[test]
    fn no_spaces_no_groups() {
        assert!(build_display_groups(&[], &[window(1, 1, "kitty", "", 1)], &terminals()).is_empty());
    }
}
