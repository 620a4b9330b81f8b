//! Map tmux sessions to the display their attached client is shown on.
//!
//! Walks from each tmux client pid up the process tree until it reaches a
//! pid that owns a terminal window, then follows that window's space to its
//! display. Single-process terminals (kitty) own several windows under one
//! pid; those are told apart by matching the window title to the session
//! name. Anything ambiguous stays unresolved.

use std::collections::{BTreeMap, HashMap};

use crate::config::NameSet;
use crate::grouping::DisplayGroup;
use crate::process::ProcessTree;
use crate::tmux::{Client, Pane};
use crate::yabai::Window;

/// Ancestor steps tried before giving up on a client
pub const MAX_ANCESTOR_DEPTH: usize = 20;

/// Panes split by the display their session is shown on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub by_display: BTreeMap<u32, Vec<Pane>>,
    /// Panes of sessions with no attached client or no resolvable display
    pub unresolved: Vec<Pane>,
}

impl Partition {
    pub fn panes_on(&self, display: u32) -> &[Pane] {
        self.by_display
            .get(&display)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Debug)]
struct TerminalWindow<'a> {
    title: &'a str,
    display: u32,
}

/// Assign every pane to the display of its session, or to `unresolved`.
pub fn partition_by_display(
    panes: &[Pane],
    clients: &[Client],
    tree: &ProcessTree,
    windows: &[Window],
    groups: &[DisplayGroup],
    terminals: &NameSet,
) -> Partition {
    let mut partition = Partition::default();
    if panes.is_empty() {
        return partition;
    }

    let session_display = resolve_sessions(clients, tree, windows, groups, terminals);

    for pane in panes {
        match session_display.get(pane.session_name.as_str()) {
            Some(&display) => partition
                .by_display
                .entry(display)
                .or_default()
                .push(pane.clone()),
            None => partition.unresolved.push(pane.clone()),
        }
    }

    partition
}

fn resolve_sessions<'a>(
    clients: &'a [Client],
    tree: &ProcessTree,
    windows: &'a [Window],
    groups: &[DisplayGroup],
    terminals: &NameSet,
) -> HashMap<&'a str, u32> {
    let space_display: HashMap<u32, u32> = groups
        .iter()
        .flat_map(|g| g.spaces.iter().map(move |row| (row.space.index, g.index)))
        .collect();

    let mut owners: HashMap<u32, Vec<TerminalWindow<'a>>> = HashMap::new();
    for window in windows.iter().filter(|w| terminals.contains(&w.app)) {
        if let Some(&display) = space_display.get(&window.space) {
            owners.entry(window.pid).or_default().push(TerminalWindow {
                title: &window.title,
                display,
            });
        }
    }

    let mut resolved = HashMap::new();
    for client in clients {
        let Some(terminal_pid) = find_terminal_ancestor(client.pid, tree, &owners) else {
            continue;
        };
        let candidates = &owners[&terminal_pid];
        let display = match candidates.as_slice() {
            [only] => Some(only.display),
            many => many
                .iter()
                .find(|w| w.title == client.session_name)
                .map(|w| w.display),
        };
        if let Some(display) = display {
            resolved.insert(client.session_name.as_str(), display);
        }
    }
    resolved
}

/// First pid on the ancestor chain starting at `pid` that owns a terminal
/// window. Stops at the root (pid ≤ 1), a missing parent, or
/// [`MAX_ANCESTOR_DEPTH`].
fn find_terminal_ancestor<T>(pid: u32, tree: &ProcessTree, owners: &HashMap<u32, T>) -> Option<u32> {
    let mut pid = pid;
    for _ in 0..MAX_ANCESTOR_DEPTH {
        if owners.contains_key(&pid) {
            return Some(pid);
        }
        match tree.parent(pid) {
            Some(ppid) if ppid > 1 => pid = ppid,
            _ => return None,
        }
    }
    None
}
