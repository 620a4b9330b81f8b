use crossterm::event::KeyEvent;

use crate::fetch::Snapshot;

/// Actions that can be dispatched through the application
#[derive(Debug, Clone)]
pub enum Action {
    /// A key was pressed
    KeyPress(KeyEvent),
    /// A fetch cycle completed
    SnapshotUpdated(Box<Snapshot>),
    /// The spaces query failed; nothing new to draw this cycle
    FetchFailed(String),
    /// Switch yabai focus to a space index
    FocusSpace(u32),
}
