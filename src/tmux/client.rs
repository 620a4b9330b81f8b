use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

use super::{Client, Pane};
use crate::command;

/// Format: session|window index|window name|pane index|command|activity|history, tab separated
const LIST_PANES_FORMAT: &str = "#{session_name}\t#{window_index}\t#{window_name}\t#{pane_index}\t#{pane_current_command}\t#{window_activity}\t#{history_size}";

const LIST_CLIENTS_FORMAT: &str = "#{client_pid}\t#{session_name}";

/// Client for querying tmux via CLI.
///
/// Both queries are best-effort: a missing server, a missing binary or a
/// timeout all yield an empty list.
#[derive(Debug, Clone)]
pub struct TmuxClient {
    /// Path to tmux binary
    tmux_path: String,
}

impl TmuxClient {
    pub fn with_bin(bin: impl Into<String>) -> Self {
        Self {
            tmux_path: bin.into(),
        }
    }

    /// List every pane of every session
    pub async fn list_panes(&self, deadline: Duration) -> Vec<Pane> {
        match command::run(
            &self.tmux_path,
            &["list-panes", "-a", "-F", LIST_PANES_FORMAT],
            deadline,
        )
        .await
        {
            Ok(out) => parse_panes(&out),
            Err(e) => {
                debug!(error = %e, "tmux list-panes unavailable");
                Vec::new()
            }
        }
    }

    /// List attached clients with the session each one shows
    pub async fn list_clients(&self, deadline: Duration) -> Vec<Client> {
        match command::run(&self.tmux_path, &["list-clients", "-F", LIST_CLIENTS_FORMAT], deadline)
            .await
        {
            Ok(out) => parse_clients(&out),
            Err(e) => {
                debug!(error = %e, "tmux list-clients unavailable");
                Vec::new()
            }
        }
    }
}

fn parse_panes(output: &str) -> Vec<Pane> {
    output.lines().filter_map(parse_pane_line).collect()
}

fn parse_pane_line(line: &str) -> Option<Pane> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 7 {
        return None;
    }

    let activity: i64 = parts[5].trim().parse().unwrap_or(0);
    let last_activity = DateTime::<Utc>::from_timestamp(activity, 0).unwrap_or_default();

    Some(Pane {
        session_name: parts[0].to_string(),
        window_index: parts[1].trim().parse().unwrap_or(0),
        window_name: parts[2].to_string(),
        pane_index: parts[3].trim().parse().unwrap_or(0),
        current_command: parts[4].to_string(),
        last_activity,
        history_size: parts[6].trim().parse().unwrap_or(0),
    })
}

fn parse_clients(output: &str) -> Vec<Client> {
    output
        .lines()
        .filter_map(|line| {
            let (pid, session) = line.split_once('\t')?;
            Some(Client {
                pid: pid.trim().parse().unwrap_or(0),
                session_name: session.to_string(),
            })
        })
        .collect()
}
