use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::QueryError;
use crate::process::{ProcessTree, PsClient};
use crate::tmux::{Client, Pane, TmuxClient};
use crate::yabai::{Space, Window, YabaiClient};

/// Everything one polling cycle learned about the outside world
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub spaces: Vec<Space>,
    pub windows: Vec<Window>,
    pub panes: Vec<Pane>,
    pub clients: Vec<Client>,
    pub process_tree: ProcessTree,
}

/// The external tools queried on every cycle
#[derive(Debug, Clone)]
pub struct Sources {
    pub yabai: YabaiClient,
    pub tmux: TmuxClient,
    pub ps: PsClient,
    spaces_timeout: Duration,
    query_timeout: Duration,
}

impl Sources {
    pub fn from_config(config: &Config) -> Self {
        Self {
            yabai: YabaiClient::with_bin(&config.yabai_path),
            tmux: TmuxClient::with_bin(&config.tmux_path),
            ps: PsClient::with_bin(&config.ps_path),
            spaces_timeout: config.spaces_timeout(),
            query_timeout: config.query_timeout(),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Run all five queries concurrently and merge them.
    ///
    /// Spaces are required: without them nothing can be drawn, so a failed
    /// spaces query fails the whole fetch. Windows, panes, clients and the
    /// process tree are best-effort and come back empty on failure.
    pub async fn fetch_all(&self) -> Result<Snapshot, QueryError> {
        let (spaces, windows, panes, clients, process_tree) = tokio::join!(
            self.yabai.query_spaces(self.spaces_timeout),
            self.yabai.query_windows(self.query_timeout),
            self.tmux.list_panes(self.query_timeout),
            self.tmux.list_clients(self.query_timeout),
            self.ps.process_tree(self.query_timeout),
        );

        let spaces = spaces.map_err(|e| {
            warn!(error = %e, "spaces query failed");
            e
        })?;
        let windows = windows.unwrap_or_else(|e| {
            debug!(error = %e, "windows query failed");
            Vec::new()
        });

        trace!(
            spaces = spaces.len(),
            windows = windows.len(),
            panes = panes.len(),
            clients = clients.len(),
            processes = process_tree.len(),
            "fetched snapshot"
        );

        Ok(Snapshot {
            spaces,
            windows,
            panes,
            clients,
            process_tree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(yabai: &str, tmux: &str, ps: &str) -> Sources {
        let config = Config {
            yabai_path: yabai.to_string(),
            tmux_path: tmux.to_string(),
            ps_path: ps.to_string(),
            spaces_timeout_ms: 500,
            query_timeout_ms: 500,
            ..Config::default()
        };
        Sources::from_config(&config)
    }

    #[tokio::test]
    async fn mandatory_failure_fails_the_fetch() {
        let sources = sources("/nonexistent/yabai", "/nonexistent/tmux", "/nonexistent/ps");
        let err = sources.fetch_all().await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn malformed_spaces_fail_the_fetch() {
        // `echo` answers every query with its arguments, which is not JSON
        let sources = sources("echo", "/nonexistent/tmux", "/nonexistent/ps");
        let err = sources.fetch_all().await.unwrap_err();
        assert!(matches!(err, QueryError::Json(_)));
    }

    /// A fake yabai that answers `--spaces` and fails everything else
    #[cfg(unix)]
    fn fake_yabai(dir: &std::path::Path) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("yabai");
        let script = r#"#!/bin/sh
if [ "$3" = "--spaces" ]; then
  echo '[{"id":1,"index":1,"display":1,"windows":[],"has-focus":true,"is-visible":true}]'
else
  exit 1
fi
"#;
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn best_effort_failures_yield_empty_fields() {
        let dir = tempfile::tempdir().unwrap();
        let yabai = fake_yabai(dir.path());
        let sources = sources(&yabai, "/nonexistent/tmux", "/nonexistent/ps");

        let snapshot = sources.fetch_all().await.unwrap();
        assert_eq!(snapshot.spaces.len(), 1);
        assert!(snapshot.spaces[0].has_focus);
        assert!(snapshot.windows.is_empty());
        assert!(snapshot.panes.is_empty());
        assert!(snapshot.clients.is_empty());
        assert_eq!(snapshot.process_tree.len(), 0);
    }
}
