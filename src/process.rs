use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::command;

/// pid → ppid for every process in one `ps` snapshot.
///
/// Only valid for the fetch cycle that produced it: pids get recycled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessTree(HashMap<u32, u32>);

impl ProcessTree {
    pub fn parent(&self, pid: u32) -> Option<u32> {
        self.0.get(&pid).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(u32, u32)> for ProcessTree {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

static RE_PID_PPID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\s+(\d+)\s*$").unwrap());

/// Parse `ps -eo pid,ppid` output. The header and anything that is not two
/// integers is skipped.
pub fn parse_ps_output(output: &str) -> ProcessTree {
    output
        .lines()
        .filter_map(|line| {
            let caps = RE_PID_PPID.captures(line)?;
            let pid: u32 = caps[1].parse().ok()?;
            let ppid: u32 = caps[2].parse().ok()?;
            Some((pid, ppid))
        })
        .collect()
}

/// Best-effort process table query via `ps`
#[derive(Debug, Clone)]
pub struct PsClient {
    ps_path: String,
}

impl PsClient {
    pub fn with_bin(bin: impl Into<String>) -> Self {
        Self { ps_path: bin.into() }
    }

    pub async fn process_tree(&self, deadline: Duration) -> ProcessTree {
        match command::run(&self.ps_path, &["-eo", "pid,ppid"], deadline).await {
            Ok(out) => parse_ps_output(&out),
            Err(e) => {
                debug!(error = %e, "ps unavailable");
                ProcessTree::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ps_table() {
        let out = "  PID  PPID\n    1     0\n  412     1\n 9001   412\n";
        let tree = parse_ps_output(out);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.parent(9001), Some(412));
        assert_eq!(tree.parent(412), Some(1));
        assert_eq!(tree.parent(7), None);
    }

    #[test]
    fn garbage_lines_are_skipped() {
        let tree = parse_ps_output("PID PPID\nabc 12\n10 20 30\n\n  5 4\n");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.parent(5), Some(4));
    }

    #[tokio::test]
    async fn missing_ps_yields_empty_tree() {
        let tree = PsClient::with_bin("/nonexistent/ps")
            .process_tree(Duration::from_secs(1))
            .await;
        assert_eq!(tree.len(), 0);
    }
}
