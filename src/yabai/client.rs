use std::time::Duration;

use tracing::debug;

use super::{Space, Window};
use crate::command;
use crate::error::QueryError;

/// Client for querying and driving yabai via its CLI
#[derive(Debug, Clone)]
pub struct YabaiClient {
    /// Path to yabai binary
    yabai_path: String,
}

impl YabaiClient {
    pub fn with_bin(bin: impl Into<String>) -> Self {
        Self {
            yabai_path: bin.into(),
        }
    }

    async fn query(&self, domain: &str, deadline: Duration) -> Result<String, QueryError> {
        let flag = format!("--{}", domain);
        command::run(&self.yabai_path, &["-m", "query", &flag], deadline).await
    }

    /// List all spaces across all displays
    pub async fn query_spaces(&self, deadline: Duration) -> Result<Vec<Space>, QueryError> {
        let out = self.query("spaces", deadline).await?;
        Ok(serde_json::from_str(&out)?)
    }

    /// List all application windows
    pub async fn query_windows(&self, deadline: Duration) -> Result<Vec<Window>, QueryError> {
        let out = self.query("windows", deadline).await?;
        Ok(serde_json::from_str(&out)?)
    }

    /// Switch focus to a space. Fire-and-forget: failures are only logged.
    pub async fn focus_space(&self, index: u32, deadline: Duration) {
        let index = index.to_string();
        if let Err(e) = command::run(
            &self.yabai_path,
            &["-m", "space", "--focus", &index],
            deadline,
        )
        .await
        {
            debug!(space = %index, error = %e, "focus space failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_yabai_surfaces_not_found() {
        let client = YabaiClient::with_bin("/nonexistent/yabai");
        let err = client
            .query_spaces(Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unparsable_output_is_json_error() {
        // `echo` prints its arguments, which is not a JSON array
        let client = YabaiClient::with_bin("echo");
        let err = client
            .query_windows(Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Json(_)));
    }

    #[tokio::test]
    async fn focus_failure_is_swallowed() {
        let client = YabaiClient::with_bin("/nonexistent/yabai");
        client.focus_space(3, Duration::from_millis(200)).await;
    }
}
