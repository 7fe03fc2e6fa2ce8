use chrono::Utc;
use tracing::info;

use super::{Repository, Write};
use crate::error::{RepoError, RepoResult};
use crate::models::{Epic, JiraStatus};

impl Repository {
    /// Records the outcome of pushing an epic to Jira.
    ///
    /// Reporting the status and key the epic already carries is a no-op and
    /// writes nothing. Any status may follow any other, so a failed push can
    /// simply be reported again as `Pushed` once the retry succeeds.
    pub fn update_epic_jira_status(
        &self,
        project_id: &str,
        epic_id: &str,
        status: JiraStatus,
        jira_key: Option<&str>,
    ) -> RepoResult<Epic> {
        let (epic, changed) = self.mutate(project_id, |tree| {
            let changed = tree.set_jira_status(epic_id, status, jira_key, Utc::now())?;
            let epic = tree
                .epic(epic_id)
                .cloned()
                .ok_or_else(|| RepoError::not_found("epic", epic_id))?;
            if changed {
                Ok(Write::Commit((epic, true)))
            } else {
                Ok(Write::Skip((epic, false)))
            }
        })?;
        if changed {
            info!(
                project_id,
                epic_id,
                status = status.as_str(),
                jira_key = epic.jira_key.as_deref().unwrap_or("-"),
                "Recorded Jira sync status"
            );
        }
        Ok(epic)
    }
}
