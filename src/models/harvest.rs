//! Harvest API wire types and derived records.
//!
//! Only the fields the bot actually renders are deserialized; the API
//! returns much more.

use serde::{Deserialize, Serialize};

/// A user's assignment to a project, with the tasks available on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAssignment {
    pub id: u64,
    pub project: ProjectRef,
    pub client: ClientRef,
    #[serde(default)]
    pub task_assignments: Vec<TaskAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task: TaskRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: u64,
    pub name: String,
}

/// A logged unit of work; "running" when it has no end time yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: u64,
    pub hours: f64,
    pub is_running: bool,
    pub spent_date: String,
    pub project: ProjectRef,
    pub task: TaskRef,
    pub client: ClientRef,
}

/// Paginated project-assignments response.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectAssignmentsPage {
    pub project_assignments: Vec<ProjectAssignment>,
}

/// Paginated time-entries response.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeEntriesPage {
    pub time_entries: Vec<TimeEntry>,
}

/// In-progress project/task selection for the tracking workflow.
///
/// Cleared whenever a new tracking flow begins; persisting between flows is
/// harmless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub selected_project: Option<u64>,
    pub selected_task: Option<u64>,
}

/// Marker for the most recently created time entry, kept so the user can
/// restart the same project/task pair with one click.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastTimeEntry {
    pub project_id: u64,
    pub task_id: u64,
    pub project_name: String,
    pub task_name: String,
    pub client_name: String,
}

impl From<&TimeEntry> for LastTimeEntry {
    fn from(entry: &TimeEntry) -> Self {
        Self {
            project_id: entry.project.id,
            task_id: entry.task.id,
            project_name: entry.project.name.clone(),
            task_name: entry.task.name.clone(),
            client_name: entry.client.name.clone(),
        }
    }
}
