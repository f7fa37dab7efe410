use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPhase {
    Execution,
    Completed,
    Paused,
}

impl ProjectPhase {
    pub const ALL: [ProjectPhase; 3] = [
        ProjectPhase::Execution,
        ProjectPhase::Completed,
        ProjectPhase::Paused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectPhase::Execution => "execution",
            ProjectPhase::Completed => "completed",
            ProjectPhase::Paused => "paused",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProjectPhase::Execution => "Ejecución",
            ProjectPhase::Completed => "Completado",
            ProjectPhase::Paused => "Pausado",
        }
    }
}

impl FromStr for ProjectPhase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "execution" => Ok(ProjectPhase::Execution),
            "completed" => Ok(ProjectPhase::Completed),
            "paused" => Ok(ProjectPhase::Paused),
            other => Err(format!("invalid project phase: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    InProgress,
    Monitoring,
    Paused,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] = [
        ProjectStatus::InProgress,
        ProjectStatus::Monitoring,
        ProjectStatus::Paused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Monitoring => "monitoring",
            ProjectStatus::Paused => "paused",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::InProgress => "EN CURSO",
            ProjectStatus::Monitoring => "EN SEGUIMIENTO",
            ProjectStatus::Paused => "PAUSADO",
        }
    }

    /// Badge color used by the frontend.
    pub fn color(&self) -> &'static str {
        match self {
            ProjectStatus::InProgress => "#007bff",
            ProjectStatus::Monitoring => "#28a745",
            ProjectStatus::Paused => "#6c757d",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ProjectStatus::InProgress),
            "monitoring" => Ok(ProjectStatus::Monitoring),
            "paused" => Ok(ProjectStatus::Paused),
            other => Err(format!("invalid project status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPriority {
    Normal,
    High,
    Low,
}

impl ProjectPriority {
    pub const ALL: [ProjectPriority; 3] = [
        ProjectPriority::Normal,
        ProjectPriority::High,
        ProjectPriority::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectPriority::Normal => "normal",
            ProjectPriority::High => "high",
            ProjectPriority::Low => "low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProjectPriority::Normal => "NORMAL",
            ProjectPriority::High => "ALTA",
            ProjectPriority::Low => "BAJA",
        }
    }

    /// Badge color used by the frontend.
    pub fn color(&self) -> &'static str {
        match self {
            ProjectPriority::Normal => "#28a745",
            ProjectPriority::High => "#dc3545",
            ProjectPriority::Low => "#ffc107",
        }
    }
}

impl FromStr for ProjectPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "normal" => Ok(ProjectPriority::Normal),
            "high" => Ok(ProjectPriority::High),
            "low" => Ok(ProjectPriority::Low),
            other => Err(format!("invalid project priority: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub phase: ProjectPhase,
    pub objective: String,
    pub status: ProjectStatus,
    pub priority: ProjectPriority,
    pub last_update: String,
    pub ready_to_offer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn to_response(&self) -> ProjectResponse {
        ProjectResponse {
            id: self.id,
            name: self.name.clone(),
            phase: self.phase,
            phase_display: self.phase.label().to_string(),
            objective: self.objective.clone(),
            status: self.status,
            status_display: self.status.label().to_string(),
            status_color: self.status.color().to_string(),
            priority: self.priority,
            priority_display: self.priority.label().to_string(),
            priority_color: self.priority.color().to_string(),
            last_update: self.last_update.clone(),
            ready_to_offer: self.ready_to_offer,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn to_list_item(&self) -> ProjectListItem {
        ProjectListItem {
            id: self.id,
            name: self.name.clone(),
            phase: self.phase,
            phase_display: self.phase.label().to_string(),
            short_objective: short_objective(&self.objective),
            status: self.status,
            status_display: self.status.label().to_string(),
            status_color: self.status.color().to_string(),
            priority: self.priority,
            priority_display: self.priority.label().to_string(),
            priority_color: self.priority.color().to_string(),
            ready_to_offer: self.ready_to_offer,
            updated_at: self.updated_at,
        }
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for Project {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        let phase: String = row.try_get("phase")?;
        let status: String = row.try_get("status")?;
        let priority: String = row.try_get("priority")?;

        Ok(Project {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            phase: phase.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            objective: row.try_get("objective")?,
            status: status.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            priority: priority.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            last_update: row.try_get("last_update")?,
            ready_to_offer: row.try_get("ready_to_offer")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Truncated objective for list rows.
pub fn short_objective(objective: &str) -> String {
    if objective.chars().count() <= 100 {
        objective.to_string()
    } else {
        let truncated: String = objective.chars().take(100).collect();
        format!("{}...", truncated)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub phase: ProjectPhase,
    pub phase_display: String,
    pub objective: String,
    pub status: ProjectStatus,
    pub status_display: String,
    pub status_color: String,
    pub priority: ProjectPriority,
    pub priority_display: String,
    pub priority_color: String,
    pub last_update: String,
    pub ready_to_offer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectListItem {
    pub id: Uuid,
    pub name: String,
    pub phase: ProjectPhase,
    pub phase_display: String,
    pub short_objective: String,
    pub status: ProjectStatus,
    pub status_display: String,
    pub status_color: String,
    pub priority: ProjectPriority,
    pub priority_display: String,
    pub priority_color: String,
    pub ready_to_offer: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub phase: Option<ProjectPhase>,
    pub objective: String,
    pub status: Option<ProjectStatus>,
    pub priority: Option<ProjectPriority>,
    pub last_update: String,
    pub ready_to_offer: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub phase: Option<ProjectPhase>,
    pub objective: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<ProjectPriority>,
    pub last_update: Option<String>,
    pub ready_to_offer: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_objective_keeps_short_text() {
        let text = "Desplegar el nuevo POS";
        assert_eq!(short_objective(text), text);
    }

    #[test]
    fn test_short_objective_truncates_long_text() {
        let text = "a".repeat(150);
        let short = short_objective(&text);
        assert_eq!(short.chars().count(), 103);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(ProjectStatus::InProgress.color(), "#007bff");
        assert_eq!(ProjectStatus::Monitoring.color(), "#28a745");
        assert_eq!(ProjectStatus::Paused.color(), "#6c757d");
    }

    #[test]
    fn test_priority_colors() {
        assert_eq!(ProjectPriority::High.color(), "#dc3545");
        assert_eq!(ProjectPriority::Normal.color(), "#28a745");
        assert_eq!(ProjectPriority::Low.color(), "#ffc107");
    }

    #[test]
    fn test_enum_round_trip() {
        for phase in ProjectPhase::ALL {
            assert_eq!(phase.as_str().parse::<ProjectPhase>(), Ok(phase));
        }
        for status in ProjectStatus::ALL {
            assert_eq!(status.as_str().parse::<ProjectStatus>(), Ok(status));
        }
        for priority in ProjectPriority::ALL {
            assert_eq!(priority.as_str().parse::<ProjectPriority>(), Ok(priority));
        }
    }
}
