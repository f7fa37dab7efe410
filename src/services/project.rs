use crate::{
    error::{AppError, Result},
    models::project::{
        CreateProjectRequest, Project, ProjectPhase, ProjectPriority, ProjectStatus,
        UpdateProjectRequest,
    },
    services::database::{Database, PaginatedResult},
};
use serde_json::{json, Value};
use sqlx::{Postgres, QueryBuilder, Row};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct ProjectListFilter {
    pub phase: Option<ProjectPhase>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<ProjectPriority>,
    pub ready_to_offer: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Clone)]
pub struct ProjectService {
    db: Arc<Database>,
}

impl ProjectService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project> {
        let name = non_empty_trimmed(&request.name, "name")?;
        let objective = non_empty_trimmed(&request.objective, "objective")?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, phase, objective, status, priority, last_update, ready_to_offer)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(request.phase.unwrap_or(ProjectPhase::Execution).as_str())
        .bind(objective)
        .bind(request.status.unwrap_or(ProjectStatus::InProgress).as_str())
        .bind(request.priority.unwrap_or(ProjectPriority::Normal).as_str())
        .bind(&request.last_update)
        .bind(request.ready_to_offer.unwrap_or(false))
        .fetch_one(&self.db.pool)
        .await?;

        info!("Created project {} ({})", project.name, project.id);
        Ok(project)
    }

    pub async fn get_projects(
        &self,
        page: usize,
        per_page: usize,
        filter: ProjectListFilter,
    ) -> Result<PaginatedResult<Project>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM projects WHERE TRUE");
        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM projects WHERE TRUE");

        for builder in [&mut query, &mut count_query] {
            if let Some(phase) = filter.phase {
                builder.push(" AND phase = ").push_bind(phase.as_str());
            }
            if let Some(status) = filter.status {
                builder.push(" AND status = ").push_bind(status.as_str());
            }
            if let Some(priority) = filter.priority {
                builder.push(" AND priority = ").push_bind(priority.as_str());
            }
            if let Some(ready) = filter.ready_to_offer {
                builder.push(" AND ready_to_offer = ").push_bind(ready);
            }
            if let Some(search) = &filter.search {
                let pattern = format!("%{}%", search);
                builder
                    .push(" AND (name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR objective ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR last_update ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        let total: i64 = count_query
            .build()
            .fetch_one(&self.db.pool)
            .await?
            .try_get(0)?;

        query.push(order_clause(filter.ordering.as_deref()));

        let offset = (page.saturating_sub(1)) * per_page;
        query
            .push(" LIMIT ")
            .push_bind(per_page as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let projects = query
            .build_query_as::<Project>()
            .fetch_all(&self.db.pool)
            .await?;

        debug!("Fetched {} of {} projects", projects.len(), total);
        Ok(PaginatedResult::new(projects, total as usize, page, per_page))
    }

    pub async fn get_by_id(&self, project_id: Uuid) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(project)
    }

    pub async fn update_project(
        &self,
        project_id: Uuid,
        request: &UpdateProjectRequest,
    ) -> Result<Project> {
        let current = self
            .get_by_id(project_id)
            .await?
            .ok_or_else(|| AppError::not_found("Project"))?;

        let name = match &request.name {
            Some(name) => non_empty_trimmed(name, "name")?,
            None => current.name.clone(),
        };
        let objective = match &request.objective {
            Some(objective) => non_empty_trimmed(objective, "objective")?,
            None => current.objective.clone(),
        };

        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $2,
                phase = $3,
                objective = $4,
                status = $5,
                priority = $6,
                last_update = $7,
                ready_to_offer = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(name)
        .bind(request.phase.unwrap_or(current.phase).as_str())
        .bind(objective)
        .bind(request.status.unwrap_or(current.status).as_str())
        .bind(request.priority.unwrap_or(current.priority).as_str())
        .bind(request.last_update.as_ref().unwrap_or(&current.last_update))
        .bind(request.ready_to_offer.unwrap_or(current.ready_to_offer))
        .fetch_one(&self.db.pool)
        .await?;

        info!("Updated project {}", project_id);
        Ok(project)
    }

    pub async fn delete_project(&self, project_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(&self.db.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Project"));
        }
        info!("Deleted project {}", project_id);
        Ok(())
    }

    /// Projects flagged ready to offer, ordered by name.
    pub async fn get_ready_to_offer(&self) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE ready_to_offer = TRUE ORDER BY name ASC",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(projects)
    }

    /// Aggregate counts per phase, status and priority.
    pub async fn get_stats(&self) -> Result<Value> {
        let total: i64 = sqlx::query("SELECT COUNT(*) FROM projects")
            .fetch_one(&self.db.pool)
            .await?
            .try_get(0)?;

        let mut by_phase = serde_json::Map::new();
        for phase in ProjectPhase::ALL {
            by_phase.insert(phase.as_str().to_string(), json!(self.count_where("phase", phase.as_str()).await?));
        }

        let mut by_status = serde_json::Map::new();
        for status in ProjectStatus::ALL {
            by_status.insert(status.as_str().to_string(), json!(self.count_where("status", status.as_str()).await?));
        }

        let mut by_priority = serde_json::Map::new();
        for priority in ProjectPriority::ALL {
            by_priority.insert(priority.as_str().to_string(), json!(self.count_where("priority", priority.as_str()).await?));
        }

        let ready: i64 = sqlx::query("SELECT COUNT(*) FROM projects WHERE ready_to_offer = TRUE")
            .fetch_one(&self.db.pool)
            .await?
            .try_get(0)?;

        Ok(json!({
            "total_projects": total,
            "by_phase": by_phase,
            "by_status": by_status,
            "by_priority": by_priority,
            "ready_to_offer": ready,
            "not_ready_to_offer": total - ready,
        }))
    }

    async fn count_where(&self, column: &str, value: &str) -> Result<i64> {
        // column comes from a fixed internal list, never user input
        let sql = format!("SELECT COUNT(*) FROM projects WHERE {} = $1", column);
        let count: i64 = sqlx::query(&sql)
            .bind(value)
            .fetch_one(&self.db.pool)
            .await?
            .try_get(0)?;
        Ok(count)
    }
}

fn non_empty_trimmed(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!(
            "The project {} cannot be empty",
            field
        )));
    }
    Ok(trimmed.to_string())
}

/// Whitelisted ordering expressions; anything else falls back to name.
fn order_clause(ordering: Option<&str>) -> &'static str {
    match ordering {
        Some("name") => " ORDER BY name ASC",
        Some("-name") => " ORDER BY name DESC",
        Some("created_at") => " ORDER BY created_at ASC",
        Some("-created_at") => " ORDER BY created_at DESC",
        Some("updated_at") => " ORDER BY updated_at ASC",
        Some("-updated_at") => " ORDER BY updated_at DESC",
        _ => " ORDER BY name ASC",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_trimmed() {
        assert_eq!(non_empty_trimmed("  POS N82 ", "name").unwrap(), "POS N82");
        assert!(non_empty_trimmed("   ", "name").is_err());
        assert!(non_empty_trimmed("", "objective").is_err());
    }

    #[test]
    fn test_order_clause_whitelist() {
        assert_eq!(order_clause(Some("-created_at")), " ORDER BY created_at DESC");
        assert_eq!(order_clause(Some("updated_at")), " ORDER BY updated_at ASC");
        // unknown fields cannot reach the SQL string
        assert_eq!(order_clause(Some("name; DROP TABLE projects")), " ORDER BY name ASC");
        assert_eq!(order_clause(None), " ORDER BY name ASC");
    }
}
