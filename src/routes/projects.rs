use crate::{
    error::{AppError, Result},
    models::project::{
        CreateProjectRequest, ProjectPhase, ProjectPriority, ProjectStatus, UpdateProjectRequest,
    },
    services::auth::AuthUser,
    services::project::ProjectListFilter,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/stats", get(get_stats))
        .route("/ready", get(get_ready_to_offer))
        .route(
            "/:id",
            get(get_project).patch(update_project).delete(delete_project),
        )
}

#[derive(Debug, Deserialize)]
pub struct ProjectListQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub phase: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub ready_to_offer: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// List projects with filters, search and ordering; rows carry the
/// truncated objective.
/// GET /api/v1/projects
pub async fn list_projects(
    AuthUser(_user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ProjectListQuery>,
) -> Result<Json<Value>> {
    let filter = ProjectListFilter {
        phase: parse_enum::<ProjectPhase>(query.phase.as_deref())?,
        status: parse_enum::<ProjectStatus>(query.status.as_deref())?,
        priority: parse_enum::<ProjectPriority>(query.priority.as_deref())?,
        ready_to_offer: query.ready_to_offer,
        search: query.search,
        ordering: query.ordering,
    };

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let result = app_state
        .project_service
        .get_projects(page, per_page, filter)
        .await?;

    debug!("Listed {} projects", result.data.len());

    Ok(Json(json!({
        "success": true,
        "data": {
            "projects": result.data.iter().map(|p| p.to_list_item()).collect::<Vec<_>>(),
            "pagination": {
                "current_page": result.page,
                "total_pages": result.total_pages,
                "total_items": result.total,
                "items_per_page": result.per_page,
            }
        }
    })))
}

/// POST /api/v1/projects
pub async fn create_project(
    AuthUser(_user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let project = app_state.project_service.create_project(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": project.to_response(),
        })),
    ))
}

/// Aggregate counts per phase, status and priority.
/// GET /api/v1/projects/stats
pub async fn get_stats(
    AuthUser(_user): AuthUser,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Value>> {
    let stats = app_state.project_service.get_stats().await?;
    Ok(Json(json!({
        "success": true,
        "data": stats,
    })))
}

/// Projects flagged ready to offer.
/// GET /api/v1/projects/ready
pub async fn get_ready_to_offer(
    AuthUser(_user): AuthUser,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Value>> {
    let projects = app_state.project_service.get_ready_to_offer().await?;
    Ok(Json(json!({
        "success": true,
        "data": projects.iter().map(|p| p.to_response()).collect::<Vec<_>>(),
    })))
}

/// GET /api/v1/projects/:id
pub async fn get_project(
    AuthUser(_user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let project = app_state
        .project_service
        .get_by_id(project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project"))?;

    Ok(Json(json!({
        "success": true,
        "data": project.to_response(),
    })))
}

/// PATCH /api/v1/projects/:id
pub async fn update_project(
    AuthUser(_user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<UpdateProjectRequest>,
) -> Result<Json<Value>> {
    let project = app_state
        .project_service
        .update_project(project_id, &request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": project.to_response(),
    })))
}

/// DELETE /api/v1/projects/:id
pub async fn delete_project(
    AuthUser(_user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Value>> {
    app_state.project_service.delete_project(project_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Project deleted",
    })))
}

fn parse_enum<T: FromStr<Err = String>>(raw: Option<&str>) -> Result<Option<T>> {
    raw.map(T::from_str)
        .transpose()
        .map_err(AppError::Validation)
}
