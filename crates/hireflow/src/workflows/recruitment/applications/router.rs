use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::catalog::TalentCatalog;
use super::domain::{
    ActorId, ActorRole, ApplicationId, ApplicationPayload, ApplicationStatus, CandidateId,
    Identity, JobId,
};
use super::events::EventEmitter;
use super::repository::{ApplicationRepository, RankedApplication, RepositoryError};
use super::rescore::CheckpointStore;
use super::service::{ApplicationRegistry, ApplicationServiceError};

/// Headers stamped by the authenticating gateway. Requests without them never reach the
/// registry; nothing in the body is trusted for identity.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

pub struct ApplicationRoutes<R, C, E> {
    registry: Arc<ApplicationRegistry<R, C, E>>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl<R, C, E> Clone for ApplicationRoutes<R, C, E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            checkpoints: Arc::clone(&self.checkpoints),
        }
    }
}

/// Router builder exposing the application lifecycle over HTTP.
pub fn application_router<R, C, E>(
    registry: Arc<ApplicationRegistry<R, C, E>>,
    checkpoints: Arc<dyn CheckpointStore>,
) -> Router
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<R, C, E>))
        .route(
            "/api/v1/applications/:application_id",
            get(get_handler::<R, C, E>),
        )
        .route(
            "/api/v1/applications/:application_id/transitions",
            post(transition_handler::<R, C, E>),
        )
        .route(
            "/api/v1/applications/:application_id/score",
            post(refresh_score_handler::<R, C, E>),
        )
        .route(
            "/api/v1/jobs/:job_id/applications",
            get(job_applications_handler::<R, C, E>),
        )
        .route(
            "/api/v1/jobs/:job_id/rescore",
            post(rescore_handler::<R, C, E>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/applications",
            get(candidate_applications_handler::<R, C, E>),
        )
        .route(
            "/api/v1/matching/preview",
            get(preview_handler::<R, C, E>),
        )
        .with_state(ApplicationRoutes {
            registry,
            checkpoints,
        })
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub job_id: JobId,
    /// Defaults to the calling candidate.
    #[serde(default)]
    pub candidate_id: Option<CandidateId>,
    #[serde(default)]
    pub payload: ApplicationPayload,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub target_status: ApplicationStatus,
    pub expected_version: u64,
}

#[derive(Debug, Deserialize)]
pub struct RefreshScoreRequest {
    pub expected_version: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RescoreRequest {
    #[serde(default)]
    pub run_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub job_id: String,
    pub candidate_id: String,
}

pub(crate) fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, Response> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let (Some(actor_id), Some(role)) = (header(ACTOR_ID_HEADER), header(ACTOR_ROLE_HEADER)) else {
        return Err(unauthorized("missing verified identity"));
    };

    let role = role
        .parse::<ActorRole>()
        .map_err(|error| unauthorized(&error.to_string()))?;

    Ok(Identity {
        actor_id: ActorId::new(actor_id),
        role,
    })
}

fn unauthorized(message: &str) -> Response {
    let payload = json!({ "error": message, "kind": "unauthenticated" });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

pub(crate) fn error_response(error: ApplicationServiceError) -> Response {
    let (status, kind) = match &error {
        ApplicationServiceError::DuplicateApplication { .. } => {
            (StatusCode::CONFLICT, "duplicate_application")
        }
        ApplicationServiceError::VersionConflict { .. } => {
            (StatusCode::CONFLICT, "version_conflict")
        }
        ApplicationServiceError::InvalidTransition { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition")
        }
        ApplicationServiceError::JobClosed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "job_closed"),
        ApplicationServiceError::ScoreFrozen { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "score_frozen")
        }
        ApplicationServiceError::PermissionDenied(_) => {
            (StatusCode::FORBIDDEN, "permission_denied")
        }
        ApplicationServiceError::NotFound(_)
        | ApplicationServiceError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        ApplicationServiceError::Repository(_)
        | ApplicationServiceError::Catalog(_)
        | ApplicationServiceError::Checkpoint(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    let mut payload = json!({
        "error": error.to_string(),
        "kind": kind,
    });
    if let ApplicationServiceError::VersionConflict { actual, .. } = &error {
        payload["current_version"] = json!(actual);
    }

    (status, axum::Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(
    status: StatusCode,
    outcome: Result<T, ApplicationServiceError>,
) -> Response {
    match outcome {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, C, E>(
    State(routes): State<ApplicationRoutes<R, C, E>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    let identity = match identity_from_headers(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let candidate_id = request
        .candidate_id
        .unwrap_or_else(|| CandidateId::new(identity.actor_id.as_str()));
    let outcome = routes
        .registry
        .submit(&identity, candidate_id, request.job_id, request.payload);
    respond(StatusCode::CREATED, outcome)
}

pub(crate) async fn get_handler<R, C, E>(
    State(routes): State<ApplicationRoutes<R, C, E>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    let identity = match identity_from_headers(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let outcome = routes
        .registry
        .get(&identity, &ApplicationId(application_id));
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn transition_handler<R, C, E>(
    State(routes): State<ApplicationRoutes<R, C, E>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    let identity = match identity_from_headers(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let outcome = routes.registry.transition(
        &identity,
        &ApplicationId(application_id),
        request.target_status,
        request.expected_version,
    );
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn refresh_score_handler<R, C, E>(
    State(routes): State<ApplicationRoutes<R, C, E>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<RefreshScoreRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    let identity = match identity_from_headers(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let outcome = routes.registry.refresh_score(
        &identity,
        &ApplicationId(application_id),
        request.expected_version,
    );
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn job_applications_handler<R, C, E>(
    State(routes): State<ApplicationRoutes<R, C, E>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    let identity = match identity_from_headers(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let outcome = routes
        .registry
        .list_for_job(&identity, &JobId(job_id))
        .map(|applications| {
            applications
                .iter()
                .map(RankedApplication::from)
                .collect::<Vec<_>>()
        });
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn candidate_applications_handler<R, C, E>(
    State(routes): State<ApplicationRoutes<R, C, E>>,
    headers: HeaderMap,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    let identity = match identity_from_headers(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let outcome = routes
        .registry
        .list_for_candidate(&identity, &CandidateId(candidate_id));
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn rescore_handler<R, C, E>(
    State(routes): State<ApplicationRoutes<R, C, E>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    request: Option<axum::Json<RescoreRequest>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    let identity = match identity_from_headers(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let request = request.map(|axum::Json(body)| body).unwrap_or_default();
    let run_id = request
        .run_id
        .unwrap_or_else(|| format!("{job_id}-{}", Utc::now().timestamp_millis()));
    let outcome = routes.registry.rescore_job(
        &identity,
        &JobId(job_id),
        &run_id,
        routes.checkpoints.as_ref(),
    );
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn preview_handler<R, C, E>(
    State(routes): State<ApplicationRoutes<R, C, E>>,
    headers: HeaderMap,
    Query(query): Query<PreviewQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    let identity = match identity_from_headers(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let outcome = routes.registry.preview_match(
        &identity,
        &JobId(query.job_id),
        &CandidateId(query.candidate_id),
    );
    respond(StatusCode::OK, outcome)
}
