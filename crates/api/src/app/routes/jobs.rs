use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use eduadmin_core::JobId;
use eduadmin_infra::jobs::{Job, JobFilter, OperatorError, Page};

use crate::app::dto::{self, BulkOutcomeDto, BulkRetryResponse};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_jobs))
        .route("/stats", get(job_stats))
        .route("/bulk-retry", post(bulk_retry))
        .route("/retry-failed", post(retry_failed))
        .route("/:id", get(get_job))
        .route("/:id/retry", post(retry_job))
        .route("/:id/cancel", post(cancel_job))
        .route("/:id/requeue", post(requeue_job))
}

pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<dto::ListJobsQuery>,
) -> axum::response::Response {
    let filter = match JobFilter::parse(q.status.as_deref(), q.job_type.as_deref()) {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let page = Page::new(q.offset.unwrap_or(0), q.limit.unwrap_or(Page::DEFAULT_LIMIT));

    match services.list(&filter, page) {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn job_stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.stats() {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let job_id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get(&job_id) {
        Ok(job) => Json(job).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn retry_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    command(&id, |job_id| services.retry(job_id))
}

pub async fn cancel_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    command(&id, |job_id| services.cancel(job_id))
}

pub async fn requeue_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    command(&id, |job_id| services.requeue(job_id))
}

pub async fn bulk_retry(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::BulkRetryRequest>,
) -> axum::response::Response {
    // Malformed ids are reported per entry like any other failure.
    let mut outcomes: Vec<Option<BulkOutcomeDto>> = Vec::with_capacity(body.job_ids.len());
    let mut valid: Vec<JobId> = Vec::new();
    for raw in &body.job_ids {
        match raw.parse::<JobId>() {
            Ok(id) => {
                valid.push(id);
                outcomes.push(None);
            }
            Err(e) => outcomes.push(Some(BulkOutcomeDto::invalid_id(raw.clone(), e.to_string()))),
        }
    }

    let mut retried = services.bulk_retry(&valid).into_iter();
    let outcomes: Vec<BulkOutcomeDto> = outcomes
        .into_iter()
        .filter_map(|slot| slot.or_else(|| retried.next().map(BulkOutcomeDto::from)))
        .collect();

    Json(BulkRetryResponse::new(outcomes)).into_response()
}

pub async fn retry_failed(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.retry_all_failed() {
        Ok(outcomes) => Json(BulkRetryResponse::from_outcomes(outcomes)).into_response(),
        Err(e) => errors::operator_error_to_response(e),
    }
}

fn parse_id(raw: &str) -> Result<JobId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"))
}

fn command<F>(raw: &str, f: F) -> axum::response::Response
where
    F: FnOnce(&JobId) -> Result<Job, OperatorError>,
{
    let job_id = match parse_id(raw) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match f(&job_id) {
        Ok(job) => Json(job).into_response(),
        Err(e) => errors::operator_error_to_response(e),
    }
}
