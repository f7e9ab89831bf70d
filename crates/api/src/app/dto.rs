use serde::{Deserialize, Serialize};

use eduadmin_infra::jobs::{BulkOutcome, BulkSummary, Job};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// `GET /jobs` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRetryRequest {
    pub job_ids: Vec<String>,
}

// -------------------------
// Response DTOs
// -------------------------

/// One entry of a bulk response; exactly one of `job` / `error` is set.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcomeDto {
    pub job_id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BulkOutcomeDto {
    pub fn invalid_id(raw: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            job_id: raw.into(),
            ok: false,
            job: None,
            error: Some("invalid_id".to_string()),
            message: Some(message.into()),
        }
    }
}

impl From<BulkOutcome> for BulkOutcomeDto {
    fn from(outcome: BulkOutcome) -> Self {
        let job_id = outcome.job_id.to_string();
        match outcome.result {
            Ok(job) => Self {
                job_id,
                ok: true,
                job: Some(job),
                error: None,
                message: None,
            },
            Err(e) => Self {
                job_id,
                ok: false,
                job: None,
                error: Some(errors::operator_error_code(&e).1.to_string()),
                message: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkSummaryDto {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkRetryResponse {
    pub summary: BulkSummaryDto,
    pub outcomes: Vec<BulkOutcomeDto>,
}

impl BulkRetryResponse {
    pub fn new(outcomes: Vec<BulkOutcomeDto>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.ok).count();
        Self {
            summary: BulkSummaryDto {
                requested: outcomes.len(),
                succeeded,
                failed: outcomes.len() - succeeded,
            },
            outcomes,
        }
    }

    pub fn from_outcomes(outcomes: Vec<BulkOutcome>) -> Self {
        let summary = BulkSummary::of(&outcomes);
        Self {
            summary: BulkSummaryDto {
                requested: summary.requested,
                succeeded: summary.succeeded,
                failed: summary.failed,
            },
            outcomes: outcomes.into_iter().map(BulkOutcomeDto::from).collect(),
        }
    }
}
