//! Filter and pagination over job listings.

use serde::Serialize;

use eduadmin_core::DomainResult;

use super::types::{Job, JobStatus, JobType};

/// Filter value meaning "no constraint on this axis".
pub const ALL: &str = "all";

/// Exact-match filter on status and/or type.
///
/// `None` on an axis matches every job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub job_type: Option<JobType>,
}

impl JobFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_type(mut self, job_type: JobType) -> Self {
        self.job_type = Some(job_type);
        self
    }

    /// Build a filter from raw query values; absent, empty and `"all"` are no-ops.
    pub fn parse(status: Option<&str>, job_type: Option<&str>) -> DomainResult<Self> {
        Ok(Self {
            status: parse_axis(status)?,
            job_type: parse_axis(job_type)?,
        })
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.status.map_or(true, |s| job.status == s)
            && self.job_type.map_or(true, |t| job.job_type == t)
    }
}

fn parse_axis<T>(raw: Option<&str>) -> DomainResult<Option<T>>
where
    T: core::str::FromStr<Err = eduadmin_core::DomainError>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case(ALL) => Ok(None),
        Some(v) => v.parse().map(Some),
    }
}

/// Offset/limit window over a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub const DEFAULT_LIMIT: usize = 50;
    pub const MAX_LIMIT: usize = 500;

    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}

/// One page of a filtered listing plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
    pub items: Vec<Job>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Cut a window out of an already ordered listing.
pub fn paginate(jobs: Vec<Job>, page: Page) -> JobPage {
    let total = jobs.len();
    let items = jobs.into_iter().skip(page.offset).take(page.limit).collect();
    JobPage {
        items,
        total,
        offset: page.offset,
        limit: page.limit,
    }
}
