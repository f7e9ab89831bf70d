use std::sync::Arc;

use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{json, Value};

use eduadmin_api::app::{self, services::AppServices};
use eduadmin_core::JobId;
use eduadmin_infra::jobs::{InMemoryJobStore, Job, JobStore, JobType, TransitionPolicy};

struct TestServer {
    base_url: String,
    store: Arc<InMemoryJobStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(policy: TransitionPolicy, jobs: Vec<Job>) -> Self {
        let store = InMemoryJobStore::arc();
        for job in jobs {
            store.enqueue(job).unwrap();
        }

        // Same router as prod, no simulator, ephemeral port.
        let app = app::build_app(Arc::new(AppServices::new(store.clone(), policy)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Ten jobs, four of them pending: 1, 4, 7, 10.
fn mixed_jobs() -> Vec<Job> {
    (1..=10u64)
        .map(|n| {
            let job_type = JobType::ALL[(n as usize) % JobType::ALL.len()];
            let mut job = Job::new(JobId::sequential(n), job_type, json!({"n": n}));
            match n % 3 {
                1 => {}
                2 => {
                    job.mark_running(Utc::now());
                    job.mark_failed(Utc::now(), "disk full");
                }
                _ => {
                    job.mark_running(Utc::now());
                    job.mark_completed(Utc::now(), json!({"ok": true}));
                }
            }
            job
        })
        .collect()
}

fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["jobId"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::spawn(TransitionPolicy::Permissive, vec![]).await;
    let res = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn list_filters_pending_in_store_order() {
    let server = TestServer::spawn(TransitionPolicy::Permissive, mixed_jobs()).await;

    let body: Value = reqwest::get(server.url("/jobs?status=pending&type=all"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["total"], 4);
    assert_eq!(
        ids(&body["items"]),
        vec!["JOB-000001", "JOB-000004", "JOB-000007", "JOB-000010"]
    );
}

#[tokio::test]
async fn list_paginates_and_rejects_unknown_filters() {
    let server = TestServer::spawn(TransitionPolicy::Permissive, mixed_jobs()).await;

    let body: Value = reqwest::get(server.url("/jobs?offset=8&limit=5"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 10);
    assert_eq!(ids(&body["items"]), vec!["JOB-000009", "JOB-000010"]);

    let res = reqwest::get(server.url("/jobs?status=stuck")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "validation_error");
}

#[tokio::test]
async fn get_returns_job_or_not_found() {
    let server = TestServer::spawn(TransitionPolicy::Permissive, mixed_jobs()).await;

    let res = reqwest::get(server.url("/jobs/JOB-000002")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let job: Value = res.json().await.unwrap();
    assert_eq!(job["status"], "failed");
    assert_eq!(job["error"], "disk full");

    let res = reqwest::get(server.url("/jobs/JOB-999999")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn retry_resets_exhausted_export() {
    let mut job = Job::new(JobId::sequential(7), JobType::Export, json!({"format": "csv"})).with_max_attempts(3);
    job.attempts = 3;
    job.mark_failed(Utc::now(), "disk full");
    let server = TestServer::spawn(TransitionPolicy::Permissive, vec![job]).await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/jobs/JOB-000007/retry"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let job: Value = res.json().await.unwrap();
    assert_eq!(job["status"], "pending");
    assert_eq!(job["attempts"], 0);
    assert!(job.get("error").is_none());

    let stored = server.store.get(&JobId::sequential(7)).unwrap();
    assert_eq!(stored.attempts, 0);
}

#[tokio::test]
async fn cancel_and_requeue_round_trip() {
    let server = TestServer::spawn(TransitionPolicy::Permissive, mixed_jobs()).await;
    let client = reqwest::Client::new();

    let job: Value = client
        .post(server.url("/jobs/JOB-000001/cancel"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(job["status"], "failed");
    assert_eq!(job["error"], "Cancelled by user");

    let before = server.store.get(&JobId::sequential(1)).unwrap().enqueued_at;
    let job: Value = client
        .post(server.url("/jobs/JOB-000001/requeue"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(job["status"], "pending");
    assert!(server.store.get(&JobId::sequential(1)).unwrap().enqueued_at >= before);

    let res = client
        .post(server.url("/jobs/JOB-000404/cancel"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_retry_reports_per_id_outcomes() {
    let server = TestServer::spawn(TransitionPolicy::Permissive, mixed_jobs()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/jobs/bulk-retry"))
        .json(&json!({ "jobIds": ["JOB-000002", "JOB-000404", " ", "JOB-000005"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();

    assert_eq!(body["summary"]["requested"], 4);
    assert_eq!(body["summary"]["succeeded"], 2);
    assert_eq!(body["summary"]["failed"], 2);

    let outcomes = body["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[0]["ok"], true);
    assert_eq!(outcomes[0]["job"]["status"], "pending");
    assert_eq!(outcomes[1]["jobId"], "JOB-000404");
    assert_eq!(outcomes[1]["error"], "not_found");
    assert_eq!(outcomes[2]["error"], "invalid_id");
    assert_eq!(outcomes[3]["jobId"], "JOB-000005");
    assert_eq!(outcomes[3]["ok"], true);
}

#[tokio::test]
async fn retry_failed_empties_failed_listing() {
    let server = TestServer::spawn(TransitionPolicy::Permissive, mixed_jobs()).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(server.url("/jobs/retry-failed"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["summary"]["succeeded"], 3);

    let listing: Value = reqwest::get(server.url("/jobs?status=failed"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["total"], 0);

    let stats: Value = reqwest::get(server.url("/jobs/stats"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["failed"], 0);
    assert_eq!(stats["pending"], 7);
}

#[tokio::test]
async fn strict_policy_answers_conflict() {
    let server = TestServer::spawn(TransitionPolicy::Strict, mixed_jobs()).await;
    let client = reqwest::Client::new();

    // JOB-000003 is completed.
    let res = client
        .post(server.url("/jobs/JOB-000003/cancel"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "transition_rejected");

    let res = client
        .post(server.url("/jobs/JOB-000003/retry"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
