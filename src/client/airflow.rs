//! HTTP client for the Airflow stable REST API (v1).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::auth::Credentials;
use crate::monitor::{RunHandle, RunStatus, StatusSource};

use super::{build_http_client, ClientError};

/// Marker substituted when the trigger response omits the run id.
pub const RUN_ID_UNAVAILABLE: &str = "N/A";

/// Body of a successful `POST .../dagRuns` response.
#[derive(Debug, Deserialize)]
struct TriggerResponse {
    dag_run_id: Option<String>,
    state: Option<String>,
}

impl TriggerResponse {
    /// Build the run handle, tolerating an absent run id.
    fn into_handle(self, dag_id: &str) -> (RunHandle, String) {
        let run_id = self
            .dag_run_id
            .unwrap_or_else(|| RUN_ID_UNAVAILABLE.to_string());
        let state = self.state.unwrap_or_else(|| "queued".to_string());
        (
            RunHandle {
                dag_id: dag_id.to_string(),
                run_id,
            },
            state,
        )
    }
}

/// Client for triggering and observing DAG runs.
#[derive(Debug, Clone)]
pub struct AirflowClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl AirflowClient {
    /// Create a client for the given Airflow instance.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::BadUrl` if the base URL does not parse.
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        accept_invalid_certs: bool,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::BadUrl(e.to_string()))?;
        Ok(Self {
            client: build_http_client(accept_invalid_certs),
            base_url,
            credentials,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::BadUrl(e.to_string()))
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
            Credentials::Bearer(token) => builder.bearer_auth(token),
        }
    }

    /// Trigger a DAG run with the given configuration payload.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Trigger` on any response other than 200/201;
    /// the caller must abort rather than retry.
    pub async fn trigger_run(&self, dag_id: &str, conf: &Value) -> Result<RunHandle, ClientError> {
        let url = self.endpoint(&format!("/api/v1/dags/{dag_id}/dagRuns"))?;
        let body = serde_json::json!({ "conf": conf });

        tracing::info!(dag = %dag_id, "Triggering DAG");
        tracing::debug!(payload = %body, "Trigger payload");

        let response = self
            .authed(self.client.post(url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Trigger {
                status: status.as_u16(),
                body,
            });
        }

        let data: TriggerResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        let (handle, state) = data.into_handle(dag_id);
        tracing::info!(run_id = %handle.run_id, state = %state, "DAG triggered successfully");
        Ok(handle)
    }

    /// Fetch the current status of one DAG run.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Fetch` on a non-200 response. The monitor loop
    /// treats every error from this call as transient.
    pub async fn run_status(&self, handle: &RunHandle) -> Result<RunStatus, ClientError> {
        let url = self.endpoint(&format!(
            "/api/v1/dags/{}/dagRuns/{}",
            handle.dag_id, handle.run_id
        ))?;

        let response = self
            .authed(self.client.get(url))
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Fetch {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(RunStatus::from_payload(payload))
    }

    /// Fetch the most recent run of a DAG, by execution date.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoRuns` when the DAG has never run, or
    /// `ClientError::Fetch` on a non-200 response.
    pub async fn latest_run(&self, dag_id: &str) -> Result<RunStatus, ClientError> {
        let mut url = self.endpoint(&format!("/api/v1/dags/{dag_id}/dagRuns"))?;
        url.query_pairs_mut()
            .append_pair("limit", "1")
            .append_pair("order_by", "-execution_date");

        let response = self
            .authed(self.client.get(url))
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Fetch {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        latest_from_payload(dag_id, &payload)
    }
}

/// Select the first entry of a `dag_runs` collection payload.
fn latest_from_payload(dag_id: &str, payload: &Value) -> Result<RunStatus, ClientError> {
    payload["dag_runs"]
        .get(0)
        .map(|run| RunStatus::from_payload(run.clone()))
        .ok_or_else(|| ClientError::NoRuns(dag_id.to_string()))
}

#[async_trait]
impl StatusSource for AirflowClient {
    async fn fetch(&self, handle: &RunHandle) -> Result<RunStatus, ClientError> {
        self.run_status(handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_response_carries_run_id() {
        let json = r#"{"dag_run_id": "manual__2024", "state": "queued"}"#;
        let data: TriggerResponse = serde_json::from_str(json).unwrap();
        let (handle, state) = data.into_handle("example_dag");
        assert_eq!(handle.dag_id, "example_dag");
        assert_eq!(handle.run_id, "manual__2024");
        assert_eq!(state, "queued");
    }

    #[test]
    fn trigger_response_without_run_id_uses_sentinel() {
        let json = r#"{"state": "queued"}"#;
        let data: TriggerResponse = serde_json::from_str(json).unwrap();
        let (handle, _) = data.into_handle("example_dag");
        assert_eq!(handle.run_id, RUN_ID_UNAVAILABLE);
    }

    #[test]
    fn latest_run_selects_first_entry() {
        let payload = serde_json::json!({
            "dag_runs": [
                { "dag_run_id": "scheduled__b", "state": "running" },
                { "dag_run_id": "scheduled__a", "state": "success" }
            ],
            "total_entries": 2
        });
        let status = latest_from_payload("example_dag", &payload).unwrap();
        assert_eq!(status.state, "running");
    }

    #[test]
    fn latest_run_with_no_entries_is_an_error() {
        let payload = serde_json::json!({ "dag_runs": [], "total_entries": 0 });
        let result = latest_from_payload("example_dag", &payload);
        assert!(matches!(result, Err(ClientError::NoRuns(_))));
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let credentials = Credentials::Bearer("t".to_string());
        let result = AirflowClient::new("not a url", credentials, false);
        assert!(matches!(result, Err(ClientError::BadUrl(_))));
    }
}
