//! OAuth2-authenticated client for the Super-Facility API.
//!
//! The token is acquired through a client-credentials grant with a
//! private-key-JWT assertion and cached until shortly before expiry. The
//! remote intermittently returns opaque auth failures that only a fresh
//! client resolves, so the retry wrapper tears the whole client down before
//! every retry after the first.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use distiller_config::Settings;
use distiller_model::SfapiJob;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CoreError, Result};

pub const SFAPI_BASE_URL: &str = "https://api.nersc.gov/api/v1.2";
pub const SFAPI_TOKEN_URL: &str = "https://oidc.nersc.gov/c2id/token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const TASK_POLL_INTERVAL: Duration = Duration::from_secs(1);
const RETRY_ATTEMPTS: u32 = 10;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);
const TOKEN_EXPIRY_LEEWAY: Duration = Duration::from_secs(60);
const ASSERTION_LIFETIME: Duration = Duration::from_secs(300);

/// The consumed Super-Facility contract, as the orchestrator sees it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SfApi: Send + Sync {
    /// Submit a batch script by path and poll the returned task until the
    /// scheduler assigns a job id.
    async fn submit_job(&self, machine: &str, script_path: &Path) -> Result<i64>;

    /// `GET /status/{machine}` -> the machine's status string.
    async fn machine_status(&self, machine: &str) -> Result<String>;

    /// `GET /compute/jobs/{machine}` through sacct for the given user,
    /// optionally filtered by qos.
    async fn list_jobs<'a>(
        &self,
        machine: &str,
        user: &str,
        qos_filter: Option<&'a str>,
    ) -> Result<Vec<SfapiJob>>;
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    jti: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct BearerToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl BearerToken {
    fn is_active(&self) -> bool {
        let leeway = chrono::TimeDelta::from_std(TOKEN_EXPIRY_LEEWAY)
            .unwrap_or_default();
        Utc::now() + leeway < self.expires_at
    }
}

/// HTTP client plus cached token; replaced wholesale on reset.
struct OAuthState {
    http: reqwest::Client,
    token: Option<BearerToken>,
}

impl OAuthState {
    fn fresh() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, token: None })
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    status: String,
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskStatus {
    status: String,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    status: String,
    #[serde(default)]
    jobid: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MachineStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    status: String,
    #[serde(default)]
    output: Vec<JobRecord>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobRecord {
    workdir: String,
    state: String,
    jobname: String,
    jobid: String,
    #[serde(default)]
    elapsed: String,
}

/// Production Super-Facility client.
pub struct SfApiClient {
    client_id: String,
    private_key: EncodingKey,
    grant_type: String,
    base_url: String,
    token_url: String,
    state: Mutex<OAuthState>,
}

impl std::fmt::Debug for SfApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SfApiClient")
            .field("client_id", &self.client_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SfApiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_endpoints(settings, SFAPI_BASE_URL, SFAPI_TOKEN_URL)
    }

    pub fn with_endpoints(
        settings: &Settings,
        base_url: &str,
        token_url: &str,
    ) -> Result<Self> {
        let private_key =
            EncodingKey::from_rsa_pem(settings.sfapi_private_key.as_bytes())?;
        Ok(Self {
            client_id: settings.sfapi_client_id.clone(),
            private_key,
            grant_type: settings.sfapi_grant_type.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
            state: Mutex::new(OAuthState::fresh()?),
        })
    }

    /// Drop the HTTP client and cached token; the next call re-authenticates
    /// from the private-key JWT.
    async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = OAuthState::fresh()?;
        Ok(())
    }

    fn sign_assertion(&self) -> Result<String> {
        let now = Utc::now();
        let lifetime =
            chrono::TimeDelta::from_std(ASSERTION_LIFETIME).unwrap_or_default();
        let claims = AssertionClaims {
            iss: &self.client_id,
            sub: &self.client_id,
            aud: &self.token_url,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.private_key,
        )?)
    }

    /// Return a usable access token, refreshing through the token endpoint
    /// when the cached one is missing or about to expire.
    async fn ensure_token(&self) -> Result<(reqwest::Client, String)> {
        let mut state = self.state.lock().await;
        if let Some(token) = &state.token
            && token.is_active()
        {
            return Ok((state.http.clone(), token.access_token.clone()));
        }

        let assertion = self.sign_assertion()?;
        let response = state
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", self.grant_type.as_str()),
                (
                    "client_assertion_type",
                    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer",
                ),
                ("client_assertion", assertion.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let token: TokenResponse = response.json().await?;

        let expires_in = chrono::TimeDelta::seconds(token.expires_in as i64);
        let bearer = BearerToken {
            access_token: token.access_token,
            expires_at: Utc::now() + expires_in,
        };
        debug!(expires_at = %bearer.expires_at, "fetched SFAPI token");
        let access = bearer.access_token.clone();
        state.token = Some(bearer);
        Ok((state.http.clone(), access))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let (http, token) = self.ensure_token().await?;
        let response = http
            .get(format!("{}/{}", self.base_url, path))
            .header("Authorization", token)
            .header("accept", "application/json")
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        let (http, token) = self.ensure_token().await?;
        let response = http
            .post(format!("{}/{}", self.base_url, path))
            .header("Authorization", token)
            .header("accept", "application/json")
            .form(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Run `op` under the submit retry policy: transient failures back off
    /// exponentially (capped), and every retry after the first starts from a
    /// rebuilt OAuth2 client.
    async fn with_retry<T, F>(&self, what: &str, mut op: impl FnMut() -> F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        let mut delay = RETRY_BASE_DELAY;
        for attempt in 1..=RETRY_ATTEMPTS {
            if attempt > 2 {
                self.reset().await?;
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < RETRY_ATTEMPTS => {
                    warn!(
                        what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %err,
                        "SFAPI request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(RETRY_MAX_DELAY);
                }
                Err(err) => return Err(err),
            }
        }
        unreachable!("retry loop always returns")
    }

    async fn poll_task(&self, task_id: &str) -> Result<i64> {
        loop {
            let task: TaskStatus = self
                .with_retry("poll task", async || {
                    self.get_json(&format!("tasks/{task_id}"), &[]).await
                })
                .await?;

            if task.status == "error" {
                return Err(CoreError::SfApi(
                    task.error.unwrap_or_else(|| "task failed".to_string()),
                ));
            }

            debug!(task_id, status = %task.status, "task poll");

            let Some(result) = task.result else {
                tokio::time::sleep(TASK_POLL_INTERVAL).await;
                continue;
            };

            let result: TaskResult = serde_json::from_str(&result)?;
            if result.status == "error" {
                return Err(CoreError::SfApi(
                    result.error.unwrap_or_else(|| "task failed".to_string()),
                ));
            }
            let Some(jobid) = result.jobid else {
                return Err(CoreError::SfApi(format!(
                    "unable to extract slurm job id for task {task_id}"
                )));
            };
            return jobid.parse().map_err(|_| {
                CoreError::SfApi(format!("non-numeric slurm job id: {jobid}"))
            });
        }
    }
}

#[async_trait]
impl SfApi for SfApiClient {
    async fn submit_job(&self, machine: &str, script_path: &Path) -> Result<i64> {
        let script = script_path.to_string_lossy().to_string();
        let path = format!("compute/jobs/{machine}");

        let response: SubmitResponse = self
            .with_retry("submit job", async || {
                self.post_form(&path, &[("job", script.as_str()), ("isPath", "true")])
                    .await
            })
            .await?;

        if response.status != "ok" {
            return Err(CoreError::SfApi(
                response
                    .error
                    .unwrap_or_else(|| "job submission failed".to_string()),
            ));
        }
        let task_id = response
            .task_id
            .ok_or_else(|| CoreError::SfApi("submission returned no task id".to_string()))?;

        self.poll_task(&task_id).await
    }

    async fn machine_status(&self, machine: &str) -> Result<String> {
        let status: MachineStatus = self
            .with_retry("machine status", async || {
                self.get_json(&format!("status/{machine}"), &[]).await
            })
            .await?;
        Ok(status.status)
    }

    async fn list_jobs<'a>(
        &self,
        machine: &str,
        user: &str,
        qos_filter: Option<&'a str>,
    ) -> Result<Vec<SfapiJob>> {
        let path = format!("compute/jobs/{machine}");
        let user_kwarg = format!("user={user}");
        let qos_kwarg = qos_filter.map(|qos| format!("qos={qos}"));

        let mut query: Vec<(&str, &str)> = vec![("kwargs", user_kwarg.as_str())];
        if let Some(qos) = &qos_kwarg {
            query.push(("kwargs", qos.as_str()));
        }
        query.push(("sacct", "true"));

        let response: JobsResponse = self
            .with_retry("list jobs", async || {
                self.get_json(&path, &query).await
            })
            .await?;

        if response.status != "ok" {
            return Err(CoreError::SfApi(
                response
                    .error
                    .unwrap_or_else(|| "job listing failed".to_string()),
            ));
        }

        let mut jobs = Vec::with_capacity(response.output.len());
        for record in response.output {
            let Ok(slurm_id) = record.jobid.parse::<i64>() else {
                warn!(jobid = %record.jobid, "skipping job with non-numeric id");
                continue;
            };
            jobs.push(SfapiJob {
                workdir: record.workdir,
                state: record.state,
                name: record.jobname,
                slurm_id,
                elapsed: record.elapsed,
            });
        }
        Ok(jobs)
    }
}
