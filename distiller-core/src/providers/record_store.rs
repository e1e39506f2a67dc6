//! REST client for the record store. Every request carries the configured
//! API-key header; responses deserialize into the shared model types.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use distiller_config::Settings;
use distiller_model::{Job, JobUpdate, Machine, Scan, ScanCreate, ScanUpdate};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};

use crate::error::{CoreError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The consumed record-store contract. The workers only see this trait;
/// tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// `GET /scans?scan_id=&created=`. More than one match is an invariant
    /// violation at the store, surfaced to the caller as the full list.
    async fn get_scans(
        &self,
        scan_id: i64,
        created: DateTime<Utc>,
    ) -> Result<Vec<Scan>>;

    /// `POST /scans`.
    async fn create_scan(&self, create: ScanCreate) -> Result<Scan>;

    /// `PATCH /scans/{id}`. The server applies its monotonic and
    /// changed-or-null guards; the returned scan reflects the stored row.
    async fn update_scan(&self, id: i64, update: ScanUpdate) -> Result<Scan>;

    /// `GET /scans/{id}`.
    async fn get_scan(&self, id: i64) -> Result<Scan>;

    /// `GET /jobs/{id}`.
    async fn get_job(&self, id: i64) -> Result<Job>;

    /// `PATCH /jobs/{id}`. Returns `None` on 404: jobs submitted outside
    /// this pipeline show up in sacct listings and are not ours to track.
    async fn update_job(&self, id: i64, update: JobUpdate) -> Result<Option<Job>>;

    /// `GET /machines`.
    async fn get_machines(&self) -> Result<Vec<Machine>>;

    /// `POST /files/haadf` multipart upload of a rendered preview image.
    async fn upload_haadf_image(&self, filename: String, png: Vec<u8>)
    -> Result<()>;
}

/// Production client over reqwest.
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: reqwest::Client,
    base_url: String,
    api_key_name: String,
    api_key: String,
}

impl HttpRecordStore {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key_name: settings.api_key_name.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(&self.api_key_name, &self.api_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(CoreError::RecordStore { status, message })
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn get_scans(
        &self,
        scan_id: i64,
        created: DateTime<Utc>,
    ) -> Result<Vec<Scan>> {
        let response = self
            .request(reqwest::Method::GET, "scans")
            .query(&[
                ("scan_id", scan_id.to_string()),
                (
                    "created",
                    created.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                ),
            ])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create_scan(&self, create: ScanCreate) -> Result<Scan> {
        let response = self
            .request(reqwest::Method::POST, "scans")
            .json(&create)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_scan(&self, id: i64, update: ScanUpdate) -> Result<Scan> {
        let response = self
            .request(reqwest::Method::PATCH, &format!("scans/{id}"))
            .json(&update)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_scan(&self, id: i64) -> Result<Scan> {
        let response = self
            .request(reqwest::Method::GET, &format!("scans/{id}"))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_job(&self, id: i64) -> Result<Job> {
        let response = self
            .request(reqwest::Method::GET, &format!("jobs/{id}"))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_job(&self, id: i64, update: JobUpdate) -> Result<Option<Job>> {
        let response = self
            .request(reqwest::Method::PATCH, &format!("jobs/{id}"))
            .json(&update)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check(response).await?.json().await?))
    }

    async fn get_machines(&self) -> Result<Vec<Machine>> {
        let response = self
            .request(reqwest::Method::GET, "machines")
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn upload_haadf_image(
        &self,
        filename: String,
        png: Vec<u8>,
    ) -> Result<()> {
        let part = Part::bytes(png)
            .file_name(filename)
            .mime_str("image/png")?;
        let form = Form::new().part("file", part);
        let response = self
            .request(reqwest::Method::POST, "files/haadf")
            .multipart(form)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
