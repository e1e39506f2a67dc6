//! Shared configuration for the Distiller stream workers.
//!
//! Every worker process reads the same environment surface (optionally via a
//! `.env` file); required variables fail fast at startup with a message
//! naming the missing key.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

/// Process-wide settings, loaded once at startup.
///
/// Serializable because the whole struct is exposed to the job-script
/// templates as `settings`.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    // Record-store REST API
    pub api_url: String,
    pub api_key_name: String,
    pub api_key: String,

    // Message broker
    pub kafka_url: String,

    // Super-Facility API
    pub sfapi_client_id: String,
    pub sfapi_private_key: String,
    pub sfapi_grant_type: String,
    pub sfapi_user: String,

    // Job orchestration
    pub acquisition_user: String,
    pub job_count_script_path: PathBuf,
    pub job_ncemhub_raw_data_path: PathBuf,
    pub job_ncemhub_count_data_path: PathBuf,
    pub job_script_directory: PathBuf,
    pub job_bbcp_number_of_streams: u32,
    pub job_qos: String,
    pub job_qos_filter: String,
    pub job_bbcp_executable_path: PathBuf,
    pub job_machine_overrides_path: Option<PathBuf>,

    // HAADF previews
    pub haadf_image_upload_dir: PathBuf,
    pub haadf_image_upload_dir_expiration_hours: u32,
    pub haadf_ncemhub_dm4_data_path: PathBuf,

    // Data custodian account
    pub custodian_user: String,
    pub custodian_private_key: String,
    pub custodian_valid_hosts: Vec<String>,

    /// Log files per complete scan.
    pub number_of_log_files: i64,
}

impl Settings {
    /// Load settings from the process environment, honoring a `.env` file if
    /// one is present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary lookup. This is the seam the tests
    /// use; `from_env` goes through it too.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key).ok_or_else(|| anyhow!("{key} must be set"))
        };
        let required_path =
            |key: &str| -> Result<PathBuf> { required(key).map(PathBuf::from) };

        Ok(Self {
            api_url: required("API_URL")?,
            api_key_name: required("API_KEY_NAME")?,
            api_key: required("API_KEY")?,

            kafka_url: required("KAFKA_URL")?,

            sfapi_client_id: required("SFAPI_CLIENT_ID")?,
            sfapi_private_key: required("SFAPI_PRIVATE_KEY")?,
            sfapi_grant_type: required("SFAPI_GRANT_TYPE")?,
            sfapi_user: required("SFAPI_USER")?,

            acquisition_user: required("ACQUISITION_USER")?,
            job_count_script_path: required_path("JOB_COUNT_SCRIPT_PATH")?,
            job_ncemhub_raw_data_path: required_path("JOB_NCEMHUB_RAW_DATA_PATH")?,
            job_ncemhub_count_data_path: required_path(
                "JOB_NCEMHUB_COUNT_DATA_PATH",
            )?,
            job_script_directory: required_path("JOB_SCRIPT_DIRECTORY")?,
            job_bbcp_number_of_streams: required("JOB_BBCP_NUMBER_OF_STREAMS")?
                .parse()
                .context("JOB_BBCP_NUMBER_OF_STREAMS must be an integer")?,
            job_qos: required("JOB_QOS")?,
            job_qos_filter: required("JOB_QOS_FILTER")?,
            job_bbcp_executable_path: required_path("JOB_BBCP_EXECUTABLE_PATH")?,
            job_machine_overrides_path: lookup("JOB_MACHINE_OVERRIDES_PATH")
                .map(PathBuf::from),

            haadf_image_upload_dir: required_path("HAADF_IMAGE_UPLOAD_DIR")?,
            haadf_image_upload_dir_expiration_hours: required(
                "HAADF_IMAGE_UPLOAD_DIR_EXPIRATION_HOURS",
            )?
            .parse()
            .context("HAADF_IMAGE_UPLOAD_DIR_EXPIRATION_HOURS must be an integer")?,
            haadf_ncemhub_dm4_data_path: required_path(
                "HAADF_NCEMHUB_DM4_DATA_PATH",
            )?,

            custodian_user: required("CUSTODIAN_USER")?,
            custodian_private_key: required("CUSTODIAN_PRIVATE_KEY")?,
            custodian_valid_hosts: required("CUSTODIAN_VALID_HOSTS")?
                .split(',')
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),

            number_of_log_files: lookup("NUMBER_OF_LOG_FILES")
                .map(|v| v.parse())
                .transpose()
                .context("NUMBER_OF_LOG_FILES must be an integer")?
                .unwrap_or(72),
        })
    }
}
