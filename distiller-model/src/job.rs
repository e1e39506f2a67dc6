use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// The two batch workloads the orchestrator knows how to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum JobType {
    Count,
    Transfer,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobType::Count => write!(f, "count"),
            JobType::Transfer => write!(f, "transfer"),
        }
    }
}

impl FromStr for JobType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(JobType::Count),
            "transfer" => Ok(JobType::Transfer),
            other => Err(ModelError::UnknownJobType(other.to_string())),
        }
    }
}

/// Scalar values allowed in a job's params map.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::String(v) => write!(f, "{v}"),
        }
    }
}

/// A batch job as tracked by the record store.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Job {
    pub id: i64,
    pub job_type: JobType,
    pub machine: String,
    /// The scan this job belongs to, when the store has linked it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub scan_id: Option<i64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub slurm_id: Option<i64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub state: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub elapsed: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub output: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: HashMap<String, ParamValue>,
}

/// Partial payload for `PATCH /jobs/{id}`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobUpdate {
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub slurm_id: Option<i64>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub state: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub elapsed: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub output: Option<String>,
}

impl JobUpdate {
    pub fn slurm_id(slurm_id: i64) -> Self {
        Self {
            slurm_id: Some(slurm_id),
            ..Self::default()
        }
    }
}

/// A job as reported by the Super-Facility API's sacct listing. Transient;
/// extracted from the response and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SfapiJob {
    pub workdir: String,
    pub state: String,
    pub name: String,
    pub slurm_id: i64,
    pub elapsed: String,
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn job_type_round_trips_as_lowercase() {
        assert_eq!(serde_json::to_string(&JobType::Count).unwrap(), "\"count\"");
        let parsed: JobType = serde_json::from_str("\"transfer\"").unwrap();
        assert_eq!(parsed, JobType::Transfer);
    }

    #[test]
    fn job_type_from_str_rejects_unknown() {
        assert!(matches!(
            "archive".parse::<JobType>(),
            Err(ModelError::UnknownJobType(_))
        ));
    }

    #[test]
    fn params_accept_mixed_scalars() {
        let job: Job = serde_json::from_str(
            r#"{
                "id": 7,
                "job_type": "count",
                "machine": "perlmutter",
                "params": {"threshold": 4, "factor": 0.5, "mode": "sparse"}
            }"#,
        )
        .unwrap();
        assert_eq!(job.params["threshold"], ParamValue::Int(4));
        assert_eq!(job.params["factor"], ParamValue::Float(0.5));
        assert_eq!(
            job.params["mode"],
            ParamValue::String("sparse".to_string())
        );
    }
}
