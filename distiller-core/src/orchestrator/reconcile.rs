//! Remote job-state reconciliation.
//!
//! Every minute the orchestrator asks each configured machine for the
//! acquisition account's jobs through sacct and projects the results back
//! into the record store. Reconciliation is idempotent: repeated writes of
//! the same terminal state collapse server-side, and a process restart only
//! costs one redundant pass over already-completed jobs.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use distiller_config::Settings;
use distiller_model::{
    JobUpdate, Location, ScanUpdate, SfapiJob, is_running_state, normalize_state,
};
use tracing::{debug, info, warn};

use super::date_directory;
use super::machines::MachineCatalog;
use crate::error::Result;
use crate::providers::{RecordStore, SfApi};

pub struct JobReconciler {
    settings: Arc<Settings>,
    store: Arc<dyn RecordStore>,
    sfapi: Arc<dyn SfApi>,
    machines: Arc<MachineCatalog>,
    /// Jobs already seen in a terminal state; lost on restart, which is fine
    /// because the state writes are idempotent.
    completed_jobs: HashSet<i64>,
}

impl std::fmt::Debug for JobReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobReconciler")
            .field("completed_jobs", &self.completed_jobs.len())
            .finish_non_exhaustive()
    }
}

/// The batch scripts run out of `<script-dir>/<job-id>`, so the job id is
/// the integer basename of the scheduler's workdir.
pub fn extract_job_id(workdir: &str) -> Option<i64> {
    Path::new(workdir)
        .file_name()?
        .to_str()?
        .parse()
        .ok()
}

async fn read_slurm_output(workdir: &str, slurm_id: i64) -> Option<String> {
    let path = Path::new(workdir).join(format!("slurm-{slurm_id}.out"));
    match tokio::fs::read_to_string(&path).await {
        Ok(output) => {
            debug!(path = %path.display(), "captured scheduler output");
            Some(output)
        }
        Err(_) => None,
    }
}

impl JobReconciler {
    pub fn new(
        settings: Arc<Settings>,
        store: Arc<dyn RecordStore>,
        sfapi: Arc<dyn SfApi>,
        machines: Arc<MachineCatalog>,
    ) -> Self {
        Self {
            settings,
            store,
            sfapi,
            machines,
            completed_jobs: HashSet::new(),
        }
    }

    /// One reconciliation pass over every configured machine. Per-machine
    /// failures are logged and do not stop the pass.
    pub async fn reconcile(&mut self) -> Result<()> {
        for machine in self.machines.names().await? {
            if let Err(err) = self.reconcile_machine(&machine).await {
                warn!(machine, %err, "machine reconciliation failed");
            }
        }
        Ok(())
    }

    async fn reconcile_machine(&mut self, machine: &str) -> Result<()> {
        let status = self.sfapi.machine_status(machine).await?;
        if status != "up" {
            info!(machine, status, "machine not up, skipping");
            return Ok(());
        }

        let qos_filter = (!self.settings.job_qos_filter.is_empty())
            .then_some(self.settings.job_qos_filter.as_str());
        let jobs = self
            .sfapi
            .list_jobs(machine, &self.settings.sfapi_user, qos_filter)
            .await?;

        for job in &jobs {
            if let Err(err) = self.reconcile_job(machine, job).await {
                warn!(machine, workdir = %job.workdir, %err, "job reconciliation failed");
            }
        }
        Ok(())
    }

    async fn reconcile_job(&mut self, machine: &str, sfjob: &SfapiJob) -> Result<()> {
        let Some(job_id) = extract_job_id(&sfjob.workdir) else {
            warn!(workdir = %sfjob.workdir, "unable to extract job id from workdir");
            return Ok(());
        };
        if self.completed_jobs.contains(&job_id) {
            return Ok(());
        }

        let state = normalize_state(&sfjob.state).to_string();
        let finished = !is_running_state(&state);
        let output = if finished {
            read_slurm_output(&sfjob.workdir, sfjob.slurm_id).await
        } else {
            None
        };

        let update = JobUpdate {
            slurm_id: None,
            state: Some(state.clone()),
            elapsed: Some(sfjob.elapsed.clone()),
            output,
        };
        let updated = self.store.update_job(job_id, update).await?;
        if finished {
            self.completed_jobs.insert(job_id);
        }
        let Some(_) = updated else {
            // 404: a job in our qos that was not submitted by this pipeline.
            debug!(job_id, "job unknown to the record store");
            return Ok(());
        };

        if state == "COMPLETED" && sfjob.name.contains("transfer") {
            self.record_transfer_location(machine, job_id).await?;
        }
        Ok(())
    }

    /// A finished transfer means the machine now holds the scan's raw data:
    /// append that location to the scan.
    async fn record_transfer_location(&self, machine: &str, job_id: i64) -> Result<()> {
        let job = self.store.get_job(job_id).await?;
        let Some(scan_id) = job.scan_id else {
            warn!(job_id, "transfer job has no scan, skipping location");
            return Ok(());
        };
        let scan = self.store.get_scan(scan_id).await?;

        let path = self
            .settings
            .job_ncemhub_raw_data_path
            .join(date_directory(scan.created));
        self.store
            .update_scan(
                scan.id,
                ScanUpdate::append_location(Location::new(
                    machine,
                    path.to_string_lossy(),
                )),
            )
            .await?;
        info!(job_id, scan_id, machine, "transfer location recorded");
        Ok(())
    }
}
