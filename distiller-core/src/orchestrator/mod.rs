//! The Job Orchestrator.
//!
//! Consumes submit-job events, renders batch scripts, drives the
//! Super-Facility API to get them scheduled, and runs the minute-by-minute
//! reconciler that projects remote scheduler state back into the record
//! store.

pub mod machines;
pub mod reconcile;
pub mod scripts;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use distiller_config::Settings;
use distiller_model::{JobType, JobUpdate, SubmitJobEvent};
use rdkafka::Message;
use rdkafka::consumer::StreamConsumer;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{CoreError, Result};
use crate::providers::{RecordStore, SfApi};

pub use machines::MachineCatalog;
pub use reconcile::JobReconciler;
pub use scripts::{ScriptInputs, render_bbcp_script, render_job_script, write_job_scripts};

const RECONCILE_INTERVAL: Duration = Duration::from_secs(60);

/// Transfers and counts land in a per-day directory named for the scan's
/// creation date in local time.
pub fn date_directory(created: DateTime<Utc>) -> String {
    created
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d")
        .to_string()
}

pub struct JobOrchestrator {
    settings: Arc<Settings>,
    store: Arc<dyn RecordStore>,
    sfapi: Arc<dyn SfApi>,
    machines: Arc<MachineCatalog>,
}

impl std::fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("machines", &self.machines)
            .finish_non_exhaustive()
    }
}

impl JobOrchestrator {
    pub fn new(
        settings: Arc<Settings>,
        store: Arc<dyn RecordStore>,
        sfapi: Arc<dyn SfApi>,
    ) -> Self {
        let machines = Arc::new(MachineCatalog::new(
            store.clone(),
            settings.job_machine_overrides_path.clone(),
        ));
        Self {
            settings,
            store,
            sfapi,
            machines,
        }
    }

    /// Consume submit events and run the reconciler until shutdown. The
    /// reconciler shares the select loop, so a pass can never overlap its
    /// predecessor.
    pub async fn run(
        self,
        consumer: StreamConsumer,
        shutdown: CancellationToken,
    ) -> Result<()> {
        info!("job orchestrator started");
        let mut reconciler = JobReconciler::new(
            self.settings.clone(),
            self.store.clone(),
            self.sfapi.clone(),
            self.machines.clone(),
        );
        let mut ticker = tokio::time::interval_at(
            Instant::now() + RECONCILE_INTERVAL,
            RECONCILE_INTERVAL,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("job orchestrator shutting down");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(err) = reconciler.reconcile().await {
                        warn!(%err, "reconciliation pass failed");
                    }
                }
                received = consumer.recv() => {
                    let message = received?;
                    let Some(payload) = message.payload() else { continue };
                    let event: SubmitJobEvent = match serde_json::from_slice(payload) {
                        Ok(event) => event,
                        Err(err) => {
                            error!(%err, "undecodable submit event, dropping");
                            continue;
                        }
                    };
                    if let Err(err) = self.handle_submit(&event).await {
                        match err {
                            CoreError::Io(_) | CoreError::Broker(_) => return Err(err),
                            err => error!(job_id = event.job.id, %err, "error submitting job"),
                        }
                    }
                }
            }
        }
    }

    /// The submit pipeline: resolve the machine, lay out directories, render
    /// and write the scripts, submit, and record the scheduler id.
    pub async fn handle_submit(&self, event: &SubmitJobEvent) -> Result<()> {
        let machine = self.machines.resolve(&event.job.machine).await?;

        let dest_root = match event.job.job_type {
            JobType::Transfer => &self.settings.job_ncemhub_raw_data_path,
            JobType::Count => &self.settings.job_ncemhub_count_data_path,
        };
        let dest_dir = dest_root.join(date_directory(event.scan.created));
        tokio::fs::create_dir_all(&dest_dir).await?;

        // Transfers write straight into the destination; counts stage
        // through the machine's bbcp directory first.
        let bbcp_dest_dir = match event.job.job_type {
            JobType::Transfer => dest_dir.clone(),
            JobType::Count => {
                PathBuf::from(&machine.bbcp_dest_dir).join(event.job.id.to_string())
            }
        };

        // A machine never fetches from itself.
        let machine_names: HashSet<String> =
            self.machines.names().await?.into_iter().collect();
        let mut scan = event.scan.clone();
        scan.locations
            .retain(|location| !machine_names.contains(&location.host));

        let inputs = ScriptInputs {
            settings: &self.settings,
            scan: &scan,
            job: &event.job,
            machine: &machine,
            dest_dir: &dest_dir,
            bbcp_dest_dir: &bbcp_dest_dir,
        };
        let main_script = render_job_script(&inputs)?;
        let bbcp_script = render_bbcp_script(&inputs)?;
        let script_path = write_job_scripts(
            &self.settings.job_script_directory,
            &event.job,
            &main_script,
            &bbcp_script,
        )
        .await?;

        let slurm_id = self.sfapi.submit_job(&machine.name, &script_path).await?;

        self.store
            .update_job(event.job.id, JobUpdate::slurm_id(slurm_id))
            .await?;
        info!(job_id = event.job.id, slurm_id, "job submitted");
        Ok(())
    }
}
