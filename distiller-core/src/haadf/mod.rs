//! The HAADF Image Worker.
//!
//! For each HAADF file event: read the DM4 file, render a false-color PNG
//! preview into a scratch directory, upload it to the record store, and
//! delete the source file best-effort.

pub mod dm4;
pub mod render;

use std::path::PathBuf;
use std::sync::Arc;

use distiller_model::HaadfEvent;
use rdkafka::Message;
use rdkafka::consumer::StreamConsumer;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{CoreError, Result};
use crate::providers::RecordStore;

pub use dm4::{Dm4Image, read_dm4};
pub use render::render_png;

pub struct HaadfWorker {
    store: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for HaadfWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaadfWorker").finish_non_exhaustive()
    }
}

impl HaadfWorker {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn run(
        self,
        consumer: StreamConsumer,
        shutdown: CancellationToken,
    ) -> Result<()> {
        info!("haadf worker started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("haadf worker shutting down");
                    return Ok(());
                }
                received = consumer.recv() => {
                    let message = received?;
                    let Some(payload) = message.payload() else { continue };
                    let event: HaadfEvent = match serde_json::from_slice(payload) {
                        Ok(event) => event,
                        Err(err) => {
                            error!(%err, "undecodable haadf event, dropping");
                            continue;
                        }
                    };
                    if let Err(err) = self.handle_event(&event).await {
                        match err {
                            CoreError::Broker(_) => return Err(err),
                            err => error!(scan_id = event.scan_id, %err, "failed to render haadf preview"),
                        }
                    }
                }
            }
        }
    }

    pub async fn handle_event(&self, event: &HaadfEvent) -> Result<()> {
        let source = PathBuf::from(&event.path);
        let bytes = tokio::fs::read(&source).await?;

        let scratch = tempfile::tempdir()?;
        let png_path = scratch.path().join(format!("{}.png", event.scan_id));

        // Parsing and rendering are CPU-bound; keep them off the worker's
        // event loop.
        let rendered = png_path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let image = read_dm4(&bytes)?;
            render_png(&image, &rendered)
        })
        .await
        .map_err(std::io::Error::other)??;

        let png = tokio::fs::read(&png_path).await?;
        self.store
            .upload_haadf_image(format!("{}.png", event.scan_id), png)
            .await?;
        info!(scan_id = event.scan_id, "haadf preview uploaded");

        // The raw file has served its purpose; losing this race is fine.
        if let Err(err) = tokio::fs::remove_file(&source).await {
            warn!(path = %source.display(), %err, "could not remove source file");
        }
        Ok(())
    }
}
