//! Machine catalog resolution.
//!
//! The full catalog is fetched from the record store once per process. At
//! each submission an optional override file named after the machine can
//! overlay individual fields, so operators can retarget a machine without a
//! round trip through the store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use distiller_model::Machine;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::providers::RecordStore;

pub struct MachineCatalog {
    store: Arc<dyn RecordStore>,
    overrides_dir: Option<PathBuf>,
    catalog: OnceCell<HashMap<String, Machine>>,
}

impl std::fmt::Debug for MachineCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineCatalog")
            .field("overrides_dir", &self.overrides_dir)
            .field("loaded", &self.catalog.initialized())
            .finish_non_exhaustive()
    }
}

impl MachineCatalog {
    pub fn new(store: Arc<dyn RecordStore>, overrides_dir: Option<PathBuf>) -> Self {
        Self {
            store,
            overrides_dir,
            catalog: OnceCell::new(),
        }
    }

    async fn catalog(&self) -> Result<&HashMap<String, Machine>> {
        self.catalog
            .get_or_try_init(|| async {
                let machines = self.store.get_machines().await?;
                debug!(count = machines.len(), "machine catalog fetched");
                Ok(machines
                    .into_iter()
                    .map(|machine| (machine.name.clone(), machine))
                    .collect())
            })
            .await
    }

    pub async fn names(&self) -> Result<Vec<String>> {
        Ok(self.catalog().await?.keys().cloned().collect())
    }

    /// Look up a machine and apply its override file, if one exists.
    pub async fn resolve(&self, name: &str) -> Result<Machine> {
        let mut machine = self
            .catalog()
            .await?
            .get(name)
            .cloned()
            .ok_or_else(|| {
                CoreError::InvariantViolation(format!("unknown machine: {name}"))
            })?;

        if let Some(dir) = &self.overrides_dir {
            let path = dir.join(name);
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    for (key, value) in parse_override_lines(&content) {
                        machine.apply_override(&key, &value);
                    }
                    info!(machine = name, path = %path.display(), "applied machine overrides");
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }

        Ok(machine)
    }
}

/// Parse `key=value` lines; blank lines and `#` comments are skipped, and
/// values may contain further `=` characters.
pub fn parse_override_lines(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            line.split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
