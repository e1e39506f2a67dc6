//! Batch-script rendering.
//!
//! Scripts are rendered from templates compiled into the binary, so equal
//! inputs always produce byte-identical output. Each submission gets its own
//! directory under the configured script root holding the main script and
//! the bbcp staging helper.

use std::path::{Path, PathBuf};

use distiller_config::Settings;
use distiller_model::{Job, JobType, Machine, Scan};
use once_cell::sync::Lazy;
use tera::Tera;
use tracing::warn;

use crate::error::Result;

static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("count.sh", include_str!("../../templates/count.sh.tera")),
        ("transfer.sh", include_str!("../../templates/transfer.sh.tera")),
        ("bbcp.sh", include_str!("../../templates/bbcp.sh.tera")),
    ])
    .expect("built-in templates parse");
    tera
});

/// Everything the templates can see.
#[derive(Debug)]
pub struct ScriptInputs<'a> {
    pub settings: &'a Settings,
    pub scan: &'a Scan,
    pub job: &'a Job,
    pub machine: &'a Machine,
    pub dest_dir: &'a Path,
    pub bbcp_dest_dir: &'a Path,
}

fn context(inputs: &ScriptInputs<'_>) -> tera::Context {
    let mut ctx = tera::Context::new();
    ctx.insert("settings", inputs.settings);
    ctx.insert("scan", inputs.scan);
    ctx.insert("job", inputs.job);
    ctx.insert("machine", inputs.machine);
    ctx.insert("dest_dir", inputs.dest_dir);
    ctx.insert("bbcp_dest_dir", inputs.bbcp_dest_dir);
    // Job params are exposed as top-level template values.
    for (key, value) in &inputs.job.params {
        ctx.insert(key, value);
    }
    ctx
}

pub fn render_job_script(inputs: &ScriptInputs<'_>) -> Result<String> {
    let template = match inputs.job.job_type {
        JobType::Count => "count.sh",
        JobType::Transfer => "transfer.sh",
    };
    Ok(TEMPLATES.render(template, &context(inputs))?)
}

pub fn render_bbcp_script(inputs: &ScriptInputs<'_>) -> Result<String> {
    Ok(TEMPLATES.render("bbcp.sh", &context(inputs))?)
}

/// Write the main script and the bbcp helper under
/// `<script_dir>/<job-id>/`, both mode 0o740. Returns the main script path.
pub async fn write_job_scripts(
    script_dir: &Path,
    job: &Job,
    main_script: &str,
    bbcp_script: &str,
) -> Result<PathBuf> {
    let job_dir = script_dir.join(job.id.to_string());
    if job_dir.exists() {
        warn!(job_id = job.id, dir = %job_dir.display(), "job script directory already exists");
    }
    tokio::fs::create_dir_all(&job_dir).await?;

    let main_path = job_dir.join(format!("{}-{}.sh", job.job_type, job.id));
    let bbcp_path = job_dir.join("bbcp.sh");
    tokio::fs::write(&main_path, main_script).await?;
    tokio::fs::write(&bbcp_path, bbcp_script).await?;

    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&main_path, Permissions::from_mode(0o740))
            .await?;
        tokio::fs::set_permissions(&bbcp_path, Permissions::from_mode(0o740))
            .await?;
    }

    Ok(main_path)
}
