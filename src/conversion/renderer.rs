use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to start renderer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("renderer exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },
    #[error("renderer did not produce {0}")]
    MissingOutput(PathBuf),
    #[error("failed to create renderer profile: {0}")]
    Profile(#[source] std::io::Error),
    #[error("failed to wait for renderer: {0}")]
    Wait(#[source] std::io::Error),
    #[error("timeout")]
    Timeout,
}

/// An external engine that turns an office document into a PDF.
pub trait Renderer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Renders `input` into `output_dir`, returning the path of the produced
    /// PDF. The PDF's file stem must match the stem of `input`.
    fn render<'a>(
        &'a self,
        input: &'a Path,
        output_dir: &'a Path,
    ) -> BoxFuture<'a, Result<PathBuf, RenderError>>;
}

/// Headless LibreOffice (`soffice --convert-to pdf`).
#[derive(Debug, Clone)]
pub struct LibreOfficeRenderer {
    program: PathBuf,
    profile_root: PathBuf,
}

impl LibreOfficeRenderer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            profile_root: std::env::temp_dir(),
        }
    }

    /// Directory under which per-conversion user profiles are created.
    #[cfg(test)]
    fn with_profile_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.profile_root = root.into();
        self
    }

    async fn run(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, RenderError> {
        // Each run gets its own profile: soffice refuses to share one between
        // concurrent processes. Removed when this future finishes or is dropped.
        let profile = tempfile::Builder::new()
            .prefix("pdfdesk-lo-")
            .tempdir_in(&self.profile_root)
            .map_err(RenderError::Profile)?;
        let profile_url = format!("file://{}", profile.path().to_string_lossy());

        let mut command = Command::new(&self.program);
        command
            .arg(format!("-env:UserInstallation={profile_url}"))
            .args(["--headless", "--norestore", "--convert-to", "pdf", "--outdir"])
            .arg(output_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // soffice forks the real worker; a group lets us stop both.
        #[cfg(unix)]
        command.process_group(0);

        debug!(program = %self.program.display(), input = %input.display(), "starting soffice");
        let child = command.spawn().map_err(|source| RenderError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        let group = ProcessGroupGuard::new(child.id());
        let output = child.wait_with_output().await.map_err(RenderError::Wait)?;
        group.disarm();

        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stem = input
            .file_stem()
            .ok_or_else(|| RenderError::MissingOutput(output_dir.to_path_buf()))?;
        let pdf_path = output_dir.join(format!("{}.pdf", stem.to_string_lossy()));

        if !tokio::fs::try_exists(&pdf_path).await.unwrap_or(false) {
            return Err(RenderError::MissingOutput(pdf_path));
        }

        Ok(pdf_path)
    }
}

/// Kills the renderer's process group if the run is abandoned before the
/// launcher exits.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        if let Ok(pgid) = i32::try_from(pgid) {
            // SAFETY: killpg only signals; the group was created for this run's child.
            if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
                debug!(pgid, error = %std::io::Error::last_os_error(), "renderer group already gone");
            } else {
                debug!(pgid, "killed abandoned renderer");
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

impl Renderer for LibreOfficeRenderer {
    fn name(&self) -> &str {
        "libreoffice"
    }

    fn render<'a>(
        &'a self,
        input: &'a Path,
        output_dir: &'a Path,
    ) -> BoxFuture<'a, Result<PathBuf, RenderError>> {
        Box::pin(self.run(input, output_dir))
    }
}
