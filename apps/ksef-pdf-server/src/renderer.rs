//! Renderers available to the server binary.

use std::process::Stdio;
use std::time::Duration;

use bytes::Bytes;
use ksef_pdf_core::KsefPdfConfig;
use ksef_pdf_http::render::{
    NotImplementedRenderer, PdfRenderer, RenderError, RenderFuture, RenderRequest,
};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs an external program per document.
///
/// The program receives the render request as JSON on stdin
/// (`{"kind", "document", "additionalData"}`) and must write the PDF to
/// stdout and exit with status 0.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    timeout_secs: u64,
}

impl CommandRenderer {
    /// Create a renderer for `program`.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            args,
            timeout_secs,
        }
    }
}

impl PdfRenderer for CommandRenderer {
    fn render(&self, request: RenderRequest) -> RenderFuture {
        let this = self.clone();
        Box::pin(async move {
            let payload = serde_json::to_vec(&request)
                .map_err(|e| RenderError::Failed(format!("cannot encode request: {e}")))?;

            match tokio::time::timeout(
                Duration::from_secs(this.timeout_secs),
                this.run(payload),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!(program = %this.program, timeout_secs = this.timeout_secs, "renderer timed out");
                    Err(RenderError::Timeout(this.timeout_secs))
                }
            }
        })
    }
}

impl CommandRenderer {
    async fn run(&self, payload: Vec<u8>) -> Result<Bytes, RenderError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RenderError::Unavailable(format!("cannot start {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Failed("renderer stdin is not available".to_owned()))?;

        let write = async move {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output =
            output.map_err(|e| RenderError::Failed(format!("renderer did not finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            return Err(RenderError::Failed(if stderr.is_empty() {
                format!("renderer exited with {}", output.status)
            } else {
                stderr.to_owned()
            }));
        }
        if let Err(e) = written {
            return Err(RenderError::Failed(format!("cannot write to renderer: {e}")));
        }
        if output.stdout.is_empty() {
            return Err(RenderError::Failed("renderer produced no output".to_owned()));
        }

        debug!(program = %self.program, size = output.stdout.len(), "renderer finished");
        Ok(Bytes::from(output.stdout))
    }
}

/// The renderer selected by configuration.
#[derive(Debug)]
pub enum ConfiguredRenderer {
    /// `RENDERER_COMMAND` is set.
    Command(CommandRenderer),
    /// No renderer configured; generate requests answer 501.
    Disabled(NotImplementedRenderer),
}

impl ConfiguredRenderer {
    /// Select a renderer from configuration.
    #[must_use]
    pub fn from_config(config: &KsefPdfConfig) -> Self {
        match &config.renderer_command {
            Some(program) => Self::Command(CommandRenderer::new(
                program.clone(),
                config.renderer_args.clone(),
                config.renderer_timeout_secs,
            )),
            None => Self::Disabled(NotImplementedRenderer),
        }
    }

    /// Short description for startup logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Command(c) => format!("command:{}", c.program),
            Self::Disabled(_) => "disabled".to_owned(),
        }
    }
}

impl PdfRenderer for ConfiguredRenderer {
    fn render(&self, request: RenderRequest) -> RenderFuture {
        match self {
            Self::Command(r) => r.render(request),
            Self::Disabled(r) => r.render(request),
        }
    }
}
