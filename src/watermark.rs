//! Watermark rendering through ImageMagick
//!
//! The photo is piped through `magick` twice: once to read its width, once
//! to draw the text centred at half opacity.

use crate::runtime::{RenderError, WatermarkRenderer};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MIN_POINT_SIZE: u32 = 12;
const FILL: &str = "rgba(255,255,255,0.5)";

/// Renders watermarks by running an ImageMagick 7 binary
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    timeout: Duration,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the program with `input` on stdin and return its stdout
    async fn run(&self, args: &[&str], input: &[u8]) -> Result<Vec<u8>, RenderError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| RenderError::Spawn(format!("{}: {e}", self.program)))?;

        // Feed stdin concurrently so a chatty child can't fill its stdout pipe and stall
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Spawn("stdin not captured".to_string()))?;
        let input = input.to_vec();
        let writer = tokio::spawn(async move {
            // The child may exit before reading everything
            let _ = stdin.write_all(&input).await;
        });

        let output = tokio::select! {
            () = tokio::time::sleep(self.timeout) => {
                writer.abort();
                return Err(RenderError::Timeout);
            }
            result = child.wait_with_output() => {
                result.map_err(|e| RenderError::Spawn(format!("wait failed: {e}")))?
            }
        };
        let _ = writer.await;

        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(RenderError::EmptyOutput);
        }
        Ok(output.stdout)
    }

    async fn image_width(&self, image: &[u8]) -> Result<u32, RenderError> {
        let out = self.run(&["identify", "-format", "%w", "-"], image).await?;
        let text = String::from_utf8_lossy(&out);
        text.trim().parse().map_err(|_| RenderError::Failed {
            status: 0,
            stderr: format!("unexpected width {:?}", text.trim()),
        })
    }
}

/// Text sized to a fifteenth of the image width
fn point_size(width: u32) -> u32 {
    (width / 15).max(MIN_POINT_SIZE)
}

/// `-annotate` reads `@file` and expands `%` escapes; neither may come from users
fn escape_annotation(text: &str) -> String {
    let escaped = text.replace('%', "%%");
    if escaped.starts_with('@') {
        format!("\\{escaped}")
    } else {
        escaped
    }
}

#[async_trait]
impl WatermarkRenderer for CommandRenderer {
    async fn render(&self, image: &[u8], text: &str) -> Result<Vec<u8>, RenderError> {
        let width = self.image_width(image).await?;
        let size = point_size(width).to_string();
        let annotation = escape_annotation(text);

        tracing::debug!(width, point_size = %size, "Rendering watermark");

        self.run(
            &[
                "-",
                "-gravity",
                "center",
                "-fill",
                FILL,
                "-pointsize",
                size.as_str(),
                "-annotate",
                "+0+0",
                annotation.as_str(),
                "jpg:-",
            ],
            image,
        )
        .await
    }
}
