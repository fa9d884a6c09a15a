use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{Result, L10nError};
use super::{parse_dimensions, MediaCommand, MediaCommandBuilder, MediaProcessor};

/// ffmpeg/ffprobe backed media processor
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path, &config.probe_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    fn commands(&self) -> MediaCommandBuilder {
        self.command_builder.clone()
    }

    fn encode_options(&self) -> Vec<String> {
        self.config.encode_options.clone()
    }

    async fn check_availability(&self) -> Result<()> {
        let version = self
            .command_builder
            .version_check()
            .execute_with_output()
            .await
            .map_err(|e| L10nError::Media(format!("ffmpeg not available at '{}': {}", self.config.binary_path, e)))?;

        let first_line = version.lines().next().unwrap_or("Unknown version");
        info!("Media processor is available: {}", first_line);
        Ok(())
    }

    async fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        let output = self.command_builder.probe_dimensions(path).execute_with_output().await?;
        let dims = parse_dimensions(&output)?;
        debug!("{}: {}x{}", path.display(), dims.0, dims.1);
        Ok(dims)
    }

    async fn execute(&self, command: MediaCommand) -> Result<()> {
        debug!("{}", command.description);
        command.execute().await
    }

    async fn probe_summary(&self, path: &Path) -> Result<String> {
        let output = self.command_builder.probe_format(path).execute_with_output().await?;
        Ok(output.trim().to_string())
    }
}
