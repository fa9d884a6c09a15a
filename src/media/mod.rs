// Media processing through external tools
//
// - commands: ffmpeg/ffprobe command lines for images and video
// - processor: executes them and parses probe output

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Command builder bound to the configured binaries
    fn commands(&self) -> MediaCommandBuilder;

    /// Extra options appended to video encodes
    fn encode_options(&self) -> Vec<String>;

    /// Check if ffmpeg can be run
    async fn check_availability(&self) -> Result<()>;

    /// Width and height of an image or the first video stream
    async fn dimensions(&self, path: &Path) -> Result<(u32, u32)>;

    /// Execute a media processing command
    async fn execute(&self, command: MediaCommand) -> Result<()>;

    /// Duration and size of a media file as reported by ffprobe
    async fn probe_summary(&self, path: &Path) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessor> {
        Box::new(processor::FfmpegProcessor::new(config))
    }
}
