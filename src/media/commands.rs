use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, L10nError};

/// Abstract media processing command representation
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add a lavfi source such as `color=c=white:s=16x16`
    pub fn lavfi_input<S: Into<String>>(self, source: S) -> Self {
        self.arg("-f").arg("lavfi").arg("-i").arg(source)
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Add a filter graph and map its labelled output
    pub fn filter_complex<S: Into<String>>(self, graph: S, output_label: &str) -> Self {
        self.arg("-filter_complex")
            .arg(graph)
            .arg("-map")
            .arg(format!("[{}]", output_label))
    }

    /// Limit the number of video frames written
    pub fn frames(self, count: u32) -> Self {
        self.arg("-frames:v").arg(count.to_string())
    }

    /// Quiet ffmpeg/ffprobe down to errors
    pub fn errors_only(self) -> Self {
        self.arg("-v").arg("error")
    }

    /// Command line as it would be typed, for logs
    pub fn display(&self) -> String {
        std::iter::once(self.binary_path.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        self.run().await.map(|_| ())
    }

    /// Execute the command and return its stdout
    pub async fn execute_with_output(&self) -> Result<String> {
        self.run().await
    }

    async fn run(&self) -> Result<String> {
        debug!("Executing media processing command: {}", self.display());
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| L10nError::Media(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(L10nError::Media(format!("{} failed: {}", self.description, stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Scale followed by a centred crop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverGeometry {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub crop_x: u32,
    pub crop_y: u32,
    pub width: u32,
    pub height: u32,
}

/// Builder for the ffmpeg/ffprobe invocations used by the asset generators
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    binary_path: String,
    probe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, probe_path: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            probe_path: probe_path.into(),
        }
    }

    /// Resize an image to exactly `width`x`height`
    pub fn scale_exact<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q, width: u32, height: u32) -> MediaCommand {
        MediaCommand::new(&self.binary_path, format!("Resize to {}x{}", width, height))
            .overwrite()
            .errors_only()
            .input(input)
            .video_filter(format!("scale={}:{}:flags=lanczos", width, height))
            .frames(1)
            .output(output)
    }

    /// Resize to fill the target, then crop its centre
    pub fn scale_cover_crop<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q, geometry: &CoverGeometry) -> MediaCommand {
        MediaCommand::new(
            &self.binary_path,
            format!("Cover crop to {}x{}", geometry.width, geometry.height),
        )
        .overwrite()
        .errors_only()
        .input(input)
        .video_filter(format!(
            "scale={}:{}:flags=lanczos,crop={}:{}:{}:{}",
            geometry.scaled_width,
            geometry.scaled_height,
            geometry.width,
            geometry.height,
            geometry.crop_x,
            geometry.crop_y
        ))
        .frames(1)
        .output(output)
    }

    /// Composite an image onto an opaque background and drop the alpha channel
    pub fn flatten_alpha<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
        size: (u32, u32),
        background: &str,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Flatten alpha")
            .overwrite()
            .errors_only()
            .input(input)
            .lavfi_input(format!("color=c={}:s={}x{}", background, size.0, size.1))
            .filter_complex("[1:v][0:v]overlay=shortest=1:format=auto,format=rgb24[out]", "out")
            .frames(1)
            .output(output)
    }

    /// Render a still frame: a solid canvas (input 0), extra images (inputs 1..) and a filter graph ending in `[out]`
    pub fn render_frame<P: AsRef<Path>>(
        &self,
        canvas: (u32, u32),
        background: &str,
        images: &[&Path],
        graph: &str,
        output: P,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Render frame")
            .overwrite()
            .errors_only()
            .lavfi_input(format!("color=c={}:s={}x{}", background, canvas.0, canvas.1));
        for image in images {
            cmd = cmd.input(image);
        }
        cmd.filter_complex(graph, "out").frames(1).output(output)
    }

    /// Encode a concat-demuxer list of still frames to H.264
    pub fn encode_slideshow<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        list_file: P,
        output: Q,
        fps: u32,
        additional_options: &[String],
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Slideshow encoding")
            .overwrite()
            .errors_only()
            .args(["-f", "concat", "-safe", "0"])
            .input(list_file)
            .video_filter(format!("fps={}", fps))
            .video_codec("libx264")
            .args(["-preset", "slow", "-crf", "18", "-pix_fmt", "yuv420p", "-movflags", "+faststart"])
            .args(additional_options.iter().cloned())
            .output(output)
    }

    /// `WIDTHxHEIGHT` of the first video stream
    pub fn probe_dimensions<P: AsRef<Path>>(&self, input: P) -> MediaCommand {
        MediaCommand::new(&self.probe_path, "Probe dimensions")
            .errors_only()
            .args(["-select_streams", "v:0", "-show_entries", "stream=width,height", "-of", "csv=s=x:p=0"])
            .output(input)
    }

    /// `duration=...` and `size=...` lines of a container
    pub fn probe_format<P: AsRef<Path>>(&self, input: P) -> MediaCommand {
        MediaCommand::new(&self.probe_path, "Probe format")
            .errors_only()
            .args(["-show_entries", "format=duration,size", "-of", "default=noprint_wrappers=1"])
            .output(input)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

/// Parse ffprobe's `WIDTHxHEIGHT` output
pub fn parse_dimensions(text: &str) -> Result<(u32, u32)> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let parsed = line
        .split_once('x')
        .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)));

    parsed.ok_or_else(|| L10nError::Media(format!("Unexpected ffprobe dimensions output: '{}'", text.trim())))
}

/// Escape a value for use inside a filter option within a filter graph.
///
/// The option level escapes `\ ' :` and the graph level then escapes
/// `\ ' [ ] , ;`.
pub fn escape_filter_value(value: &str) -> String {
    let mut option_level = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}
