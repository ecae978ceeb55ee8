use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};

use crate::config::Config;

pub const TILE_FILE_NAME: &str = "tile.png";
pub const PALETTE_FILE_NAME: &str = "palette.png";
pub const OUTPUT_FILE_NAME: &str = "output.gif";

const TILE_FILTER: &str = "format=rgb24,tile=10x10:color=black";
const PALETTE_FILTER: &str = "palettegen=max_colors=64:reserve_transparent=1:stats_mode=single";
const RENDER_FILTER: &str = "split[s0][s1]; [s0]palettegen= max_colors=256: stats_mode=single: reserve_transparent=on: transparency_color=ffffff[p]; [s1][p]paletteuse=new=1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfmpegStep {
    Tile,
    Palette,
    Render,
}

impl FfmpegStep {
    pub fn label(self) -> &'static str {
        match self {
            Self::Tile => "tile",
            Self::Palette => "palette",
            Self::Render => "render",
        }
    }

    /// The file this step writes into the working directory.
    pub fn output_file(self) -> &'static str {
        match self {
            Self::Tile => TILE_FILE_NAME,
            Self::Palette => PALETTE_FILE_NAME,
            Self::Render => OUTPUT_FILE_NAME,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FfmpegMode {
    Auto,
    System,
    Sidecar,
}

/// Runs one ffmpeg invocation inside the working directory.
pub trait FfmpegBackend {
    fn mode_label(&self) -> &'static str;
    /// The executable this backend spawns.
    fn program(&self) -> PathBuf;
    fn run(&self, working_dir: &Path, args: &[String]) -> Result<()>;
}

pub struct SystemFfmpeg {
    ffmpeg_path: PathBuf,
}

impl SystemFfmpeg {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl FfmpegBackend for SystemFfmpeg {
    fn mode_label(&self) -> &'static str {
        "system"
    }

    fn program(&self) -> PathBuf {
        self.ffmpeg_path.clone()
    }

    fn run(&self, working_dir: &Path, args: &[String]) -> Result<()> {
        run_ffmpeg_process(&self.ffmpeg_path, working_dir, args, self.mode_label())
    }
}

#[cfg(feature = "sidecar_ffmpeg")]
pub struct SidecarFfmpeg;

#[cfg(feature = "sidecar_ffmpeg")]
impl FfmpegBackend for SidecarFfmpeg {
    fn mode_label(&self) -> &'static str {
        "sidecar"
    }

    fn program(&self) -> PathBuf {
        ffmpeg_sidecar::paths::ffmpeg_path()
    }

    fn run(&self, working_dir: &Path, args: &[String]) -> Result<()> {
        let path = self.program();
        if !path.exists() {
            ffmpeg_sidecar::download::auto_download()
                .context("failed to auto-download ffmpeg sidecar binary")?;
        }
        run_ffmpeg_process(&path, working_dir, args, self.mode_label())
    }
}

pub fn select_backend(mode: FfmpegMode, ffmpeg_path: &Path) -> Result<Box<dyn FfmpegBackend>> {
    match mode {
        FfmpegMode::Auto | FfmpegMode::System => Ok(Box::new(SystemFfmpeg::new(ffmpeg_path))),
        FfmpegMode::Sidecar => {
            #[cfg(feature = "sidecar_ffmpeg")]
            {
                Ok(Box::new(SidecarFfmpeg))
            }
            #[cfg(not(feature = "sidecar_ffmpeg"))]
            {
                Err(anyhow!(
                    "ffmpeg sidecar mode requested but gifmaker was built without `sidecar_ffmpeg`. Rebuild with `--features sidecar_ffmpeg`."
                ))
            }
        }
    }
}

/// Logs the command line, runs `step` and logs ffmpeg's output when it fails.
pub fn run_step(
    backend: &dyn FfmpegBackend,
    working_dir: &Path,
    step: FfmpegStep,
    config: &Config,
) -> Result<()> {
    let args = ffmpeg_args(step, config);
    log::info!("{}", command_line(backend, &args));
    backend
        .run(working_dir, &args)
        .with_context(|| format!("ffmpeg {} step failed", step.label()))
}

pub fn command_line(backend: &dyn FfmpegBackend, args: &[String]) -> String {
    format!("{} {}", backend.program().display(), args.join(" "))
}

pub fn ffmpeg_args(step: FfmpegStep, config: &Config) -> Vec<String> {
    let mut args = vec!["-y".to_owned(), "-hide_banner".to_owned()];
    match step {
        FfmpegStep::Tile => args.extend([
            "-i".to_owned(),
            config.input_pattern(),
            "-vf".to_owned(),
            TILE_FILTER.to_owned(),
            "-frames:v".to_owned(),
            "1".to_owned(),
        ]),
        FfmpegStep::Palette => args.extend([
            "-i".to_owned(),
            TILE_FILE_NAME.to_owned(),
            "-vf".to_owned(),
            PALETTE_FILTER.to_owned(),
        ]),
        FfmpegStep::Render => args.extend([
            "-framerate".to_owned(),
            config.fps.clone(),
            "-i".to_owned(),
            config.input_pattern(),
            "-i".to_owned(),
            PALETTE_FILE_NAME.to_owned(),
            "-filter_complex".to_owned(),
            RENDER_FILTER.to_owned(),
        ]),
    }
    args.push(step.output_file().to_owned());
    args
}

fn run_ffmpeg_process(
    ffmpeg_path: &Path,
    working_dir: &Path,
    args: &[String],
    mode_label: &str,
) -> Result<()> {
    let output = Command::new(ffmpeg_path)
        .args(args)
        .current_dir(working_dir)
        .output()
        .map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                anyhow!(
                    "ffmpeg executable not found (mode={mode_label}, resolved_path={}). Install ffmpeg or pass --ffmpeg <path>.",
                    ffmpeg_path.display()
                )
            } else {
                anyhow!(
                    "failed to spawn ffmpeg process (mode={mode_label}, resolved_path={}, args='{}'): {error}",
                    ffmpeg_path.display(),
                    args.join(" ")
                )
            }
        })?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        log::error!("{}", combined.trim());
        bail!(
            "ffmpeg failed with status {} (mode={mode_label}, resolved_path={})",
            output.status,
            ffmpeg_path.display()
        );
    }

    Ok(())
}
