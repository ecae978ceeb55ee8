use std::fs;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::discovery::discover;
use crate::encoding::{
    run_step, FfmpegBackend, FfmpegStep, OUTPUT_FILE_NAME, PALETTE_FILE_NAME, TILE_FILE_NAME,
};
use crate::rename::{RenamePlan, RenameReport};

/// Blocks before the process exits so a double-clicked console window stays readable.
pub trait Confirm {
    fn wait(&self);
}

pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn wait(&self) {
        log::info!("Press Enter to exit");
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
    }
}

pub struct NoConfirm;

impl Confirm for NoConfirm {
    fn wait(&self) {}
}

/// Waiting only makes sense when progress is printed and someone can press Enter.
pub fn should_pause(verbose: bool, no_pause: bool, stdin_is_terminal: bool) -> bool {
    verbose && !no_pause && stdin_is_terminal
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Skipped,
    Succeeded,
    Failed,
}

impl StepStatus {
    fn from_result(result: &Result<()>) -> Self {
        match result {
            Ok(()) => Self::Succeeded,
            Err(error) => {
                log::error!("{error:#}");
                Self::Failed
            }
        }
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub frames: usize,
    pub tile: StepStatus,
    pub palette: StepStatus,
    pub render: StepStatus,
    pub restore: RenameReport,
}

impl RunOutcome {
    fn nothing_to_do() -> Self {
        Self {
            frames: 0,
            tile: StepStatus::Skipped,
            palette: StepStatus::Skipped,
            render: StepStatus::Skipped,
            restore: RenameReport::default(),
        }
    }

    /// True when there was nothing to convert or every ffmpeg step succeeded.
    /// Restore problems are reported separately and do not count.
    pub fn succeeded(&self) -> bool {
        self.frames == 0 || self.render == StepStatus::Succeeded
    }

    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }
}

/// Converts the frames in `dir` into `output.gif`.
///
/// Errors are returned only when nothing has been renamed yet (the rename plan was refused
/// or rolled back). Once files carry sequential names they are always restored before this
/// returns, and ffmpeg failures are reported through [`RunOutcome`].
///
/// `confirm` is consulted once before returning, except after a tile failure, which exits
/// straight away.
pub fn run(
    dir: &Path,
    config: &Config,
    backend: &dyn FfmpegBackend,
    confirm: &dyn Confirm,
) -> Result<RunOutcome> {
    let outcome = convert(dir, config, backend);
    let tile_failed = matches!(&outcome, Ok(done) if done.tile == StepStatus::Failed);
    if !tile_failed {
        confirm.wait();
    }
    outcome
}

fn convert(dir: &Path, config: &Config, backend: &dyn FfmpegBackend) -> Result<RunOutcome> {
    let discovery = discover(dir, &config.extension);
    if discovery.is_empty() {
        log::info!("no files with type '{}' found. Exiting", config.extension);
        return Ok(RunOutcome::nothing_to_do());
    }

    let plan = RenamePlan::build(&discovery.accepted, &config.extension, &discovery.listed)
        .context("refusing to rename frames")?;
    plan.apply(dir).context("failed to rename frames")?;

    let mut outcome = RunOutcome {
        frames: plan.len(),
        ..RunOutcome::nothing_to_do()
    };

    outcome.tile = StepStatus::from_result(&run_step(backend, dir, FfmpegStep::Tile, config));
    if outcome.tile == StepStatus::Succeeded {
        outcome.palette =
            StepStatus::from_result(&run_step(backend, dir, FfmpegStep::Palette, config));
    }
    if outcome.palette == StepStatus::Succeeded {
        outcome.render =
            StepStatus::from_result(&run_step(backend, dir, FfmpegStep::Render, config));
        if outcome.render == StepStatus::Succeeded {
            log::info!("{OUTPUT_FILE_NAME} generated");
        }
    }

    outcome.restore = plan.restore(dir);

    if outcome.tile == StepStatus::Succeeded {
        delete_temp_file(dir, TILE_FILE_NAME);
    }
    if outcome.palette == StepStatus::Succeeded {
        delete_temp_file(dir, PALETTE_FILE_NAME);
    }

    Ok(outcome)
}

fn delete_temp_file(dir: &Path, name: &str) {
    match fs::remove_file(dir.join(name)) {
        Ok(()) => log::info!("tmp file {name} deleted successfully"),
        Err(error) => log::warn!(
            "failed to delete temp file {name} ({error}). File can be deleted manually"
        ),
    }
}
