use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use gifmaker::config::{Config, SETTINGS_FILE_NAME};
use gifmaker::encoding::{select_backend, FfmpegMode};
use gifmaker::pipeline::{self, should_pause, Confirm, NoConfirm, StdinConfirm};

#[derive(Debug, Parser)]
#[command(name = "gifmaker", version)]
#[command(about = "Turn a directory of still frames into output.gif using ffmpeg")]
struct Cli {
    /// Directory holding the frames; output.gif is written here.
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Settings file (extension, fps, quiet flag). Defaults to <DIR>/config.txt.
    #[arg(long)]
    config: Option<PathBuf>,

    /// ffmpeg executable used in system mode.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    #[arg(long = "ffmpeg-mode", value_enum, default_value_t = FfmpegMode::Auto)]
    ffmpeg_mode: FfmpegMode,

    /// Exit without waiting for Enter, even in an interactive terminal.
    #[arg(long)]
    no_pause: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.dir.join(SETTINGS_FILE_NAME));
    let config = Config::load(&settings_path);
    init_logging(config.verbose);
    config.log_summary();

    let backend = select_backend(cli.ffmpeg_mode, &cli.ffmpeg)?;
    let confirm: Box<dyn Confirm> =
        if should_pause(config.verbose, cli.no_pause, std::io::stdin().is_terminal()) {
            Box::new(StdinConfirm)
        } else {
            Box::new(NoConfirm)
        };

    let outcome = pipeline::run(&cli.dir, &config, backend.as_ref(), confirm.as_ref())?;
    let code = outcome.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Off
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}
