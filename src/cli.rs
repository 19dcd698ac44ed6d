use crate::camera::NokhwaWebcam;
use crate::command::{CommandParseError, UserCommand};
use crate::config::{config_path, load_config_from, save_config_to, Config};
use crate::controller::SessionController;
use crate::error::StyleMateError;
use crate::event::Event;
use crate::frame::collect_images;
use crate::onnx::OnnxProvider;
use crate::recommendation::browse;
use crate::schedule::Schedule;
use crate::session::{InputSource, ModelSlot, RunState};
use crate::view::{AdvisoryKind, RecommendationPanel};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const LOAD_TIMEOUT: Duration = Duration::from_secs(120);
const FRAME_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(
    name = "stylemate",
    version,
    about = "Face shape and personal tone style advisor"
)]
pub struct Cli {
    /// Configuration file (defaults to $STYLEMATE_CONFIG_PATH or stylemate.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify an image, or every image in a directory
    Classify {
        path: PathBuf,
        #[arg(short, long, value_enum, default_value = "face-shape")]
        model: ModelSlot,
    },
    /// Run the webcam analysis loop
    Live {
        #[arg(short, long, value_enum, default_value = "face-shape")]
        model: ModelSlot,
        /// Stop after this many rendered results
        #[arg(short, long, default_value_t = 30)]
        frames: u64,
    },
    /// Interactive session driven by commands on stdin
    Session,
    /// Print the guide entry for a label
    Guide {
        label: String,
        #[arg(short, long, value_enum, default_value = "face-shape")]
        model: ModelSlot,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigSubcommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Session(#[from] StyleMateError),
    #[error("{0}")]
    Advisory(String),
    #[error("timed out waiting for the inference worker")]
    Timeout,
    #[error("{0} already exists, pass --force to overwrite")]
    ConfigExists(PathBuf),
    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("STYLEMATE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run_cli() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = execute(cli) {
        error!("{e}");
        std::process::exit(1);
    }
}

pub fn execute(cli: Cli) -> Result<(), CliError> {
    let path = cli.config.unwrap_or_else(config_path);
    let config = load_config_from(&path);
    match cli.command {
        Commands::Classify { path, model } => classify(config, path, model),
        Commands::Live { model, frames } => live(config, model, frames),
        Commands::Session => session(config),
        Commands::Guide { label, model } => {
            let panel = RecommendationPanel::Guide {
                entry: browse(model, &label),
                label,
            };
            println!("{panel}");
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigSubcommand::Init { force } => init_config(path, force),
            ConfigSubcommand::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

fn controller(config: Config) -> SessionController {
    let webcam = NokhwaWebcam::new(config.webcam.index);
    SessionController::new(config, Arc::new(OnnxProvider), Box::new(webcam))
}

/// Fails with the rendered advisory if model loading did not succeed.
fn load_model(ctl: &mut SessionController, model: ModelSlot) -> Result<(), CliError> {
    ctl.select_model_slot(model)?;
    if !ctl.settle(LOAD_TIMEOUT) {
        return Err(CliError::Timeout);
    }
    if ctl.session().active_slot() != Some(model) {
        let message = ctl
            .view()
            .advisory()
            .map(|a| a.message.clone())
            .unwrap_or_else(|| format!("failed to load {model} model"));
        return Err(CliError::Advisory(message));
    }
    Ok(())
}

fn classify(config: Config, path: PathBuf, model: ModelSlot) -> Result<(), CliError> {
    let images = collect_images(&path);
    if images.is_empty() {
        return Err(StyleMateError::NoFrameAvailable.into());
    }
    let mut ctl = controller(config).with_schedule(Schedule::Manual);
    ctl.select_input_source(InputSource::Upload);
    load_model(&mut ctl, model)?;
    for image in images {
        if let Err(e) = ctl.upload_image(&image) {
            error!("{e}");
            continue;
        }
        ctl.process_upload()?;
        if !ctl.settle(FRAME_TIMEOUT) {
            return Err(CliError::Timeout);
        }
        println!("== {}", image.display());
        println!("{}\n", ctl.view());
    }
    Ok(())
}

fn live(config: Config, model: ModelSlot, frames: u64) -> Result<(), CliError> {
    let mut ctl = controller(config);
    ctl.select_input_source(InputSource::Webcam);
    load_model(&mut ctl, model)?;
    ctl.start_or_resume()?;
    let target = ctl.rendered_results() + frames;
    let mut seen = ctl.view().revision();
    while ctl.rendered_results() < target {
        let Some(event) = ctl.next_event(Some(FRAME_TIMEOUT)) else {
            return Err(CliError::Timeout);
        };
        ctl.handle(event);
        if let Some(advisory) = ctl.view().advisory() {
            if matches!(
                advisory.kind,
                AdvisoryKind::InferenceFailure | AdvisoryKind::FrameSourceAcquisitionFailure
            ) {
                return Err(CliError::Advisory(advisory.message.clone()));
            }
        }
        if ctl.view().revision() != seen {
            seen = ctl.view().revision();
            println!("{}\n", ctl.view());
        }
    }
    if ctl.session().run_state() == RunState::Running {
        ctl.start_or_resume()?;
    }
    info!(results = ctl.rendered_results(), "live analysis finished");
    Ok(())
}

const SESSION_HELP: &str = "commands: source <webcam|upload>, model <face-shape|personal-tone>, \
start, open <path>, process, guide <label>, show, quit";

fn session(config: Config) -> Result<(), CliError> {
    let mut ctl = controller(config);
    let events = ctl.events();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match line.parse::<UserCommand>() {
                Ok(command) => {
                    let quit = command == UserCommand::Quit;
                    if events.send(Event::User(command)).is_err() || quit {
                        return;
                    }
                }
                Err(CommandParseError::Empty) => {}
                Err(e) => error!("{e}; {SESSION_HELP}"),
            }
        }
        let _ = events.send(Event::Shutdown);
    });
    println!("{SESSION_HELP}");
    ctl.run(|c| {
        let session = c.session();
        let slot = session
            .active_slot()
            .map(ModelSlot::display_name)
            .unwrap_or("no model");
        println!(
            "[{} | {} | {}]",
            session.input_source(),
            slot,
            session.run_state()
        );
        println!("{}\n", c.view());
    });
    Ok(())
}

fn init_config(path: PathBuf, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::ConfigExists(path));
    }
    save_config_to(&path, &Config::default()).map_err(|source| CliError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "config written");
    Ok(())
}
