use clap::Parser;
use proptest::prelude::*;
use serial_test::serial;
use std::path::PathBuf;
use stylemate::cli::CliError;
use stylemate::command::CommandParseError;
use stylemate::config::load_config_from;
use stylemate::{execute, Cli, Commands, Config, ConfigSubcommand, InputSource, ModelSlot, UserCommand};
use tempfile::tempdir;

proptest! {
    #[test]
    fn parse_live_frames(value in 1u64..10_000) {
        let args = ["stylemate", "live", "--frames", &value.to_string()];
        let cli = Cli::parse_from(args);
        match cli.command {
            Commands::Live { model, frames } => {
                prop_assert_eq!(frames, value);
                prop_assert_eq!(model, ModelSlot::FaceShape);
            }
            _ => prop_assert!(false, "unexpected subcommand"),
        }
    }

    #[test]
    fn parse_classify_path(path in "[a-zA-Z0-9][a-zA-Z0-9/_\\.-]*") {
        let args = ["stylemate", "classify", &path, "--model", "personal-tone"];
        let cli = Cli::parse_from(args);
        match cli.command {
            Commands::Classify { path: parsed, model } => {
                prop_assert_eq!(parsed, PathBuf::from(path));
                prop_assert_eq!(model, ModelSlot::PersonalTone);
            }
            _ => prop_assert!(false, "unexpected subcommand"),
        }
    }

    #[test]
    fn parse_guide_label(label in "[A-Za-z][A-Za-z ]{0,12}") {
        let line = format!("guide {label}");
        prop_assert_eq!(line.parse::<UserCommand>(), Ok(UserCommand::Guide(label.trim().to_string())));
    }
}

#[test]
fn parse_global_config_flag() {
    let cli = Cli::parse_from(["stylemate", "config", "show", "--config", "alt.json"]);
    assert_eq!(cli.config, Some(PathBuf::from("alt.json")));
    assert!(matches!(
        cli.command,
        Commands::Config {
            action: ConfigSubcommand::Show
        }
    ));
}

#[test]
fn model_accepts_numeric_alias() {
    let cli = Cli::parse_from(["stylemate", "guide", "Warm", "--model", "2"]);
    match cli.command {
        Commands::Guide { label, model } => {
            assert_eq!(label, "Warm");
            assert_eq!(model, ModelSlot::PersonalTone);
        }
        _ => panic!("unexpected subcommand"),
    }
}

#[test]
fn parse_session_commands() {
    assert_eq!(
        "source upload".parse::<UserCommand>(),
        Ok(UserCommand::SelectSource(InputSource::Upload))
    );
    assert_eq!(
        "webcam".parse::<UserCommand>(),
        Ok(UserCommand::SelectSource(InputSource::Webcam))
    );
    assert_eq!(
        "model Personal-Tone".parse::<UserCommand>(),
        Ok(UserCommand::SelectModel(ModelSlot::PersonalTone))
    );
    assert_eq!(
        "model 1".parse::<UserCommand>(),
        Ok(UserCommand::SelectModel(ModelSlot::FaceShape))
    );
    assert_eq!("  pause ".parse::<UserCommand>(), Ok(UserCommand::Toggle));
    assert_eq!(
        "open photos/me.png".parse::<UserCommand>(),
        Ok(UserCommand::Open(PathBuf::from("photos/me.png")))
    );
    assert_eq!("exit".parse::<UserCommand>(), Ok(UserCommand::Quit));
}

#[test]
fn reject_malformed_session_commands() {
    assert_eq!("".parse::<UserCommand>(), Err(CommandParseError::Empty));
    assert_eq!(
        "dance".parse::<UserCommand>(),
        Err(CommandParseError::Unknown("dance".into()))
    );
    assert_eq!(
        "open".parse::<UserCommand>(),
        Err(CommandParseError::MissingArgument("open"))
    );
    assert_eq!(
        "model 3".parse::<UserCommand>(),
        Err(CommandParseError::InvalidArgument {
            command: "model",
            value: "3".into()
        })
    );
}

#[test]
fn guide_runs_without_models() {
    let dir = tempdir().unwrap();
    let cli = Cli {
        config: Some(dir.path().join("none.json")),
        command: Commands::Guide {
            label: "Heart".into(),
            model: ModelSlot::FaceShape,
        },
    };
    assert!(execute(cli).is_ok());
}

#[test]
fn classify_empty_directory_fails() {
    let dir = tempdir().unwrap();
    let cli = Cli {
        config: Some(dir.path().join("none.json")),
        command: Commands::Classify {
            path: dir.path().to_path_buf(),
            model: ModelSlot::FaceShape,
        },
    };
    assert!(matches!(
        execute(cli),
        Err(CliError::Session(stylemate::StyleMateError::NoFrameAvailable))
    ));
}

#[test]
#[serial]
fn config_init_refuses_to_overwrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stylemate.json");
    std::env::set_var("STYLEMATE_CONFIG_PATH", &path);

    let init = |force| Cli {
        config: None,
        command: Commands::Config {
            action: ConfigSubcommand::Init { force },
        },
    };
    execute(init(false)).unwrap();
    assert_eq!(load_config_from(&path), Config::default());
    assert!(matches!(
        execute(init(false)),
        Err(CliError::ConfigExists(p)) if p == path
    ));
    assert!(execute(init(true)).is_ok());
    std::env::remove_var("STYLEMATE_CONFIG_PATH");
}

#[test]
fn config_init_reports_write_failure() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let path = blocker.join("stylemate.json");
    let cli = Cli {
        config: Some(path.clone()),
        command: Commands::Config {
            action: ConfigSubcommand::Init { force: false },
        },
    };
    assert!(matches!(
        execute(cli),
        Err(CliError::Io { path: p, .. }) if p == path
    ));
    assert!(!path.exists());
}
