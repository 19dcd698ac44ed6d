use crate::session::{InputSource, ModelSlot};
use clap::ValueEnum;
use std::path::PathBuf;
use std::str::FromStr;

/// A user interaction, as typed into an interactive session.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    SelectSource(InputSource),
    SelectModel(ModelSlot),
    /// Start, pause or resume.
    Toggle,
    Open(PathBuf),
    Process,
    Guide(String),
    Show,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid argument `{value}` for `{command}`")]
    InvalidArgument {
        command: &'static str,
        value: String,
    },
}

fn value<T: ValueEnum>(command: &'static str, arg: Option<&str>) -> Result<T, CommandParseError> {
    let arg = arg.ok_or(CommandParseError::MissingArgument(command))?;
    <T as ValueEnum>::from_str(arg, true).map_err(|_| CommandParseError::InvalidArgument {
        command,
        value: arg.to_string(),
    })
}

impl FromStr for UserCommand {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (line, None),
        };
        match head {
            "" => Err(CommandParseError::Empty),
            "source" => value("source", rest).map(UserCommand::SelectSource),
            "webcam" => Ok(UserCommand::SelectSource(InputSource::Webcam)),
            "upload" => Ok(UserCommand::SelectSource(InputSource::Upload)),
            "model" => value("model", rest).map(UserCommand::SelectModel),
            "start" | "pause" | "resume" => Ok(UserCommand::Toggle),
            "open" => rest
                .map(|p| UserCommand::Open(PathBuf::from(p)))
                .ok_or(CommandParseError::MissingArgument("open")),
            "process" => Ok(UserCommand::Process),
            "guide" => rest
                .map(|l| UserCommand::Guide(l.to_string()))
                .ok_or(CommandParseError::MissingArgument("guide")),
            "show" => Ok(UserCommand::Show),
            "quit" | "exit" => Ok(UserCommand::Quit),
            other => Err(CommandParseError::Unknown(other.to_string())),
        }
    }
}
