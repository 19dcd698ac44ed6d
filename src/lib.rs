pub mod camera;
pub mod cli;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod frame;
pub mod gate;
pub mod inference;
pub mod onnx;
pub mod recommendation;
pub mod schedule;
pub mod session;
pub mod view;
mod worker;

pub use cli::{execute, run_cli, Cli, Commands, ConfigSubcommand};
pub use command::UserCommand;
pub use config::{load_config, save_config, Config};
pub use controller::SessionController;
pub use error::{InferenceError, StyleMateError};
pub use event::Event;
pub use frame::Frame;
pub use session::{InputSource, ModelSlot, RunState, Session};
pub use view::View;
