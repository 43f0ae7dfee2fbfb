//! Command surface over the revkv engine.
//!
//! `Command` is the transport-neutral shape of one request; `CommandService`
//! runs it against an `Engine` and renders the short text reply frontends
//! show. `http` serves the same commands over plain HTTP GET.

pub mod http;

use revkv_core::{Engine, EngineError};
use revkv_store::VersionStore;

/// One store operation as requested by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { name: String, value: String },
    Get { name: String },
    Unset { name: String },
    NumEqualTo { value: String },
    Undo,
    Redo,
    End,
}

/// Runs commands against one engine.
#[derive(Debug)]
pub struct CommandService<'a, S> {
    engine: &'a Engine<S>,
}

impl<'a, S: VersionStore> CommandService<'a, S> {
    pub fn new(engine: &'a Engine<S>) -> Self {
        Self { engine }
    }

    /// Execute `command` and render its reply text.
    pub fn execute(&self, command: Command) -> Result<String, EngineError> {
        match command {
            Command::Set { name, value } => {
                self.engine.set(&name, value.as_str())?;
                Ok(format!("{name} = {value}"))
            }
            Command::Get { name } => Ok(render_value(self.engine.get(&name)?.as_deref())),
            Command::Unset { name } => {
                self.engine.unset(&name)?;
                Ok(format!("{name} = None"))
            }
            Command::NumEqualTo { value } => Ok(self.engine.count_equal(&value)?.to_string()),
            Command::Undo => Ok(self.engine.undo()?.to_string()),
            Command::Redo => Ok(self.engine.redo()?.to_string()),
            Command::End => {
                self.engine.clear_all()?;
                Ok("CLEANED".to_string())
            }
        }
    }
}

/// Text form of an optional value; absent renders as `None`.
pub fn render_value(value: Option<&str>) -> String {
    value.unwrap_or("None").to_string()
}
