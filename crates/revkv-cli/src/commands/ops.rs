use crate::config::Config;
use crate::support::{open_engine, or_exit, print_json};
use revkv_core::{Engine, EngineError};
use revkv_http::{Command, CommandService};
use revkv_store::VersionStore;
use serde_json::{Value, json};
use std::path::PathBuf;

/// Run one command against the JSONL store and print its reply.
pub fn run(config: &Config, store: Option<PathBuf>, command: Command, json_output: bool) {
    let (engine, _) = open_engine(store, config);
    if json_output {
        print_json(&or_exit(json_reply(&engine, command)));
    } else {
        println!("{}", or_exit(CommandService::new(&engine).execute(command)));
    }
}

fn json_reply<S: VersionStore>(engine: &Engine<S>, command: Command) -> Result<Value, EngineError> {
    let reply = match command {
        Command::Set { name, value } => {
            let version = engine.set(&name, value.as_str())?;
            json!({ "name": name, "value": value, "version": version })
        }
        Command::Get { name } => {
            let value = engine.get(&name)?;
            json!({ "name": name, "value": value })
        }
        Command::Unset { name } => {
            let version = engine.unset(&name)?;
            json!({ "name": name, "value": Value::Null, "version": version })
        }
        Command::NumEqualTo { value } => {
            let count = engine.count_equal(&value)?;
            json!({ "value": value, "count": count })
        }
        Command::Undo => json!(engine.undo()?),
        Command::Redo => json!(engine.redo()?),
        Command::End => json!({ "removed": engine.clear_all()? }),
    };
    Ok(reply)
}
