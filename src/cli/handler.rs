use std::path::PathBuf;

use crate::error::{AppError, Result};

/// Something the session does on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    SaveJoke(String),
    SavePhoto(PathBuf),
    ListJokes { days_ago: Option<i64>, json: bool },
    ListPhotos { json: bool },
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Reset,
    Action(AppAction),
}

pub const USAGE: &str = "\
Usage: joke-tab <command>

Commands:
  save-joke <text...>      Save a joke
  save-photo <image-file>  Capture an image file and save it
  jokes [--days N] [--json]
                           List saved jokes, or those from N days ago
  photos [--json]          List saved photos
  status                   Show the store's version and contents
  reset                    Delete the store
  help                     Show this message";

/// Parses `std::env::args()` (program name first) into a command.
pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some(command) = args.get(1) else {
        return Ok(Command::Help);
    };
    let rest = &args[2..];

    match command.as_str() {
        "help" | "--help" | "-h" => Ok(Command::Help),
        "reset" => no_extra_args(command, rest).map(|_| Command::Reset),
        "status" => no_extra_args(command, rest).map(|_| Command::Action(AppAction::Status)),

        "save-joke" => {
            let text = rest.join(" ");
            if text.trim().is_empty() {
                return Err(usage_error("save-joke needs the joke text"));
            }
            Ok(Command::Action(AppAction::SaveJoke(text)))
        }

        "save-photo" => match rest {
            [path] => Ok(Command::Action(AppAction::SavePhoto(PathBuf::from(path)))),
            _ => Err(usage_error("save-photo needs exactly one image file")),
        },

        "jokes" => {
            let mut days_ago = None;
            let mut json = false;
            let mut iter = rest.iter();
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--json" => json = true,
                    "--days" => {
                        let value = iter
                            .next()
                            .ok_or_else(|| usage_error("--days needs a number"))?;
                        let days = value.parse::<i64>().map_err(|_| {
                            usage_error(&format!("--days expects a whole number, got '{value}'"))
                        })?;
                        days_ago = Some(days);
                    }
                    other => return Err(usage_error(&format!("unknown option '{other}'"))),
                }
            }
            Ok(Command::Action(AppAction::ListJokes { days_ago, json }))
        }

        "photos" => match rest {
            [] => Ok(Command::Action(AppAction::ListPhotos { json: false })),
            [flag] if flag == "--json" => Ok(Command::Action(AppAction::ListPhotos { json: true })),
            _ => Err(usage_error("photos only accepts --json")),
        },

        other => Err(usage_error(&format!("unknown command '{other}'"))),
    }
}

fn no_extra_args(command: &str, rest: &[String]) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(usage_error(&format!("{command} takes no arguments")))
    }
}

fn usage_error(message: &str) -> AppError {
    AppError::Usage(format!("{message}\n\n{USAGE}"))
}
