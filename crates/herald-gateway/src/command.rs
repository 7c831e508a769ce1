//! The chat command surface.

use herald_schedule::{Theme, TimeOfDay};

use crate::GatewayError;

/// A reconfiguration or query command, one per schedule operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddTime(TimeOfDay),
    RemoveTime(TimeOfDay),
    ListTimes,
    AddTheme(Theme),
    RemoveTheme(String),
    ListThemes,
    Pause,
    Resume,
    Status,
}

impl Command {
    /// Parse one command line, e.g. `addtime 08:00` or `status`.
    ///
    /// The verb is case-insensitive; the remainder of the line is the
    /// argument. Malformed input is a usage error for the issuer, never a
    /// fault.
    pub fn parse(line: &str) -> Result<Self, GatewayError> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "addtime" => {
                let arg = non_empty(rest, "addtime")?;
                Ok(Self::AddTime(arg.parse()?))
            }
            "removetime" => {
                let arg = non_empty(rest, "removetime")?;
                Ok(Self::RemoveTime(arg.parse()?))
            }
            "times" => Ok(Self::ListTimes),
            "addtheme" => Ok(Self::AddTheme(Theme::new(rest)?)),
            "removetheme" => {
                let arg = non_empty(rest, "removetheme")?;
                Ok(Self::RemoveTheme(arg.to_string()))
            }
            "themes" => Ok(Self::ListThemes),
            "pause" => Ok(Self::Pause),
            "resume" => Ok(Self::Resume),
            "status" => Ok(Self::Status),
            other => Err(GatewayError::UnknownCommand(other.to_string())),
        }
    }
}

fn non_empty<'a>(rest: &'a str, verb: &'static str) -> Result<&'a str, GatewayError> {
    if rest.is_empty() {
        Err(GatewayError::MissingArgument(verb))
    } else {
        Ok(rest)
    }
}
