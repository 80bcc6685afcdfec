//! Terminal presentation of a [`LookupState`].

use std::fmt;

use colored::Colorize;

use crate::lookup::{LookupState, Phase};

/// Shown under every available name.
pub const DISCLAIMER: &str =
    "Note: Availability does not guarantee you can register this name. PyPI may have additional restrictions.";

/// How loudly a [`Panel::Message`] is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The input needs fixing.
    Warning,
    /// The lookup failed.
    Error,
}

/// What to show for one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Panel {
    /// A request is in flight.
    Busy {
        /// Canonical name being looked up.
        name: String,
    },
    /// The name is free.
    Available {
        /// Canonical name.
        name: String,
    },
    /// The name is registered.
    Taken {
        /// Canonical name.
        name: String,
        /// Link to the existing project.
        url: String,
    },
    /// Validation or lookup message.
    Message {
        /// Text to show.
        text: String,
        /// Warning for invalid input, error for failed lookups.
        severity: Severity,
    },
}

/// Choose the panel for `state`; idle and pending show nothing.
#[must_use]
pub fn render(state: &LookupState) -> Option<Panel> {
    match state.phase() {
        Phase::Idle | Phase::Pending => None,
        Phase::Loading { name } => Some(Panel::Busy { name: name.clone() }),
        Phase::Available { name } => Some(Panel::Available { name: name.clone() }),
        Phase::Taken { name, project_url } => Some(Panel::Taken {
            name: name.clone(),
            url: project_url.clone(),
        }),
        Phase::Invalid { message } => Some(Panel::Message {
            text: message.clone(),
            severity: Severity::Warning,
        }),
        Phase::Error { message } => Some(Panel::Message {
            text: message.clone(),
            severity: Severity::Error,
        }),
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy { name } => write!(f, "{}", format!("checking \"{name}\"...").dimmed()),
            Self::Available { name } => {
                writeln!(f, "{}", format!("\"{name}\" is available!").green().bold())?;
                write!(f, "{}", DISCLAIMER.dimmed())
            }
            Self::Taken { name, url } => {
                writeln!(f, "{}", format!("\"{name}\" is taken").red().bold())?;
                write!(f, "View on PyPI: {}", url.as_str().underline())
            }
            Self::Message { text, severity } => match severity {
                Severity::Warning => write!(f, "{}", text.as_str().yellow().bold()),
                Severity::Error => write!(f, "{}", text.as_str().red().bold()),
            },
        }
    }
}
