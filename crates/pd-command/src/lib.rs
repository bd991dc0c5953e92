//! pd-command: `/pagerduty` slash commands
//!
//! Parses the command line typed in chat (or in the terminal front end),
//! calls PagerDuty through [`pd_core::PagerDutyApi`] and renders markdown
//! replies.

pub mod error;
pub mod handler;
pub mod render;
pub mod types;

pub use error::{CommandError, Result};
pub use handler::{CommandHandler, SUBCOMMANDS, TRIGGER};
pub use types::{AutocompleteData, CommandArgs, CommandResponse, ResponseType};
