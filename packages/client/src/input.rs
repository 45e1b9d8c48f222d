//! Input line parsing and recipient selection.
//!
//! - `/to <user>`: select the current recipient
//! - `@<user> <text>`: send once to `<user>` without changing the current recipient
//! - anything else: send to the current recipient

use hanashi_server::infrastructure::dto::websocket::ClientEnvelope;

/// Parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    SelectRecipient(String),
    SendTo { to: String, message: String },
    SendToCurrent(String),
    Help,
    /// Reason shown to the user
    Invalid(String),
}

pub fn parse_input(line: &str) -> InputCommand {
    let line = line.trim();

    if line == "/help" {
        return InputCommand::Help;
    }

    if let Some(rest) = line.strip_prefix("/to") {
        let user = rest.trim();
        if user.is_empty() || user.contains(char::is_whitespace) || !rest.starts_with(' ') {
            return InputCommand::Invalid("usage: /to <user>".to_string());
        }
        return InputCommand::SelectRecipient(user.to_string());
    }

    if let Some(rest) = line.strip_prefix('@') {
        return match rest.split_once(char::is_whitespace) {
            Some((to, message)) if !to.is_empty() && !message.trim().is_empty() => {
                InputCommand::SendTo {
                    to: to.to_string(),
                    message: message.trim_start().to_string(),
                }
            }
            _ => InputCommand::Invalid("usage: @<user> <message>".to_string()),
        };
    }

    InputCommand::SendToCurrent(line.to_string())
}

/// What the readline loop should do with one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeOutcome {
    Send(ClientEnvelope),
    /// Print locally, nothing is sent
    Notice(String),
}

/// Keeps the current recipient between input lines
#[derive(Debug, Default)]
pub struct Composer {
    recipient: Option<String>,
}

impl Composer {
    pub fn new(recipient: Option<String>) -> Self {
        Self { recipient }
    }

    pub fn prompt(&self) -> String {
        match &self.recipient {
            Some(to) => format!("to {}> ", to),
            None => "> ".to_string(),
        }
    }

    pub fn compose(&mut self, line: &str) -> ComposeOutcome {
        match parse_input(line) {
            InputCommand::SelectRecipient(user) => {
                let notice = format!("Now talking to '{}'", user);
                self.recipient = Some(user);
                ComposeOutcome::Notice(notice)
            }
            InputCommand::SendTo { to, message } => {
                ComposeOutcome::Send(ClientEnvelope { to, message })
            }
            InputCommand::SendToCurrent(message) => match &self.recipient {
                Some(to) => ComposeOutcome::Send(ClientEnvelope {
                    to: to.clone(),
                    message,
                }),
                None => ComposeOutcome::Notice(
                    "No recipient selected. Use /to <user> or @<user> <message>".to_string(),
                ),
            },
            InputCommand::Help => ComposeOutcome::Notice(
                "/to <user>  select recipient\n@<user> <message>  send once\n<message>  send to current recipient"
                    .to_string(),
            ),
            InputCommand::Invalid(reason) => ComposeOutcome::Notice(reason),
        }
    }
}
