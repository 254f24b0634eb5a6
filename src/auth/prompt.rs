//! Interactive credential prompt on the controlling terminal.
//!
//! Input is read key by key (console puts the terminal in raw mode for
//! each key), so Ctrl-C while prompting arrives as input instead of a
//! signal and resolves the device to `Skipped`.

use super::{CredentialPrompt, PromptReply};
use crate::types::Credentials;
use async_trait::async_trait;
use console::{style, Key, Term};
use std::io;
use std::net::Ipv4Addr;
use tracing::warn;

const CTRL_C: char = '\u{3}';

/// Prompt writing to stderr and reading from the terminal.
#[derive(Debug, Clone)]
pub struct TerminalPrompt {
    term: Term,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    /// Whether an operator can answer at all.
    pub fn is_attended(&self) -> bool {
        self.term.is_term()
    }

    fn ask(&self, address: Ipv4Addr) -> io::Result<PromptReply> {
        self.term.write_str(&format!(
            "{} No credentials worked for {}. Enter credentials? [y/N] ",
            style("?").cyan().bold(),
            style(address).bold()
        ))?;
        let Some(answer) = self.read_field(true)? else {
            return Ok(PromptReply::Cancelled);
        };
        if !accepts(&answer) {
            return Ok(PromptReply::Decline);
        }

        self.term.write_str("  Username: ")?;
        let Some(username) = self.read_field(true)? else {
            return Ok(PromptReply::Cancelled);
        };

        self.term.write_str("  Password: ")?;
        let Some(password) = self.read_field(false)? else {
            return Ok(PromptReply::Cancelled);
        };

        Ok(PromptReply::Submit(Credentials::new(username.trim(), password)))
    }

    /// Read one line; `None` if the operator hit Ctrl-C or Escape.
    fn read_field(&self, echo: bool) -> io::Result<Option<String>> {
        let mut value = String::new();

        loop {
            match self.term.read_key() {
                Ok(Key::Enter) => {
                    self.term.write_line("")?;
                    return Ok(Some(value));
                }
                Ok(Key::Backspace) => {
                    if value.pop().is_some() && echo {
                        self.term.clear_chars(1)?;
                    }
                }
                Ok(Key::Escape) | Ok(Key::Char(CTRL_C)) => {
                    self.term.write_line("")?;
                    return Ok(None);
                }
                Ok(Key::Char(c)) if !c.is_control() => {
                    value.push(c);
                    if echo {
                        self.term.write_str(c.encode_utf8(&mut [0; 4]))?;
                    }
                }
                // Input closed; looping would spin forever.
                Ok(Key::Unknown) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "terminal input closed",
                    ))
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    self.term.write_line("")?;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialPrompt for TerminalPrompt {
    async fn prompt(&self, address: Ipv4Addr) -> PromptReply {
        if !self.is_attended() {
            return PromptReply::Decline;
        }

        let prompt = self.clone();
        match tokio::task::spawn_blocking(move || prompt.ask(address)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(address = %address, error = %e, "Credential prompt failed");
                PromptReply::Decline
            }
            Err(e) => {
                warn!(address = %address, error = %e, "Credential prompt aborted");
                PromptReply::Cancelled
            }
        }
    }
}

fn accepts(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
