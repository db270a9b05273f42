//! Line-oriented terminal frontend.
//!
//! Each input line is either a chat message or a slash command:
//!
//! ```text
//! /clear           empty the conversation log
//! /connect <url>   switch to another relay
//! /name <name>     change the display name
//! /quit            leave
//! ```
//!
//! Output is append-only: status changes and new messages are printed as
//! they appear, never redrawn.

use std::io::{self, Write};

use relaychat_client::{Command, Frontend, RuntimeError, View};
use relaychat_core::{ConnectionStatus, Direction, Message, MessageKind};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Rejected input line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Slash command that does not exist.
    #[error("unknown command /{0} (try /clear, /connect, /name, /quit)")]
    UnknownCommand(String),

    /// Slash command used without its argument.
    #[error("/{command} needs {argument}")]
    MissingArgument {
        /// Command name.
        command: &'static str,
        /// What is missing.
        argument: &'static str,
    },
}

/// Parse one input line. `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<Command>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(line.to_owned())));
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "clear" => Command::Clear,
        "quit" | "exit" => Command::Quit,
        "connect" if argument.is_empty() => {
            return Err(InputError::MissingArgument { command: "connect", argument: "a url" });
        },
        "connect" => Command::ChangeEndpoint(argument.to_owned()),
        "name" if argument.is_empty() => {
            return Err(InputError::MissingArgument { command: "name", argument: "a name" });
        },
        "name" => Command::SetDisplayName(argument.to_owned()),
        other => return Err(InputError::UnknownCommand(other.to_owned())),
    };

    Ok(Some(command))
}

/// Terminal frontend over any line reader and writer.
pub struct TerminalFrontend<R, W> {
    input: Lines<R>,
    output: W,
    last_status: Option<ConnectionStatus>,
    last_url: String,
    printed: usize,
}

impl TerminalFrontend<BufReader<Stdin>, io::Stdout> {
    /// Frontend reading stdin and writing stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), io::stdout())
    }
}

impl<R, W> TerminalFrontend<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    /// Create a frontend over `input` and `output`.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: input.lines(),
            output,
            last_status: None,
            last_url: String::new(),
            printed: 0,
        }
    }

    /// Writer the frontend prints to.
    pub fn output(&self) -> &W {
        &self.output
    }

    fn write_view(&mut self, view: &View<'_>) -> io::Result<()> {
        if self.last_status != Some(view.status) || self.last_url != view.endpoint.url {
            writeln!(
                self.output,
                "-- {}: {} as {} --",
                view.status, view.endpoint.url, view.endpoint.display_name
            )?;
            self.last_status = Some(view.status);
            self.last_url.clone_from(&view.endpoint.url);
        }

        if view.messages.len() < self.printed {
            writeln!(self.output, "-- log cleared --")?;
            self.printed = 0;
        }

        for message in &view.messages[self.printed..] {
            writeln!(self.output, "{}", format_message(message))?;
        }
        self.printed = view.messages.len();

        self.output.flush()
    }
}

impl<R, W> Frontend for TerminalFrontend<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    type Error = RuntimeError;

    async fn next_command(&mut self) -> Result<Option<Command>, RuntimeError> {
        loop {
            let Some(line) = self.input.next_line().await? else {
                return Ok(None);
            };

            match parse_line(&line) {
                Ok(Some(command)) => return Ok(Some(command)),
                Ok(None) => {},
                Err(e) => {
                    writeln!(self.output, "!! {e}")?;
                    self.output.flush()?;
                },
            }
        }
    }

    fn render(&mut self, view: &View<'_>) -> Result<(), RuntimeError> {
        Ok(self.write_view(view)?)
    }
}

fn format_message(message: &Message) -> String {
    let author = message.author.as_deref().unwrap_or_default();
    match (message.kind, message.direction) {
        (MessageKind::System, _) => format!("* {}", message.text),
        (MessageKind::Chat, Direction::Outbound) => format!("> {author}: {}", message.text),
        (MessageKind::Chat, _) => format!("< {author}: {}", message.text),
    }
}
