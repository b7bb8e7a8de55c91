use std::io::{BufRead, Write};

use anyhow::{bail, Context};
use bkdraw::native::EventLoop;
use bkdraw::terminal::TerminalPage;
use bkdraw::{Action, Dispatcher, PointerEvent};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Click(PointerEvent),
    Action(String),
    Symbol(String),
    /// Fill the symbol field without sending anything.
    Type(String),
    /// Send the symbol field's current value.
    SetFromEntry,
    Template(String),
    Mode(String),
    Quit,
}

pub const HELP: &str = "commands: click X Y | action NAME | undo | redo | expand | symbol S | \
                        type TEXT | set | template T | mode M | quit";

/// `Ok(None)` for blank lines and `#` comments.
pub fn parse_line(line: &str) -> anyhow::Result<Option<SessionCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let argument = |what: &str| -> anyhow::Result<String> {
        if rest.is_empty() {
            bail!("`{word}` needs {what}");
        }
        Ok(rest.to_string())
    };

    let command = match word {
        "click" => {
            let mut coords = rest.split_whitespace();
            let (Some(x), Some(y), None) = (coords.next(), coords.next(), coords.next()) else {
                bail!("`click` needs X and Y");
            };
            let x = x.parse::<i32>().with_context(|| format!("bad x coordinate {x:?}"))?;
            let y = y.parse::<i32>().with_context(|| format!("bad y coordinate {y:?}"))?;
            SessionCommand::Click(PointerEvent::new(x, y))
        }
        "action" => SessionCommand::Action(argument("an action name")?),
        "undo" | "redo" => SessionCommand::Action(word.to_string()),
        "expand" => SessionCommand::Action(Action::expand_all().name().to_string()),
        "symbol" => SessionCommand::Symbol(argument("a symbol")?),
        "type" => SessionCommand::Type(rest.to_string()),
        "set" => SessionCommand::SetFromEntry,
        "template" => SessionCommand::Template(argument("a template name")?),
        "mode" => SessionCommand::Mode(argument("a mode name")?),
        "quit" | "exit" => SessionCommand::Quit,
        other => bail!("unknown command `{other}`; {HELP}"),
    };
    Ok(Some(command))
}

/// Dispatch one command and wait for its response. Returns false when the
/// request could not be sent or completed with an error.
pub async fn apply<W: Write>(
    dispatcher: &Dispatcher<TerminalPage<W>>,
    events: &mut EventLoop,
    command: SessionCommand,
) -> anyhow::Result<bool> {
    let sent = match command {
        SessionCommand::Click(event) => dispatcher.click(event),
        SessionCommand::Action(name) => dispatcher.send_action(&name),
        SessionCommand::Symbol(symbol) => dispatcher.set_symbol(&symbol),
        SessionCommand::Type(text) => {
            let field = dispatcher.settings().symbol_field.clone();
            dispatcher.page().borrow_mut().type_into(&field, &text);
            return Ok(true);
        }
        SessionCommand::SetFromEntry => dispatcher.set_symbol_from_entry()?,
        SessionCommand::Template(temp) => dispatcher.set_template(&temp),
        SessionCommand::Mode(mode) => dispatcher.set_mode(&mode),
        SessionCommand::Quit => return Ok(true),
    };
    events.run_until_idle().await;
    match dispatcher.take_last_error() {
        Some(err) => {
            eprintln!("error: {err}");
            Ok(false)
        }
        None => Ok(sent),
    }
}

/// Run commands from `input` until EOF or `quit`. Bad lines are reported
/// and skipped; the result is false if any command failed.
pub async fn run<W: Write, R: BufRead>(
    dispatcher: &Dispatcher<TerminalPage<W>>,
    events: &mut EventLoop,
    input: R,
) -> anyhow::Result<bool> {
    let mut all_ok = true;
    for line in input.lines() {
        let line = line.context("reading session input")?;
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                warn!(line = %line, "skipping unparsable command");
                eprintln!("error: {err}");
                all_ok = false;
                continue;
            }
        };
        if command == SessionCommand::Quit {
            break;
        }
        match apply(dispatcher, events, command).await {
            Ok(ok) => all_ok &= ok,
            Err(err) => {
                eprintln!("error: {err}");
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}
