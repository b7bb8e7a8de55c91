use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use reqwest::Url;

use bkdraw::logging::LogFormat;

#[derive(Parser)]
#[command(
    name = "bkdraw",
    version,
    about = "Send drawing actions to a running drawing server",
    long_about = "Send drawing actions to a running drawing server.\n\n\
                  Each action is a GET to the server root; the reloaded drawing URL and\n\
                  the SMILES reported back are printed on stdout."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the drawing server.
    #[arg(
        long,
        env = "BKDRAW_SERVER",
        default_value = "http://127.0.0.1:8000/",
        global = true
    )]
    pub server: Url,

    /// Image reloaded after every completed action.
    #[arg(long = "image-endpoint", default_value = "content.png", global = true)]
    pub image_endpoint: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,
}

#[derive(Subcommand)]
pub enum Command {
    /// Click the drawing at viewport pixel coordinates.
    #[command(allow_negative_numbers = true)]
    Click { x: i32, y: i32 },

    /// Send a bare named action such as undo, redo or expand_all.
    Action { name: String },

    /// Set the atom symbol of the selection.
    Symbol { symbol: String },

    /// Switch to template mode with the given template.
    Template { name: String },

    /// Switch the editing mode.
    Mode { name: String },

    /// Read commands from stdin, one per line, until EOF or `quit`.
    Session,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}
