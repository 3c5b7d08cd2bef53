use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cs-cli")]
#[command(about = "Resolve character-sheet scripts from the command line")]
pub(crate) struct Cli {
    /// Character sheet JSON; without it scripts run with no entity.
    #[arg(long = "sheet", global = true)]
    pub(crate) sheet: Option<String>,
    /// Id of the sheet node bound as `self`.
    #[arg(long = "self-id", global = true)]
    pub(crate) self_id: Option<String>,
    /// Permitted execution time per script, in seconds.
    #[arg(long = "timeout", global = true)]
    pub(crate) timeout: Option<f64>,
    #[arg(long = "seed", global = true)]
    pub(crate) seed: Option<u32>,
    #[arg(long = "verbose", global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Run a script and print its result.
    Script(TextArgs),
    /// Resolve embedded scripts inside text.
    Text(TextArgs),
    Number(TextArgs),
    Weight(TextArgs),
}

#[derive(Debug, Args)]
pub(crate) struct TextArgs {
    pub(crate) text: String,
}
