mod app;
mod commands;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "enex2md",
    about = "Convert Evernote .enex exports into Markdown notes and attachments",
    version
)]
struct Cli {
    /// Evernote export file (.enex)
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory; a folder named after the input file is created inside it
    /// (default: current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Attachment directory, relative to the output folder (default: "res")
    #[arg(short, long)]
    attachments: Option<String>,

    /// Only list the notes in the export
    #[arg(short, long)]
    list: bool,

    /// Do not write resource files (references are still resolved)
    #[arg(long)]
    no_resources: bool,

    /// Do not render PDF snapshots of saved web pages
    #[arg(long)]
    no_snapshots: bool,

    /// Browser used for snapshots (overrides the config file)
    #[arg(long)]
    browser: Option<String>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for --list
    #[arg(long, default_value = "plain")]
    format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let app = app::App::new(&cli)?;

    if cli.list {
        commands::list::run(&app, &cli.format)?;
    } else {
        commands::convert::run(&app)?;
    }

    Ok(())
}
