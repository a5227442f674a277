use std::{io::Read, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::format::{format_card_cvc, format_card_number, format_phone, pretty_json};

#[derive(Parser, Debug)]
#[command(about = "Run the reservation form formatters from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    FormatPhone { value: String },
    FormatCard { value: String },
    FormatCvc { value: String },
    /// Pretty-print a JSON document from a file, or stdin when omitted.
    PrettyJson { path: Option<PathBuf> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::FormatPhone { value } => println!("{}", format_phone(&value)),
        Command::FormatCard { value } => println!("{}", format_card_number(&value)),
        Command::FormatCvc { value } => println!("{}", format_card_cvc(&value)),
        Command::PrettyJson { path } => {
            let raw = match path {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read '{}'", path.display()))?,
                None => {
                    let mut raw = String::new();
                    std::io::stdin()
                        .read_to_string(&mut raw)
                        .context("failed to read stdin")?;
                    raw
                }
            };
            println!("{}", pretty_json(&raw).context("input is not valid JSON")?);
        }
    }

    Ok(())
}
