//! mongocell: resolve notebook MongoDB commands from a terminal
//!
//! # Usage
//!
//! ```bash
//! # Accessor chain against the instance's current database
//! mongocell chain "db['invoices'].find({'status': 'open'})"
//!
//! # Flagged line and cell forms
//! mongocell line "show_collections -i prod -d orders"
//! printf 'find -i prod -d orders -c invoices\n{"status": "open"}\n' | mongocell cell
//!
//! # Interactive mode
//! mongocell repl
//! ```

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing_subscriber::EnvFilter;

use mongocell::config::Config;
use mongocell::engine::{dispatch, CatalogBackend};
use mongocell::format::{cell_text, columns, render, Rendered};
use mongocell::help;
use mongocell::parser::{resolve, InputKind};
use mongocell::session::Session;

#[derive(Parser)]
#[command(name = "mongocell")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve notebook-typed MongoDB commands into validated descriptors", long_about = None)]
#[command(after_help = "EXAMPLES:
    mongocell chain \"db['mycol'].find({'_id': {'$in': ['a', 'b']}})\"
    mongocell line 'show_dbs -i prod'
    mongocell cell query.txt --dry-run")]
struct Cli {
    /// Config file (defaults to ./mongocell.toml, then the user config dir)
    #[arg(long, global = true, env = "MONGOCELL_CONFIG")]
    config: Option<PathBuf>,

    /// Instance to use for chain input (defaults to the config's default_instance)
    #[arg(short, long, global = true)]
    instance: Option<String>,

    /// Only print the resolved descriptor
    #[arg(long, global = true)]
    dry_run: bool,

    /// Output format for document results
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an accessor chain or `use`/`curdb`/`listdbs`
    Chain {
        /// The chain expression
        input: String,
    },
    /// Resolve a line-form command (`show_dbs`, `show_collections`)
    Line {
        /// The command line
        input: String,
    },
    /// Resolve a two-line cell (header and query body)
    Cell {
        /// File holding the cell; reads stdin when omitted
        file: Option<PathBuf>,
    },
    /// Interactive REPL mode
    Repl,
    /// Show usage examples
    Examples,
}

/// How one command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Done,
    Failed,
    Fatal,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(Outcome::Done) => {}
        Ok(Outcome::Failed) => std::process::exit(1),
        Ok(Outcome::Fatal) => std::process::exit(2),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "mongocell=debug" } else { "mongocell=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<Outcome> {
    if let Commands::Examples = cli.command {
        println!("{}", help::full_help());
        return Ok(Outcome::Done);
    }

    let config = Config::load(cli.config.as_deref())?;
    let mut session = config.session(cli.instance.as_deref())?;

    let outcome = match &cli.command {
        Commands::Chain { input } => execute(input, InputKind::Chain, &mut session, cli),
        Commands::Line { input } => execute(input, InputKind::Line, &mut session, cli),
        Commands::Cell { file } => {
            let input = read_cell(file.as_ref())?;
            execute(&input, InputKind::Cell, &mut session, cli)
        }
        Commands::Repl => run_repl(&mut session, cli),
        Commands::Examples => Outcome::Done,
    };
    Ok(outcome)
}

fn read_cell(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read cell from stdin")?;
            Ok(input)
        }
    }
}

/// Resolve one input and, unless it is a dry run, dispatch it.
fn execute(input: &str, kind: InputKind, session: &mut Session, cli: &Cli) -> Outcome {
    if cli.verbose {
        println!("{} {}", "Input:".dimmed(), input.yellow());
    }

    let cmd = match resolve(input, kind, &session.defaults()) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("{} {}", format!("{}:", e.kind()).red().bold(), e);
            return Outcome::Failed;
        }
    };

    if cli.dry_run || cmd.operation.is_data_access() {
        println!("{}", "Resolved command:".green().bold());
        println!(
            "{}",
            serde_json::to_string_pretty(&cmd).unwrap_or_else(|_| cmd.to_string())
        );
        if !cli.dry_run {
            println!();
            println!(
                "{}",
                "⚠ No database driver is connected; the command was resolved but not run.".yellow()
            );
        }
        return Outcome::Done;
    }

    match dispatch(&cmd, &mut CatalogBackend::new(session)) {
        Ok(response) => {
            print_rendered(render(&cmd, response), cli.format);
            Outcome::Done
        }
        Err(e) if e.is_fatal() => {
            eprintln!("{} {}", "Fatal:".red().bold(), e);
            Outcome::Fatal
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            Outcome::Failed
        }
    }
}

fn print_rendered(rendered: Rendered, format: OutputFormat) {
    match rendered {
        Rendered::Markdown(text) | Rendered::Text(text) => println!("{}", text),
        Rendered::Rows(rows) => print_rows(&rows, format),
    }
}

fn print_rows(rows: &[serde_json::Value], format: OutputFormat) {
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows).unwrap_or_default());
        }
        OutputFormat::Table => {
            let columns = columns(rows);

            let mut widths: HashMap<&str, usize> =
                columns.iter().map(|c| (c.as_str(), c.len())).collect();
            for row in rows {
                for col in &columns {
                    let len = cell_text(row.get(col)).chars().count();
                    if let Some(w) = widths.get_mut(col.as_str()) {
                        *w = (*w).max(len);
                    }
                }
            }
            let width = |c: &str| widths.get(c).copied().unwrap_or_default();

            let header: Vec<String> = columns
                .iter()
                .map(|c| format!("{:width$}", c, width = width(c)))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = columns.iter().map(|c| "─".repeat(width(c))).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in rows {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| format!("{:width$}", cell_text(row.get(c)), width = width(c)))
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", rows.len().to_string().cyan());
        }
    }
}

/// What the REPL does after a line.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Exit(Outcome),
}

/// Routes REPL lines to an input surface.
///
/// Plain lines are chain input, `%mongo <line>` is a line command, and
/// `%%mongo <header>` starts a cell that ends at the next blank line.
#[derive(Debug, Default)]
struct ReplInput {
    cell: Option<Vec<String>>,
}

impl ReplInput {
    fn in_cell(&self) -> bool {
        self.cell.is_some()
    }

    fn cancel(&mut self) {
        self.cell = None;
    }

    /// Feed one line, running complete inputs with `run`.
    fn feed(&mut self, line: &str, mut run: impl FnMut(&str, InputKind) -> Outcome) -> Step {
        let trimmed = line.trim();

        if let Some(lines) = self.cell.as_mut() {
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
                return Step::Continue;
            }
            let input = self.cell.take().unwrap_or_default().join("\n");
            return Self::after(run(&input, InputKind::Cell));
        }

        if trimmed.is_empty() {
            return Step::Continue;
        }
        if let Some(header) = trimmed.strip_prefix("%%mongo") {
            self.cell = Some(vec![header.trim().to_string()]);
            return Step::Continue;
        }
        let outcome = match trimmed.strip_prefix("%mongo") {
            Some(rest) => run(rest, InputKind::Line),
            None => run(trimmed, InputKind::Chain),
        };
        Self::after(outcome)
    }

    /// Contract violations end the session; anything else was reported.
    fn after(outcome: Outcome) -> Step {
        match outcome {
            Outcome::Fatal => Step::Exit(Outcome::Fatal),
            Outcome::Done | Outcome::Failed => Step::Continue,
        }
    }
}

/// Run the interactive REPL mode.
fn run_repl(session: &mut Session, cli: &Cli) -> Outcome {
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    println!("{}", "mongocell REPL - Interactive Mode".cyan().bold());
    println!("{}", "Type .help for examples, .exit to quit.".dimmed());
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{} {}", "Failed to initialize REPL:".red(), e);
            return Outcome::Failed;
        }
    };

    let history_path = dirs::home_dir()
        .map(|p| p.join(".mongocell_history"))
        .unwrap_or_default();
    if rl.load_history(&history_path).is_err() {
        tracing::debug!(path = %history_path.display(), "no REPL history loaded");
    }

    let mut input = ReplInput::default();
    let mut outcome = Outcome::Done;

    loop {
        let prompt = if input.in_cell() {
            "   ...> ".dimmed().to_string()
        } else {
            format!("{}> ", session.instance()).cyan().bold().to_string()
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if !input.in_cell() && !trimmed.is_empty() {
                    if let Err(e) = rl.add_history_entry(trimmed) {
                        tracing::debug!(error = %e, "failed to record history");
                    }

                    match trimmed {
                        ".exit" | ".quit" | "exit" | "quit" => {
                            println!("{}", "Goodbye!".green());
                            break;
                        }
                        ".help" | "help" => {
                            println!("{}", help::markdown_table());
                            continue;
                        }
                        ".clear" | "clear" => {
                            print!("\x1B[2J\x1B[1;1H");
                            continue;
                        }
                        _ => {}
                    }
                }

                let step = input.feed(&line, |text, kind| execute(text, kind, session, cli));
                if let Step::Exit(end) = step {
                    outcome = end;
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                input.cancel();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".green());
                break;
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red(), err);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_path) {
        tracing::debug!(error = %e, "failed to save REPL history");
    }
    outcome
}
