// cellgrid CLI - headless sheet evaluation

mod script;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cellgrid_engine::formula::CellLookup as _;
use cellgrid_engine::sheet::Sheet;
use cellgrid_engine::value::CellValue;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;
/// The engine rejected an operation (cycle, bad position, bad formula).
pub const EXIT_EVAL_ERROR: u8 = 1;
/// Usage error - bad arguments, conflicting flags.
pub const EXIT_ARGS_ERROR: u8 = 2;
/// Could not read the script or write output.
pub const EXIT_IO_ERROR: u8 = 3;
/// Malformed script line (not a command the script grammar knows).
pub const EXIT_PARSE_ERROR: u8 = 4;

#[derive(Parser)]
#[command(name = "cgrid")]
#[command(about = "Spreadsheet evaluation core (headless)")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a cell script against a fresh sheet and print the result
    #[command(after_help = "\
Script lines, one command per line:
  A1 = hello          set a cell (text after the first '=', one optional
                      leading space dropped, rest verbatim)
  B2 = =A1*2          formulas keep their own leading '='
  clear A1            clear a cell
  # ...               comment; blank lines are skipped too

Examples:
  cgrid eval model.cg
  echo 'A1 = =1+2' | cgrid eval
  cat model.cg | cgrid eval -
  cgrid eval model.cg --texts
  cgrid eval model.cg --json | jq .
  cgrid eval model.cg --size")]
    Eval {
        /// Script file (omit or use - to read from stdin)
        script: Option<PathBuf>,

        /// Print raw cell texts instead of evaluated values
        #[arg(long)]
        texts: bool,

        /// Print cells as a JSON object keyed by A1 position
        #[arg(long)]
        json: bool,

        /// Print only the printable size as ROWSxCOLS
        #[arg(long)]
        size: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: cgrid <command> [options]");
            eprintln!("       cgrid --help for more information");
            Ok(())
        }
        Some(Commands::Eval { script, texts, json, size }) => cmd_eval(script, texts, json, size),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ARGS_ERROR, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO_ERROR, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE_ERROR, message: msg.into(), hint: None }
    }

    pub fn eval(msg: impl Into<String>) -> Self {
        Self { code: EXIT_EVAL_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// eval
// ============================================================================

fn cmd_eval(
    script_path: Option<PathBuf>,
    texts: bool,
    json: bool,
    size: bool,
) -> Result<(), CliError> {
    if [texts, json, size].iter().filter(|&&flag| flag).count() > 1 {
        return Err(CliError::args("--texts, --json, and --size are mutually exclusive")
            .with_hint("pick one output mode, or none for the value grid"));
    }

    let source = script::load_source(script_path.as_deref())?;
    let sheet = script::run(&source)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if size {
        let extent = sheet.printable_size();
        writeln!(handle, "{}x{}", extent.rows, extent.cols)
            .map_err(|e| CliError::io(e.to_string()))?;
    } else if json {
        let rendered = cells_as_json(&sheet);
        writeln!(handle, "{}", rendered).map_err(|e| CliError::io(e.to_string()))?;
    } else if texts {
        sheet.print_texts(&mut handle).map_err(|e| CliError::io(e.to_string()))?;
    } else {
        sheet.print_values(&mut handle).map_err(|e| CliError::io(e.to_string()))?;
    }

    Ok(())
}

/// One object per non-empty cell, keyed by A1 position in row-major order.
fn cells_as_json(sheet: &Sheet) -> serde_json::Value {
    let mut sorted: Vec<_> = sheet
        .cells()
        .filter(|(_, cell)| !cell.is_empty())
        .collect();
    sorted.sort_by_key(|&(pos, _)| pos);

    let mut map = serde_json::Map::new();
    for (pos, cell) in sorted {
        let value = match sheet.cell_value(pos) {
            CellValue::Empty => serde_json::Value::Null,
            CellValue::Text(s) => serde_json::Value::String(s),
            CellValue::Number(n) => serde_json::json!(n),
            CellValue::Error(e) => serde_json::Value::String(e.to_string()),
        };
        map.insert(
            pos.to_string(),
            serde_json::json!({ "text": cell.text(), "value": value }),
        );
    }
    serde_json::Value::Object(map)
}
