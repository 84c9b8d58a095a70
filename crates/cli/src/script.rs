//! Cell scripts: line-oriented edit commands run against a fresh sheet.
//!
//! Grammar, one command per line:
//!
//! ```text
//! POS = TEXT      set the cell at POS; TEXT is everything after the first
//!                 '=' with one optional leading space dropped, verbatim
//! clear POS       clear the cell at POS
//! # ...           comment
//! ```
//!
//! Blank lines are skipped. Execution stops at the first failing line and
//! the error message carries the one-based line number.

use std::io::{self, Read};
use std::path::Path;

use cellgrid_engine::error::EngineError;
use cellgrid_engine::position::Position;
use cellgrid_engine::sheet::Sheet;

use crate::CliError;

/// Script source from a file, or from stdin for `None` / `-`.
pub fn load_source(script: Option<&Path>) -> Result<String, CliError> {
    match script {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read {}: {}", path.display(), e))),
        _ => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .map_err(|e| CliError::io(format!("cannot read stdin: {}", e)))?;
            Ok(source)
        }
    }
}

/// Apply every command in `source`, in order, to a fresh sheet.
pub fn run(source: &str) -> Result<Sheet, CliError> {
    let mut sheet = Sheet::new();
    for (idx, line) in source.lines().enumerate() {
        apply_line(&mut sheet, line).map_err(|mut err| {
            err.message = format!("line {}: {}", idx + 1, err.message);
            err
        })?;
    }
    Ok(sheet)
}

fn apply_line(sheet: &mut Sheet, line: &str) -> Result<(), CliError> {
    let command = line.trim_start();
    if command.is_empty() || command.starts_with('#') {
        return Ok(());
    }

    if let Some(rest) = command.strip_prefix("clear ") {
        let pos = parse_position(rest.trim())?;
        return sheet.clear_cell(pos).map_err(engine_error);
    }

    let Some(eq) = command.find('=') else {
        return Err(
            CliError::parse(format!("not a command: {:?}", line.trim()))
                .with_hint("expected 'POS = TEXT' or 'clear POS'"),
        );
    };

    let pos = parse_position(command[..eq].trim())?;
    // TEXT is verbatim apart from one optional space after the separator,
    // so trailing whitespace and inner '=' survive
    let text = command[eq + 1..].strip_prefix(' ').unwrap_or(&command[eq + 1..]);
    sheet.set_cell(pos, text).map_err(engine_error)
}

fn parse_position(s: &str) -> Result<Position, CliError> {
    Position::from_a1(s)
        .ok_or_else(|| CliError::parse(format!("{:?} is not a cell position", s)))
}

fn engine_error(err: EngineError) -> CliError {
    let cli = CliError::eval(err.to_string());
    match err {
        EngineError::Syntax(_) => {
            cli.with_hint("formulas use numbers, A1 references, + - * / and parentheses")
        }
        EngineError::CircularDependency(_) => {
            cli.with_hint("the chain of references would loop back into this cell")
        }
        EngineError::InvalidPosition(_) => cli,
    }
}
