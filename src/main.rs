//! CLI entry point for the water sort solver.
//!
//! Usage:
//!   water-sort-solver solve <puzzle.json> [options]
//!   water-sort-solver solve --stdin [options]
//!   water-sort-solver verify <puzzle.json> --moves <moves.json>
//!
//! Options:
//!   --max-depth <n>     Do not explore beyond n pours (default: unbounded)
//!   --max-nodes <n>     Stop after visiting n search nodes (default: unbounded)
//!   --timeout <seconds> Maximum search time (default: unbounded)
//!   --dedupe            Skip configurations that were already explored
//!   --format <fmt>      json or text (default: json)
//!   -v                  More logging on stderr, repeatable

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use water_sort_solver::{
    solve, verify_solution, Palette, PuzzleConfig, PuzzleError, PuzzleState, SearchOutcome,
    SolverConfig, SolverResult,
};

#[derive(Parser)]
#[command(name = "water-sort-solver")]
#[command(about = "Exhaustive depth-first solver for water sort puzzles")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a sequence of pours that solves a puzzle
    Solve {
        /// Path to puzzle JSON file (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read puzzle from stdin instead of file
        #[arg(long)]
        stdin: bool,

        /// Do not explore beyond this many pours
        #[arg(long)]
        max_depth: Option<usize>,

        /// Stop after visiting this many search nodes
        #[arg(long)]
        max_nodes: Option<u64>,

        /// Maximum search time in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Skip configurations that were already explored
        #[arg(long)]
        dedupe: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Check that a list of pours solves a puzzle
    Verify {
        /// Path to puzzle JSON file (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read puzzle from stdin instead of file
        #[arg(long)]
        stdin: bool,

        /// JSON file with 1-based pairs, e.g. [[1, 13], [2, 1]]
        #[arg(long, value_name = "MOVES")]
        moves: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

/// Output format for a solve run
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolveOutput {
    solved: bool,
    outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    moves: Option<Vec<MoveOutput>>,
    nodes_visited: u64,
    max_depth: usize,
    time_elapsed_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveOutput {
    from: usize,
    to: usize,
    color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    onto: Option<String>,
    units: usize,
}

/// Output format for a verify run
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOutput {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "water_sort_solver=warn",
        1 => "water_sort_solver=debug",
        _ => "water_sort_solver=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(command: Commands) -> Result<bool, PuzzleError> {
    match command {
        Commands::Solve {
            file,
            stdin,
            max_depth,
            max_nodes,
            timeout,
            dedupe,
            format,
        } => {
            let puzzle = read_puzzle(file, stdin)?;
            let (mut state, palette) = puzzle.build()?;

            let config = SolverConfig {
                max_depth,
                max_nodes,
                timeout: timeout.map(Duration::from_secs),
                dedupe,
            };
            info!(
                name = puzzle.name.as_deref().unwrap_or("unnamed"),
                capacity = puzzle.capacity,
                "loaded puzzle"
            );

            let result = solve(&mut state, &config)?;
            let solved = result.outcome.is_solved();
            match format {
                OutputFormat::Json => {
                    let output = format_result(&result, &palette);
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => print!("{}", format_text(&result, &state, &palette)),
            }
            Ok(solved)
        }
        Commands::Verify { file, stdin, moves } => {
            let puzzle = read_puzzle(file, stdin)?;
            let (state, _) = puzzle.build()?;
            let pairs: Vec<(usize, usize)> =
                serde_json::from_str(&std::fs::read_to_string(&moves)?)?;
            let output = check_moves(&state, &pairs)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(output.valid)
        }
    }
}

fn read_puzzle(file: Option<PathBuf>, stdin: bool) -> Result<PuzzleConfig, PuzzleError> {
    if stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        PuzzleConfig::from_json_str(&buffer)
    } else if let Some(path) = file {
        PuzzleConfig::from_json_file(path)
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "must provide either a file path or --stdin",
        )
        .into())
    }
}

/// Replay 1-based `pairs` on `state`, turning bad moves into an invalid verdict
fn check_moves(
    state: &PuzzleState,
    pairs: &[(usize, usize)],
) -> Result<VerifyOutput, PuzzleError> {
    let verdict = state
        .indices_from_numbers(pairs)
        .and_then(|pairs| verify_solution(state, &pairs));
    let reason = match verdict {
        Ok(true) => None,
        Ok(false) => Some("final state is not solved".to_string()),
        Err(
            e @ (PuzzleError::IllegalPour { .. }
            | PuzzleError::IndexOutOfRange { .. }
            | PuzzleError::InvalidContainerNumber { .. }),
        ) => Some(e.to_string()),
        Err(e) => return Err(e),
    };
    Ok(VerifyOutput {
        valid: reason.is_none(),
        reason,
    })
}

fn format_result(result: &SolverResult, palette: &Palette) -> SolveOutput {
    let moves = match &result.outcome {
        SearchOutcome::Solved(moves) => Some(
            moves
                .iter()
                .map(|m| MoveOutput {
                    from: m.source + 1,
                    to: m.dest + 1,
                    color: palette.label(m.poured),
                    onto: m.onto.map(|c| palette.label(c)),
                    units: m.units,
                })
                .collect(),
        ),
        _ => None,
    };
    SolveOutput {
        solved: result.outcome.is_solved(),
        outcome: result.outcome.as_str().to_string(),
        moves,
        nodes_visited: result.nodes_visited,
        max_depth: result.max_depth,
        time_elapsed_ms: result.time_elapsed_ms,
    }
}

fn format_text(result: &SolverResult, state: &PuzzleState, palette: &Palette) -> String {
    let mut out = String::new();
    match &result.outcome {
        SearchOutcome::Solved(moves) => {
            if moves.is_empty() {
                out.push_str("already solved\n");
            }
            for (i, m) in moves.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, m.describe(palette)));
            }
            out.push('\n');
            out.push_str(&state.display(palette).to_string());
        }
        outcome => {
            out.push_str(&format!(
                "no solution ({}) after {} nodes\n",
                outcome.as_str(),
                result.nodes_visited
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_puzzle() -> PuzzleState {
        let puzzle = PuzzleConfig::from_json_str(
            r#"{"capacity": 2, "containers": [["r", "b"], ["b", "r"], []]}"#,
        )
        .unwrap();
        puzzle.build().unwrap().0
    }

    #[test]
    fn test_check_moves_accepts_solution() {
        let output = check_moves(&create_puzzle(), &[(1, 3), (2, 1)]).unwrap();
        assert!(output.valid);
        assert!(output.reason.is_none());
    }

    #[test]
    fn test_check_moves_reports_container_numbers() {
        let state = create_puzzle();

        let output = check_moves(&state, &[(1, 3), (1, 3)]).unwrap();
        assert!(!output.valid);
        assert_eq!(
            output.reason.as_deref(),
            Some("move 2: pour from 1 into 3 is not legal")
        );

        let output = check_moves(&state, &[(1, 4)]).unwrap();
        assert!(!output.valid);
        assert_eq!(
            output.reason.as_deref(),
            Some("container 4 out of range (puzzle has 3 containers)")
        );

        let output = check_moves(&state, &[(0, 1)]).unwrap();
        assert_eq!(
            output.reason.as_deref(),
            Some("container 0 out of range (puzzle has 3 containers)")
        );
    }

    #[test]
    fn test_check_moves_incomplete() {
        let output = check_moves(&create_puzzle(), &[(1, 3)]).unwrap();
        assert!(!output.valid);
        assert_eq!(output.reason.as_deref(), Some("final state is not solved"));
    }
}
