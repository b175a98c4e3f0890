//! Codegraph command-line tool.
//!
//! Provides the `codegraph` binary, which loads a JSON graph description,
//! validates it with `codegraph_core`, and reports the result. `check`
//! prints a summary; `describe` prints the normalized description as JSON.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;

use codegraph_core::{Graph, GraphConfig, GraphDesc, Loader, ModelMap};

/// Codegraph description validator.
#[derive(Parser)]
#[command(name = "codegraph", about = "Load and validate codegraph descriptions")]
struct Cli {
    /// JSON graph configuration (conversion table, connection limits).
    #[arg(long, global = true, env = "CODEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Load a description and print a summary of the graph.
    Check(Input),
    /// Load a description and print it back in normalized form.
    Describe(Input),
}

#[derive(Args)]
struct Input {
    /// Path to the graph description (JSON).
    file: PathBuf,

    /// Path to a JSON object of block models.
    #[arg(short, long)]
    models: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Check(input) => run_check(&input, cli.config.as_deref()),
        Commands::Describe(input) => run_describe(&input, cli.config.as_deref()),
    };
    process::exit(exit_code);
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 = success, 1 = graph error, 3 = I/O or parse error.
fn run_check(input: &Input, config: Option<&Path>) -> i32 {
    match load_graph(input, config) {
        Ok(graph) => {
            print!("{}", summary(&graph));
            0
        }
        Err(code) => code,
    }
}

/// Execute the describe subcommand. Exit codes as for `check`.
fn run_describe(input: &Input, config: Option<&Path>) -> i32 {
    let graph = match load_graph(input, config) {
        Ok(graph) => graph,
        Err(code) => return code,
    };
    match serde_json::to_string_pretty(&graph.describe()) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: failed to serialize description: {}", e);
            3
        }
    }
}

/// Reads the inputs and loads the graph, reporting failures on stderr.
/// The error is the exit code to use.
fn load_graph(input: &Input, config: Option<&Path>) -> Result<Graph, i32> {
    let config = match config {
        Some(path) => read_json::<GraphConfig>(path)?,
        None => GraphConfig::default(),
    };
    let desc = read_json::<GraphDesc>(&input.file)?;
    let models = input
        .models
        .as_deref()
        .map(read_json::<ModelMap>)
        .transpose()?;

    let loader = Loader::new(&desc);
    let loader = match &models {
        Some(models) => loader.with_models(models),
        None => loader,
    };
    loader.load(Graph::with_config(config)).map_err(|e| {
        eprintln!("Error: {}", e);
        1
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, i32> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: failed to read '{}': {}", path.display(), e);
        3
    })?;
    tracing::debug!("read {} byte(s) from {}", text.len(), path.display());
    serde_json::from_str(&text).map_err(|e| {
        eprintln!("Error: failed to parse '{}': {}", path.display(), e);
        3
    })
}

/// One line per block with its ports, then one line per connection.
fn summary(graph: &Graph) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "ok: {} block(s), {} connection(s)",
        graph.block_count(),
        graph.connection_count()
    );
    for block in graph.blocks() {
        let _ = writeln!(
            out,
            "  {} `{}` ({}): {} input(s), {} output(s)",
            block.id(),
            block.name(),
            block.variant(),
            block.inputs().len(),
            block.outputs().len()
        );
    }
    for connection in graph.connections() {
        let _ = writeln!(out, "  {} -> {}", connection.output(), connection.input());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_blocks_and_connections() {
        let desc: GraphDesc = serde_json::from_str(
            r#"{
                "blocks": [
                    {"id": "0", "name": "print", "variant": "Instruction"},
                    {"id": "1", "name": "start", "outputs": [{"socketKind": "Stream", "name": "out"}]}
                ],
                "connections": [
                    {"outputBlockId": "1", "outputPointName": "out",
                     "inputBlockId": "0", "inputPointName": "in"}
                ]
            }"#,
        )
        .unwrap();
        let graph = Graph::from_description(&desc, None).unwrap();
        let text = summary(&graph);

        assert!(text.starts_with("ok: 2 block(s), 1 connection(s)\n"));
        assert!(text.contains("0 `print` (Instruction): 1 input(s), 1 output(s)"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn cli_parses_global_config() {
        let cli = Cli::try_parse_from([
            "codegraph",
            "check",
            "graph.json",
            "--models",
            "models.json",
            "--config",
            "config.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("config.json")));
        match cli.command {
            Commands::Check(input) => {
                assert_eq!(input.file, PathBuf::from("graph.json"));
                assert_eq!(input.models, Some(PathBuf::from("models.json")));
            }
            Commands::Describe(_) => panic!("expected check"),
        }
    }
}
