//! hdvsa CLI: fit and query a hyperdimensional graph memory, or fit/predict/
//! auto-tune a level-encoding classifier, from plain delimited text files.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use hdvsa::classifier::{self, MLModel};
use hdvsa::dataset;
use hdvsa::graph::{Edge, Graph};

#[derive(Parser)]
#[command(name = "hdvsa", version, about = "Hyperdimensional computing: graph memory and level-encoding classifier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Associative graph memory: fit an edge list, or query a single edge.
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },
    /// Level-encoding classifier: fit, predict, or auto-tune hyperparameters.
    Classify {
        #[command(subcommand)]
        action: ClassifyAction,
    },
}

#[derive(Subcommand)]
enum GraphAction {
    /// Fit a graph from an edge-list file and report its error rate.
    Fit {
        #[arg(long)]
        edges: PathBuf,
        #[arg(long, default_value = "\t")]
        sep: String,
        #[arg(long, default_value_t = 10_000)]
        dim: usize,
        #[arg(long, default_value_t = false)]
        directed: bool,
        #[arg(long, default_value_t = false)]
        weighted: bool,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,
    },
    /// Refit a graph from an edge-list file and query a single edge.
    Query {
        #[arg(long)]
        edges: PathBuf,
        #[arg(long, default_value = "\t")]
        sep: String,
        #[arg(long, default_value_t = 10_000)]
        dim: usize,
        #[arg(long, default_value_t = false)]
        directed: bool,
        #[arg(long, default_value_t = false)]
        weighted: bool,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        u: String,
        #[arg(long)]
        v: String,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,
    },
}

#[derive(Subcommand)]
enum ClassifyAction {
    /// Fit a classifier on a labelled dataset and report its class list.
    Fit {
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long, default_value = "\t")]
        sep: String,
        #[arg(long)]
        levels: usize,
        #[arg(long, default_value_t = 10_000)]
        dim: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Fit on a dataset, hold out a stratified test split, and predict it.
    Predict {
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long, default_value = "\t")]
        sep: String,
        #[arg(long)]
        levels: usize,
        #[arg(long, default_value_t = 10_000)]
        dim: usize,
        #[arg(long)]
        test_percentage: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Grid search (size, levels) pairs by cross-validated accuracy.
    Autotune {
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long, default_value = "\t")]
        sep: String,
        #[arg(long, value_delimiter = ',')]
        sizes: Vec<usize>,
        #[arg(long, value_delimiter = ',')]
        levels: Vec<usize>,
        #[arg(long, default_value_t = 5)]
        cv: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Parse an edge-list file: each non-blank, non-`#` line is `u<sep>v[<sep>weight]`.
fn load_edges(path: &PathBuf, sep: &str) -> Result<Vec<Edge>> {
    let text = fs::read_to_string(path).into_diagnostic()?;
    let mut edges = Vec::new();
    for line in text.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(sep).collect();
        let weight = if fields.len() >= 3 {
            Some(fields[2].parse::<f64>().into_diagnostic()?)
        } else {
            None
        };
        edges.push(Edge::new(fields[0], fields[1], weight));
    }
    Ok(edges)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Graph { action } => match action {
            GraphAction::Fit {
                edges,
                sep,
                dim,
                directed,
                weighted,
                seed,
                threshold,
            } => {
                let edge_list = load_edges(&edges, &sep)?;
                let mut g = Graph::new(dim, directed, weighted, seed).into_diagnostic()?;
                g.fit(&edge_list).into_diagnostic()?;
                let (rate, fp, fn_) = g.error_rate(&edge_list, threshold).into_diagnostic()?;
                println!(
                    "nodes={} edges={} error_rate={:.4} false_positives={} false_negatives={}",
                    g.nodes_count(),
                    g.edges_count(),
                    rate,
                    fp.len(),
                    fn_.len()
                );
            }
            GraphAction::Query {
                edges,
                sep,
                dim,
                directed,
                weighted,
                seed,
                u,
                v,
                weight,
                threshold,
            } => {
                let edge_list = load_edges(&edges, &sep)?;
                let mut g = Graph::new(dim, directed, weighted, seed).into_diagnostic()?;
                g.fit(&edge_list).into_diagnostic()?;
                let (exists, distance) = g.edge_exists(&u, &v, weight, threshold).into_diagnostic()?;
                println!("exists={exists} distance={distance:.4}");
            }
        },
        Commands::Classify { action } => match action {
            ClassifyAction::Fit {
                dataset: dataset_path,
                sep,
                levels,
                dim,
                seed,
            } => {
                let ds = dataset::load_dataset(&dataset_path, &sep).into_diagnostic()?;
                let mut model = MLModel::new(dim, levels, seed).into_diagnostic()?;
                model.fit(&ds.matrix, &ds.classes).into_diagnostic()?;
                println!("classes={:?} points={}", model.classes(), ds.matrix.len());
            }
            ClassifyAction::Predict {
                dataset: dataset_path,
                sep,
                levels,
                dim,
                test_percentage,
                seed,
            } => {
                let ds = dataset::load_dataset(&dataset_path, &sep).into_diagnostic()?;
                let test_indices = dataset::percentage_split(&ds.classes, test_percentage, seed).into_diagnostic()?;
                let mut model = MLModel::new(dim, levels, Some(seed)).into_diagnostic()?;
                model.fit(&ds.matrix, &ds.classes).into_diagnostic()?;
                let prediction = model.predict(&test_indices).into_diagnostic()?;
                println!(
                    "predictions={:?} error_rate={:.4}",
                    prediction.labels,
                    prediction.error_rate.unwrap_or(f64::NAN)
                );
            }
            ClassifyAction::Autotune {
                dataset: dataset_path,
                sep,
                sizes,
                levels,
                cv,
                seed,
            } => {
                let ds = dataset::load_dataset(&dataset_path, &sep).into_diagnostic()?;
                let result = classifier::auto_tune(&ds.matrix, &ds.classes, &sizes, &levels, cv, seed).into_diagnostic()?;
                println!(
                    "best_size={} best_levels={} mean_accuracy={:.4}",
                    result.size, result.levels, result.mean_accuracy
                );
            }
        },
    }

    Ok(())
}
