use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tracing::info;

use case_picking::io::{read_order_lines, write_solution};
use case_picking::solver::GREEDY_BETA;
use case_picking::warehouse::{distance_matrix, Graph};
use case_picking::Solver;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Greedy,
    Biased,
}

#[derive(Parser)]
#[command(name = "case_picking", about = "3D case-picking pallet packer")]
struct Cli {
    /// Problem CSV (semicolon-delimited order lines)
    #[arg(long, default_value = "./test/testproblem.csv")]
    input: PathBuf,

    /// Result CSV (comma-delimited placed cases)
    #[arg(long, default_value = "./test/results.csv")]
    output: PathBuf,

    /// greedy runs Heuristic(0.9999) once; biased runs the time-bounded
    /// multistart wrapper
    #[arg(long, value_enum, default_value_t = Mode::Greedy)]
    mode: Mode,

    /// Wall-clock budget for --mode biased, in seconds
    #[arg(long, default_value_t = 10)]
    budget_secs: u64,

    /// RNG seed; defaults to a time-derived value when omitted
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    });

    if let Err(err) = run(&cli, seed) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli, seed: u64) -> case_picking::Result<()> {
    info!(input = %cli.input.display(), "loading order lines");
    let order_lines = read_order_lines(&cli.input)?;
    info!(count = order_lines.len(), "order lines loaded");

    info!("building warehouse graph");
    let graph = Graph::build();
    let dists = distance_matrix(&graph);

    let mut solver = Solver::new(order_lines, dists, seed);
    info!(order_lines = solver.order_line_count(), "savings edges built");

    let start = Instant::now();
    let solution = match cli.mode {
        Mode::Greedy => {
            info!("running greedy heuristic");
            solver.heuristic(GREEDY_BETA)?
        }
        Mode::Biased => {
            info!(budget_secs = cli.budget_secs, "running biased-randomized wrapper");
            solver.biased_randomized(Duration::from_secs(cli.budget_secs))?
        }
    };
    let elapsed = start.elapsed();

    info!(output = %cli.output.display(), "writing solution");
    write_solution(&cli.output, &solution)?;

    println!("Computational time: {:.3}s", elapsed.as_secs_f64());
    println!("Pallets: {}", solution.pallets.len());
    println!("Total cost: {:.2}", solution.cost);

    Ok(())
}
