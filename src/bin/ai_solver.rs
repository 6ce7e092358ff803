use anyhow::Context;
use clap::Parser;
use log::info;
use npuzzle_solver::config::{Algorithm, SolverConfig};
use npuzzle_solver::heuristics::HeuristicKind;
use npuzzle_solver::pattern_db::PdbCache;
use npuzzle_solver::solver::{solve, SearchOutcome, SearchStats};
use npuzzle_solver::utils::parse_problems;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the problem file (one `size initial... goal...` instance per line)
    problem_file: PathBuf,

    /// JSON solver configuration; the flags below override its values
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Search algorithm
    #[clap(short, long, value_enum)]
    algorithm: Option<Algorithm>,

    /// Heuristic: misplaced, manhattan, linear-conflict, disjoint-pdb or zero
    #[clap(long)]
    heuristic: Option<HeuristicKind>,

    /// Give up on an instance after this many expansions
    #[clap(long)]
    max_expansions: Option<u64>,

    /// Search even when the parity check says the goal is unreachable
    #[clap(long)]
    skip_solvability_check: bool,

    /// Print one JSON report per instance instead of text
    #[clap(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    instance: usize,
    size: usize,
    outcome: &'static str,
    cost: Option<u32>,
    moves: Option<String>,
    stats: SearchStats,
    elapsed_ms: f64,
}

fn load_config(args: &Args) -> anyhow::Result<SolverConfig> {
    let mut config = match &args.config {
        Some(path) => SolverConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SolverConfig::default(),
    };
    if let Some(algorithm) = args.algorithm {
        config.algorithm = algorithm;
    }
    if let Some(heuristic) = args.heuristic {
        config.heuristic = heuristic;
    }
    if args.max_expansions.is_some() {
        config.max_expansions = args.max_expansions;
    }
    if args.skip_solvability_check {
        config.check_solvability = false;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let text = fs::read_to_string(&args.problem_file)
        .with_context(|| format!("Failed to read problem file {}", args.problem_file.display()))?;
    let problems = parse_problems(&text)
        .with_context(|| format!("Invalid problem file {}", args.problem_file.display()))?;
    info!(
        "Loaded {} problems; algorithm {:?}, heuristic {}",
        problems.len(),
        config.algorithm,
        config.heuristic
    );

    let cache = PdbCache::global();
    for (i, problem) in problems.iter().enumerate() {
        let started = Instant::now();
        let (outcome, stats) = solve(problem, &config, cache.clone())
            .with_context(|| format!("Failed to set up the search for instance {}", i + 1))?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let solution = outcome.solution();
        let moves: Option<String> =
            solution.map(|s| s.moves.iter().map(|d| d.to_char()).collect());

        if args.json {
            let report = Report {
                instance: i + 1,
                size: problem.size(),
                outcome: outcome.label(),
                cost: solution.map(|s| s.cost),
                moves,
                stats,
                elapsed_ms,
            };
            println!("{}", serde_json::to_string(&report)?);
            continue;
        }

        println!("Instance {} ({}x{}):", i + 1, problem.size(), problem.size());
        println!("{}\n", problem.initial());
        match &outcome {
            SearchOutcome::Solved(solution) => {
                println!("Solution found:\n");
                println!("Moves ({}):", solution.len());
                if solution.is_empty() {
                    println!("  No moves needed.");
                } else {
                    println!("  {}", moves.unwrap_or_default());
                }
            }
            SearchOutcome::Unsolvable => println!("Unsolvable: the goal has the other parity."),
            SearchOutcome::Exhausted => println!("No solution found: search space exhausted."),
            SearchOutcome::LimitReached => println!("Gave up: expansion limit reached."),
        }
        println!(
            "Generated {}, expanded {}, iterations {}, {:.1} ms\n",
            stats.nodes_generated, stats.nodes_expanded, stats.iterations, elapsed_ms
        );
    }
    Ok(())
}
