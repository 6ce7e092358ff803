use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use npuzzle_solver::engine::Board;
use npuzzle_solver::heuristics::{Heuristic, HeuristicKind};
use npuzzle_solver::pattern_db::{Partition, PdbCache};
use npuzzle_solver::problem::{NPuzzleProblem, Predictor};
use npuzzle_solver::solver::{IdaStar, SearchLimits};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Compares heuristics on seeded random instances", long_about = None)]
struct Args {
    /// Board side length
    #[clap(short, long, default_value_t = 3)]
    size: usize,

    /// Number of random instances
    #[clap(short, long, default_value_t = 20)]
    boards: usize,

    /// Random blank moves used to scramble each instance
    #[clap(short, long, default_value_t = 40)]
    moves: usize,

    /// Seed of the first instance; instance i uses seed + i
    #[clap(long, default_value_t = 0)]
    seed: u64,

    /// Heuristics to compare, comma separated
    #[clap(
        long,
        value_delimiter = ',',
        default_value = "misplaced,manhattan,linear-conflict,disjoint-pdb"
    )]
    heuristics: Vec<HeuristicKind>,

    /// Per-instance expansion budget
    #[clap(long)]
    max_expansions: Option<u64>,
}

#[derive(Default)]
struct Tally {
    solved: usize,
    expanded: u64,
    millis: f64,
}

/// Partition used for the pattern database on boards without a default one.
fn partition_for(size: usize) -> Option<Partition> {
    match size {
        3 => Partition::from_tiles(&[vec![1, 2, 3, 4], vec![5, 6, 7, 8]]).ok(),
        _ => Partition::standard(size),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let args = Args::parse();
    let goal = Board::solved(args.size).context("Unsupported board size")?;
    let cache = PdbCache::global();
    let limits = SearchLimits {
        max_expansions: args.max_expansions,
        check_solvability: true,
    };

    let estimators: Vec<Heuristic> = args
        .heuristics
        .iter()
        .map(|&kind| {
            let heuristic = Heuristic::with_cache(kind, &goal, cache.clone());
            match (kind, partition_for(args.size)) {
                (HeuristicKind::DisjointPdb, Some(partition)) => heuristic.with_partition(partition),
                _ => heuristic,
            }
        })
        .collect();

    let mut tallies: HashMap<HeuristicKind, Tally> = HashMap::new();
    println!(
        "Starting heuristic evaluation for {} boards ({}x{}, {} scramble moves)...",
        args.boards, args.size, args.size, args.moves
    );

    for board_idx in 0..args.boards {
        let current_seed = args.seed + board_idx as u64;
        let mut rng = SmallRng::seed_from_u64(current_seed);
        let initial = Board::scrambled(&goal, args.moves, &mut rng);
        let problem = NPuzzleProblem::new(initial, goal.clone())?;

        println!("\nEvaluating Board {} (Seed: {})", board_idx, current_seed);
        for heuristic in &estimators {
            let kind = heuristic.kind();
            let mut search =
                IdaStar::new(|s: &Board, g: &Board| heuristic.predict(s, g)).with_limits(limits);
            let started = Instant::now();
            let outcome = search.search(&problem);
            let millis = started.elapsed().as_secs_f64() * 1000.0;
            let stats = search.stats();

            let tally = tallies.entry(kind).or_default();
            tally.expanded += stats.nodes_expanded;
            tally.millis += millis;
            match outcome.solution() {
                Some(solution) => {
                    tally.solved += 1;
                    println!(
                        "  Heuristic: {:<16} Length: {:<4} Expanded: {:<10} {:.1} ms",
                        kind,
                        solution.len(),
                        stats.nodes_expanded,
                        millis
                    );
                }
                None => {
                    warn!("{} gave up on board {}: {}", kind, board_idx, outcome.label());
                }
            }
        }
    }

    println!("\n--- Evaluation Complete ---");
    println!("Number of boards evaluated: {}", args.boards);
    println!("\n--- Averages ---");

    let mut rows: Vec<(HeuristicKind, f64, f64, usize)> = tallies
        .into_iter()
        .map(|(kind, t)| {
            let n = args.boards.max(1) as f64;
            (kind, t.expanded as f64 / n, t.millis / n, t.solved)
        })
        .collect();
    rows.sort_by(|a, b| a.1.total_cmp(&b.1));

    for (kind, expanded, millis, solved) in rows {
        println!(
            "Heuristic {:<16}: Average Expanded = {:.1}, Average Time = {:.2} ms, Solved = {}/{}",
            kind, expanded, millis, solved, args.boards
        );
    }
    info!("Pattern databases cached: {}", cache.len());
    Ok(())
}
