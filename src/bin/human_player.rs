use anyhow::Context;
use clap::Parser;
use npuzzle_solver::engine::{Board, Direction};
use npuzzle_solver::heuristics::{Heuristic, HeuristicKind};
use npuzzle_solver::problem::NPuzzleProblem;
use npuzzle_solver::solver::{IdaStar, SearchLimits};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::io::{self, Write};

/// Budget for a hint search, so a hint on a hard 4x4 board stays interactive.
const HINT_EXPANSIONS: u64 = 2_000_000;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Play the sliding-tile puzzle in the terminal", long_about = None)]
struct Args {
    /// Board side length
    #[clap(short, long, default_value_t = 3)]
    size: usize,

    /// Random blank moves used to scramble the board
    #[clap(short, long, default_value_t = 30)]
    moves: usize,

    /// Seed for the scramble; random if omitted
    #[clap(long)]
    seed: Option<u64>,
}

fn parse_direction(input: &str) -> Option<Direction> {
    match input {
        "w" => Some(Direction::Up),
        "s" => Some(Direction::Down),
        "a" => Some(Direction::Left),
        "d" => Some(Direction::Right),
        _ => None,
    }
}

fn hint(board: &Board, goal: &Board) -> anyhow::Result<Option<(Direction, usize)>> {
    let problem = NPuzzleProblem::new(board.clone(), goal.clone())?;
    let mut search = IdaStar::new(Heuristic::new(HeuristicKind::LinearConflict, goal)).with_limits(SearchLimits {
        max_expansions: Some(HINT_EXPANSIONS),
        check_solvability: true,
    });
    Ok(search
        .search(&problem)
        .into_solution()
        .and_then(|s| s.moves.first().map(|&d| (d, s.len()))))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_micros()
        .init();

    let args = Args::parse();
    let goal = Board::solved(args.size).context("Unsupported board size")?;
    let mut rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    let mut board = Board::scrambled(&goal, args.moves, &mut rng);
    let mut history: Vec<Board> = Vec::new();
    println!("Welcome to the {}-puzzle!", args.size * args.size - 1);

    loop {
        println!("---------------------");
        println!("Moves: {}", history.len());
        println!("{}", board);

        if board == goal {
            println!();
            println!("---------------------");
            println!("🎉 SOLVED! 🎉");
            println!("Total Moves: {}", history.len());
            println!("---------------------");
            break;
        }

        print!("Move the blank with w/a/s/d, 'u' to undo, 'h' for a hint, 'q' to quit: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        match input.trim() {
            "q" => {
                println!("Thanks for playing!");
                break;
            }
            "u" => match history.pop() {
                Some(previous) => {
                    board = previous;
                    println!("Move undone.");
                }
                None => println!("Cannot undo further (no moves made)."),
            },
            "h" => match hint(&board, &goal)? {
                Some((dir, remaining)) => {
                    println!("Hint: move the blank {} ({} moves left with best play).", dir, remaining)
                }
                None => println!("No hint available within the search budget."),
            },
            other => match parse_direction(other) {
                Some(dir) => match board.apply(dir) {
                    Some(next) => history.push(std::mem::replace(&mut board, next)),
                    None => println!("Invalid move: the blank cannot move {}.", dir),
                },
                None => println!("Invalid input. Use w/a/s/d, 'u', 'h' or 'q'."),
            },
        }
    }
    Ok(())
}
