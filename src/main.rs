use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, ensure, Context, Result};
use burrow_solver::replay::Replay;
use burrow_solver::solve::{self, Outcome};
use burrow_solver::{Level, MoveError, Moves};
use clap::Parser;
use console::{style, Term};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

const LEVEL_DIR: &str = "levels";
const EXTENSION: &str = "map";

#[derive(Debug, Parser)]
#[command(
    name = "burrow-solver",
    about = "Finds the shortest way to catch every token in a burrow level",
    version
)]
struct Args {
    /// Level files. Defaults to every `.map` file under `levels/`.
    levels: Vec<PathBuf>,

    /// Print every step of each solution.
    #[arg(long)]
    replay: bool,

    /// Number of levels solved in parallel.
    #[arg(short, long)]
    jobs: Option<usize>,
}

struct Report {
    path: PathBuf,
    level: Level,
    outcome: Result<Outcome, MoveError>,
    elapsed: Duration,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to set up the worker pool")?;
    }

    let paths = if args.levels.is_empty() {
        find_levels(Path::new(LEVEL_DIR))?
    } else {
        args.levels
    };
    ensure!(!paths.is_empty(), "No level files found");

    let levels = paths
        .into_iter()
        .map(|path| -> Result<_> {
            let level = load(&path)?;
            Ok((path, level))
        })
        .collect::<Result<Vec<_>>>()?;

    let multi = MultiProgress::new();
    let spinner =
        ProgressStyle::with_template("{spinner} {prefix:.bold} {human_pos} states ({elapsed})")
            .context("Invalid progress template")?;
    let reports = levels
        .into_par_iter()
        .map(|(path, level)| {
            let pb = multi.add(
                ProgressBar::new_spinner()
                    .with_style(spinner.clone())
                    .with_prefix(path.display().to_string()),
            );
            let start = Instant::now();
            let outcome = solve::bfs(&level, || pb.inc(1));
            let elapsed = start.elapsed();
            pb.finish_and_clear();
            Report {
                path,
                level,
                outcome,
                elapsed,
            }
        })
        .collect::<Vec<_>>();

    let term = Term::stdout();
    let mut failed_cnt = 0;
    for report in &reports {
        let name = report.path.display();
        match &report.outcome {
            Ok(Outcome::Solved(solution)) => {
                term.write_line(&format!(
                    "{} {name}: {} moves in {:?}",
                    style("solved").green().bold(),
                    solution.moves.len(),
                    report.elapsed,
                ))?;
                term.write_line(&Moves(&solution.moves).to_string())?;
                if args.replay {
                    let replay = Replay::new(&report.level, &solution.moves)
                        .with_context(|| format!("Solution of {name} does not replay"))?;
                    term.write_str(&replay.to_string())?;
                }
            }
            Ok(Outcome::Unsolvable { explored }) => {
                failed_cnt += 1;
                term.write_line(&format!(
                    "{} {name}: no solution after {explored} states in {:?}",
                    style("unsolvable").red().bold(),
                    report.elapsed,
                ))?;
            }
            Err(err) => {
                failed_cnt += 1;
                term.write_line(&format!("{} {name}: {err}", style("error").red().bold()))?;
            }
        }
    }

    if failed_cnt != 0 {
        bail!("{failed_cnt}/{} levels not solved", reports.len());
    }
    Ok(())
}

fn load(path: &Path) -> Result<Level> {
    let map_data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    map_data
        .parse::<Level>()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn find_levels(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;
    for ent in entries {
        let path = ent?.path();
        if path.extension().is_some_and(|ext| ext == EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
