//! Command-line solver. Parse args, read or deal the position, run the
//! search, and report the moves.

use std::io::Read;
use std::process::ExitCode;

use clap::Parser;

use freehaven::search::DEFAULT_MEMORY_LIMIT;
use freehaven::search::arena::BLOCK_SIZE;
use freehaven::{
    GameConfig, Layout, Preset, Solver, SolverParams, Status, deal_ms, params::NUM_X,
};

#[derive(Parser, Debug)]
#[command(
    name = "freehaven",
    about = "Solve Freecell and Seahaven type patience (solitaire) games",
    after_help = "-s implies -a -w10 -t4, -f implies -a -w8 -t4.\n\
                  Set PATSOLVE_START and PATSOLVE_END to solve a range of \
                  Microsoft board numbers instead of reading a layout."
)]
struct Args {
    /// Seahaven mode: same-suit stacking, 10 work piles
    #[arg(short = 's', conflicts_with = "freecell")]
    seahaven: bool,

    /// Freecell mode: red/black stacking, 8 work piles (the default)
    #[arg(short = 'f')]
    freecell: bool,

    /// Only kings may start an empty pile
    #[arg(short = 'k', conflicts_with = "any_card")]
    king_only: bool,

    /// Any card may start an empty pile
    #[arg(short = 'a')]
    any_card: bool,

    /// Number of work piles
    #[arg(short = 'w', value_name = "N")]
    work_piles: Option<usize>,

    /// Number of free cells
    #[arg(short = 't', value_name = "N")]
    free_cells: Option<usize>,

    /// Don't stop at the first solution; keep looking for shorter ones
    #[arg(short = 'E', conflicts_with = "to_stack")]
    no_exit: bool,

    /// Speed mode: find a solution quickly rather than a good one
    #[arg(short = 'S')]
    to_stack: bool,

    /// Quiet: print only the solution
    #[arg(short = 'q')]
    quiet: bool,

    /// Verbose: enable debug logging
    #[arg(short = 'v', conflicts_with = "quiet")]
    verbose: bool,

    /// Override the first ten x parameters
    #[arg(short = 'X', num_args = 10, value_name = "X", allow_negative_numbers = true)]
    x_params: Option<Vec<i32>>,

    /// Override the queue-dispatch cutoff (the last x parameter)
    #[arg(short = 'c', value_name = "N")]
    cutoff: Option<i32>,

    /// Override the three y parameters
    #[arg(short = 'Y', num_args = 3, value_name = "Y", allow_negative_numbers = true)]
    y_params: Option<Vec<f64>>,

    /// Use a parameter preset (0..=7)
    #[arg(short = 'P', value_name = "N")]
    preset: Option<usize>,

    /// Memory limit in megabytes
    #[arg(short = 'M', value_name = "MB")]
    megabytes: Option<usize>,

    /// Layout file; "-" or absent reads stdin
    layout: Option<String>,
}

fn auto_preset(cfg: &GameConfig, to_stack: bool) -> Preset {
    match (cfg.same_suit, cfg.king_only, to_stack) {
        (true, true, false) => Preset::SeahavenKing,
        (true, true, true) => Preset::SeahavenKingSpeed,
        (true, false, false) => Preset::SeahavenBest,
        (true, false, true) => Preset::SeahavenSpeed,
        (false, false, false) => Preset::FreecellBest,
        // Freecell defaults, including the odd freecell-plus-kings combo.
        _ => Preset::FreecellSpeed,
    }
}

fn env_board(name: &str) -> Result<Option<u64>, String> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| format!("{name} is not a board number: {value:?}")),
        Err(_) => Ok(None),
    }
}

struct Session {
    cfg: GameConfig,
    params: SolverParams,
    cutoff: i32,
    to_stack: bool,
    no_exit: bool,
    max_states: Option<u64>,
    memory_limit: usize,
}

impl Session {
    fn solver(&self) -> Result<Solver, freehaven::SolverError> {
        let mut solver = Solver::new(self.cfg, self.params, self.memory_limit)?;
        solver.set_cutoff(self.cutoff);
        solver.set_to_stack(self.to_stack);
        solver.set_dont_exit_on_sol(self.no_exit);
        solver.set_max_checked_states(self.max_states);
        Ok(solver)
    }
}

fn solve_one(
    session: &Session,
    layout: &Layout,
    quiet: bool,
    print_moves: bool,
) -> Result<Status, String> {
    let mut solver = session.solver().map_err(|e| e.to_string())?;
    solver.load_layout(layout).map_err(|e| e.to_string())?;
    let status = solver.run();

    if let Some(moves) = solver.solution() {
        if print_moves {
            for m in moves {
                println!("{m}");
            }
        }
        if !quiet {
            println!("A winner.");
            println!("{} moves.", moves.len());
        }
    }
    if !quiet {
        match status {
            Status::Win => {}
            Status::Fail => println!("Out of memory."),
            Status::NoSol if solver.stats().num_solutions > 0 => {
                println!("No shorter solutions.")
            }
            Status::NoSol => println!("No solution."),
        }
    }

    // -E keeps the status at NoSol while collecting solutions.
    if solver.stats().num_solutions > 0 {
        return Ok(Status::Win);
    }
    Ok(status)
}

fn run() -> Result<ExitCode, String> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let mut cfg = if args.seahaven {
        GameConfig::seahaven()
    } else {
        GameConfig::freecell()
    };
    cfg.king_only = args.king_only;
    if let Some(w) = args.work_piles {
        cfg.nwpiles = w;
    }
    if let Some(t) = args.free_cells {
        cfg.ntpiles = t;
    }
    cfg.validate().map_err(|e| e.to_string())?;

    let mut params = match args.preset {
        Some(index) => {
            let preset = Preset::from_index(index).ok_or("invalid parameter preset")?;
            SolverParams::preset(preset)
        }
        None => SolverParams::preset(auto_preset(&cfg, args.to_stack)),
    };
    if let Some(x) = &args.x_params {
        params.x[..NUM_X - 1].copy_from_slice(x);
    }
    if let Some(y) = &args.y_params {
        params.y.copy_from_slice(y);
    }
    let cutoff = args.cutoff.unwrap_or(params.x[NUM_X - 1]);

    let memory_limit = match args.megabytes {
        Some(mb) => mb * 1_000_000,
        None => DEFAULT_MEMORY_LIMIT,
    };
    if memory_limit < 2 * BLOCK_SIZE {
        return Err("-M too small".into());
    }

    if !args.quiet {
        print!("{}", if cfg.same_suit { "Seahaven; " } else { "Freecell; " });
        if cfg.king_only {
            println!("only Kings are allowed to start a pile.");
        } else {
            println!("any card may start a pile.");
        }
        println!("{} work piles, {} temp cells.", cfg.nwpiles, cfg.ntpiles);
    }

    let session = Session {
        cfg,
        params,
        cutoff,
        to_stack: args.to_stack,
        no_exit: args.no_exit,
        max_states: None,
        memory_limit,
    };

    // Range mode: play consecutive Microsoft boards.
    let start = env_board("PATSOLVE_START")?;
    let end = env_board("PATSOLVE_END")?;
    if let Some(start) = start {
        let end = end.ok_or("PATSOLVE_START is set but PATSOLVE_END is not")?;
        for board in start..end {
            println!("#{board}");
            let layout = deal_ms(board, cfg.nwpiles);
            match solve_one(&session, &layout, true, false)? {
                Status::Win => println!("#{board} - Won"),
                Status::NoSol => println!("#{board} - Impossible"),
                Status::Fail => println!("#{board} - OutOfMem"),
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    // Single layout from a file or stdin.
    let text = match args.layout.as_deref() {
        Some("-") | None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("cannot read stdin: {e}"))?;
            text
        }
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read input file '{path}': {e}"))?,
    };
    let layout = Layout::parse(&text).map_err(|e| e.to_string())?;

    match solve_one(&session, &layout, args.quiet, true)? {
        Status::Win => Ok(ExitCode::SUCCESS),
        Status::NoSol => Ok(ExitCode::from(1)),
        Status::Fail => Ok(ExitCode::from(2)),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(message) => {
            eprintln!("freehaven: {message}");
            ExitCode::from(2)
        }
    }
}
