//! freehaven: a solver for Freecell- and Seahaven-style patience games.
//!
//! The core is a prioritized best-first search over the implicit game graph.
//! Positions are canonicalized (piles sorted by interned id), bit-packed and
//! deduplicated in per-cluster binary trees; the move generator prunes
//! provably redundant lines and ranks the rest with a small tuned parameter
//! vector. The Microsoft-compatible dealer reproduces the classic numbered
//! boards bit for bit.
//!
//! ```no_run
//! use freehaven::{GameConfig, Solver, SolverParams, Preset, Status};
//! use freehaven::deal_ms;
//! use freehaven::search::DEFAULT_MEMORY_LIMIT;
//!
//! let layout = deal_ms(1, 8);
//! let params = SolverParams::preset(Preset::FreecellBest);
//! let mut solver = Solver::new(GameConfig::freecell(), params, DEFAULT_MEMORY_LIMIT)?;
//! solver.load_layout(&layout)?;
//! if solver.run() == Status::Win {
//!     for m in solver.solution().unwrap() {
//!         println!("{m}");
//!     }
//! }
//! # Ok::<(), freehaven::SolverError>(())
//! ```

pub mod card;
pub mod deal;
pub mod layout;
pub mod params;
pub mod search;

pub use card::Card;
pub use deal::{MsRng, deal_ms};
pub use layout::{Layout, LayoutError};
pub use params::{PRESETS, Preset, SolverParams};
pub use search::{
    ConfigError, GameConfig, Move, PileKind, Solver, SolverError, Stats, Status,
};
