//! The solver engine.
//!
//! Prioritized breadth-first search. Plain breadth-first uses exponential
//! memory; here the work queue is kept sorted by priority so positions with
//! more cards out are serviced first. The solution found is therefore not
//! guaranteed shortest, but it beats depth-first badly on quality and plain
//! breadth-first on memory.
//!
//! One [`Solver`] owns everything a search touches: the live tableau, the
//! pile interner, the packed-position store, the position slab and the
//! hundred priority queues. Nothing is shared; batch solving runs one solver
//! per board.

use std::collections::VecDeque;

use log::{debug, warn};
use smallvec::SmallVec;
use thiserror::Error;

use crate::card::Card;
use crate::layout::Layout;
use crate::params::SolverParams;

pub mod arena;
pub mod fnv;
pub mod intern;
pub mod movegen;
pub mod ordering;
pub mod prune;
pub mod tableau;
pub mod tree;

pub use movegen::{Move, PileKind};

use arena::MemBudget;
use intern::{PileId, PileInterner};
use movegen::MoveBuf;
use tableau::Tableau;
use tree::{InsertOutcome, NodeId, TreeStore};

pub const MAX_WORK_PILES: usize = 13;
pub const MAX_FREECELLS: usize = 8;

/// One FIFO queue per priority level.
pub const NUM_QUEUES: usize = 100;

/// Default allocation allowance per solver, about 50 MB.
pub const DEFAULT_MEMORY_LIMIT: usize = 50_000_000;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SolverError {
    #[error("memory budget exhausted")]
    OutOfMemory,
    #[error("pile id space exhausted")]
    PileOverflow,
    #[error("checked-states limit reached")]
    StateLimit,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("too many work piles")]
    TooManyWorkPiles,
    #[error("too many free cells")]
    TooManyFreeCells,
    #[error("at least one work pile is required")]
    NoWorkPiles,
}

/// Search outcome. `NoSol` is the initial value and survives until a win or
/// a failure flips it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    Win,
    NoSol,
    Fail,
}

/// Game variant parameters: which cards stack and how many piles there are.
#[derive(Clone, Copy, Debug)]
pub struct GameConfig {
    /// Seahaven stacks same-suit; Freecell stacks alternating colors.
    pub same_suit: bool,
    /// Only kings may start an empty work pile.
    pub king_only: bool,
    pub nwpiles: usize,
    pub ntpiles: usize,
}

impl GameConfig {
    pub fn freecell() -> GameConfig {
        GameConfig {
            same_suit: false,
            king_only: false,
            nwpiles: 8,
            ntpiles: 4,
        }
    }

    pub fn seahaven() -> GameConfig {
        GameConfig {
            same_suit: true,
            king_only: false,
            nwpiles: 10,
            ntpiles: 4,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nwpiles == 0 {
            return Err(ConfigError::NoWorkPiles);
        }
        if self.nwpiles > MAX_WORK_PILES {
            return Err(ConfigError::TooManyWorkPiles);
        }
        if self.ntpiles > MAX_FREECELLS {
            return Err(ConfigError::TooManyFreeCells);
        }
        Ok(())
    }

    /// Suit-bit mask for the stacking test: color bit for Freecell, both
    /// suit bits for Seahaven.
    #[inline]
    pub(crate) fn suit_mask(&self) -> u8 {
        if self.same_suit { 0x3 } else { 0x1 }
    }

    /// Required xor of the suit bits: differing colors, or equal suits.
    #[inline]
    pub(crate) fn suit_val(&self) -> u8 {
        if self.same_suit { 0x0 } else { 0x1 }
    }
}

pub type PosId = u32;

/// One examined position. The packed pile configuration lives in the store
/// node; the free cells are kept here because they are not part of the
/// canonical key and would otherwise need recomputing from the move chain.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Position {
    pub parent: Option<PosId>,
    pub node: NodeId,
    /// The move that produced this position (sentinel card on the root).
    pub mv: Move,
    pub cluster: u16,
    pub depth: u16,
    /// Live child positions; the position can be recycled when it has none
    /// and is off the queue.
    pub nchild: u8,
    /// Number of occupied free cells.
    pub ntemp: u8,
    pub freecells: [Card; MAX_FREECELLS],
}

/// Diagnostic counters.
#[derive(Clone, Copy, Debug)]
pub struct Stats {
    /// Unique positions inserted into the store.
    pub checked_states: u64,
    /// Insert attempts, including duplicates.
    pub generated_states: u64,
    pub remaining_memory: usize,
    pub num_solutions: u32,
}

pub struct Solver {
    cfg: GameConfig,
    params: SolverParams,
    /// Successor-count threshold below which expansion recurses instead of
    /// queueing. Copied out of `params.x[10]`.
    cutoff: i32,
    /// Stack mode (`-S`): newest-first dispatch, no depth improvements.
    to_stack: bool,
    /// Keep searching after a win; every further win replaces the trace.
    dont_exit_on_sol: bool,
    max_num_checked_states: Option<u64>,

    budget: MemBudget,
    interner: PileInterner,
    store: TreeStore,
    tableau: Tableau,

    positions: Vec<Position>,
    /// Recycled position slots.
    free_positions: Vec<PosId>,

    queues: Vec<VecDeque<PosId>>,
    max_queue_idx: usize,
    /// Saw-tooth dequeue cursor.
    qpos: i32,
    minpos: i32,

    status: Status,
    num_checked_states: u64,
    num_states_in_collection: u64,
    num_solutions: u32,
    moves_to_win: Vec<Move>,
}

impl Solver {
    pub fn new(
        cfg: GameConfig,
        params: SolverParams,
        memory_limit: usize,
    ) -> Result<Solver, SolverError> {
        cfg.validate()?;
        let mut budget = MemBudget::new(memory_limit);
        let store = TreeStore::new(cfg.nwpiles, &mut budget)?;
        Ok(Solver {
            cfg,
            params,
            cutoff: params.cutoff(),
            to_stack: false,
            dont_exit_on_sol: false,
            max_num_checked_states: None,
            budget,
            interner: PileInterner::new(),
            store,
            tableau: Tableau::new(&cfg),
            positions: Vec::new(),
            free_positions: Vec::new(),
            queues: vec![VecDeque::new(); NUM_QUEUES],
            max_queue_idx: 0,
            qpos: 0,
            minpos: 0,
            status: Status::NoSol,
            num_checked_states: 0,
            num_states_in_collection: 0,
            num_solutions: 0,
            moves_to_win: Vec::new(),
        })
    }

    pub fn set_params(&mut self, params: SolverParams) {
        self.params = params;
        self.cutoff = params.cutoff();
    }

    pub fn set_to_stack(&mut self, to_stack: bool) {
        self.to_stack = to_stack;
    }

    pub fn set_dont_exit_on_sol(&mut self, keep_going: bool) {
        self.dont_exit_on_sol = keep_going;
    }

    pub fn set_max_checked_states(&mut self, max: Option<u64>) {
        self.max_num_checked_states = max;
    }

    pub fn set_cutoff(&mut self, cutoff: i32) {
        self.cutoff = cutoff;
        self.params.x[crate::params::NUM_X - 1] = cutoff;
    }

    /// Install the starting layout. The layout must use at most the
    /// configured number of piles and cells; missing piles are empty.
    pub fn load_layout(&mut self, layout: &Layout) -> Result<(), SolverError> {
        if layout.piles.len() > self.cfg.nwpiles {
            return Err(ConfigError::TooManyWorkPiles.into());
        }
        if layout.freecells.len() > self.cfg.ntpiles {
            return Err(ConfigError::TooManyFreeCells.into());
        }
        self.tableau.load(layout);
        Ok(())
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// The winning move sequence, once one has been found.
    pub fn solution(&self) -> Option<&[Move]> {
        if self.status == Status::Win || self.num_solutions > 0 {
            Some(&self.moves_to_win)
        } else {
            None
        }
    }

    pub fn stats(&self) -> Stats {
        Stats {
            checked_states: self.num_checked_states,
            generated_states: self.num_states_in_collection,
            remaining_memory: self.budget.remaining(),
            num_solutions: self.num_solutions,
        }
    }

    #[inline]
    fn descending(&self) -> bool {
        self.params.x[9] < 0
    }

    #[inline]
    fn fail(&mut self, err: SolverError) {
        if self.status == Status::NoSol {
            warn!("search failed: {err}");
            self.status = Status::Fail;
        }
    }

    /// Run the search to completion and return the final status.
    pub fn run(&mut self) -> Status {
        let descending = self.descending();
        if let Err(e) = self
            .tableau
            .sort_piles(&mut self.interner, descending, &mut self.budget)
        {
            self.fail(e);
            return self.status;
        }
        let Some(root) = self.new_position(None, &Move::default()) else {
            return self.status;
        };
        self.queue_position(root, 0);

        while let Some(pos) = self.dequeue_position() {
            if !self.solve(pos) {
                self.free_position_chain(pos);
            }
        }

        debug!(
            "search over: {:?}, {} unique states, {} generated, {} bytes left",
            self.status,
            self.num_checked_states,
            self.num_states_in_collection,
            self.budget.remaining()
        );
        self.status
    }

    /// Expand one position: generate pruned moves, apply each, and either
    /// recurse (progress or near-leaf) or queue the child. Returns whether
    /// this position must be kept alive for a queued descendant.
    fn solve(&mut self, parent: PosId) -> bool {
        // After a win or failure we still drain the queues, but expand
        // nothing, so the position store unwinds deterministically.
        if self.status != Status::NoSol {
            return false;
        }

        // Found again by a shorter path since it was queued: this copy of
        // the path is superseded.
        {
            let p = &self.positions[parent as usize];
            if self.store.depth(p.node) < p.depth {
                return false;
            }
        }

        let moves = self.get_moves(parent);
        if moves.is_empty() {
            if self.tableau.is_won() {
                self.win(parent);
            }
            return false;
        }

        let nmoves = moves.len();
        self.positions[parent as usize].nchild = nmoves as u8;
        let parent_cluster = self.positions[parent as usize].cluster;
        let descending = self.descending();

        let mut keep = false;
        for m in &moves {
            self.tableau.make_move(m);
            if let Err(e) = self
                .tableau
                .sort_piles(&mut self.interner, descending, &mut self.budget)
            {
                self.fail(e);
                self.tableau.undo_move(m);
                self.positions[parent as usize].nchild -= 1;
                continue;
            }

            let Some(child) = self.new_position(Some(parent), m) else {
                // Duplicate, inferior, or out of memory.
                self.tableau.undo_move(m);
                self.positions[parent as usize].nchild -= 1;
                continue;
            };

            // A cluster change means a card went out: follow it depth-first.
            // A small move count is close to a dead end, also worth chasing
            // down right away instead of queueing.
            if self.positions[child as usize].cluster != parent_cluster
                || (nmoves as i32) < self.cutoff
            {
                let child_keep = self.solve(child);
                self.tableau.undo_move(m);
                if !child_keep {
                    self.free_position(child);
                }
                keep |= child_keep;
            } else {
                self.queue_position(child, m.pri as i32);
                self.tableau.undo_move(m);
                keep = true;
            }
        }
        keep
    }

    /// Generate, prune, mark and prioritize the moves from the live
    /// position. Refused foundation moves are rotated to the back: they are
    /// still good moves, but recursing on them after queueing the others
    /// keeps the search breadth-first on non-progress.
    fn get_moves(&mut self, parent: PosId) -> SmallVec<[Move; 16]> {
        let mut possible = MoveBuf::new();
        let (auto, numout) =
            movegen::get_possible_moves(&self.tableau, &self.cfg, &self.params.x, &mut possible);

        let mut live = possible.len();
        if !auto {
            for i in 0..possible.len() {
                let m = possible[i];
                if prune::prune_seahaven(&self.tableau, &self.cfg, &m)
                    || prune::prune_redundant(&self.positions, parent, self.cfg.ntpiles, &m)
                {
                    possible[i].card = Card::EMPTY;
                    live -= 1;
                }
            }
            ordering::mark_irreversible(&self.cfg, &self.params.x, &mut possible);
            if live > 0 {
                ordering::prioritize(&self.tableau, &self.params.x, &mut possible);
            }
        }

        let mut out = SmallVec::new();
        if live == 0 {
            return out;
        }
        if auto || numout == 0 {
            out.extend(possible.iter().copied().filter(|m| !m.card.is_empty()));
        } else {
            out.extend(possible[numout..].iter().copied().filter(|m| !m.card.is_empty()));
            out.extend(possible[..numout].iter().copied().filter(|m| !m.card.is_empty()));
        }
        out
    }

    /// Pack the live position and wrap it in a `Position` if it is new (or
    /// newly better). Returns `None` for duplicates and on failure; after a
    /// failure every further allocation refuses, so the caller's loop drains.
    fn new_position(&mut self, parent: Option<PosId>, m: &Move) -> Option<PosId> {
        if self.status == Status::Fail {
            return None;
        }
        let depth = match parent {
            Some(p) => self.positions[p as usize].depth + 1,
            None => 0,
        };

        let cluster = self.tableau.cluster();
        let mut ids = [0 as PileId; MAX_WORK_PILES];
        self.tableau.sorted_ids(&mut ids);
        let inserted = self.store.insert(
            cluster,
            &ids[..self.cfg.nwpiles],
            depth,
            self.to_stack,
            &mut self.budget,
        );
        let (outcome, node) = match inserted {
            Ok(v) => v,
            Err(e) => {
                self.fail(e);
                return None;
            }
        };
        self.num_states_in_collection += 1;

        match outcome {
            InsertOutcome::New => {
                self.num_checked_states += 1;
                if self
                    .max_num_checked_states
                    .is_some_and(|max| self.num_checked_states > max)
                {
                    self.fail(SolverError::StateLimit);
                    return None;
                }
            }
            InsertOutcome::FoundBetter => {}
            InsertOutcome::Found => return None,
        }

        let id = match self.free_positions.pop() {
            Some(id) => id,
            None => {
                if let Err(e) = self.budget.charge(size_of::<Position>()) {
                    self.fail(e);
                    return None;
                }
                self.positions.push(Position::default());
                (self.positions.len() - 1) as PosId
            }
        };
        self.positions[id as usize] = Position {
            parent,
            node,
            mv: *m,
            cluster,
            depth,
            nchild: 0,
            ntemp: self.tableau.num_cards_in_freecells(),
            freecells: self.tableau.freecells,
        };
        Some(id)
    }

    /// Capture the winning move chain. In `-E` mode the search keeps going;
    /// the depth watermark guarantees any later trace is no longer.
    fn win(&mut self, pos: PosId) {
        let mut moves = Vec::new();
        let mut at = pos;
        while let Some(parent) = self.positions[at as usize].parent {
            moves.push(self.positions[at as usize].mv);
            at = parent;
        }
        moves.reverse();
        debug!("winner: {} moves", moves.len());
        self.num_solutions += 1;
        self.moves_to_win = moves;
        if !self.dont_exit_on_sol {
            self.status = Status::Win;
        }
    }

    /// Queue a position at its move priority plus the queue-squash term: a
    /// quadratic bonus in the number of cards out, clamped to the queue
    /// range.
    fn queue_position(&mut self, pos: PosId, pri: i32) {
        let nout = self.tableau.foundation_total() as f64;
        let y = &self.params.y;
        let squash = (y[0] * nout + y[1]) * nout + y[2];
        let pri = (pri + (squash + 0.5).floor() as i32).clamp(0, NUM_QUEUES as i32 - 1) as usize;

        if pri > self.max_queue_idx {
            self.max_queue_idx = pri;
        }
        if self.to_stack {
            self.queues[pri].push_front(pos);
        } else {
            self.queues[pri].push_back(pos);
        }
    }

    /// Prioritized round robin: sweeps run from the top priority downwards
    /// and get longer each time, so high priorities are serviced most
    /// without starving the low ones. The dequeued position is unpacked
    /// into the tableau.
    fn dequeue_position(&mut self) -> Option<PosId> {
        let mut last = false;
        loop {
            self.qpos -= 1;
            if self.qpos < self.minpos {
                if last {
                    return None;
                }
                self.qpos = self.max_queue_idx as i32;
                self.minpos -= 1;
                if self.minpos < 0 {
                    self.minpos = self.max_queue_idx as i32;
                }
                if self.minpos == 0 {
                    last = true;
                }
            }
            if !self.queues[self.qpos as usize].is_empty() {
                break;
            }
        }

        let pos = self.queues[self.qpos as usize].pop_front()?;

        // Walk the watermark down if the top queue drained.
        while self.queues[self.qpos as usize].is_empty()
            && self.qpos as usize == self.max_queue_idx
            && self.max_queue_idx > 0
        {
            self.max_queue_idx -= 1;
            self.qpos -= 1;
            if self.qpos < self.minpos {
                self.minpos = self.qpos;
            }
        }

        self.unpack_position(pos);
        Some(pos)
    }

    /// Restore the tableau from a stored position: foundations from the
    /// cluster nibbles, piles through the interner's reverse lookup, free
    /// cells from the snapshot.
    fn unpack_position(&mut self, pos: PosId) {
        let p = &self.positions[pos as usize];
        let node = p.node;
        let cluster = p.cluster;
        let freecells = p.freecells;

        let mut ids = [0 as PileId; MAX_WORK_PILES];
        tree::unpack_key(self.store.key(node), self.cfg.nwpiles, &mut ids);

        let tab = &mut self.tableau;
        tab.foundations[0] = (cluster & 0xf) as u8;
        tab.foundations[1] = (cluster >> 4 & 0xf) as u8;
        tab.foundations[2] = (cluster >> 8 & 0xf) as u8;
        tab.foundations[3] = (cluster >> 12 & 0xf) as u8;

        for w in 0..self.cfg.nwpiles {
            let id = ids[w];
            tab.piles[w] = self.interner.pile_bytes(id).iter().map(|&b| Card(b)).collect();
            tab.ids[w] = id;
            tab.hashes[w] = self.interner.pile_hash(id);
        }
        tab.freecells = freecells;
    }

    /// Recycle a position whose expansion kept nothing.
    fn free_position(&mut self, pos: PosId) {
        self.free_positions.push(pos);
        if let Some(parent) = self.positions[pos as usize].parent {
            self.positions[parent as usize].nchild -= 1;
        }
    }

    /// Recycle a dequeued position and cascade up through parents that have
    /// no children left. Tree nodes are never freed; only the `Position`
    /// wrappers are recycled.
    fn free_position_chain(&mut self, pos: PosId) {
        let mut at = pos;
        loop {
            self.free_positions.push(at);
            let Some(parent) = self.positions[at as usize].parent else {
                return;
            };
            self.positions[parent as usize].nchild -= 1;
            if self.positions[parent as usize].nchild != 0 {
                return;
            }
            at = parent;
        }
    }
}
