//! Exhaustive depth-first search over the pour graph.
//!
//! The search mutates a single [`PuzzleState`] in place: every pour that does
//! not lead to a solution is undone before the next candidate is tried. Pairs
//! `(i, j)` are visited in lexicographic order, so the first solution found is
//! deterministic.
//!
//! The traversal runs on an explicit frame stack rather than the call stack,
//! which lets callers bound depth, node count and wall-clock time. With the
//! default [`SolverConfig`] no bound applies and the visiting order is exactly
//! that of the plain recursive formulation.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::Result;
use crate::state::{PourRecord, PuzzleState, StateKey};

/// Configuration for the solver
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Do not expand nodes at or beyond this many pours
    pub max_depth: Option<usize>,
    /// Stop after visiting this many nodes
    pub max_nodes: Option<u64>,
    /// Maximum time to search
    pub timeout: Option<Duration>,
    /// Skip configurations that were already expanded
    pub dedupe: bool,
}

/// Why a search stopped without a definite answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The tree was exhausted but some nodes were cut off by `max_depth`
    DepthLimit,
    NodeLimit,
    Timeout,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::DepthLimit => "depth_limit",
            StopReason::NodeLimit => "node_limit",
            StopReason::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Pours that reach a solved state, in the order applied
    Solved(Vec<PourRecord>),
    /// Every reachable branch was explored without finding a solution
    Unsolvable,
    /// A limit ended the search before it could decide
    LimitReached(StopReason),
}

impl SearchOutcome {
    pub fn is_solved(&self) -> bool {
        matches!(self, SearchOutcome::Solved(_))
    }

    pub fn into_solution(self) -> Option<Vec<PourRecord>> {
        match self {
            SearchOutcome::Solved(moves) => Some(moves),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchOutcome::Solved(_) => "solved",
            SearchOutcome::Unsolvable => "unsolvable",
            SearchOutcome::LimitReached(reason) => reason.as_str(),
        }
    }
}

/// Result of the solver search
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub outcome: SearchOutcome,
    /// Number of search tree nodes visited
    pub nodes_visited: u64,
    /// Deepest pour sequence explored
    pub max_depth: usize,
    /// Nodes not expanded because of `max_depth`
    pub depth_cutoffs: u64,
    /// Nodes not expanded because their configuration was already seen
    pub duplicates_pruned: u64,
    /// Time elapsed in milliseconds
    pub time_elapsed_ms: u64,
}

/// One expanded node: the position of the next `(i, j)` pair to try.
#[derive(Debug, Clone, Copy, Default)]
struct SearchFrame {
    cursor: usize,
}

impl SearchFrame {
    fn next_legal_pour(&mut self, state: &PuzzleState) -> Option<(usize, usize)> {
        let n = state.len();
        while self.cursor < n * n {
            let (i, j) = (self.cursor / n, self.cursor % n);
            self.cursor += 1;
            if i != j && state.is_legal_pour(i, j) {
                return Some((i, j));
            }
        }
        None
    }
}

/// Search for a pour sequence that solves `state`.
///
/// On success the winning pours remain applied and recorded in the state's
/// history. Otherwise every pour made by the search is undone before
/// returning, leaving the state as it was passed in.
pub fn solve(state: &mut PuzzleState, config: &SolverConfig) -> Result<SolverResult> {
    let start_time = Instant::now();
    let deadline = config.timeout.map(|t| start_time + t);

    let mut nodes_visited: u64 = 0;
    let mut max_depth = 0;
    let mut depth_cutoffs: u64 = 0;
    let mut duplicates_pruned: u64 = 0;
    let mut visited: HashSet<StateKey> = HashSet::new();

    let mut frames: Vec<SearchFrame> = Vec::new();
    let mut path: Vec<PourRecord> = Vec::new();

    info!(containers = state.len(), "starting search");

    let mut entering = true;
    let stop = loop {
        if entering {
            entering = false;
            nodes_visited += 1;
            max_depth = max_depth.max(path.len());

            if state.is_solved() {
                info!(
                    moves = path.len(),
                    nodes = nodes_visited,
                    "solution found"
                );
                return Ok(SolverResult {
                    outcome: SearchOutcome::Solved(path),
                    nodes_visited,
                    max_depth,
                    depth_cutoffs,
                    duplicates_pruned,
                    time_elapsed_ms: start_time.elapsed().as_millis() as u64,
                });
            }

            if config.max_nodes.is_some_and(|limit| nodes_visited >= limit) {
                break Some(StopReason::NodeLimit);
            }
            if deadline.is_some_and(|d| Instant::now() > d) {
                break Some(StopReason::Timeout);
            }

            let expand = if config.max_depth.is_some_and(|d| path.len() >= d) {
                depth_cutoffs += 1;
                false
            } else if config.dedupe && !visited.insert(state.config_key()) {
                duplicates_pruned += 1;
                false
            } else {
                true
            };

            if expand {
                frames.push(SearchFrame::default());
            } else {
                // Dead end: back out of the pour that led here.
                if path.pop().is_none() {
                    break None;
                }
                state.undo()?;
            }
        }

        let Some(frame) = frames.last_mut() else {
            break None;
        };

        match frame.next_legal_pour(state) {
            Some((i, j)) => {
                path.push(state.pour(i, j));
                entering = true;
            }
            None => {
                frames.pop();
                if frames.is_empty() {
                    break None;
                }
                path.pop();
                state.undo()?;
            }
        }
    };

    // Unwind whatever is still applied so the caller gets its state back.
    while path.pop().is_some() {
        state.undo()?;
    }

    let outcome = match stop {
        Some(reason) => SearchOutcome::LimitReached(reason),
        None if depth_cutoffs > 0 => SearchOutcome::LimitReached(StopReason::DepthLimit),
        None => SearchOutcome::Unsolvable,
    };
    debug!(
        outcome = outcome.as_str(),
        nodes = nodes_visited,
        depth_cutoffs,
        duplicates_pruned,
        "search ended without solution"
    );

    Ok(SolverResult {
        outcome,
        nodes_visited,
        max_depth,
        depth_cutoffs,
        duplicates_pruned,
        time_elapsed_ms: start_time.elapsed().as_millis() as u64,
    })
}

/// Unbounded search. Returns `None` if no pour sequence solves the puzzle.
pub fn search(state: &mut PuzzleState) -> Result<Option<Vec<PourRecord>>> {
    Ok(solve(state, &SolverConfig::default())?.outcome.into_solution())
}

/// Replay `moves` on a copy of `initial` and check that every pour is legal
/// and the final state is solved.
pub fn verify_solution(initial: &PuzzleState, moves: &[(usize, usize)]) -> Result<bool> {
    let mut state = initial.clone();
    state.apply_moves(moves)?;
    Ok(state.is_solved())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::puzzle::Color;

    const RED: Color = Color::new(0);
    const BLUE: Color = Color::new(1);
    const GREEN: Color = Color::new(2);

    fn create_state(capacity: usize, containers: &[&[Color]]) -> PuzzleState {
        PuzzleState::new(
            containers
                .iter()
                .map(|colors| Container::from_colors(capacity, colors.iter().copied()))
                .collect(),
        )
    }

    fn pairs(moves: &[PourRecord]) -> Vec<(usize, usize)> {
        moves.iter().map(|m| (m.source, m.dest)).collect()
    }

    // Straightforward recursive formulation, used to check the frame stack
    // visits nodes in the same order.
    fn recursive_search(
        state: &mut PuzzleState,
        depth: usize,
        limit: usize,
    ) -> Option<Vec<(usize, usize)>> {
        if state.is_solved() {
            return Some(Vec::new());
        }
        if depth >= limit {
            return None;
        }
        let n = state.len();
        for i in 0..n {
            for j in 0..n {
                if i == j || !state.is_legal_pour(i, j) {
                    continue;
                }
                state.pour(i, j);
                if let Some(mut rest) = recursive_search(state, depth + 1, limit) {
                    rest.insert(0, (i, j));
                    return Some(rest);
                }
                state.undo().unwrap();
            }
        }
        None
    }

    #[test]
    fn test_already_solved() {
        let mut state = create_state(2, &[&[RED, RED], &[BLUE], &[]]);
        let result = solve(&mut state, &SolverConfig::default()).unwrap();
        assert_eq!(result.outcome, SearchOutcome::Solved(vec![]));
        assert_eq!(result.nodes_visited, 1);
        assert!(state.history().is_empty());
    }

    #[test]
    fn test_single_pour_solution() {
        let mut state = create_state(2, &[&[RED, BLUE], &[BLUE]]);
        let moves = search(&mut state).unwrap().unwrap();
        assert_eq!(
            moves,
            vec![PourRecord {
                source: 0,
                dest: 1,
                poured: BLUE,
                onto: Some(BLUE),
                units: 1,
            }]
        );
        assert!(state.is_solved());
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn test_two_pour_solution_in_fixed_order() {
        let mut state = create_state(2, &[&[RED, BLUE], &[BLUE, RED], &[]]);
        let initial = state.clone();

        let moves = search(&mut state).unwrap().unwrap();
        assert_eq!(pairs(&moves), vec![(0, 2), (1, 0)]);
        assert_eq!(moves[0].onto, None);
        assert_eq!(moves[1].poured, RED);
        assert!(verify_solution(&initial, &pairs(&moves)).unwrap());
    }

    #[test]
    fn test_unsolvable_leaves_history_empty() {
        let mut state = create_state(2, &[&[RED, BLUE], &[BLUE, RED]]);
        let initial = state.clone();

        let result = solve(&mut state, &SolverConfig::default()).unwrap();
        assert_eq!(result.outcome, SearchOutcome::Unsolvable);
        assert!(!result.outcome.is_solved());
        assert!(state.history().is_empty());
        assert_eq!(state, initial);
    }

    #[test]
    fn test_every_pour_in_solution_is_legal() {
        let mut state = create_state(
            3,
            &[&[RED, BLUE, GREEN], &[GREEN, RED, BLUE], &[BLUE, GREEN, RED], &[], &[]],
        );
        let initial = state.clone();
        let config = SolverConfig {
            max_depth: Some(12),
            ..Default::default()
        };

        let result = solve(&mut state, &config).unwrap();
        let moves = result.outcome.into_solution().expect("puzzle has a solution");

        let mut replay = initial.clone();
        for m in &moves {
            assert!(replay.is_legal_pour(m.source, m.dest));
            let (_, units) = replay.containers()[m.source].surface();
            assert_eq!(units, m.units);
            replay.pour(m.source, m.dest);
        }
        assert!(replay.is_solved());
        assert_eq!(replay.color_counts(), initial.color_counts());
    }

    #[test]
    fn test_matches_recursive_order() {
        let puzzles: [(usize, &[&[Color]]); 3] = [
            (2, &[&[RED, BLUE], &[BLUE, RED], &[]]),
            (2, &[&[RED, BLUE], &[BLUE, GREEN], &[GREEN, RED], &[]]),
            (3, &[&[RED, BLUE, GREEN], &[GREEN, RED, BLUE], &[BLUE, GREEN, RED], &[], &[]]),
        ];
        let limit = 10;

        for (capacity, containers) in puzzles {
            let mut reference = create_state(capacity, containers);
            let expected = recursive_search(&mut reference, 0, limit);

            let mut state = create_state(capacity, containers);
            let config = SolverConfig {
                max_depth: Some(limit),
                ..Default::default()
            };
            let result = solve(&mut state, &config).unwrap();
            let found = result.outcome.into_solution().map(|m| pairs(&m));

            assert_eq!(found, expected);
            assert_eq!(state, reference);
        }
    }

    #[test]
    fn test_depth_limit_unwinds() {
        let mut state = create_state(2, &[&[RED, BLUE], &[BLUE, RED], &[]]);
        let initial = state.clone();
        let config = SolverConfig {
            max_depth: Some(1),
            ..Default::default()
        };

        let result = solve(&mut state, &config).unwrap();
        assert_eq!(
            result.outcome,
            SearchOutcome::LimitReached(StopReason::DepthLimit)
        );
        assert_eq!(result.depth_cutoffs, 2);
        assert_eq!(result.max_depth, 1);
        assert_eq!(state, initial);
    }

    #[test]
    fn test_node_limit_unwinds() {
        let mut state = create_state(2, &[&[RED, BLUE], &[BLUE, RED], &[]]);
        let initial = state.clone();
        let config = SolverConfig {
            max_nodes: Some(2),
            ..Default::default()
        };

        let result = solve(&mut state, &config).unwrap();
        assert_eq!(
            result.outcome,
            SearchOutcome::LimitReached(StopReason::NodeLimit)
        );
        assert_eq!(result.nodes_visited, 2);
        assert!(state.history().is_empty());
        assert_eq!(state, initial);
    }

    #[test]
    fn test_dedupe_finds_same_first_solution() {
        let containers: &[&[Color]] = &[&[RED, BLUE], &[BLUE, RED], &[]];

        let mut plain = create_state(2, containers);
        let expected = search(&mut plain).unwrap().map(|m| pairs(&m));

        let mut state = create_state(2, containers);
        let config = SolverConfig {
            dedupe: true,
            ..Default::default()
        };
        let result = solve(&mut state, &config).unwrap();
        assert_eq!(result.outcome.into_solution().map(|m| pairs(&m)), expected);
    }

    #[test]
    fn test_dedupe_unsolvable_is_exhaustive() {
        let mut state = create_state(2, &[&[RED, BLUE], &[BLUE, RED]]);
        let config = SolverConfig {
            dedupe: true,
            ..Default::default()
        };
        let result = solve(&mut state, &config).unwrap();
        assert_eq!(result.outcome, SearchOutcome::Unsolvable);
        assert!(state.history().is_empty());
    }

    #[test]
    fn test_sample_puzzle() {
        let config =
            crate::puzzle::PuzzleConfig::from_json_str(include_str!("../demos/sample.json")).unwrap();
        let (mut state, _) = config.build().unwrap();
        let initial = state.clone();

        let moves = search(&mut state).unwrap().expect("sample is solvable");
        assert_eq!(moves.len(), 43);
        assert_eq!(pairs(&moves[..3]), vec![(0, 12), (0, 13), (2, 0)]);
        assert_eq!(state.history().len(), 43);
        assert!(verify_solution(&initial, &pairs(&moves)).unwrap());

        let mut deduped = initial.clone();
        let config = SolverConfig {
            dedupe: true,
            ..Default::default()
        };
        let result = solve(&mut deduped, &config).unwrap();
        assert_eq!(result.outcome, SearchOutcome::Solved(moves));
        assert!(result.duplicates_pruned > 0);
    }

    #[test]
    fn test_verify_solution_rejects_incomplete() {
        let state = create_state(2, &[&[RED, BLUE], &[BLUE, RED], &[]]);
        assert!(!verify_solution(&state, &[(0, 2)]).unwrap());
        assert!(verify_solution(&state, &[(0, 2), (1, 0)]).unwrap());
        assert!(verify_solution(&state, &[(0, 1)]).is_err());
    }
}
