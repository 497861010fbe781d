use crate::error::{Error, Result};
use crate::pgn::write_pgn;
use crate::piece::Color;
use crate::rules::Rules;
use crate::square::{square_name, Square};
use crate::tracker::Outcome;
use crate::tree::{GameTree, NodeId, Path};
use tracing::info;

/// One line of a game with a single hidden king square per node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalLine {
    /// Hidden king square at every node of the line, root first
    pub kings: Vec<Square>,
    /// Notation of every ply, hidden plies written as king moves
    pub sans: Vec<String>,
    pub outcome: Option<Outcome>,
}

/// Picks one king trajectory along `path` that every hidden ply can
/// follow with a single king step, starting from the end of the line.
///
/// # Panics
/// When a hidden ply has no candidate next to the square picked after it,
/// which means tracking and reconstruction disagree.
pub fn reconstruct<R: Rules>(tree: &GameTree<R>, path: &Path) -> Result<CanonicalLine> {
    let mut line = CanonicalLine {
        kings: Vec::with_capacity(path.len() + 1),
        sans: Vec::with_capacity(path.len()),
        outcome: None,
    };
    pick_king(tree, tree.root(), path, &mut line).ok_or_else(|| Error::UnknownPath(path.to_string()))?;
    line.kings.reverse();
    line.sans.reverse();
    Ok(line)
}

// Kings and notation are pushed innermost first. None when the path leaves the tree.
fn pick_king<R: Rules>(tree: &GameTree<R>, id: NodeId, path: &Path, line: &mut CanonicalLine) -> Option<Square> {
    let tracker = &tree.node(id).tracker;
    let Some(token) = path.head() else {
        let (outcome, witness) = tracker.outcome_with_witness();
        line.outcome = outcome;
        let preferred = if tracker.turn() == Color::HIDDEN { witness } else { None };
        let king = preferred
            .or_else(|| tracker.candidates().first())
            .unwrap_or_else(|| panic!("no candidate left at {}", tree.path_of(id)));
        line.kings.push(king);
        return Some(king);
    };

    let child = tree.child_by_token(id, token)?;
    let child_king = pick_king(tree, child, &path.tail(), line)?;

    let king = if tracker.turn() == Color::VISIBLE {
        line.sans.push(tree.node(child).san.clone().unwrap_or_default());
        child_king
    } else {
        line.sans.push(format!("K{}", square_name(child_king).unwrap_or_default()));
        (tracker.candidates() & tracker.king_step_targets(child_king))
            .first()
            .unwrap_or_else(|| {
                panic!(
                    "no candidate next to {} at {}",
                    square_name(child_king).unwrap_or_default(),
                    tree.path_of(id)
                )
            })
    };
    line.kings.push(king);
    Some(king)
}

/// Notation document of the line along `path`, the hidden king standing
/// on its canonical square in the `FEN` header.
pub fn export<R: Rules>(tree: &GameTree<R>, path: &Path) -> Result<String> {
    let line = reconstruct(tree, path)?;
    let root = &tree.node(tree.root()).tracker;
    let start_king = line.kings.first().copied().unwrap_or_default();
    let result = Outcome::result(line.outcome);
    let headers = vec![
        ("FEN".to_string(), root.fen_with_king(start_king)),
        ("Result".to_string(), result.clone()),
    ];
    info!(path = %path, plies = line.sans.len(), %result, "line exported");
    Ok(write_pgn(
        &headers,
        root.position().fullmoves(),
        root.turn(),
        &line.sans,
        &result,
    ))
}
