use crate::error::Result;
use crate::pgn::{parse_pgn, PgnGame, PgnNode};
use crate::rules::Rules;
use crate::tracker::{Tracker, DEFAULT_SETUP};
use crate::tree::{GameTree, NodeId};
use tracing::{info, warn};

/// Builds a game tree out of a notation document. The `FEN` header, when
/// present, replaces the default setup.
pub fn load<R: Rules>(text: &str) -> Result<GameTree<R>> {
    let game = parse_pgn(text)?;
    let root = Tracker::from_fen(game.header("FEN").unwrap_or(DEFAULT_SETUP))?;
    let mut tree = GameTree::new(root);
    let created = replay_into(&mut tree, &game);
    info!(nodes = created + 1, moves = game.move_count(), "document loaded");
    Ok(tree)
}

/// Replays every line of `game` into `tree`, depth first, and returns how
/// many nodes were created. A move that cannot be read or played ends its
/// own branch, sibling lines are still replayed.
pub fn replay_into<R: Rules>(tree: &mut GameTree<R>, game: &PgnGame) -> usize {
    let before = tree.len();
    let mut stack: Vec<(NodeId, &PgnNode)> = vec![(tree.root(), &game.moves)];
    while let Some((at, node)) = stack.pop() {
        let mut next = Vec::with_capacity(node.children.len());
        for child in &node.children {
            let played = match tree.node(at).tracker.parse_san(&child.san) {
                Ok(mv) => tree.play(at, mv),
                Err(e) => Err(e),
            };
            match played {
                Ok(id) => next.push((id, child)),
                Err(e) => warn!(san = %child.san, path = %tree.path_of(at), error = %e, "replay branch aborted"),
            }
        }
        stack.extend(next.into_iter().rev());
    }
    tree.len() - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::error::Error;
    use crate::tree::Path;

    const GAME: &str = "[Result \"*\"]\n\n1. Nf3 -- 2. Ng5 (2. Nh4 Ke5) 2... Z0 3. Ke2 *\n";

    #[test]
    fn replays_every_branch() {
        let tree: GameTree<Board> = load(GAME).unwrap();
        // root, Nf3, --, Ng5, --, Ke2, Nh4, Ke5
        assert_eq!(tree.len(), 8);
        let root = tree.root();
        let after_pass = tree.node_at(&"g1f3/0000".parse::<Path>().unwrap()).unwrap();
        assert_eq!(tree.children(after_pass).len(), 2);
        let sans: Vec<_> = tree
            .mainline()
            .iter()
            .skip(1)
            .map(|id| tree.node(*id).san.clone().unwrap())
            .collect();
        assert_eq!(sans, vec!["Nf3", "--", "Ng5", "--", "Ke2"]);
        assert_eq!(tree.node(root).ply, 0);
    }

    #[test]
    fn second_replay_adds_nothing() {
        let mut tree: GameTree<Board> = load(GAME).unwrap();
        let game = parse_pgn(GAME).unwrap();
        assert_eq!(replay_into(&mut tree, &game), 0);
        assert_eq!(tree.len(), 8);
    }

    #[test]
    fn bad_moves_abort_their_branch_only() {
        let tree: GameTree<Board> = load("1. Nf3 -- 2. Nb5 -- (2. Ng5 --) *").unwrap();
        // root, Nf3, --, Ng5, --
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn setup_comes_from_the_fen_header() {
        let tree: GameTree<Board> = load("[FEN \"8/8/8/8/8/8/8/KR6 b - - 0 1\"]\n\n1... Kd5 2. Rb2 *").unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.node(tree.root()).ply, 1);
        assert!(matches!(load::<Board>("[FEN \"8/8/8/8/8/8/8/8 w - - 0 1\"]"), Err(Error::InvalidSetup(_))));
        assert!(matches!(load::<Board>("[FEN \"8/8/8\"]"), Err(Error::InvalidFen(_))));
        assert!(matches!(load::<Board>("1. Nf3 ("), Err(Error::InvalidPgn(_))));
    }
}
