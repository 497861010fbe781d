use crate::board::Board;
use crate::error::{Error, Result};
use crate::piece::{Color, PieceType};
use crate::r#move::Move;
use crate::rules::Rules;
use crate::square::{square_name, Square};
use crate::tracker::Tracker;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::debug;

/// Identifies one ply among the moves playable from a position: origin,
/// target and promotion packed like a move, without its flags.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PathToken(u16);

impl PathToken {
    /// Token of every hidden-side ply
    pub const PASS: PathToken = PathToken(0);

    pub fn of(mv: Move) -> PathToken {
        let promotion = match mv.promotion_target() {
            None => 0,
            Some(PieceType::Knight) => 1,
            Some(PieceType::Bishop) => 2,
            Some(PieceType::Rook) => 3,
            Some(_) => 4,
        };
        PathToken(((mv.origin() as u16) << 10) | ((mv.target() as u16) << 4) | promotion)
    }

    pub fn origin(&self) -> Square {
        (self.0 >> 10) as Square
    }
    pub fn target(&self) -> Square {
        ((self.0 >> 4) & 0b111111) as Square
    }
    pub fn promotion(&self) -> Option<PieceType> {
        match self.0 & 0b1111 {
            1 => Some(PieceType::Knight),
            2 => Some(PieceType::Bishop),
            3 => Some(PieceType::Rook),
            4 => Some(PieceType::Queen),
            _ => None,
        }
    }
}

impl Display for PathToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if *self == Self::PASS {
            return write!(f, "0000");
        }
        let o = square_name(self.origin()).unwrap_or_default();
        let t = square_name(self.target()).unwrap_or_default();
        match self.promotion() {
            Some(p) => write!(f, "{}{}{}", o, t, p),
            None => write!(f, "{}{}", o, t),
        }
    }
}

impl FromStr for PathToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "0000" {
            return Ok(Self::PASS);
        }
        let (origin, target, promotion) = Move::parse(s).ok_or_else(|| Error::UnknownPath(s.to_string()))?;
        let mv = match promotion {
            Some(p) => Move::new_promotion(origin, target, p, false),
            None => Move::new_quiet(origin, target),
        };
        Ok(Self::of(mv))
    }
}

/// Sequence of tokens leading from the root of a game tree to one node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathToken>);

impl Path {
    pub fn empty() -> Path {
        Path(Vec::new())
    }
    pub fn append(&self, token: PathToken) -> Path {
        let mut tokens = self.0.clone();
        tokens.push(token);
        Path(tokens)
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn head(&self) -> Option<PathToken> {
        self.0.first().copied()
    }
    pub fn tail(&self) -> Path {
        Path(self.0.iter().skip(1).copied().collect())
    }
    pub fn last(&self) -> Option<PathToken> {
        self.0.last().copied()
    }
    pub fn tokens(&self) -> &[PathToken] {
        &self.0
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let tokens: Vec<String> = self.0.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", tokens.join("/"))
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Path::empty());
        }
        s.split('/').map(PathToken::from_str).collect::<Result<Vec<_>>>().map(Path)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct GameNode<R: Rules = Board> {
    pub tracker: Tracker<R>,
    /// Move and notation that led here, absent at the root
    pub mv: Option<Move>,
    pub san: Option<String>,
    pub ply: u32,
    pub path: Path,
    pub parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<R: Rules> GameNode<R> {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Branching history of a game, stored as an arena. The first child of a
/// node is its main line.
#[derive(Debug, Clone)]
pub struct GameTree<R: Rules = Board> {
    nodes: Vec<GameNode<R>>,
}

fn ply_of(turn: Color, fullmoves: u32) -> u32 {
    (fullmoves.max(1) - 1) * 2 + if turn == Color::Black { 1 } else { 0 }
}

impl<R: Rules> GameTree<R> {
    pub fn new(root: Tracker<R>) -> GameTree<R> {
        let ply = ply_of(root.turn(), root.position().fullmoves());
        GameTree {
            nodes: vec![GameNode {
                tracker: root,
                mv: None,
                san: None,
                ply,
                path: Path::empty(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &GameNode<R> {
        &self.nodes[id.0]
    }
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }
    pub fn path_of(&self, id: NodeId) -> &Path {
        &self.node(id).path
    }

    pub fn child_by_token(&self, id: NodeId, token: PathToken) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.node(*c).path.last() == Some(token))
    }

    /// Walks down from the root, one token at a time
    pub fn node_at(&self, path: &Path) -> Option<NodeId> {
        let mut current = self.root();
        let mut rest = path.clone();
        while let Some(token) = rest.head() {
            current = self.child_by_token(current, token)?;
            rest = rest.tail();
        }
        Some(current)
    }

    fn token_for(&self, parent: NodeId, mv: Move) -> PathToken {
        if self.node(parent).tracker.turn() == Color::HIDDEN {
            PathToken::PASS
        } else {
            PathToken::of(mv)
        }
    }

    /// Appends a child reached by `mv`, or returns the existing child
    /// carrying the same token.
    pub fn insert(&mut self, parent: NodeId, mv: Move, san: String, tracker: Tracker<R>) -> NodeId {
        let token = self.token_for(parent, mv);
        if let Some(existing) = self.child_by_token(parent, token) {
            return existing;
        }
        let mv = if token == PathToken::PASS { Move::NULL } else { mv };
        let id = NodeId(self.nodes.len());
        let path = self.node(parent).path.append(token);
        let ply = ply_of(tracker.turn(), tracker.position().fullmoves());
        self.nodes.push(GameNode {
            tracker,
            mv: Some(mv),
            san: Some(san),
            ply,
            path,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        debug!(ply, path = %self.node(id).path, "node inserted");
        id
    }

    /// Plays `mv` from `parent`, re-entering the existing child when the
    /// ply was already explored.
    pub fn play(&mut self, parent: NodeId, mv: Move) -> Result<NodeId> {
        self.node(parent).tracker.validate(mv)?;
        if let Some(existing) = self.child_by_token(parent, self.token_for(parent, mv)) {
            return Ok(existing);
        }
        let mut tracker = self.node(parent).tracker.clone();
        let san = tracker.san_and_play(mv)?;
        Ok(self.insert(parent, mv, san, tracker))
    }

    /// Every node, parents before children, siblings in insertion order
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    /// Root followed by the first child of every node
    pub fn mainline(&self) -> Vec<NodeId> {
        let mut line = vec![self.root()];
        let mut current = self.root();
        while let Some(first) = self.children(current).first() {
            line.push(*first);
            current = *first;
        }
        line
    }

    /// Nodes from the root down to `id`, both included
    pub fn line_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut line = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            line.push(parent);
            current = parent;
        }
        line.reverse();
        line
    }
}

impl Default for GameTree<Board> {
    fn default() -> Self {
        GameTree::new(Tracker::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::parse_square;

    fn tree() -> GameTree {
        GameTree::default()
    }

    fn mv(tree: &GameTree, at: NodeId, san: &str) -> Move {
        tree.node(at).tracker.parse_san(san).unwrap()
    }

    #[test]
    fn insert_is_idempotent() {
        let mut tree = tree();
        let root = tree.root();
        let rook = mv(&tree, root, "Ra4");
        let first = tree.play(root, rook).unwrap();
        let again = tree.play(root, rook).unwrap();
        assert_eq!(first, again);
        assert_eq!(tree.len(), 2);

        let tracker = tree.node(first).tracker.clone();
        let copy = tree.insert(root, rook, "Ra4".to_string(), tracker);
        assert_eq!(copy, first);
        assert_eq!(tree.children(root).len(), 1);
    }

    #[test]
    fn hidden_plies_share_the_pass_token() {
        let mut tree = tree();
        let white = mv(&tree, tree.root(), "Nf3");
        let after_white = tree.play(tree.root(), white).unwrap();
        let pass = tree.play(after_white, Move::NULL).unwrap();
        let king_step = Move::new_quiet(parse_square("e8").unwrap(), parse_square("e7").unwrap());
        assert_eq!(tree.play(after_white, king_step).unwrap(), pass);
        assert_eq!(tree.node(pass).san.as_deref(), Some("--"));
        assert_eq!(tree.path_of(pass).last(), Some(PathToken::PASS));
        assert_eq!(tree.node(pass).ply, 2);
    }

    #[test]
    fn existing_children_do_not_skip_validation() {
        let mut tree = tree();
        let white = mv(&tree, tree.root(), "Nf3");
        let after_white = tree.play(tree.root(), white).unwrap();
        tree.play(after_white, Move::NULL).unwrap();
        assert!(matches!(tree.play(after_white, Move::new_quiet(0, 63)), Err(Error::IllegalMove(_))));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn node_at_follows_the_path() {
        let mut tree = tree();
        let root = tree.root();
        let a = tree.play(root, mv(&tree, root, "Nf3")).unwrap();
        let b = tree.play(root, mv(&tree, root, "Nh3")).unwrap();
        let a2 = tree.play(a, Move::NULL).unwrap();

        assert_eq!(tree.node_at(&Path::empty()), Some(root));
        assert_eq!(tree.node_at(tree.path_of(b)), Some(b));
        assert_eq!(tree.node_at(tree.path_of(a2)), Some(a2));
        let path: Path = "g1f3/0000".parse().unwrap();
        assert_eq!(tree.node_at(&path), Some(a2));
        assert_eq!(tree.node_at(&"g1h3/0000".parse().unwrap()), None);
        assert_eq!(tree.mainline(), vec![root, a, a2]);
        assert_eq!(tree.depth_first(), vec![root, a, a2, b]);
        assert_eq!(tree.line_to(a2), vec![root, a, a2]);
    }

    #[test]
    fn paths_print_and_parse() {
        let path = Path::empty()
            .append(PathToken::of(Move::new_promotion(52, 60, PieceType::Knight, false)))
            .append(PathToken::PASS);
        assert_eq!(path.to_string(), "e7e8n/0000");
        assert_eq!(path.to_string().parse::<Path>().unwrap(), path);
        assert_eq!(path.head(), Some(PathToken::of(Move::new_promotion(52, 60, PieceType::Knight, true))));
        assert_eq!(path.tail().len(), 1);
        assert!("e7".parse::<Path>().is_err());
    }

    #[test]
    fn illegal_moves_create_nothing() {
        let mut tree = tree();
        assert!(tree.play(tree.root(), Move::new_quiet(0, 9)).is_err());
        assert_eq!(tree.len(), 1);
    }
}
