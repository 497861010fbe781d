use crate::error::{Error, Result};
use crate::piece::Color;
use lazy_static::lazy_static;
use regex::Regex;

/// One move of a notation document along with its annotations. The root
/// node carries no move; the first child of any node is its main line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnNode {
    pub san: String,
    pub comments: Vec<String>,
    pub nags: Vec<u32>,
    pub children: Vec<PgnNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnGame {
    pub headers: Vec<(String, String)>,
    pub moves: PgnNode,
    pub result: Option<String>,
}

impl PgnGame {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of moves, variations included
    pub fn move_count(&self) -> usize {
        fn count(node: &PgnNode) -> usize {
            node.children.iter().map(|c| 1 + count(c)).sum()
        }
        count(&self.moves)
    }
}

lazy_static! {
    static ref HEADER_RE: Regex =
        Regex::new(r#"^\[\s*(\w+)\s+"((?:[^"\\]|\\.)*)"\s*\]$"#).expect("header pattern compiles");
    static ref TOKEN_RE: Regex =
        Regex::new(r"\{[^}]*\}|;[^\n]*|\$\d+|[(){}]|1-0|0-1|1/2-1/2|\*|\d+\.+|[^\s(){};$]+")
            .expect("movetext pattern compiles");
}

// Arena used while reading, turned into owned nodes once complete
struct Draft {
    node: PgnNode,
    parent: Option<usize>,
    children: Vec<usize>,
}

fn assemble(drafts: &mut [Option<Draft>], id: usize) -> PgnNode {
    let Some(draft) = drafts[id].take() else {
        return PgnNode::default();
    };
    let mut node = draft.node;
    node.children = draft.children.iter().map(|c| assemble(drafts, *c)).collect();
    node
}

/// Reads the first game of a notation document
pub fn parse_pgn(text: &str) -> Result<PgnGame> {
    let mut game = PgnGame::default();
    let mut movetext = String::new();
    let mut in_headers = true;
    for line in text.lines() {
        let trimmed = line.trim();
        if in_headers && trimmed.starts_with('[') {
            let caps = HEADER_RE
                .captures(trimmed)
                .ok_or_else(|| Error::InvalidPgn(format!("bad header line '{}'", trimmed)))?;
            game.headers
                .push((caps[1].to_string(), caps[2].replace("\\\"", "\"").replace("\\\\", "\\")));
            continue;
        }
        if !trimmed.is_empty() {
            in_headers = false;
        }
        if trimmed.starts_with('%') {
            continue;
        }
        movetext.push_str(line);
        movetext.push('\n');
    }

    let mut drafts = vec![Some(Draft {
        node: PgnNode::default(),
        parent: None,
        children: Vec::new(),
    })];
    // Node the next move attaches after, one per open variation
    let mut stack = vec![0usize];

    for token in TOKEN_RE.find_iter(&movetext).map(|m| m.as_str()) {
        let current = *stack.last().unwrap_or(&0);
        match token {
            "(" => {
                let parent = drafts[current]
                    .as_ref()
                    .and_then(|d| d.parent)
                    .ok_or_else(|| Error::InvalidPgn("variation before any move".to_string()))?;
                stack.push(parent);
            }
            ")" => {
                if stack.len() == 1 {
                    return Err(Error::InvalidPgn("unbalanced ')'".to_string()));
                }
                stack.pop();
            }
            "{" => return Err(Error::InvalidPgn("unterminated comment".to_string())),
            "}" => return Err(Error::InvalidPgn("unbalanced '}'".to_string())),
            "1-0" | "0-1" | "1/2-1/2" | "*" => {
                if stack.len() == 1 {
                    game.result = Some(token.to_string());
                    break;
                }
            }
            t if t.starts_with('{') || t.starts_with(';') => {
                let comment = t.trim_start_matches(&['{', ';'][..]).trim_end_matches('}').trim();
                if let Some(d) = drafts[current].as_mut() {
                    d.node.comments.push(comment.to_string());
                }
            }
            t if t.starts_with('$') => {
                if let (Some(d), Ok(nag)) = (drafts[current].as_mut(), t[1..].parse::<u32>()) {
                    d.node.nags.push(nag);
                }
            }
            t if t.starts_with(|c: char| c.is_ascii_digit()) && t.ends_with('.') => (),
            san => {
                let id = drafts.len();
                drafts.push(Some(Draft {
                    node: PgnNode {
                        san: san.to_string(),
                        ..Default::default()
                    },
                    parent: Some(current),
                    children: Vec::new(),
                }));
                if let Some(d) = drafts[current].as_mut() {
                    d.children.push(id);
                }
                if let Some(top) = stack.last_mut() {
                    *top = id;
                }
            }
        }
    }
    if stack.len() > 1 {
        return Err(Error::InvalidPgn("unbalanced '('".to_string()));
    }

    game.moves = assemble(&mut drafts, 0);
    Ok(game)
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Writes one line of play, numbering moves from `start_fullmove` with
/// `start_turn` to move first.
pub fn write_pgn(
    headers: &[(String, String)],
    start_fullmove: u32,
    start_turn: Color,
    sans: &[String],
    result: &str,
) -> String {
    let mut pgn = String::new();
    for (name, value) in headers {
        pgn.push_str(&format!("[{} \"{}\"]\n", name, escape(value)));
    }
    if !headers.is_empty() {
        pgn.push('\n');
    }

    let mut tokens = Vec::with_capacity(sans.len() * 3 / 2 + 1);
    let mut fullmove = start_fullmove.max(1);
    let mut turn = start_turn;
    for (i, san) in sans.iter().enumerate() {
        if turn == Color::White {
            tokens.push(format!("{}.", fullmove));
        } else if i == 0 {
            tokens.push(format!("{}...", fullmove));
        }
        tokens.push(san.clone());
        if turn == Color::Black {
            fullmove += 1;
        }
        turn = turn.opposite();
    }
    tokens.push(result.to_string());
    pgn.push_str(&tokens.join(" "));
    pgn.push('\n');
    pgn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_mainline() {
        let game = parse_pgn("[FEN \"8/8/8/8/8/8/8/RNBQKBNR w KQ - 0 1\"]\n[Result \"*\"]\n\n1. Nf3 -- 2. Nc3 Z0 *\n").unwrap();
        assert_eq!(game.header("FEN"), Some("8/8/8/8/8/8/8/RNBQKBNR w KQ - 0 1"));
        assert_eq!(game.result.as_deref(), Some("*"));
        let sans: Vec<&str> = std::iter::successors(game.moves.children.first(), |n| n.children.first())
            .map(|n| n.san.as_str())
            .collect();
        assert_eq!(sans, vec!["Nf3", "--", "Nc3", "Z0"]);
    }

    #[test]
    fn reads_variations_and_annotations() {
        let game = parse_pgn("1. e4 {best} (1. d4 d5 (1... Nf6)) 1... e5 $1 ; line comment\n2. Nf3 1-0").unwrap();
        let root = &game.moves;
        assert_eq!(root.children.len(), 2);
        let e4 = &root.children[0];
        assert_eq!(e4.san, "e4");
        assert_eq!(e4.comments, vec!["best"]);
        let d4 = &root.children[1];
        assert_eq!(d4.san, "d4");
        assert_eq!(d4.children.len(), 2);
        assert_eq!(d4.children[1].san, "Nf6");
        let e5 = &e4.children[0];
        assert_eq!(e5.nags, vec![1]);
        assert_eq!(e5.comments, vec!["line comment"]);
        assert_eq!(e5.children[0].san, "Nf3");
        assert_eq!(game.result.as_deref(), Some("1-0"));
        assert_eq!(game.move_count(), 6);
    }

    #[test]
    fn rejects_broken_documents() {
        assert!(matches!(parse_pgn("1. e4 (1. d4"), Err(Error::InvalidPgn(_))));
        assert!(matches!(parse_pgn("1. e4 )"), Err(Error::InvalidPgn(_))));
        assert!(matches!(parse_pgn("1. e4 { never closed"), Err(Error::InvalidPgn(_))));
        assert!(matches!(parse_pgn("(1. e4)"), Err(Error::InvalidPgn(_))));
        assert!(matches!(parse_pgn("[FEN broken]\n1. e4"), Err(Error::InvalidPgn(_))));
    }

    #[test]
    fn empty_text_is_an_empty_game() {
        let game = parse_pgn("").unwrap();
        assert!(game.headers.is_empty());
        assert!(game.moves.children.is_empty());
        assert_eq!(game.result, None);
    }

    #[test]
    fn numbers_moves_from_either_side() {
        let headers = vec![("Result".to_string(), "*".to_string())];
        let sans: Vec<String> = ["Kd5", "Nf3", "Ke4"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            write_pgn(&headers, 3, Color::Black, &sans, "*"),
            "[Result \"*\"]\n\n3... Kd5 4. Nf3 Ke4 *\n"
        );
        assert_eq!(write_pgn(&[], 1, Color::White, &sans[1..], "1/2-1/2"), "1. Nf3 Ke4 1/2-1/2\n");
    }
}
