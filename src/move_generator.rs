use crate::{
    board::Board,
    movelist::MoveList,
    piece::{Color, PieceType},
    r#move::Move,
    square::Square,
    square_set::SquareSet,
};

struct MoveGenInfo {
    pub move_list: MoveList,
    pub king_square: Square,
    pub side: Color,
    pub occupancy: SquareSet,
    pub opponents: SquareSet,
    pub push_targets: SquareSet,
    pub capture_targets: SquareSet,
    pub pinned_pieces: SquareSet,
    pub pinning_pieces: SquareSet,
}

// Origin of a pawn move given its target and the forward offset of the move
fn origin_of(target: Square, forward: isize, side: Color) -> Square {
    let delta = if side == Color::White { forward } else { -forward };
    (target as isize - delta) as Square
}

/// Generates all legal moves for a given position.
/// A side without a king has no legal moves.
pub fn generate(board: &Board) -> MoveList {
    let side = board.side_to_move();
    let king_square = match board.king_square(side) {
        Some(sq) => sq,
        None => return MoveList::default(),
    };
    let (pinned_pieces, pinning_pieces) = board.pins(king_square);
    let mut info = MoveGenInfo {
        move_list: MoveList::default(),
        king_square,
        side,
        occupancy: board.occupancy(),
        opponents: board.color_set(side.opposite()),
        push_targets: !board.occupancy(),
        capture_targets: board.color_set(side.opposite()),
        pinned_pieces,
        pinning_pieces,
    };

    let mut king_attackers = board.attackers(king_square, side.opposite()).iter();
    let xray_attack_map = board.attack_map(side.opposite(), true);
    king_moves(xray_attack_map, &mut info);

    if let Some(checker_square) = king_attackers.next() {
        // Double check, only the king may move
        if king_attackers.next().is_some() {
            return info.move_list;
        }

        info.capture_targets = SquareSet::from_square(checker_square);
        let slider = board.piece_type_on(checker_square).map_or(false, |p| p.can_slide());
        info.push_targets = if slider {
            SquareSet::ray(king_square, checker_square) & !info.occupancy
        } else {
            SquareSet::EMPTY
        };
    } else {
        castling(board, xray_attack_map, &mut info);
    }
    pawn_moves(board, &mut info);
    knight_moves(board, &mut info);
    slider_moves(board, &mut info);
    en_passant(board, &mut info);
    pinned_pieces_moves(board, &mut info);

    info.move_list
}

fn pawn_moves(board: &Board, info: &mut MoveGenInfo) {
    let pre_promo_rank = if info.side == Color::Black { SquareSet::RANKS[1] } else { SquareSet::RANKS[6] };
    let pawns = board.pieces(PieceType::Pawn, info.side) & !info.pinned_pieces;
    if (pawns & pre_promo_rank).non_empty() {
        pawn_promotions(pawns & pre_promo_rank, info)
    }
    let pawns = pawns - pre_promo_rank;

    for target in SquareSet::pawn_pushes(pawns, !info.occupancy, info.side) & info.push_targets {
        info.move_list.push(Move::new_quiet(origin_of(target, 8, info.side), target))
    }
    for target in SquareSet::pawn_double_pushes(pawns, !info.occupancy, info.side) & info.push_targets {
        info.move_list.push(Move::new_double_push(origin_of(target, 16, info.side), target))
    }
    for target in SquareSet::pawn_west_attacks(pawns, info.side) & info.capture_targets {
        info.move_list.push(Move::new_capture(origin_of(target, 7, info.side), target))
    }
    for target in SquareSet::pawn_east_attacks(pawns, info.side) & info.capture_targets {
        info.move_list.push(Move::new_capture(origin_of(target, 9, info.side), target))
    }
}

fn pawn_promotions(pawns: SquareSet, info: &mut MoveGenInfo) {
    let capture_mask = info.opponents & info.capture_targets;

    for target in SquareSet::pawn_pushes(pawns, !info.occupancy, info.side) & info.push_targets {
        for prom in Move::all_promotions(origin_of(target, 8, info.side), target, false) {
            info.move_list.push(prom)
        }
    }
    for target in SquareSet::pawn_west_attacks(pawns, info.side) & capture_mask {
        for prom in Move::all_promotions(origin_of(target, 7, info.side), target, true) {
            info.move_list.push(prom)
        }
    }
    for target in SquareSet::pawn_east_attacks(pawns, info.side) & capture_mask {
        for prom in Move::all_promotions(origin_of(target, 9, info.side), target, true) {
            info.move_list.push(prom)
        }
    }
}

fn push_targets_from(origin: Square, moves: SquareSet, info: &mut MoveGenInfo) {
    for target in moves & info.push_targets {
        info.move_list.push(Move::new_quiet(origin, target))
    }
    for target in moves & info.capture_targets {
        info.move_list.push(Move::new_capture(origin, target))
    }
}

fn knight_moves(board: &Board, info: &mut MoveGenInfo) {
    let knights = board.pieces(PieceType::Knight, info.side) & !info.pinned_pieces;
    for origin in knights {
        push_targets_from(origin, SquareSet::KNIGHT_ATTACKS[origin], info)
    }
}

fn king_moves(attacks: SquareSet, info: &mut MoveGenInfo) {
    let moves = SquareSet::KING_STEPS[info.king_square] & !attacks;
    push_targets_from(info.king_square, moves, info)
}

fn slider_moves(board: &Board, info: &mut MoveGenInfo) {
    for piece_type in [PieceType::Bishop, PieceType::Rook, PieceType::Queen] {
        specific_slider_moves(board, piece_type, info)
    }
}

fn slider_attacks(piece_type: PieceType, origin: Square, occupancy: SquareSet) -> SquareSet {
    match piece_type {
        PieceType::Bishop => SquareSet::bishop_attacks(origin, occupancy),
        PieceType::Rook => SquareSet::rook_attacks(origin, occupancy),
        _ => SquareSet::queen_attacks(origin, occupancy),
    }
}

fn specific_slider_moves(board: &Board, piece_type: PieceType, info: &mut MoveGenInfo) {
    let sliders = board.pieces(piece_type, info.side) & !info.pinned_pieces;
    for origin in sliders {
        push_targets_from(origin, slider_attacks(piece_type, origin, info.occupancy), info)
    }
}

fn piece_move(board: &Board, piece_type: PieceType, info: &mut MoveGenInfo) {
    match piece_type {
        PieceType::Pawn => pawn_moves(board, info),
        PieceType::Knight => knight_moves(board, info),
        PieceType::Bishop | PieceType::Rook | PieceType::Queen => specific_slider_moves(board, piece_type, info),
        PieceType::King => (),
    }
}

fn en_passant(board: &Board, info: &mut MoveGenInfo) {
    let Some(target) = board.en_passant_target() else { return };
    let removed_piece_square = if info.side == Color::White { target - 8 } else { target + 8 };
    if !info.push_targets.has(target) && !info.capture_targets.has(removed_piece_square) {
        return;
    }

    // Both pawns leaving the rank can uncover a rook on the king
    let occupancy = info.occupancy.without(removed_piece_square);
    let mut cross_ray = SquareSet::EMPTY;
    for origin in board.cardinal_sliders(info.side.opposite()) {
        let pin_ray = SquareSet::ray(info.king_square, origin);
        let from_pinner = pin_ray & SquareSet::rook_attacks(origin, occupancy);
        let to_pinner = pin_ray & SquareSet::rook_attacks(info.king_square, occupancy);
        cross_ray = cross_ray | (to_pinner & from_pinner)
    }

    let origins = SquareSet::pawn_attacks(SquareSet::from_square(target), info.side.opposite())
        & board.pieces(PieceType::Pawn, info.side)
        & !info.pinned_pieces
        & !cross_ray;
    for origin in origins {
        info.move_list.push(Move::new_en_passant(origin, target))
    }
}

fn castling(board: &Board, attacks: SquareSet, info: &mut MoveGenInfo) {
    let (kingside_right, queenside_right) = board.side_to_move_castling_rights();
    let side = info.side as usize;
    let kingside_blocked = (info.occupancy & SquareSet::CASTLING_PATH[side][0])
        | (attacks & SquareSet::CASTLING_SAFE[side][0]);
    let queenside_blocked = (info.occupancy & SquareSet::CASTLING_PATH[side][1])
        | (attacks & SquareSet::CASTLING_SAFE[side][1]);

    if kingside_right && kingside_blocked.is_empty() {
        info.move_list.push(Move::new_kingside_castle(info.side))
    }
    if queenside_right && queenside_blocked.is_empty() {
        info.move_list.push(Move::new_queenside_castle(info.side))
    }
}

// Each pinned piece may only move along the ray joining its king and pinner
fn pinned_pieces_moves(board: &Board, info: &mut MoveGenInfo) {
    let (push_targets, capture_targets, pinned_pieces) = (info.push_targets, info.capture_targets, info.pinned_pieces);
    for pinner_sq in info.pinning_pieces {
        let push_ray = SquareSet::ray(info.king_square, pinner_sq);
        let Some(pinned_sq) = (push_ray & pinned_pieces).first() else { continue };
        let Some(piece_type) = board.piece_type_on(pinned_sq) else { continue };
        info.pinned_pieces = !SquareSet::from_square(pinned_sq);
        info.push_targets = push_ray & !info.occupancy & push_targets;
        info.capture_targets = push_ray & info.opponents & capture_targets;
        piece_move(board, piece_type, info);
    }
    info.push_targets = push_targets;
    info.capture_targets = capture_targets;
    info.pinned_pieces = pinned_pieces;
}

#[cfg(test)]
mod perft_tests {
    use super::generate;
    use crate::board::Board;

    // Depth 3 already goes through every kind of move these positions offer
    const TEST_POSITIONS: [(&str, [u64; 3]); 7] = [
        ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", [20, 400, 8902]),
        ("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1", [48, 2039, 97862]),
        ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", [14, 191, 2812]),
        ("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1", [6, 264, 9467]),
        ("r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1", [6, 264, 9467]),
        ("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8", [44, 1486, 62379]),
        ("r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10", [46, 2079, 89890]),
    ];

    #[test]
    fn perft_verification() {
        for (fen, results) in TEST_POSITIONS {
            let board = Board::from_fen(fen).unwrap();
            for d in 1..=3 {
                assert_eq!(results[d - 1], perft(&board, d), "{} at depth {}", fen, d)
            }
        }
    }

    #[test]
    fn kingless_side_has_no_moves() {
        let board = Board::from_fen("8/8/8/8/8/8/8/RNBQKBNR b - - 0 1").unwrap();
        assert!(generate(&board).is_empty());
    }

    // perft with counting at horizon nodes
    fn perft(board: &Board, depth: usize) -> u64 {
        let moves = generate(board);
        if depth == 1 {
            return moves.len() as u64;
        }

        let mut nodes = 0;
        for m in &moves {
            let mut child = board.clone();
            child.play(*m);
            nodes += perft(&child, depth - 1);
        }
        nodes
    }
}
