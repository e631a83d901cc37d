use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dice::Roll;
use super::effects::{crosses_wall, required_exit_roll, EXIT_ANY_ROLL, EXIT_ON_THREE, EXIT_ON_TWO};
use super::path::{
    checked_square_of_index, index_of_square, is_valid_index, square_of_index, CellIndex, Square,
    LAST_SQUARE,
};
use super::state::{BoardState, Cell, IntegrityError, Player};

/// 一步走子的落点：棋盘内的下标，或者出盘。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "index", rename_all = "lowercase")]
pub enum Destination {
    Cell(CellIndex),
    Exit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: CellIndex,
    pub to: Destination,
}

impl Move {
    pub const fn new(from: CellIndex, to: CellIndex) -> Self {
        Self {
            from,
            to: Destination::Cell(to),
        }
    }

    pub const fn exit(from: CellIndex) -> Self {
        Self {
            from,
            to: Destination::Exit,
        }
    }

    #[inline]
    pub const fn is_exit(&self) -> bool {
        matches!(self.to, Destination::Exit)
    }

    pub fn from_square(&self) -> Option<Square> {
        is_valid_index(self.from).then(|| square_of_index(self.from))
    }

    pub fn to_square(&self) -> Option<Square> {
        match self.to {
            Destination::Cell(index) if is_valid_index(index) => Some(square_of_index(index)),
            _ => None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.from_square() {
            Some(square) => write!(f, "{square} -> ")?,
            None => write!(f, "#{} -> ", self.from)?,
        }
        match (self.to, self.to_square()) {
            (Destination::Exit, _) => f.write_str("off"),
            (_, Some(square)) => write!(f, "{square}"),
            (Destination::Cell(index), None) => write!(f, "#{index}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("roll {roll} is outside 1..=5")]
    InvalidRoll { roll: u8 },
    #[error("square {square} is outside 1..=30")]
    SquareOutOfRange { square: Square },
    #[error("cell index {index} is outside 0..30")]
    IndexOutOfRange { index: CellIndex },
    #[error("square {square} is already occupied")]
    SquareOccupied { square: Square },
    #[error("cell {index} does not hold a {player} piece")]
    NotOwnPiece { player: Player, index: CellIndex },
    #[error("{mv} is not a legal move for {player} with roll {roll}")]
    InvalidMove { player: Player, mv: Move, roll: Roll },
    #[error("unknown player `{name}`")]
    UnknownPlayer { name: String },
    #[error("board integrity violated: {error}")]
    IntegrityViolation { error: IntegrityError },
}

impl BoardState {
    /// 下标 `from` 上的棋子掷出 `roll` 后的落点；`None` 表示这一步走不了。
    ///
    /// 不检查落点上是否有己方棋子。越界的下标同样返回 `None`。
    pub fn destination_of(&self, from: CellIndex, roll: Roll) -> Option<Destination> {
        let from_square = checked_square_of_index(from)?;
        let dest_square = from_square + roll.value();

        if from_square == EXIT_ANY_ROLL {
            return Some(Destination::Exit);
        }
        if let Some(required) = required_exit_roll(from_square) {
            return (roll.value() == required).then_some(Destination::Exit);
        }
        if crosses_wall(from_square, dest_square) {
            return None;
        }
        if dest_square > LAST_SQUARE {
            return Some(Destination::Exit);
        }
        Some(Destination::Cell(index_of_square(dest_square)))
    }

    /// 按下标升序枚举 `player` 掷出 `roll` 时的全部合法走法。
    pub fn legal_moves(&self, player: Player, roll: Roll) -> Vec<Move> {
        let own = Cell::from(player);
        self.pieces(player)
            .filter_map(|from| match self.destination_of(from, roll)? {
                Destination::Exit => Some(Move::exit(from)),
                Destination::Cell(to) if self.cells[to] == own => None,
                Destination::Cell(to) => Some(Move::new(from, to)),
            })
            .collect()
    }

    /// 与 `legal_moves` 相同，但按起点格号排序，便于展示给玩家。
    pub fn legal_moves_by_square(&self, player: Player, roll: Roll) -> Vec<Move> {
        let mut moves = self.legal_moves(player, roll);
        moves.sort_by_key(|mv| square_of_index(mv.from));
        moves
    }

    /// 30 号格上的棋子必须在本方下一次行动时出盘，与点数无关。
    pub fn forced_exit(&self, player: Player) -> Option<Move> {
        self.has_piece_on_square(player, EXIT_ANY_ROLL)
            .then(|| Move::exit(index_of_square(EXIT_ANY_ROLL)))
    }

    /// 校验后执行走法。走法必须出现在 `legal_moves(player, roll)` 中。
    pub fn apply_move(&self, player: Player, mv: Move, roll: Roll) -> Result<BoardState, RuleError> {
        let origin = self
            .cell(mv.from)
            .ok_or(RuleError::IndexOutOfRange { index: mv.from })?;
        if origin.occupant() != Some(player) {
            return Err(RuleError::NotOwnPiece {
                player,
                index: mv.from,
            });
        }
        if let Destination::Cell(to) = mv.to {
            if !is_valid_index(to) {
                return Err(RuleError::IndexOutOfRange { index: to });
            }
        }
        if !self.legal_moves(player, roll).contains(&mv) {
            return Err(RuleError::InvalidMove { player, mv, roll });
        }
        Ok(self.apply_legal(player, mv))
    }

    /// 执行一个已知合法的走法。吃子是交换：对方棋子被换到起点格。
    pub(crate) fn apply_legal(&self, player: Player, mv: Move) -> BoardState {
        let mut next = *self;
        next.cells[mv.from] = Cell::Empty;

        match mv.to {
            Destination::Exit => next.record_exit(player),
            Destination::Cell(to) => {
                if let Some(displaced) = next.cells[to].occupant() {
                    next.cells[mv.from] = Cell::from(displaced);
                }
                next.cells[to] = Cell::from(player);
                next.resolve_landing(player, square_of_index(to));
            }
        }
        next
    }

    /// 回合开始时的终点区修正：28 号格需要 3、29 号格需要 2，点数不符则送回重生点。
    pub fn apply_end_zone_correction(&self, player: Player, roll: Roll) -> BoardState {
        let mut next = *self;
        for square in [EXIT_ON_THREE, EXIT_ON_TWO] {
            let stuck = required_exit_roll(square).is_some_and(|required| required != roll.value());
            if stuck && next.has_piece_on_square(player, square) {
                next.send_to_checkpoint(player, square);
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::dice::roll_sticks;
    use crate::game::effects::{CHECKPOINT, GO_TO_CHECKPOINT, WALL};
    use crate::game::path::{BOARD_CELLS, FIRST_SQUARE, LAST_SQUARE};
    use crate::game::state::PIECES_PER_PLAYER;
    use rand::rngs::SmallRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn roll(value: u8) -> Roll {
        Roll::new(value).unwrap()
    }

    fn sq(square: Square) -> CellIndex {
        index_of_square(square)
    }

    #[test]
    fn opening_roll_two_only_frees_the_front_piece() {
        let board = BoardState::new();
        let moves = board.legal_moves(Player::Computer, roll(2));
        assert_eq!(moves, vec![Move::new(sq(14), sq(16))]);
    }

    #[test]
    fn opening_roll_one_captures_by_swapping() {
        let board = BoardState::new();
        let moves = board.legal_moves(Player::Human, roll(1));
        assert_eq!(moves.len(), 7);
        assert!(moves.windows(2).all(|pair| pair[0].from < pair[1].from));

        let mv = Move::new(sq(1), sq(2));
        let next = board.apply_move(Player::Human, mv, roll(1)).unwrap();
        assert!(next.has_piece_on_square(Player::Human, 2));
        assert!(next.has_piece_on_square(Player::Computer, 1));
        assert_eq!(next.pieces_on_board(Player::Computer), 7);
        assert_eq!(board, BoardState::new());
    }

    #[test]
    fn pieces_cannot_vault_the_wall() {
        for from in FIRST_SQUARE..WALL {
            for r in Roll::ALL {
                let dest = from + r.value();
                let board = BoardState::from_squares(&[from], &[], 0, 0).unwrap();
                let moves = board.legal_moves(Player::Human, r);
                if dest > WALL {
                    assert!(moves.is_empty(), "{from} + {r} vaulted the wall");
                } else {
                    assert_eq!(moves, vec![Move::new(sq(from), sq(dest))]);
                }
            }
        }
    }

    #[test]
    fn end_zone_squares_need_exact_rolls() {
        for (square, exact) in [(EXIT_ON_THREE, 3), (EXIT_ON_TWO, 2)] {
            let board = BoardState::from_squares(&[], &[square], 0, 0).unwrap();
            for r in Roll::ALL {
                let moves = board.legal_moves(Player::Computer, r);
                if r.value() == exact {
                    assert_eq!(moves, vec![Move::exit(sq(square))]);
                } else {
                    assert!(moves.is_empty(), "square {square} moved on roll {r}");
                }
            }
        }
    }

    #[test]
    fn last_square_exits_on_any_roll() {
        let board = BoardState::from_squares(&[], &[LAST_SQUARE], 0, 0).unwrap();
        for r in Roll::ALL {
            assert_eq!(
                board.legal_moves(Player::Computer, r),
                vec![Move::exit(sq(LAST_SQUARE))]
            );
        }
        assert_eq!(board.forced_exit(Player::Computer), Some(Move::exit(sq(LAST_SQUARE))));
        assert_eq!(board.forced_exit(Player::Human), None);
    }

    #[test]
    fn exiting_increments_the_counter() {
        let board = BoardState::from_squares(&[], &[LAST_SQUARE], 0, 3).unwrap();
        let next = board
            .apply_move(Player::Computer, Move::exit(sq(LAST_SQUARE)), roll(4))
            .unwrap();
        assert_eq!(next.exited(Player::Computer), 4);
        assert_eq!(next.pieces_on_board(Player::Computer), 0);
    }

    #[test]
    fn wall_square_can_be_left_by_any_roll() {
        let board = BoardState::from_squares(&[WALL], &[], 0, 0).unwrap();
        assert_eq!(board.legal_moves(Player::Human, roll(2)), vec![Move::new(sq(26), sq(28))]);
        assert_eq!(board.legal_moves(Player::Human, roll(5)), vec![Move::exit(sq(26))]);
    }

    #[test]
    fn own_pieces_block() {
        let board = BoardState::from_squares(&[3, 5], &[], 0, 0).unwrap();
        assert_eq!(board.legal_moves(Player::Human, roll(2)), vec![Move::new(sq(5), sq(7))]);
    }

    #[test]
    fn landing_on_go_to_checkpoint_returns_the_piece() {
        let board = BoardState::from_squares(&[WALL], &[], 0, 0).unwrap();
        let next = board
            .apply_move(Player::Human, Move::new(sq(WALL), sq(GO_TO_CHECKPOINT)), roll(1))
            .unwrap();
        assert_eq!(next.occupant_at_square(GO_TO_CHECKPOINT), None);
        assert!(next.has_piece_on_square(Player::Human, CHECKPOINT));
    }

    #[test]
    fn checkpoint_return_skips_occupied_squares() {
        let board = BoardState::from_squares(&[WALL], &[CHECKPOINT, 14], 0, 0).unwrap();
        let next = board
            .apply_move(Player::Human, Move::new(sq(WALL), sq(GO_TO_CHECKPOINT)), roll(1))
            .unwrap();
        assert!(next.has_piece_on_square(Player::Human, 13));
        assert!(next.has_piece_on_square(Player::Computer, CHECKPOINT));
    }

    #[test]
    fn end_zone_correction_returns_stuck_pieces() {
        let board = BoardState::from_squares(&[EXIT_ON_TWO], &[], 0, 0).unwrap();
        let corrected = board.apply_end_zone_correction(Player::Human, roll(5));
        assert_eq!(corrected.occupant_at_square(EXIT_ON_TWO), None);
        assert!(corrected.has_piece_on_square(Player::Human, CHECKPOINT));

        let kept = board.apply_end_zone_correction(Player::Human, roll(2));
        assert_eq!(kept, board);

        let other_side = board.apply_end_zone_correction(Player::Computer, roll(5));
        assert_eq!(other_side, board);
    }

    #[test]
    fn end_zone_correction_handles_both_squares() {
        let board = BoardState::from_squares(&[EXIT_ON_THREE, EXIT_ON_TWO], &[], 0, 0).unwrap();
        let corrected = board.apply_end_zone_correction(Player::Human, roll(1));
        assert!(corrected.has_piece_on_square(Player::Human, CHECKPOINT));
        assert!(corrected.has_piece_on_square(Player::Human, 14));
        assert_eq!(corrected.pieces_on_board(Player::Human), 2);

        let corrected = board.apply_end_zone_correction(Player::Human, roll(3));
        assert!(corrected.has_piece_on_square(Player::Human, EXIT_ON_THREE));
        assert!(corrected.has_piece_on_square(Player::Human, CHECKPOINT));
    }

    #[test]
    fn rejects_uninvited_moves() {
        let board = BoardState::new();
        assert_eq!(
            board.apply_move(Player::Human, Move::new(sq(2), sq(4)), roll(2)),
            Err(RuleError::NotOwnPiece {
                player: Player::Human,
                index: sq(2),
            })
        );
        assert_eq!(
            board.apply_move(Player::Human, Move::new(40, sq(4)), roll(2)),
            Err(RuleError::IndexOutOfRange { index: 40 })
        );
        assert_eq!(
            board.apply_move(Player::Human, Move::new(sq(1), 99), roll(2)),
            Err(RuleError::IndexOutOfRange { index: 99 })
        );
        let wrong_distance = Move::new(sq(13), sq(16));
        assert_eq!(
            board.apply_move(Player::Human, wrong_distance, roll(2)),
            Err(RuleError::InvalidMove {
                player: Player::Human,
                mv: wrong_distance,
                roll: roll(2),
            })
        );
        let early_exit = Move::exit(sq(13));
        assert!(board.apply_move(Player::Human, early_exit, roll(5)).is_err());
    }

    #[test]
    fn moves_render_with_square_numbers() {
        assert_eq!(Move::new(sq(14), sq(16)).to_string(), "14 -> 16");
        assert_eq!(Move::exit(sq(30)).to_string(), "30 -> off");
        let err = RuleError::InvalidMove {
            player: Player::Computer,
            mv: Move::exit(sq(28)),
            roll: roll(1),
        };
        assert_eq!(err.to_string(), "28 -> off is not a legal move for computer with roll 1");
    }

    #[test]
    fn moves_serialize_with_tagged_destination() {
        let json = serde_json::to_string(&Move::exit(3)).unwrap();
        assert_eq!(json, r#"{"from":3,"to":{"type":"exit"}}"#);
        let parsed: Move = serde_json::from_str(r#"{"from":3,"to":{"type":"cell","index":4}}"#).unwrap();
        assert_eq!(parsed, Move::new(3, 4));
    }

    #[test]
    fn presentation_order_follows_squares() {
        let board = BoardState::from_squares(&[11, 13], &[], 0, 0).unwrap();
        let by_index = board.legal_moves(Player::Human, roll(1));
        let by_square = board.legal_moves_by_square(Player::Human, roll(1));
        let squares = |moves: &[Move]| moves.iter().map(|mv| mv.from_square().unwrap()).collect::<Vec<_>>();
        assert_eq!(squares(&by_index), vec![13, 11]);
        assert_eq!(squares(&by_square), vec![11, 13]);
    }

    #[test]
    fn out_of_range_origin_has_no_destination() {
        let board = BoardState::new();
        assert_eq!(board.destination_of(BOARD_CELLS, roll(1)), None);
        assert_eq!(board.destination_of(usize::MAX, roll(5)), None);
        assert_eq!(
            board.destination_of(sq(14), roll(2)),
            Some(Destination::Cell(sq(16)))
        );
    }

    #[test]
    fn random_games_conserve_pieces() {
        for seed in 0..40 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut board = BoardState::new();
            let mut mover = Player::Human;
            for _ in 0..400 {
                let before = board;
                let r = roll_sticks(&mut rng);
                board = board.apply_end_zone_correction(mover, r);
                let moves = board.legal_moves(mover, r);
                let chosen = board.forced_exit(mover).or_else(|| moves.choose(&mut rng).copied());
                if let Some(mv) = chosen {
                    board = board.apply_move(mover, mv, r).unwrap();
                }

                for player in Player::BOTH {
                    assert!(board.exited(player) >= before.exited(player), "seed {seed}\n{board}");
                    assert_eq!(
                        board.pieces_on_board(player) + board.exited(player),
                        PIECES_PER_PLAYER,
                        "seed {seed}\n{board}"
                    );
                }
                assert!(board.integrity_check().is_ok());

                if board.is_terminal() {
                    break;
                }
                mover = mover.opponent();
            }
        }
    }
}
