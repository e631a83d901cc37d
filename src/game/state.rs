use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::effects::SpecialSquare;
use super::path::{
    checked_index_of_square, index_of_square, square_of_index, CellIndex, Square, BOARD_CELLS,
    COLUMNS, ROWS,
};
use super::rules::RuleError;

/// 每方的棋子数，也是获胜所需的出盘数。
pub const PIECES_PER_PLAYER: u8 = 7;
/// 开局时占据的格子数（1..=14，奇数格属人类，偶数格属电脑）。
pub const OPENING_SQUARES: Square = 14;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Human,
    Computer,
}

impl Player {
    pub const BOTH: [Player; 2] = [Player::Human, Player::Computer];

    #[inline]
    pub const fn opponent(self) -> Player {
        match self {
            Player::Human => Player::Computer,
            Player::Computer => Player::Human,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Player::Human => 'H',
            Player::Computer => 'C',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Human => f.write_str("human"),
            Player::Computer => f.write_str("computer"),
        }
    }
}

impl FromStr for Player {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "h" | "player" => Ok(Player::Human),
            "computer" | "c" | "ai" => Ok(Player::Computer),
            _ => Err(RuleError::UnknownPlayer { name: s.to_string() }),
        }
    }
}

/// 单个格子的占用情况，每格至多一枚棋子。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    #[default]
    Empty,
    Human,
    Computer,
}

impl Cell {
    #[inline]
    pub const fn occupant(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::Human => Some(Player::Human),
            Cell::Computer => Some(Player::Computer),
        }
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl From<Player> for Cell {
    fn from(player: Player) -> Self {
        match player {
            Player::Human => Cell::Human,
            Player::Computer => Cell::Computer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("{player} has {on_board} pieces on the board and {exited} exited, more than {}", PIECES_PER_PLAYER)]
    TooManyPieces {
        player: Player,
        on_board: u8,
        exited: u8,
    },
}

/// 棋盘状态：30 格占用情况加上双方的出盘计数。
///
/// 按值传递；规则操作总是返回新的状态，从不修改已发布的状态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BoardState {
    pub(crate) cells: [Cell; BOARD_CELLS],
    #[serde(default)]
    pub(crate) human_exited: u8,
    #[serde(default)]
    pub(crate) computer_exited: u8,
}

impl BoardState {
    /// 开局布置：1..=14 格交替放子，奇数格为人类。
    pub fn new() -> Self {
        let mut board = Self::empty();
        for square in 1..=OPENING_SQUARES {
            let owner = if square % 2 == 1 {
                Player::Human
            } else {
                Player::Computer
            };
            board.cells[index_of_square(square)] = Cell::from(owner);
        }
        board
    }

    pub fn empty() -> Self {
        Self {
            cells: [Cell::Empty; BOARD_CELLS],
            human_exited: 0,
            computer_exited: 0,
        }
    }

    /// 按格号构造任意局面，主要用于残局分析与测试。
    pub fn from_squares(
        human: &[Square],
        computer: &[Square],
        human_exited: u8,
        computer_exited: u8,
    ) -> Result<Self, RuleError> {
        let mut board = Self::empty()
            .with_exited(Player::Human, human_exited)
            .with_exited(Player::Computer, computer_exited);
        for &square in human {
            board = board.with_piece(Player::Human, square)?;
        }
        for &square in computer {
            board = board.with_piece(Player::Computer, square)?;
        }
        board
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })?;
        Ok(board)
    }

    pub fn with_piece(mut self, player: Player, square: Square) -> Result<Self, RuleError> {
        let index = checked_index_of_square(square).ok_or(RuleError::SquareOutOfRange { square })?;
        if !self.cells[index].is_empty() {
            return Err(RuleError::SquareOccupied { square });
        }
        self.cells[index] = Cell::from(player);
        Ok(self)
    }

    pub fn with_exited(mut self, player: Player, count: u8) -> Self {
        match player {
            Player::Human => self.human_exited = count,
            Player::Computer => self.computer_exited = count,
        }
        self
    }

    #[inline]
    pub fn cell(&self, index: CellIndex) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    pub fn cells(&self) -> &[Cell; BOARD_CELLS] {
        &self.cells
    }

    pub fn occupant_at_square(&self, square: Square) -> Option<Player> {
        checked_index_of_square(square).and_then(|index| self.cells[index].occupant())
    }

    pub fn has_piece_on_square(&self, player: Player, square: Square) -> bool {
        self.occupant_at_square(square) == Some(player)
    }

    #[inline]
    pub fn exited(&self, player: Player) -> u8 {
        match player {
            Player::Human => self.human_exited,
            Player::Computer => self.computer_exited,
        }
    }

    pub(crate) fn record_exit(&mut self, player: Player) {
        match player {
            Player::Human => self.human_exited += 1,
            Player::Computer => self.computer_exited += 1,
        }
    }

    /// 该玩家棋子所在的下标，按下标升序。
    pub fn pieces(&self, player: Player) -> impl Iterator<Item = CellIndex> + '_ {
        let cell = Cell::from(player);
        self.cells
            .iter()
            .enumerate()
            .filter(move |&(_, &c)| c == cell)
            .map(|(index, _)| index)
    }

    pub fn pieces_on_board(&self, player: Player) -> u8 {
        self.pieces(player).count() as u8
    }

    pub fn has_won(&self, player: Player) -> bool {
        self.exited(player) >= PIECES_PER_PLAYER
    }

    pub fn is_terminal(&self) -> bool {
        Player::BOTH.iter().any(|&player| self.has_won(player))
    }

    pub fn winner(&self) -> Option<Player> {
        if self.has_won(Player::Computer) {
            Some(Player::Computer)
        } else if self.has_won(Player::Human) {
            Some(Player::Human)
        } else {
            None
        }
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        for player in Player::BOTH {
            let on_board = self.pieces_on_board(player);
            let exited = self.exited(player);
            if u16::from(on_board) + u16::from(exited) > u16::from(PIECES_PER_PLAYER) {
                return Err(IntegrityError::TooManyPieces {
                    player,
                    on_board,
                    exited,
                });
            }
        }
        Ok(())
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..ROWS {
            for col in 0..COLUMNS {
                let index = row * COLUMNS + col;
                let square = square_of_index(index);
                match (self.cells[index].occupant(), SpecialSquare::from_square(square)) {
                    (Some(player), _) => write!(f, " {}  ", player.symbol())?,
                    (None, Some(special)) => write!(f, "[{}] ", special.marker())?,
                    (None, None) => f.write_str(" .  ")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "Out: H={} C={}", self.human_exited, self.computer_exited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_alternates_on_first_fourteen_squares() {
        let board = BoardState::new();
        for square in 1..=OPENING_SQUARES {
            let expected = if square % 2 == 1 {
                Player::Human
            } else {
                Player::Computer
            };
            assert_eq!(board.occupant_at_square(square), Some(expected));
        }
        for square in 15..=30 {
            assert_eq!(board.occupant_at_square(square), None);
        }
        assert_eq!(board.pieces_on_board(Player::Human), PIECES_PER_PLAYER);
        assert_eq!(board.pieces_on_board(Player::Computer), PIECES_PER_PLAYER);
        assert!(!board.is_terminal());
        assert!(board.integrity_check().is_ok());
    }

    #[test]
    fn win_requires_seven_exits() {
        let board = BoardState::empty().with_exited(Player::Human, 6);
        assert!(!board.has_won(Player::Human));
        let board = board.with_exited(Player::Human, 7);
        assert!(board.has_won(Player::Human));
        assert!(board.is_terminal());
        assert_eq!(board.winner(), Some(Player::Human));
    }

    #[test]
    fn integrity_rejects_extra_pieces() {
        let result = BoardState::from_squares(&[1, 2], &[], 6, 0);
        assert_eq!(
            result,
            Err(RuleError::IntegrityViolation {
                error: IntegrityError::TooManyPieces {
                    player: Player::Human,
                    on_board: 2,
                    exited: 6,
                }
            })
        );
    }

    #[test]
    fn placing_on_an_occupied_square_fails() {
        let result = BoardState::from_squares(&[3], &[3], 0, 0);
        assert_eq!(result, Err(RuleError::SquareOccupied { square: 3 }));
        let result = BoardState::from_squares(&[31], &[], 0, 0);
        assert_eq!(result, Err(RuleError::SquareOutOfRange { square: 31 }));
    }

    #[test]
    fn player_names_parse() {
        assert_eq!("Human".parse::<Player>(), Ok(Player::Human));
        assert_eq!("c".parse::<Player>(), Ok(Player::Computer));
        assert!("nobody".parse::<Player>().is_err());
    }

    #[test]
    fn renders_grid_with_special_markers() {
        let rendered = BoardState::new().to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with(" H   C "));
        assert!(lines[1].contains("[R]"));
        assert!(lines[2].contains("[S]") && lines[2].contains("[D]"));
        assert_eq!(lines[3], "Out: H=0 C=0");
    }

    #[test]
    fn serializes_as_plain_json() {
        let board = BoardState::from_squares(&[29], &[30], 2, 3).unwrap();
        let json = serde_json::to_string(&board).unwrap();
        let parsed: BoardState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, board);
        assert!(json.contains("\"human_exited\":2"));
    }
}
