//! 特殊格规则：重生点、墙、传送回重生点，以及终点区的出盘条件。

use serde::{Deserialize, Serialize};

use super::path::{index_of_square, CellIndex, Square};
use super::state::{BoardState, Cell, Player};

pub const CHECKPOINT: Square = 15;
pub const WALL: Square = 26;
pub const GO_TO_CHECKPOINT: Square = 27;
pub const EXIT_ON_THREE: Square = 28;
pub const EXIT_ON_TWO: Square = 29;
pub const EXIT_ANY_ROLL: Square = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpecialSquare {
    Checkpoint,
    Wall,
    GoToCheckpoint,
    ExitOnThree,
    ExitOnTwo,
    ExitAnyRoll,
}

impl SpecialSquare {
    pub const ALL: [SpecialSquare; 6] = [
        SpecialSquare::Checkpoint,
        SpecialSquare::Wall,
        SpecialSquare::GoToCheckpoint,
        SpecialSquare::ExitOnThree,
        SpecialSquare::ExitOnTwo,
        SpecialSquare::ExitAnyRoll,
    ];

    pub fn from_square(square: Square) -> Option<Self> {
        match square {
            CHECKPOINT => Some(SpecialSquare::Checkpoint),
            WALL => Some(SpecialSquare::Wall),
            GO_TO_CHECKPOINT => Some(SpecialSquare::GoToCheckpoint),
            EXIT_ON_THREE => Some(SpecialSquare::ExitOnThree),
            EXIT_ON_TWO => Some(SpecialSquare::ExitOnTwo),
            EXIT_ANY_ROLL => Some(SpecialSquare::ExitAnyRoll),
            _ => None,
        }
    }

    pub const fn square(self) -> Square {
        match self {
            SpecialSquare::Checkpoint => CHECKPOINT,
            SpecialSquare::Wall => WALL,
            SpecialSquare::GoToCheckpoint => GO_TO_CHECKPOINT,
            SpecialSquare::ExitOnThree => EXIT_ON_THREE,
            SpecialSquare::ExitOnTwo => EXIT_ON_TWO,
            SpecialSquare::ExitAnyRoll => EXIT_ANY_ROLL,
        }
    }

    /// 空格渲染时使用的标记。
    pub const fn marker(self) -> char {
        match self {
            SpecialSquare::Checkpoint => 'R',
            SpecialSquare::Wall => 'S',
            SpecialSquare::GoToCheckpoint => 'W',
            SpecialSquare::ExitOnThree => 'A',
            SpecialSquare::ExitOnTwo => 'B',
            SpecialSquare::ExitAnyRoll => 'D',
        }
    }
}

/// 终点区中需要精确点数才能出盘的格子。
pub fn required_exit_roll(square: Square) -> Option<u8> {
    match square {
        EXIT_ON_THREE => Some(3),
        EXIT_ON_TWO => Some(2),
        _ => None,
    }
}

/// 从 `from` 到 `to` 是否越过了墙（落在墙上不算越过）。
#[inline]
pub fn crosses_wall(from: Square, to: Square) -> bool {
    from < WALL && to > WALL
}

impl BoardState {
    /// 从重生点向下扫描，把棋子放到第一个空格。全部占满时返回 `None`，棋盘不变。
    pub(crate) fn place_on_checkpoint(&mut self, player: Player) -> Option<CellIndex> {
        let index = (1..=CHECKPOINT)
            .rev()
            .map(index_of_square)
            .find(|&index| self.cells[index] == Cell::Empty)?;
        self.cells[index] = Cell::from(player);
        Some(index)
    }

    /// 把 `square` 上的棋子送回重生点区域；无处可放时棋子留在原格。
    pub(crate) fn send_to_checkpoint(&mut self, player: Player, square: Square) {
        let index = index_of_square(square);
        self.cells[index] = Cell::Empty;
        if self.place_on_checkpoint(player).is_none() {
            self.cells[index] = Cell::from(player);
        }
    }

    /// 落子后的特殊格效果。
    pub(crate) fn resolve_landing(&mut self, player: Player, square: Square) {
        if square == GO_TO_CHECKPOINT {
            self.send_to_checkpoint(player, square);
        }
    }
}
