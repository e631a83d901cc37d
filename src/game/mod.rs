//! 游戏核心逻辑模块（S 形路径、棋盘状态、规则与评估）。

pub mod dice;
pub mod effects;
pub mod eval;
pub mod path;
pub mod rules;
pub mod state;

pub use dice::{roll_sticks, Roll};
pub use effects::{
    SpecialSquare,
    CHECKPOINT,
    EXIT_ANY_ROLL,
    EXIT_ON_THREE,
    EXIT_ON_TWO,
    GO_TO_CHECKPOINT,
    WALL,
};
pub use eval::EvalWeights;
pub use path::{index_of_square, square_of_index, CellIndex, Square};
pub use rules::{Destination, Move, RuleError};
pub use state::{BoardState, Cell, IntegrityError, Player, PIECES_PER_PLAYER};
