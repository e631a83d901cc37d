//! S 形路径：棋盘格号（1..=30）与存储下标（0..=29）之间的双向映射。
//!
//! 第 0 行从左到右，第 1 行从右到左，第 2 行再从左到右。

/// 玩家可见的格号，取值 1..=30。
pub type Square = u8;
/// 棋盘存储下标，取值 0..=29。
pub type CellIndex = usize;

pub const BOARD_CELLS: usize = 30;
pub const ROWS: usize = 3;
pub const COLUMNS: usize = 10;
pub const FIRST_SQUARE: Square = 1;
pub const LAST_SQUARE: Square = 30;

/// `PATH[square - 1]` 为该格所在的下标。
pub const PATH: [CellIndex; BOARD_CELLS] = build_path();
/// `SQUARE_OF_INDEX[index]` 为该下标对应的格号。
pub const SQUARE_OF_INDEX: [Square; BOARD_CELLS] = build_square_of_index();

const fn build_path() -> [CellIndex; BOARD_CELLS] {
    let mut path = [0; BOARD_CELLS];
    let mut k = 0;
    let mut row = 0;
    while row < ROWS {
        let mut col = 0;
        while col < COLUMNS {
            let offset = if row % 2 == 0 { col } else { COLUMNS - 1 - col };
            path[k] = row * COLUMNS + offset;
            k += 1;
            col += 1;
        }
        row += 1;
    }
    path
}

const fn build_square_of_index() -> [Square; BOARD_CELLS] {
    let path = build_path();
    let mut inverse = [0; BOARD_CELLS];
    let mut i = 0;
    while i < BOARD_CELLS {
        inverse[path[i]] = (i + 1) as Square;
        i += 1;
    }
    inverse
}

#[inline]
pub const fn is_valid_square(square: Square) -> bool {
    square >= FIRST_SQUARE && square <= LAST_SQUARE
}

#[inline]
pub const fn is_valid_index(index: CellIndex) -> bool {
    index < BOARD_CELLS
}

/// 下标对应的格号。调用方需保证 `index < 30`。
#[inline]
pub const fn square_of_index(index: CellIndex) -> Square {
    SQUARE_OF_INDEX[index]
}

/// 格号对应的下标。调用方需保证格号在 1..=30。
#[inline]
pub const fn index_of_square(square: Square) -> CellIndex {
    PATH[(square - 1) as usize]
}

pub fn checked_index_of_square(square: Square) -> Option<CellIndex> {
    is_valid_square(square).then(|| index_of_square(square))
}

pub fn checked_square_of_index(index: CellIndex) -> Option<Square> {
    is_valid_index(index).then(|| square_of_index(index))
}
