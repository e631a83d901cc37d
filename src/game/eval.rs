//! 启发式局面评估：电脑方为正，人类方为负。

use serde::{Deserialize, Serialize};

use super::dice::Roll;
use super::effects::{EXIT_ANY_ROLL, EXIT_ON_THREE, EXIT_ON_TWO, GO_TO_CHECKPOINT, WALL};
use super::path::{checked_index_of_square, square_of_index, Square};
use super::rules::Destination;
use super::state::{BoardState, Player, PIECES_PER_PLAYER};

/// 评估函数的全部常数。默认值约为 70% 安全、30% 进度。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvalWeights {
    pub win_score: f64,
    pub safety_weight: f64,
    pub exit_weight: f64,
    pub wall_bonus: f64,
    pub go_to_checkpoint_bonus: f64,
    pub exit_on_three_bonus: f64,
    pub exit_on_two_bonus: f64,
    pub exit_any_roll_bonus: f64,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            win_score: 10_000.0,
            safety_weight: 30.0,
            exit_weight: 50.0,
            wall_bonus: 10.0,
            go_to_checkpoint_bonus: -20.0,
            exit_on_three_bonus: 12.0,
            exit_on_two_bonus: 14.0,
            exit_any_roll_bonus: 25.0,
        }
    }
}

impl EvalWeights {
    pub fn special_bonus(&self, square: Square) -> f64 {
        match square {
            WALL => self.wall_bonus,
            GO_TO_CHECKPOINT => self.go_to_checkpoint_bonus,
            EXIT_ON_THREE => self.exit_on_three_bonus,
            EXIT_ON_TWO => self.exit_on_two_bonus,
            EXIT_ANY_ROLL => self.exit_any_roll_bonus,
            _ => 0.0,
        }
    }

    /// 任意局面评估值绝对值的上界，搜索用它推导机会节点的窗口。
    pub fn value_bound(&self) -> f64 {
        let largest_bonus = [
            self.wall_bonus,
            self.go_to_checkpoint_bonus,
            self.exit_on_three_bonus,
            self.exit_on_two_bonus,
            self.exit_any_roll_bonus,
        ]
        .iter()
        .fold(0.0_f64, |acc, bonus| acc.max(bonus.abs()));
        let pieces = f64::from(PIECES_PER_PLAYER);
        let heuristic = pieces * (self.safety_weight.abs() + largest_bonus) + pieces * self.exit_weight.abs();
        self.win_score.abs().max(heuristic)
    }
}

impl BoardState {
    /// 使用默认权重评估。
    pub fn evaluate(&self) -> f64 {
        self.evaluate_with(&EvalWeights::default())
    }

    pub fn evaluate_with(&self, weights: &EvalWeights) -> f64 {
        if self.has_won(Player::Computer) {
            return weights.win_score;
        }
        if self.has_won(Player::Human) {
            return -weights.win_score;
        }

        let mut score = 0.0;
        for (index, cell) in self.cells.iter().enumerate() {
            let Some(owner) = cell.occupant() else {
                continue;
            };
            let square = square_of_index(index);
            let safety = 1.0 - self.danger(owner, square);
            let value = safety * weights.safety_weight + weights.special_bonus(square);
            match owner {
                Player::Computer => score += value,
                Player::Human => score -= value,
            }
        }

        score += f64::from(self.computer_exited) * weights.exit_weight;
        score -= f64::from(self.human_exited) * weights.exit_weight;
        score
    }

    /// `owner` 在 `square` 上的棋子下一手被对方换走的概率，上限为 1。
    ///
    /// 只计入按走子规则真正能落到 `square` 的进攻棋子。
    pub fn danger(&self, owner: Player, square: Square) -> f64 {
        let attacker = owner.opponent();
        let Some(target) = checked_index_of_square(square) else {
            return 0.0;
        };
        let danger: f64 = Roll::ALL
            .iter()
            .filter(|&&roll| {
                let Some(from) = square.checked_sub(roll.value()).filter(|&from| from >= 1) else {
                    return false;
                };
                self.has_piece_on_square(attacker, from)
                    && checked_index_of_square(from)
                        .and_then(|origin| self.destination_of(origin, roll))
                        == Some(Destination::Cell(target))
            })
            .map(|roll| roll.probability())
            .sum();
        danger.min(1.0)
    }
}
