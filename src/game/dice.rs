use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::rules::RuleError;

pub const MIN_ROLL: u8 = 1;
pub const MAX_ROLL: u8 = 5;

/// 四根投掷棒的点数分布（以 1/16 为单位）：1→4, 2→6, 3→4, 4→1, 5→1。
const ROLL_WEIGHTS: [u8; 5] = [4, 6, 4, 1, 1];
const WEIGHT_TOTAL: u8 = 16;

/// 合法的投掷点数，只能是 1..=5。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Roll(u8);

impl Roll {
    pub const ALL: [Roll; 5] = [Roll(1), Roll(2), Roll(3), Roll(4), Roll(5)];

    pub fn new(value: u8) -> Result<Self, RuleError> {
        if (MIN_ROLL..=MAX_ROLL).contains(&value) {
            Ok(Roll(value))
        } else {
            Err(RuleError::InvalidRoll { roll: value })
        }
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// 该点数在一次投掷中出现的概率。
    #[inline]
    pub fn probability(self) -> f64 {
        f64::from(ROLL_WEIGHTS[(self.0 - 1) as usize]) / f64::from(WEIGHT_TOTAL)
    }
}

impl TryFrom<u8> for Roll {
    type Error = RuleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Roll::new(value)
    }
}

impl From<Roll> for u8 {
    fn from(roll: Roll) -> Self {
        roll.0
    }
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 按投掷棒分布抽取一次点数。核心搜索从不调用它，只在对局编排层使用。
pub fn roll_sticks<R: Rng + ?Sized>(rng: &mut R) -> Roll {
    let mut ticket = rng.gen_range(0..WEIGHT_TOTAL);
    for roll in Roll::ALL {
        let weight = ROLL_WEIGHTS[(roll.0 - 1) as usize];
        if ticket < weight {
            return roll;
        }
        ticket -= weight;
    }
    Roll(MAX_ROLL)
}
