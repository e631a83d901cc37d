use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::game::{BoardState, EvalWeights, Move, Player, Roll};
use crate::utils::console_log;

const DEFAULT_DEPTH: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct SearchInstant {
    timestamp: f64,
}

impl SearchInstant {
    fn now() -> Self {
        Self {
            timestamp: now_millis(),
        }
    }

    fn elapsed(&self) -> Duration {
        let elapsed_ms = (now_millis() - self.timestamp).max(0.0);
        Duration::from_millis(elapsed_ms as u64)
    }
}

impl std::ops::Add<Duration> for SearchInstant {
    type Output = SearchInstant;

    fn add(self, duration: Duration) -> Self::Output {
        Self {
            timestamp: self.timestamp + duration.as_secs_f64() * 1000.0,
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn now_millis() -> f64 {
    web_sys::js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
fn now_millis() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    Easy,
    Normal,
    Hard,
    Expert,
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(AiDifficulty::Easy),
            "normal" | "medium" => Ok(AiDifficulty::Normal),
            "hard" => Ok(AiDifficulty::Hard),
            "expert" | "extreme" => Ok(AiDifficulty::Expert),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiConfig {
    /// 搜索层数；每层是一次决策加上随后的机会节点。
    pub depth: u8,
    /// 协作式超时；`None` 表示不限时。
    pub time_limit: Option<Duration>,
    /// 关闭后决策节点不再剪枝，用作参照遍历。
    pub pruning: bool,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        let depth = match difficulty {
            AiDifficulty::Easy => 1,
            AiDifficulty::Normal => 2,
            AiDifficulty::Hard => 3,
            AiDifficulty::Expert => 4,
        };
        Self {
            depth,
            ..Self::default()
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn without_pruning(mut self) -> Self {
        self.pruning = false;
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            time_limit: None,
            pruning: true,
        }
    }
}

/// 每次搜索调用的返回值：选中的局面及其评估值。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub state: BoardState,
    pub value: f64,
    /// 决策节点选中的走法；机会节点、截断和让步时为空。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_move: Option<Move>,
}

impl SearchResult {
    fn leaf(state: BoardState, value: f64) -> Self {
        Self {
            state,
            value,
            best_move: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes_visited: u64,
    pub nodes_evaluated: u64,
    pub cutoffs: u64,
    pub timed_out: bool,
}

/// 带 alpha-beta 剪枝的期望极小化极大搜索。电脑为 Max 方，人类为 Min 方。
pub struct Expectiminimax {
    config: AiConfig,
    weights: EvalWeights,
    bound: f64,
    stats: SearchStats,
    deadline: Option<SearchInstant>,
}

impl Expectiminimax {
    pub fn new(config: AiConfig, weights: EvalWeights) -> Self {
        let bound = weights.value_bound();
        Self {
            config,
            weights,
            bound,
            stats: SearchStats::default(),
            deadline: None,
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn weights(&self) -> &EvalWeights {
        &self.weights
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// 清空统计并按配置重新计时。
    pub fn reset(&mut self) {
        self.stats = SearchStats::default();
        self.deadline = self
            .config
            .time_limit
            .map(|limit| SearchInstant::now() + limit);
    }

    pub fn max_node(
        &mut self,
        state: &BoardState,
        depth: u8,
        roll: Roll,
        alpha: f64,
        beta: f64,
    ) -> SearchResult {
        self.decision_node(state, depth, roll, Player::Computer, alpha, beta)
    }

    pub fn min_node(
        &mut self,
        state: &BoardState,
        depth: u8,
        roll: Roll,
        alpha: f64,
        beta: f64,
    ) -> SearchResult {
        self.decision_node(state, depth, roll, Player::Human, alpha, beta)
    }

    /// 对 `next_mover` 的五种点数求期望。五个分支全部展开，不在此处剪枝。
    ///
    /// 每个分支得到由父窗口、已累计期望和估值上界推出的子窗口，
    /// 保证根节点的值与不剪枝的遍历一致。
    pub fn chance_node(
        &mut self,
        state: &BoardState,
        depth: u8,
        next_mover: Player,
        alpha: f64,
        beta: f64,
    ) -> SearchResult {
        self.stats.nodes_visited += 1;
        if let Some(leaf) = self.cutoff(state, depth) {
            return leaf;
        }

        let mut expected = 0.0;
        let mut remaining = 1.0;
        for roll in Roll::ALL {
            let probability = roll.probability();
            remaining -= probability;
            let (child_alpha, child_beta) = if self.config.pruning {
                (
                    (alpha - expected - self.bound * remaining) / probability,
                    (beta - expected + self.bound * remaining) / probability,
                )
            } else {
                (f64::NEG_INFINITY, f64::INFINITY)
            };
            let child = match next_mover {
                Player::Computer => self.max_node(state, depth, roll, child_alpha, child_beta),
                Player::Human => self.min_node(state, depth, roll, child_alpha, child_beta),
            };
            expected += probability * child.value;
        }

        SearchResult::leaf(*state, expected)
    }

    fn decision_node(
        &mut self,
        state: &BoardState,
        depth: u8,
        roll: Roll,
        mover: Player,
        mut alpha: f64,
        mut beta: f64,
    ) -> SearchResult {
        self.stats.nodes_visited += 1;
        if let Some(leaf) = self.cutoff(state, depth) {
            return leaf;
        }

        let current = state.apply_end_zone_correction(mover, roll);
        let next_mover = mover.opponent();

        if let Some(exit) = current.forced_exit(mover) {
            let next = current.apply_legal(mover, exit);
            let result = self.chance_node(&next, depth - 1, next_mover, alpha, beta);
            return SearchResult {
                best_move: Some(exit),
                ..result
            };
        }

        let moves = current.legal_moves(mover, roll);
        if moves.is_empty() {
            return self.chance_node(&current, depth - 1, next_mover, alpha, beta);
        }

        let maximizing = mover == Player::Computer;
        let mut best = SearchResult::leaf(
            current,
            if maximizing {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            },
        );

        for mv in moves {
            let next = current.apply_legal(mover, mv);
            let value = self
                .chance_node(&next, depth - 1, next_mover, alpha, beta)
                .value;

            let improves = if maximizing {
                value > best.value
            } else {
                value < best.value
            };
            if improves {
                best = SearchResult {
                    state: next,
                    value,
                    best_move: Some(mv),
                };
            }

            if maximizing {
                alpha = alpha.max(best.value);
            } else {
                beta = beta.min(best.value);
            }

            if self.stats.timed_out {
                break;
            }
            if self.config.pruning && alpha >= beta {
                self.stats.cutoffs += 1;
                break;
            }
        }

        best
    }

    fn cutoff(&mut self, state: &BoardState, depth: u8) -> Option<SearchResult> {
        if depth == 0 || state.is_terminal() || self.deadline_passed() {
            self.stats.nodes_evaluated += 1;
            return Some(SearchResult::leaf(
                *state,
                state.evaluate_with(&self.weights),
            ));
        }
        None
    }

    fn deadline_passed(&mut self) -> bool {
        if self.stats.timed_out {
            return true;
        }
        match self.deadline {
            Some(deadline) if SearchInstant::now() >= deadline => {
                self.stats.timed_out = true;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDecision {
    pub player: Player,
    pub roll: Roll,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Move>,
    /// 执行终点区修正和走法后的局面。
    pub state: BoardState,
    pub evaluation: f64,
    pub depth: u8,
    pub stats: SearchStats,
    pub duration_ms: u64,
}

/// 为任意一方选择走法的电脑玩家。
pub struct AiAgent {
    search: Expectiminimax,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self::with_weights(config, EvalWeights::default())
    }

    pub fn with_weights(config: AiConfig, weights: EvalWeights) -> Self {
        Self {
            search: Expectiminimax::new(config, weights),
        }
    }

    pub fn config(&self) -> &AiConfig {
        self.search.config()
    }

    pub fn decide_action(&mut self, state: &BoardState, player: Player, roll: Roll) -> AiDecision {
        let start = SearchInstant::now();
        self.search.reset();

        if state.is_terminal() {
            return AiDecision {
                player,
                roll,
                action: None,
                state: *state,
                evaluation: state.evaluate_with(self.search.weights()),
                depth: 0,
                stats: self.search.stats(),
                duration_ms: start.elapsed().as_millis() as u64,
            };
        }

        let depth = self.search.config().depth.max(1);
        let result = match player {
            Player::Computer => {
                self.search
                    .max_node(state, depth, roll, f64::NEG_INFINITY, f64::INFINITY)
            }
            Player::Human => {
                self.search
                    .min_node(state, depth, roll, f64::NEG_INFINITY, f64::INFINITY)
            }
        };
        let stats = self.search.stats();

        console_log(&format!(
            "ai {player} roll {roll}: depth {depth}, {} nodes ({} evaluated), value {:.2}{}",
            stats.nodes_visited,
            stats.nodes_evaluated,
            result.value,
            if stats.timed_out { ", timed out" } else { "" },
        ));

        AiDecision {
            player,
            roll,
            action: result.best_move,
            state: result.state,
            evaluation: result.value,
            depth,
            stats,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

impl Default for AiAgent {
    fn default() -> Self {
        AiAgent::new(AiConfig::default())
    }
}
