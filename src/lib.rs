pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{
    AiAgent, AiConfig, AiDecision, AiDifficulty, Expectiminimax, SearchResult, SearchStats,
};
pub use game::{
    roll_sticks, BoardState, Cell, Destination, EvalWeights, IntegrityError, Move, Player, Roll,
    RuleError, SpecialSquare,
};
use utils::set_panic_hook;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_player(name: &str) -> Result<Player, JsValue> {
    Player::from_str(name).map_err(to_js_error)
}

fn parse_roll(value: u8) -> Result<Roll, JsValue> {
    Roll::new(value).map_err(to_js_error)
}

fn checked_state(state: BoardState) -> Result<BoardState, JsValue> {
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(state)
}

fn config_for(difficulty: Option<&str>) -> AiConfig {
    let difficulty = difficulty
        .and_then(|value| AiDifficulty::from_str(value).ok())
        .unwrap_or(AiDifficulty::Normal);
    AiConfig::from_difficulty(difficulty)
}

/// 持有一个棋盘状态的前端句柄。回合流程（谁掷、何时掷）由调用方负责。
#[wasm_bindgen]
pub struct GameEngine {
    state: BoardState,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(initial_state_json: Option<String>) -> Result<GameEngine, JsValue> {
        let state = match initial_state_json {
            Some(json) => checked_state(serde_json::from_str(&json).map_err(serde_to_js_error)?)?,
            None => BoardState::new(),
        };
        Ok(GameEngine { state })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: BoardState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.state = checked_state(state)?;
        Ok(())
    }

    pub fn legal_moves_json(&self, player: &str, roll: u8) -> Result<String, JsValue> {
        let player = parse_player(player)?;
        let roll = parse_roll(roll)?;
        let moves = self.state.legal_moves_by_square(player, roll);
        serde_json::to_string(&moves).map_err(serde_to_js_error)
    }

    /// 回合开始时调用：按点数处理 28/29 号格上卡住的棋子。
    pub fn apply_end_zone(&mut self, player: &str, roll: u8) -> Result<String, JsValue> {
        let player = parse_player(player)?;
        let roll = parse_roll(roll)?;
        self.state = self.state.apply_end_zone_correction(player, roll);
        self.state_json()
    }

    pub fn apply_move_json(&mut self, player: &str, move_json: &str, roll: u8) -> Result<String, JsValue> {
        let player = parse_player(player)?;
        let roll = parse_roll(roll)?;
        let mv: Move = serde_json::from_str(move_json).map_err(serde_to_js_error)?;
        self.state = self.state.apply_move(player, mv, roll).map_err(to_js_error)?;
        self.state_json()
    }

    /// 让 AI 为 `player` 走一步并写回状态；终点区修正已包含在内。
    pub fn apply_ai_move(
        &mut self,
        player: &str,
        roll: u8,
        difficulty: Option<String>,
    ) -> Result<String, JsValue> {
        let player = parse_player(player)?;
        let roll = parse_roll(roll)?;
        let mut agent = AiAgent::new(config_for(difficulty.as_deref()));
        let decision = agent.decide_action(&self.state, player, roll);
        self.state = decision.state;
        serde_json::to_string(&decision).map_err(serde_to_js_error)
    }

    pub fn think_ai(
        &self,
        player: String,
        roll: u8,
        difficulty: Option<String>,
        delay_ms: Option<u32>,
    ) -> Promise {
        let state = self.state;
        let config = config_for(difficulty.as_deref());
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            let player = parse_player(&player)?;
            let roll = parse_roll(roll)?;
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = AiAgent::new(config);
            let decision = agent.decide_action(&state, player, roll);
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    pub fn render(&self) -> String {
        self.state.to_string()
    }
}

/// 返回开局局面。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&BoardState::new()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "rollSticks")]
pub fn roll_sticks_js() -> u8 {
    let mut rng = SmallRng::from_entropy();
    roll_sticks(&mut rng).value()
}

#[wasm_bindgen(js_name = "legalMoves")]
pub fn legal_moves(state: JsValue, player: &str, roll: u8) -> Result<JsValue, JsValue> {
    let state: BoardState = from_value(state).map_err(JsValue::from)?;
    let state = checked_state(state)?;
    let moves = state.legal_moves_by_square(parse_player(player)?, parse_roll(roll)?);
    to_value(&moves).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "evaluateState")]
pub fn evaluate_state(state: JsValue) -> Result<f64, JsValue> {
    let state: BoardState = from_value(state).map_err(JsValue::from)?;
    Ok(checked_state(state)?.evaluate())
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: BoardState = from_value(state).map_err(JsValue::from)?;
    checked_state(state)?;
    Ok(())
}

#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(
    state: JsValue,
    player: &str,
    roll: u8,
    difficulty: Option<String>,
) -> Result<JsValue, JsValue> {
    let state: BoardState = from_value(state).map_err(JsValue::from)?;
    let state = checked_state(state)?;
    let mut agent = AiAgent::new(config_for(difficulty.as_deref()));
    let decision = agent.decide_action(&state, parse_player(player)?, parse_roll(roll)?);
    to_value(&decision).map_err(JsValue::from)
}
