pub mod ai;
pub mod game;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{best_move, minimax, AiAgent, AiConfig, AiDecision, Evaluation, SearchError};
pub use game::{
    GameEvent, GameState, GameStatus, IntegrityError, MoveOutcome, NextStep, RuleEngine,
    RuleError, RuleResolution, Side, AI_THINK_DELAY_MS, INITIAL_PILE, MAX_TAKE,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    if console_log::init_with_level(log::Level::Debug).is_err() {
        web_sys::console::warn_1(&"logger already initialised".into());
    }
}

fn to_js_error<E: Serialize + std::fmt::Display>(error: E) -> JsValue {
    to_value(&error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

/// JS 传入的取子数可能为负或超出 u8，统一转换为走子错误。
fn amount_from_js(amount: i32, state: &GameState) -> Result<u8, RuleError> {
    u8::try_from(amount).map_err(|_| RuleError::InvalidAmount {
        amount,
        max: state.max_take(),
    })
}

fn parse_state(json: &str) -> Result<GameState, JsValue> {
    let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(state)
}

#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    applied: RuleResolution,
}

#[wasm_bindgen]
pub struct NimEngine {
    state: GameState,
    rules: RuleEngine,
    agent: AiAgent,
}

#[wasm_bindgen]
impl NimEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(initial_state_json: Option<String>) -> Result<NimEngine, JsValue> {
        let state = match initial_state_json {
            Some(json) => parse_state(&json)?,
            None => GameState::new(),
        };
        Ok(NimEngine {
            state,
            rules: RuleEngine::new(),
            agent: AiAgent::default(),
        })
    }

    #[wasm_bindgen(js_name = "stateJson")]
    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    #[wasm_bindgen(js_name = "setStateJson")]
    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.state = parse_state(json)?;
        Ok(())
    }

    pub fn status(&self) -> Result<JsValue, JsValue> {
        to_value(&self.state.status()).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = "statusJson")]
    pub fn status_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.status()).map_err(serde_to_js_error)
    }

    pub fn pile(&self) -> u8 {
        self.state.pile
    }

    #[wasm_bindgen(js_name = "statusMessage")]
    pub fn status_message(&self) -> String {
        self.state.status_message()
    }

    #[wasm_bindgen(js_name = "pileLabel")]
    pub fn pile_label(&self) -> String {
        self.state.pile_label()
    }

    /// 严格模式：非法走子以结构化错误返回。
    #[wasm_bindgen(js_name = "applyPlayerMove")]
    pub fn apply_player_move(&mut self, amount: i32) -> Result<String, JsValue> {
        let amount = amount_from_js(amount, &self.state).map_err(to_js_error)?;
        let outcome = self
            .rules
            .apply_player_move(&mut self.state, amount)
            .map_err(to_js_error)?;
        make_resolution_json(RuleResolution::new(self.state.clone(), Some(outcome)))
    }

    /// 宽松模式：非法走子被忽略，返回未改变的局面。
    #[wasm_bindgen(js_name = "tryPlayerMove")]
    pub fn try_player_move(&mut self, amount: i32) -> Result<String, JsValue> {
        let outcome = match amount_from_js(amount, &self.state) {
            Ok(amount) => self.rules.try_player_move(&mut self.state, amount),
            Err(error) => {
                log::warn!("ignoring player move: {error}");
                None
            }
        };
        make_resolution_json(RuleResolution::new(self.state.clone(), outcome))
    }

    /// 立即计算并应用 AI 走子，不经过延迟。
    #[wasm_bindgen(js_name = "applyAiMove")]
    pub fn apply_ai_move(&mut self) -> Result<String, JsValue> {
        if self.state.is_finished() {
            return Err(to_js_error(RuleError::GameFinished));
        }
        let decision = self.agent.decide(&self.state).map_err(to_js_error)?;
        let outcome = self
            .rules
            .apply_ai_decision(&mut self.state, &decision)
            .map_err(to_js_error)?;
        let response = AiMoveResponse {
            decision,
            applied: RuleResolution::new(self.state.clone(), Some(outcome)),
        };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    /// 等待 `delay_ms`（默认 900ms）后在局面快照上计算 AI 决策，
    /// 结果需通过 `applyAiDecision` 回传才会生效。
    #[wasm_bindgen(js_name = "thinkAi")]
    pub fn think_ai(&self, delay_ms: Option<u32>) -> Promise {
        let state = self.state.clone();
        let config = self.agent.config();
        let delay = delay_ms.unwrap_or_else(|| self.rules.think_delay_ms());

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = AiAgent::new(config);
            let decision = agent.decide(&state).map_err(to_js_error)?;
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    #[wasm_bindgen(js_name = "applyAiDecision")]
    pub fn apply_ai_decision(&mut self, decision_json: &str) -> Result<String, JsValue> {
        let decision: AiDecision =
            serde_json::from_str(decision_json).map_err(serde_to_js_error)?;
        let outcome = self
            .rules
            .apply_ai_decision(&mut self.state, &decision)
            .map_err(to_js_error)?;
        make_resolution_json(RuleResolution::new(self.state.clone(), Some(outcome)))
    }

    pub fn reset(&mut self) -> Result<String, JsValue> {
        let event = self.rules.reset(&mut self.state);
        make_resolution_json(RuleResolution::with_events(
            self.state.clone(),
            None,
            vec![event],
        ))
    }
}

/// 返回开局状态，方便前端调试或初始化。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&GameState::new()).map_err(JsValue::from)
}

/// JS 数值按 i32 接收，避免 u8 截断后把越界石子数当成合法局面。
fn pile_from_js(pile: i32) -> Result<u8, SearchError> {
    u8::try_from(pile)
        .ok()
        .filter(|pile| *pile <= INITIAL_PILE)
        .ok_or(SearchError::PileOutOfRange { pile })
}

#[wasm_bindgen(js_name = "bestMove")]
pub fn best_move_js(pile: i32) -> Result<u8, JsValue> {
    let pile = pile_from_js(pile).map_err(to_js_error)?;
    best_move(pile).map_err(to_js_error)
}

#[wasm_bindgen(js_name = "minimax")]
pub fn minimax_js(pile: i32, is_maximizing: bool) -> Result<i8, JsValue> {
    let pile = pile_from_js(pile).map_err(to_js_error)?;
    minimax(pile, is_maximizing).map_err(to_js_error)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
