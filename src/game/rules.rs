use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use super::state::{GameEvent, GameState, GameStatus, IntegrityError, Side, AI_THINK_DELAY_MS};
use crate::ai::AiDecision;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Display, Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[display("the game is already over")]
    GameFinished,
    #[display("it is not the player's turn")]
    NotPlayerTurn,
    #[display("it is not the AI's turn")]
    NotAiTurn,
    #[display("cannot take {amount} stones, allowed range is 1..={max}")]
    InvalidAmount { amount: i32, max: u8 },
    #[display("decision for generation {actual} does not match current generation {expected}")]
    StaleDecision { expected: u64, actual: u64 },
    #[display("decision was made for a pile of {decided}, but {current} stones remain")]
    PositionChanged { decided: u8, current: u8 },
    #[display("state integrity violated: {error}")]
    IntegrityViolation { error: IntegrityError },
}

impl RuleError {
    /// 属于 "非法走子" 一类的错误，界面层直接忽略即可。
    pub fn is_invalid_move(&self) -> bool {
        matches!(
            self,
            RuleError::GameFinished
                | RuleError::NotPlayerTurn
                | RuleError::NotAiTurn
                | RuleError::InvalidAmount { .. }
        )
    }
}

/// 走子之后界面层应当做的下一件事。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum NextStep {
    ScheduleAi { delay_ms: u32 },
    AwaitPlayer,
    GameOver { winner: Side },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveOutcome {
    pub side: Side,
    pub amount: u8,
    pub remaining: u8,
    pub next: NextStep,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub status: GameStatus,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MoveOutcome>,
}

impl RuleResolution {
    pub fn new(state: GameState, outcome: Option<MoveOutcome>) -> Self {
        let events = outcome
            .as_ref()
            .map(|outcome| outcome.events.clone())
            .unwrap_or_default();
        Self::with_events(state, outcome, events)
    }

    pub fn with_events(
        state: GameState,
        outcome: Option<MoveOutcome>,
        events: Vec<GameEvent>,
    ) -> Self {
        let status = state.status();
        Self {
            state,
            status,
            events,
            outcome,
        }
    }
}

pub struct RuleEngine {
    think_delay_ms: u32,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            think_delay_ms: AI_THINK_DELAY_MS,
        }
    }

    pub fn with_think_delay(mut self, delay_ms: u32) -> Self {
        self.think_delay_ms = delay_ms;
        self
    }

    pub fn think_delay_ms(&self) -> u32 {
        self.think_delay_ms
    }

    fn ensure_in_progress(state: &GameState) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        Ok(())
    }

    fn ensure_turn(state: &GameState, side: Side) -> Result<(), RuleError> {
        if state.turn != side {
            return Err(match side {
                Side::Player => RuleError::NotPlayerTurn,
                Side::Ai => RuleError::NotAiTurn,
            });
        }
        Ok(())
    }

    fn ensure_amount(state: &GameState, amount: u8) -> Result<(), RuleError> {
        if !state.is_legal_amount(amount) {
            return Err(RuleError::InvalidAmount {
                amount: i32::from(amount),
                max: state.max_take(),
            });
        }
        Ok(())
    }

    fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    fn apply_move(
        &self,
        state: &mut GameState,
        side: Side,
        amount: u8,
    ) -> Result<MoveOutcome, RuleError> {
        Self::ensure_in_progress(state)?;
        Self::ensure_integrity(state)?;
        Self::ensure_turn(state, side)?;
        Self::ensure_amount(state, amount)?;

        let events = state.take(side, amount);
        let next = match state.winner {
            Some(winner) => NextStep::GameOver { winner },
            None => match side {
                Side::Player => NextStep::ScheduleAi {
                    delay_ms: self.think_delay_ms,
                },
                Side::Ai => NextStep::AwaitPlayer,
            },
        };

        log::debug!(
            "{side:?} took {amount}, {} left, next {next:?}",
            state.pile
        );

        Ok(MoveOutcome {
            side,
            amount,
            remaining: state.pile,
            next,
            events,
        })
    }

    pub fn apply_player_move(
        &self,
        state: &mut GameState,
        amount: u8,
    ) -> Result<MoveOutcome, RuleError> {
        self.apply_move(state, Side::Player, amount)
    }

    pub fn apply_ai_move(
        &self,
        state: &mut GameState,
        amount: u8,
    ) -> Result<MoveOutcome, RuleError> {
        self.apply_move(state, Side::Ai, amount)
    }

    /// 应用延迟计算出的 AI 决策；若期间发生了重置或局面变化则拒绝。
    pub fn apply_ai_decision(
        &self,
        state: &mut GameState,
        decision: &AiDecision,
    ) -> Result<MoveOutcome, RuleError> {
        if decision.generation != state.generation {
            log::warn!(
                "dropping AI decision from generation {} (current {})",
                decision.generation,
                state.generation
            );
            return Err(RuleError::StaleDecision {
                expected: state.generation,
                actual: decision.generation,
            });
        }
        Self::ensure_in_progress(state)?;
        Self::ensure_turn(state, Side::Ai)?;
        if decision.pile != state.pile {
            // 同一代内局面已变化，决策同样过期。
            return Err(RuleError::PositionChanged {
                decided: decision.pile,
                current: state.pile,
            });
        }
        self.apply_ai_move(state, decision.amount)
    }

    /// 宽松模式：非法走子静默忽略，状态保持不变。
    pub fn try_player_move(&self, state: &mut GameState, amount: u8) -> Option<MoveOutcome> {
        match self.apply_player_move(state, amount) {
            Ok(outcome) => Some(outcome),
            Err(error) => {
                log::warn!("ignoring player move of {amount}: {error}");
                None
            }
        }
    }

    pub fn reset(&self, state: &mut GameState) -> GameEvent {
        let event = state.reset();
        log::debug!("game reset, generation {}", state.generation);
        event
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
