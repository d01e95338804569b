use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// 开局石子数量。
pub const INITIAL_PILE: u8 = 15;
/// 每回合最多可取的石子数。
pub const MAX_TAKE: u8 = 3;
/// AI "思考" 的默认延迟（毫秒），仅用于界面节奏。
pub const AI_THINK_DELAY_MS: u32 = 900;

/// 对局双方。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Player,
    Ai,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::Player => Side::Ai,
            Side::Ai => Side::Player,
        }
    }

    /// 胜利提示里使用的称呼，玩家固定显示为 "You"。
    pub fn label(self) -> &'static str {
        match self {
            Side::Player => "You",
            Side::Ai => "AI",
        }
    }
}

/// 游戏事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    StonesTaken { side: Side, amount: u8, remaining: u8 },
    TurnPassed { to: Side },
    GameWon { winner: Side },
    GameReset { generation: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Display, Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[display("pile {pile} exceeds the initial pile")]
    PileOutOfRange { pile: u8 },
    #[display("a winner is recorded but {pile} stones remain")]
    WinnerWithStonesLeft { pile: u8 },
    #[display("the pile is empty but no winner is recorded")]
    MissingWinner,
}

/// 提供给界面层渲染的只读快照。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameStatus {
    pub pile: u8,
    pub turn: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    pub message: String,
}

/// 游戏整体状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub pile: u8,
    #[serde(default)]
    pub turn: Side,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    #[serde(default)]
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            pile: INITIAL_PILE,
            turn: Side::Player,
            winner: None,
            generation: 0,
            event_log: Vec::new(),
        }
    }

    /// 构造任意局面，主要用于调试与测试。
    pub fn with_position(pile: u8, turn: Side) -> Result<Self, IntegrityError> {
        let state = Self {
            pile,
            turn,
            winner: None,
            generation: 0,
            event_log: Vec::new(),
        };
        state.integrity_check()?;
        Ok(state)
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// 当前局面下合法的最大取子数。
    pub fn max_take(&self) -> u8 {
        self.pile.min(MAX_TAKE)
    }

    pub fn is_legal_amount(&self, amount: u8) -> bool {
        amount >= 1 && amount <= self.max_take()
    }

    /// 从石堆中取走 `amount` 个石子并推进回合；调用方负责合法性校验。
    pub(crate) fn take(&mut self, side: Side, amount: u8) -> Vec<GameEvent> {
        self.pile = self.pile.saturating_sub(amount);
        let mut events = vec![GameEvent::StonesTaken {
            side,
            amount,
            remaining: self.pile,
        }];

        if self.pile == 0 {
            // 回合标记停在取走最后一颗石子的一方。
            self.turn = side;
            events.push(self.declare_victory(side));
        } else {
            self.turn = side.opponent();
            events.push(GameEvent::TurnPassed { to: self.turn });
        }

        for event in &events {
            self.record_event(event.clone());
        }
        events
    }

    fn declare_victory(&mut self, winner: Side) -> GameEvent {
        if self.winner.is_none() {
            self.winner = Some(winner);
        }
        GameEvent::GameWon { winner }
    }

    pub(crate) fn reset(&mut self) -> GameEvent {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            ..Self::new()
        };
        let event = GameEvent::GameReset { generation };
        self.record_event(event.clone());
        event
    }

    pub fn status(&self) -> GameStatus {
        GameStatus {
            pile: self.pile,
            turn: self.turn,
            winner: self.winner,
            message: self.status_message(),
        }
    }

    pub fn status_message(&self) -> String {
        match (self.winner, self.turn) {
            (Some(winner), _) => format!("{} wins!", winner.label()),
            (None, Side::Player) => "Your turn!".to_string(),
            (None, Side::Ai) => "AI is thinking...".to_string(),
        }
    }

    pub fn pile_label(&self) -> String {
        format!("Pile: {}", self.pile)
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if self.pile > INITIAL_PILE {
            return Err(IntegrityError::PileOutOfRange { pile: self.pile });
        }
        match self.winner {
            Some(_) if self.pile > 0 => {
                Err(IntegrityError::WinnerWithStonesLeft { pile: self.pile })
            }
            None if self.pile == 0 => Err(IntegrityError::MissingWinner),
            _ => Ok(()),
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
