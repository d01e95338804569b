//! 游戏核心逻辑模块（状态、回合状态机）。

pub mod rules;
pub mod state;

pub use rules::{MoveOutcome, NextStep, RuleEngine, RuleError, RuleResolution};
pub use state::{
    GameEvent,
    GameState,
    GameStatus,
    IntegrityError,
    Side,
    AI_THINK_DELAY_MS,
    INITIAL_PILE,
    MAX_TAKE,
};
