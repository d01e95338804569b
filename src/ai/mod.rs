//! AI 对手：基于极小化极大搜索的取子决策。

pub mod minimax;

pub use minimax::{best_move, minimax, AiAgent, AiConfig, AiDecision, Evaluation, SearchError};
