use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::game::{GameState, INITIAL_PILE, MAX_TAKE};

/// 胜负评估值：轮到行动的一方必胜为 1，必败为 -1。
pub type Evaluation = i8;

const WIN: Evaluation = 1;
const LOSS: Evaluation = -1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Display, Error)]
#[serde(tag = "type")]
pub enum SearchError {
    #[display("cannot search an empty pile")]
    EmptyPile,
    #[display("pile {pile} is outside the playable range")]
    PileOutOfRange { pile: i32 },
}

/// 穷举搜索的规模随石子数指数增长，只接受开局范围内的局面。
fn ensure_pile_in_range(pile: u8) -> Result<(), SearchError> {
    if pile > INITIAL_PILE {
        return Err(SearchError::PileOutOfRange {
            pile: i32::from(pile),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AiConfig {
    /// 按 (石子数, 是否极大层) 缓存搜索结果；默认关闭，即完整穷举。
    #[serde(default)]
    pub memoize: bool,
}

impl AiConfig {
    pub fn exhaustive() -> Self {
        Self { memoize: false }
    }

    pub fn memoized() -> Self {
        Self { memoize: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    pub amount: u8,
    pub evaluation: Evaluation,
    pub nodes: u64,
    pub memoized: bool,
    /// 决策时的石子数与重置代数，用于丢弃过期决策。
    pub pile: u8,
    pub generation: u64,
}

struct SearchStats {
    nodes: u64,
}

impl SearchStats {
    fn new() -> Self {
        Self { nodes: 0 }
    }
}

#[derive(Debug, Default)]
struct SearchCache {
    // 下标为石子数，[极小层, 极大层]
    values: Vec<[Option<Evaluation>; 2]>,
}

impl SearchCache {
    fn get(&self, pile: u8, maximizing: bool) -> Option<Evaluation> {
        self.values
            .get(pile as usize)
            .and_then(|slot| slot[maximizing as usize])
    }

    fn insert(&mut self, pile: u8, maximizing: bool, value: Evaluation) {
        let index = pile as usize;
        if self.values.len() <= index {
            self.values.resize(index + 1, [None, None]);
        }
        self.values[index][maximizing as usize] = Some(value);
    }
}

pub struct AiAgent {
    config: AiConfig,
    cache: SearchCache,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            cache: SearchCache::default(),
        }
    }

    pub fn config(&self) -> AiConfig {
        self.config
    }

    pub fn decide(&mut self, state: &GameState) -> Result<AiDecision, SearchError> {
        let mut stats = SearchStats::new();
        let (amount, evaluation) = self.search_root(state.pile, &mut stats)?;

        log::debug!(
            "ai takes {amount} from {} (eval {evaluation}, {} nodes)",
            state.pile,
            stats.nodes
        );

        Ok(AiDecision {
            amount,
            evaluation,
            nodes: stats.nodes,
            memoized: self.config.memoize,
            pile: state.pile,
            generation: state.generation,
        })
    }

    pub fn best_move(&mut self, pile: u8) -> Result<u8, SearchError> {
        let mut stats = SearchStats::new();
        self.search_root(pile, &mut stats).map(|(amount, _)| amount)
    }

    pub fn minimax(&mut self, pile: u8, maximizing: bool) -> Result<Evaluation, SearchError> {
        ensure_pile_in_range(pile)?;
        let mut stats = SearchStats::new();
        Ok(self.minimax_rec(pile, maximizing, &mut stats))
    }

    fn search_root(
        &mut self,
        pile: u8,
        stats: &mut SearchStats,
    ) -> Result<(u8, Evaluation), SearchError> {
        if pile == 0 {
            return Err(SearchError::EmptyPile);
        }
        ensure_pile_in_range(pile)?;

        let mut best_value = Evaluation::MIN;
        let mut best_amount = 1;

        for amount in 1..=pile.min(MAX_TAKE) {
            let value = self.minimax_rec(pile - amount, false, stats);
            // 严格大于：同分时保留较小的取子数。
            if value > best_value {
                best_value = value;
                best_amount = amount;
            }
        }

        Ok((best_amount, best_value))
    }

    fn minimax_rec(&mut self, pile: u8, maximizing: bool, stats: &mut SearchStats) -> Evaluation {
        stats.nodes += 1;

        if pile == 0 {
            // 上一手取走了最后一颗石子。
            return if maximizing { LOSS } else { WIN };
        }

        if self.config.memoize {
            if let Some(value) = self.cache.get(pile, maximizing) {
                return value;
            }
        }

        let moves = 1..=pile.min(MAX_TAKE);
        let value = if maximizing {
            let mut value = Evaluation::MIN;
            for amount in moves {
                value = value.max(self.minimax_rec(pile - amount, false, stats));
            }
            value
        } else {
            let mut value = Evaluation::MAX;
            for amount in moves {
                value = value.min(self.minimax_rec(pile - amount, true, stats));
            }
            value
        };

        if self.config.memoize {
            self.cache.insert(pile, maximizing, value);
        }
        value
    }
}

impl Default for AiAgent {
    fn default() -> Self {
        AiAgent::new(AiConfig::default())
    }
}

/// 为当前行动方选出最优取子数（穷举搜索，无缓存）。
pub fn best_move(pile: u8) -> Result<u8, SearchError> {
    AiAgent::new(AiConfig::exhaustive()).best_move(pile)
}

pub fn minimax(pile: u8, maximizing: bool) -> Result<Evaluation, SearchError> {
    AiAgent::new(AiConfig::exhaustive()).minimax(pile, maximizing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Side;

    fn value(pile: u8, maximizing: bool) -> Evaluation {
        minimax(pile, maximizing).expect("pile in range")
    }

    #[test]
    fn best_move_is_always_legal() {
        for pile in 1..=INITIAL_PILE {
            let amount = best_move(pile).expect("non-empty pile");
            assert!((1..=3).contains(&amount), "pile {pile} gave {amount}");
            assert!(amount <= pile);
        }
    }

    #[test]
    fn best_move_follows_modulo_four_law() {
        for pile in 1..=INITIAL_PILE {
            let amount = best_move(pile).expect("non-empty pile");
            let remainder = pile % 4;
            if remainder != 0 {
                assert_eq!(amount, remainder, "pile {pile}");
                assert_eq!(value(pile - amount, false), WIN);
            } else {
                // 所有走法同样必败，按升序取第一个。
                assert_eq!(amount, 1, "pile {pile}");
                for other in 1..=3u8.min(pile) {
                    assert_eq!(
                        value(pile - amount, false),
                        value(pile - other, false),
                        "pile {pile}, move {other}"
                    );
                }
            }
        }
    }

    #[test]
    fn opening_move_takes_three() {
        assert_eq!(best_move(15), Ok(3));
    }

    #[test]
    fn empty_pile_is_rejected() {
        assert_eq!(best_move(0), Err(SearchError::EmptyPile));
        let state = GameState {
            pile: 0,
            winner: Some(Side::Player),
            ..GameState::new()
        };
        assert_eq!(
            AiAgent::default().decide(&state),
            Err(SearchError::EmptyPile)
        );
    }

    #[test]
    fn piles_beyond_the_opening_are_rejected() {
        assert_eq!(
            best_move(16),
            Err(SearchError::PileOutOfRange { pile: 16 })
        );
        assert_eq!(
            minimax(40, true),
            Err(SearchError::PileOutOfRange { pile: 40 })
        );
        assert_eq!(
            AiAgent::new(AiConfig::memoized()).best_move(u8::MAX),
            Err(SearchError::PileOutOfRange { pile: 255 })
        );
        assert_eq!(best_move(INITIAL_PILE), Ok(3));
        assert_eq!(minimax(0, true), Ok(LOSS));
    }

    #[test]
    fn terminal_values_score_the_previous_mover() {
        assert_eq!(value(0, true), LOSS);
        assert_eq!(value(0, false), WIN);
        assert_eq!(value(4, true), LOSS);
        assert_eq!(value(5, true), WIN);
    }

    #[test]
    fn memoized_search_agrees_and_visits_fewer_nodes() {
        let state = GameState::new();
        let exhaustive = AiAgent::new(AiConfig::exhaustive())
            .decide(&state)
            .expect("decision");
        let memoized = AiAgent::new(AiConfig::memoized())
            .decide(&state)
            .expect("decision");

        assert_eq!(exhaustive.amount, memoized.amount);
        assert_eq!(exhaustive.evaluation, memoized.evaluation);
        assert!(memoized.memoized);
        assert!(memoized.nodes < exhaustive.nodes);

        let mut agent = AiAgent::new(AiConfig::memoized());
        for pile in 1..=INITIAL_PILE {
            assert_eq!(agent.best_move(pile), best_move(pile), "pile {pile}");
        }
    }

    #[test]
    fn decision_carries_position_stamp() {
        let mut state = GameState::with_position(12, Side::Ai).expect("valid position");
        state.generation = 7;
        let decision = AiAgent::default().decide(&state).expect("decision");
        assert_eq!(decision.amount, 1);
        assert_eq!(decision.evaluation, LOSS);
        assert_eq!(decision.pile, 12);
        assert_eq!(decision.generation, 7);
    }
}
