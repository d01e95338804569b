#![cfg(target_arch = "wasm32")]

use nim_wasm::{best_move_js, minimax_js, AiDecision, GameState, NimEngine, Side};
use serde_json::Value;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn parse(json: &str) -> Value {
    serde_json::from_str(json).expect("engine emits valid json")
}

#[wasm_bindgen_test]
fn player_then_ai_move_round() {
    let mut engine = NimEngine::new(None).expect("engine");

    let resolution = parse(&engine.apply_player_move(3).expect("legal move"));
    assert_eq!(resolution["status"]["pile"], 12);
    assert_eq!(resolution["status"]["message"], "AI is thinking...");
    assert_eq!(resolution["outcome"]["next"]["type"], "ScheduleAi");
    assert_eq!(resolution["outcome"]["next"]["delay_ms"], 900);

    let response = parse(&engine.apply_ai_move().expect("ai move"));
    assert_eq!(response["decision"]["amount"], 1);
    assert_eq!(engine.pile(), 11);
    assert_eq!(engine.status_message(), "Your turn!");
    assert_eq!(engine.pile_label(), "Pile: 11");
}

#[wasm_bindgen_test]
fn strict_and_lenient_player_moves() {
    let state = GameState::with_position(3, Side::Player).expect("position");
    let json = serde_json::to_string(&state).expect("state json");
    let mut engine = NimEngine::new(Some(json)).expect("engine");

    assert!(engine.apply_player_move(5).is_err());
    assert!(engine.apply_player_move(-1).is_err());

    let resolution = parse(&engine.try_player_move(5).expect("lenient move"));
    assert!(resolution.get("outcome").is_none());
    assert_eq!(engine.pile(), 3);

    engine.apply_player_move(3).expect("winning move");
    assert_eq!(engine.status_message(), "You wins!");
}

#[wasm_bindgen_test]
async fn decision_computed_before_reset_is_rejected() {
    let mut engine = NimEngine::new(None).expect("engine");
    engine.apply_player_move(2).expect("legal move");

    let pending = JsFuture::from(engine.think_ai(Some(0)))
        .await
        .expect("decision promise");
    let decision_json = pending.as_string().expect("decision json");
    let decision: AiDecision = serde_json::from_str(&decision_json).expect("decision");
    assert_eq!(decision.amount, 1);

    engine.reset().expect("reset");
    assert!(engine.apply_ai_decision(&decision_json).is_err());
    assert_eq!(engine.pile(), 15);
    assert_eq!(engine.status_message(), "Your turn!");
}

#[wasm_bindgen_test]
fn rejects_corrupted_state_json() {
    assert!(NimEngine::new(Some(r#"{"pile":20}"#.to_string())).is_err());
    assert!(NimEngine::new(Some(r#"{"pile":0}"#.to_string())).is_err());
}

#[wasm_bindgen_test]
fn search_exports_reject_piles_outside_the_game() {
    assert_eq!(best_move_js(15).expect("opening pile"), 3);
    assert_eq!(minimax_js(0, true).expect("terminal pile"), -1);

    assert!(best_move_js(16).is_err());
    assert!(best_move_js(40).is_err());
    // 257 与 -1 若被截断为 u8 会变成 1 与 255。
    assert!(best_move_js(257).is_err());
    assert!(best_move_js(-1).is_err());
    assert!(best_move_js(0).is_err());
    assert!(minimax_js(16, false).is_err());
    assert!(minimax_js(-1, true).is_err());
}
