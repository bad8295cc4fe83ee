//! End-to-end walkthroughs of the assistant layer over the bundled systems,
//! plus the canonicalization/duplicate-episode invariants the rest of the
//! workspace leans on.

use dscenkit_agent::{RLAgent, RLConfig};
use dscenkit_assistant::{Assistant, CyberSystemAgent};
use dscenkit_core::{get_model, remove_all_models, Action, EnvironmentState};
use dscenkit_systems::{Gridworld, LedCircuit, TicTacToe};
use dscenkit_xp::{Episode, Experience, Transition};

fn fresh_model(name: &str) -> std::sync::Arc<dscenkit_core::Model> {
    remove_all_models();
    get_model(name)
}

#[test]
fn training_a_tictactoe_agent_eventually_reaches_a_terminal_episode() {
    fresh_model("tictactoe");
    let assistant = Assistant::new("tictactoe-actor", Box::new(TicTacToe::new()));
    let mut agent = CyberSystemAgent::new(assistant);
    agent.assistant.set_current_goal("player1").unwrap();
    agent.set_custom_agent_maker(|| Box::new(RLAgent::new(RLConfig::default())));

    let mut reached_terminal = false;
    for _ in 0..200 {
        let result = agent.train().unwrap();
        if result.is_terminal() {
            reached_terminal = true;
            break;
        }
    }
    assert!(reached_terminal, "a full tic-tac-toe game should terminate well within 200 steps");
    assert!(agent.stats.episodes_count >= 1);
    remove_all_models();
}

#[test]
fn a_gridworld_agent_can_learn_to_reach_the_goal() {
    fresh_model("gridworld");
    let mut system = Gridworld::new();
    // A single corridor: from Start only "right" is ever a legal, unvisited
    // move, so every rollout (greedy or exploring) reaches End in 2 steps.
    system.set_configuration("3 1\nS E\n").unwrap();
    let assistant = Assistant::new("grid-actor", Box::new(system));
    let mut agent = CyberSystemAgent::new(assistant);
    agent.assistant.set_current_goal("Pawn").unwrap();
    agent.set_custom_agent_maker(|| Box::new(RLAgent::new(RLConfig::default())));

    let mut successes = 0;
    for _ in 0..20 {
        let result = agent.train().unwrap();
        if result.is_terminal() && result.as_state_result() == Some(dscenkit_core::StateResult::Succeeded) {
            successes += 1;
        }
    }
    assert!(successes > 0, "the only reachable terminal state in this corridor is the goal");
    remove_all_models();
}

#[test]
fn wiring_a_complete_led_circuit_through_the_assistant_lights_the_led() {
    fresh_model("led-circuit");
    let mut assistant = Assistant::new("circuit-actor", Box::new(LedCircuit::new()));
    assistant
        .cyber_system_mut()
        .set_configuration("PowerSupplyDC Battery 6000 50\nLED LED1 Red\nResistor R1 2200 500\nSwitch SW1 12000 40\n")
        .unwrap();
    assistant.set_current_goal("Default").unwrap();
    assistant.new_episode().unwrap();

    let wires = [
        ("Battery", "+", "SW1", "In"),
        ("SW1", "Out1", "R1", "Pin1"),
        ("R1", "Pin2", "LED1", "Anode"),
        ("LED1", "Cathode", "Battery", "-"),
    ];
    for (from_entity, from_pin, to_entity, to_pin) in wires {
        let action = Action::new(
            "connect",
            vec![from_entity.to_string(), from_pin.to_string(), to_entity.to_string(), to_pin.to_string()],
        );
        let result = assistant.take_action(&action, true).unwrap();
        assert!(!matches!(result, dscenkit_assistant::ActionResult::Denied));
    }
    let close_switch = Action::new("switch", vec!["SW1".to_string(), "1".to_string()]);
    let result = assistant.take_action(&close_switch, true).unwrap();
    assert_eq!(result, dscenkit_assistant::ActionResult::Succeeded);

    remove_all_models();
}

#[test]
fn storing_a_structurally_identical_episode_twice_bumps_repetitions_instead_of_duplicating() {
    let model = fresh_model("duplicate-episode-test");
    let s0 = model.canonicalize_state(EnvironmentState::new());
    let mut end_state = EnvironmentState::new();
    end_state.set_feature("step", "1".to_string());
    let s1 = model.canonicalize_state(end_state);
    let action = model.canonicalize_action(Action::new("move", vec!["1".to_string()]));

    let mut experience = Experience::new("goal", "duplicate-episode-test");
    for _ in 0..2 {
        let mut episode = Episode::new(s0.clone());
        episode.push_transition(Transition::new(s0.clone(), action.clone(), s1.clone()));
        experience.store_episode(episode, true);
    }

    assert_eq!(experience.episodes.len(), 1, "the second identical episode must not be stored separately");
    assert_eq!(experience.episodes[0].repetitions_count, 1, "the stored episode's repetition count should bump once");
    remove_all_models();
}

#[test]
fn canonicalizing_the_same_state_twice_returns_the_same_interned_reference() {
    let model = fresh_model("canonicalization-test");
    let a = model.canonicalize_state(EnvironmentState::new());
    let b = model.canonicalize_state(EnvironmentState::new());
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    remove_all_models();
}

#[test]
fn canonicalizing_the_same_action_twice_returns_the_same_interned_reference() {
    let model = fresh_model("canonicalization-action-test");
    let a = model.canonicalize_action(Action::new("move", vec!["1".to_string()]));
    let b = model.canonicalize_action(Action::new("move", vec!["1".to_string()]));
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    remove_all_models();
}
