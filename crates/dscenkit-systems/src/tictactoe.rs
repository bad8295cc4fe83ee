//! Tic-tac-toe against a built-in heuristic opponent.
//!
//! Grounded in `TicTacToeCybSys.cpp`: the `board` entity carries the whole
//! grid as a single `state` property, `player1`/`player2` roles share the
//! same success/deadlock conditions with the player swapped, and smart
//! `available_actions` forces a winning move first, then a blocking move,
//! before falling back to every free cell. `GameInfo`/`TicTacToeSolver`
//! (the win/threat detection) were not part of the indexed source, so the
//! detection here is a plain implementation of the same rules the feature
//! names imply (`"can win 1"`, `"can win 2"`).
//!
//! The original wires two independent `CyberSystemAssistant`s against one
//! shared `ICyberSystem`, which this crate's `Assistant` (one boxed system
//! per actor, see `dscenkit-assistant`) cannot reproduce without a shared
//! mutable system. Instead this system always plays as one fixed seat
//! (`controlled_player`, `Player::Player1` unless constructed otherwise);
//! the other seat is played automatically by [`choose_opponent_move`] right
//! after every controlled move, keeping one system instance self-consistent
//! for single-agent training.

use dscenkit_core::{
    Action, CompOp, Condition, EntityStateType, EnvironmentState, FeatureCondition, Model,
    RoleInfo, StateResult, StateRewardRules,
};
use dscenkit_env::{CyberSystem, EnvError, EnvResult};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::sync::Arc;

const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    Player1,
    Player2,
}

impl Player {
    fn other(self) -> Player {
        match self {
            Player::Player1 => Player::Player2,
            Player::Player2 => Player::Player1,
        }
    }

    fn mark(self) -> char {
        match self {
            Player::Player1 => 'X',
            Player::Player2 => 'O',
        }
    }

    fn role_name(self) -> &'static str {
        match self {
            Player::Player1 => "player1",
            Player::Player2 => "player2",
        }
    }

    fn param(self) -> &'static str {
        match self {
            Player::Player1 => "1",
            Player::Player2 => "2",
        }
    }
}

fn winning_moves(cells: &[char; 9], mark: char) -> Vec<usize> {
    let mut moves = Vec::new();
    for pos in 0..9 {
        if cells[pos] != ' ' {
            continue;
        }
        let mut probe = *cells;
        probe[pos] = mark;
        if line_winner(&probe) == Some(mark) {
            moves.push(pos);
        }
    }
    moves
}

fn line_winner(cells: &[char; 9]) -> Option<char> {
    for line in WIN_LINES {
        let [a, b, c] = line;
        if cells[a] != ' ' && cells[a] == cells[b] && cells[b] == cells[c] {
            return Some(cells[a]);
        }
    }
    None
}

fn board_to_string(cells: &[char; 9]) -> String {
    (0..3)
        .map(|row| cells[row * 3..row * 3 + 3].iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("|")
}

pub struct TicTacToe {
    model_name: String,
    controlled_player: Player,
    initialized: bool,
    cells: [char; 9],
    started: bool,
    ended: bool,
    winner: Option<Player>,
}

impl TicTacToe {
    pub fn new() -> Self {
        Self::for_player(Player::Player1)
    }

    pub fn for_player(controlled_player: Player) -> Self {
        Self {
            model_name: "tictactoe".to_string(),
            controlled_player,
            initialized: false,
            cells: [' '; 9],
            started: false,
            ended: false,
            winner: None,
        }
    }

    fn apply_move(&mut self, pos: usize, mark: char) {
        self.cells[pos] = mark;
        self.started = true;
        if let Some(winner_mark) = line_winner(&self.cells) {
            self.ended = true;
            self.winner = Some(if winner_mark == Player::Player1.mark() {
                Player::Player1
            } else {
                Player::Player2
            });
        } else if self.cells.iter().all(|c| *c != ' ') {
            self.ended = true;
            self.winner = None;
        }
    }

    fn choose_opponent_move(&self) -> Option<usize> {
        let opponent_mark = self.controlled_player.other().mark();
        let controlled_mark = self.controlled_player.mark();

        let wins = winning_moves(&self.cells, opponent_mark);
        if let Some(&pos) = wins.first() {
            return Some(pos);
        }
        let blocks = winning_moves(&self.cells, controlled_mark);
        if let Some(&pos) = blocks.first() {
            return Some(pos);
        }
        let free: Vec<usize> = (0..9).filter(|&i| self.cells[i] == ' ').collect();
        free.choose(&mut rand::thread_rng()).copied()
    }

    fn player_role_rules(for_player: Player) -> StateRewardRules {
        let own = FeatureCondition::new(format!("can win {}", role_index(for_player)), CompOp::Equal, "1");
        let own_multi = FeatureCondition::new(
            format!("can win {}", role_index(for_player)),
            CompOp::Greater,
            "1",
        );
        let opp = FeatureCondition::new(
            format!("can win {}", role_index(for_player.other())),
            CompOp::Equal,
            "1",
        );
        let opp_multi = FeatureCondition::new(
            format!("can win {}", role_index(for_player.other())),
            CompOp::Greater,
            "1",
        );
        StateRewardRules::new()
            .with_result_reward(StateResult::InProgress, 0.0)
            .with_result_reward(StateResult::Succeeded, 1000.0)
            .with_result_reward(StateResult::Failed, -1000.0)
            .with_result_reward(StateResult::Deadlock, -10.0)
            .with_feature_reward(own, 25.0)
            .with_feature_reward(opp, -50.0)
            .with_feature_reward(own_multi, 50.0)
            .with_feature_reward(opp_multi, -100.0)
    }
}

fn role_index(player: Player) -> u8 {
    match player {
        Player::Player1 => 1,
        Player::Player2 => 2,
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl CyberSystem for TicTacToe {
    fn system_name(&self) -> &str {
        &self.model_name
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn initialize(&mut self, model: &Arc<Model>, force: bool) -> EnvResult<()> {
        if self.initialized && !force {
            return Ok(());
        }
        let mut defaults = BTreeMap::new();
        defaults.insert("state".to_string(), board_to_string(&[' '; 9]));
        let board_type =
            EntityStateType::new("Board", &self.model_name, defaults, BTreeMap::new(), vec![])
                .map_err(|e| EnvError::InvalidConfiguration {
                    system: self.model_name.clone(),
                    reason: e.to_string(),
                })?;
        model.register_entity_state_type(board_type);
        self.initialized = true;
        Ok(())
    }

    fn init_roles(&mut self, model: &Arc<Model>) -> EnvResult<()> {
        let player1_wins = FeatureCondition::new("winner", CompOp::Equal, "player1");
        let player2_wins = FeatureCondition::new("winner", CompOp::Equal, "player2");
        let ended = FeatureCondition::new("ended", CompOp::Equal, "true");
        let no_winner = FeatureCondition::new("winner", CompOp::Equal, "none");

        let player1_success = Condition::new().add_feature_condition(player1_wins.clone());
        let player2_success = Condition::new().add_feature_condition(player2_wins.clone());
        let deadlock = Condition::new()
            .add_feature_condition(ended)
            .add_feature_condition(no_winner);

        model.register_role(RoleInfo::new(
            "player1",
            player1_success.clone(),
            player2_success.clone(),
            deadlock.clone(),
            Self::player_role_rules(Player::Player1),
        ));
        model.register_role(RoleInfo::new(
            "player2",
            player2_success,
            player1_success,
            deadlock,
            Self::player_role_rules(Player::Player2),
        ));
        Ok(())
    }

    fn reset_system(&mut self) {
        self.cells = [' '; 9];
        self.started = false;
        self.ended = false;
        self.winner = None;
    }

    fn initial_system_state(&self) -> EnvironmentState {
        self.interpret_system_state()
    }

    fn execute_action(&mut self, action: &Action) -> EnvResult<bool> {
        if action.type_id != "move" || action.params.is_empty() {
            return Ok(false);
        }
        let Ok(pos) = action.params[0].parse::<usize>() else {
            return Ok(false);
        };
        if pos < 1 || pos > 9 || self.cells[pos - 1] != ' ' || self.ended {
            return Ok(false);
        }
        self.apply_move(pos - 1, self.controlled_player.mark());

        if !self.ended {
            if let Some(opponent_pos) = self.choose_opponent_move() {
                self.apply_move(opponent_pos, self.controlled_player.other().mark());
            }
        }
        Ok(true)
    }

    fn interpret_system_state(&self) -> EnvironmentState {
        let mut state = EnvironmentState::new();

        let mut defaults = BTreeMap::new();
        defaults.insert("state".to_string(), board_to_string(&self.cells));
        let board_type = Arc::new(
            EntityStateType::new("Board", &self.model_name, defaults.clone(), BTreeMap::new(), vec![])
                .expect("board type has no possible-value keys to violate"),
        );
        let mut board_entity = dscenkit_core::EntityState::from_defaults(board_type);
        board_entity
            .set_property("state", board_to_string(&self.cells))
            .expect("state is the only declared property");
        state.set_entity("board", Arc::new(board_entity));

        let winner_str = match self.winner {
            Some(Player::Player1) => "player1",
            Some(Player::Player2) => "player2",
            None => "none",
        };
        let player_str = self.controlled_player.role_name();
        state.set_feature("started", self.started.to_string());
        state.set_feature("ended", self.ended.to_string());
        state.set_feature("winner", winner_str.to_string());
        state.set_feature("player", player_str.to_string());
        state.set_feature(
            "can win 1",
            winning_moves(&self.cells, Player::Player1.mark()).len().to_string(),
        );
        state.set_feature(
            "can win 2",
            winning_moves(&self.cells, Player::Player2.mark()).len().to_string(),
        );
        state
    }

    fn available_actions(&self, smart: bool) -> Vec<Action> {
        if self.ended {
            return Vec::new();
        }
        let mark = self.controlled_player.mark();

        if smart {
            let wins = winning_moves(&self.cells, mark);
            if !wins.is_empty() {
                return wins
                    .into_iter()
                    .map(|pos| Action::new("move", vec![(pos + 1).to_string(), self.controlled_player.param().to_string()]))
                    .collect();
            }
            let saves = winning_moves(&self.cells, self.controlled_player.other().mark());
            if !saves.is_empty() {
                return saves
                    .into_iter()
                    .map(|pos| Action::new("move", vec![(pos + 1).to_string(), self.controlled_player.param().to_string()]))
                    .collect();
            }
        }

        (0..9)
            .filter(|&i| self.cells[i] == ' ')
            .map(|pos| Action::new("move", vec![(pos + 1).to_string(), self.controlled_player.param().to_string()]))
            .collect()
    }

    fn failure_condition(&self) -> Condition {
        Condition::new()
    }

    fn system_info(&self, info_id: &str) -> EnvResult<String> {
        if !info_id.is_empty() && info_id != "Board" {
            return Err(EnvError::UnknownInfoId(info_id.to_string()));
        }
        let mut out = String::new();
        for row in 0..3 {
            for col in 0..3 {
                let c = self.cells[row * 3 + col];
                out.push('|');
                out.push(c);
            }
            out.push_str("|\n");
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscenkit_core::{get_model, remove_all_models};

    fn fresh_model(name: &str) -> Arc<Model> {
        remove_all_models();
        get_model(name)
    }

    #[test]
    fn three_in_a_row_is_detected() {
        let mut cells = [' '; 9];
        cells[0] = 'X';
        cells[1] = 'X';
        cells[2] = 'X';
        assert_eq!(line_winner(&cells), Some('X'));
    }

    #[test]
    fn winning_move_is_found_for_two_in_a_row() {
        let mut cells = [' '; 9];
        cells[0] = 'X';
        cells[1] = 'X';
        let moves = winning_moves(&cells, 'X');
        assert_eq!(moves, vec![2]);
    }

    #[test]
    fn smart_selection_forces_the_winning_move() {
        let model = fresh_model("tictactoe-smart-test");
        let mut system = TicTacToe::new();
        system.initialize(&model, true).unwrap();
        system.init_roles(&model).unwrap();
        system.reset_system();
        system.cells[0] = 'X';
        system.cells[1] = 'X';
        let actions = system.available_actions(true);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].params[0], "3");
        remove_all_models();
    }

    #[test]
    fn a_full_game_reaches_a_terminal_state() {
        let model = fresh_model("tictactoe-play-test");
        let mut system = TicTacToe::new();
        system.initialize(&model, true).unwrap();
        system.init_roles(&model).unwrap();
        system.reset_system();

        for _ in 0..5 {
            if system.ended {
                break;
            }
            let actions = system.available_actions(true);
            if actions.is_empty() {
                break;
            }
            system.execute_action(&actions[0]).unwrap();
        }
        let state = system.interpret_system_state();
        assert!(state.feature("ended").is_some());
        remove_all_models();
    }
}
