//! The autonomous agent: an [`Assistant`] driven by a per-goal [`Agent`],
//! choosing its own actions, learning from every transition, and pruning
//! actions that led to a detected deadlock.
//!
//! Grounded in `CyberSystemAgent.cpp`: `Act` filters out actions recorded in
//! `DeadlockActions` for the current state before asking the agent to
//! choose, `DetectLoop` flags a repeated state within the same episode, and
//! `ProcessActionResult` only escalates a detected loop to `Deadlock` when
//! no alternative action was available (`alternative_action_count == 0`).

use crate::action_result::ActionResult;
use crate::assistant::Assistant;
use crate::error::AssistantResult;
use crate::stats::AgentStats;
use dscenkit_core::{Action, ActionRef, StateRef};
use dscenkit_agent::{Agent, RLAgent};
use dscenkit_xp::Transition;
use std::collections::HashMap;

type AgentMaker = Box<dyn Fn() -> Box<dyn Agent> + Send>;

/// An [`Assistant`] paired with one [`Agent`] per goal, running the
/// choose/act/learn loop on its own.
pub struct CyberSystemAgent {
    pub assistant: Assistant,
    agents: HashMap<String, Box<dyn Agent>>,
    custom_agent_maker: Option<AgentMaker>,
    deadlock_actions: HashMap<StateRef, Vec<ActionRef>>,
    last_transition: Option<Transition>,
    pub loop_detection_enabled: bool,
    pub learning_enabled: bool,
    new_episode_started: bool,
    pub stats: AgentStats,
}

impl CyberSystemAgent {
    pub fn new(assistant: Assistant) -> Self {
        Self {
            assistant,
            agents: HashMap::new(),
            custom_agent_maker: None,
            deadlock_actions: HashMap::new(),
            last_transition: None,
            loop_detection_enabled: true,
            learning_enabled: true,
            new_episode_started: false,
            stats: AgentStats::default(),
        }
    }

    /// Installs a factory used to build a fresh agent for each goal,
    /// discarding any agents already built. Grounded in
    /// `SetCustomAgentMaker`.
    pub fn set_custom_agent_maker(&mut self, maker: impl Fn() -> Box<dyn Agent> + Send + 'static) {
        self.agents.clear();
        self.custom_agent_maker = Some(Box::new(maker));
    }

    fn make_agent(&self) -> Box<dyn Agent> {
        match &self.custom_agent_maker {
            Some(maker) => maker(),
            None => Box::new(RLAgent::default()),
        }
    }

    fn agent_for_current_goal(&mut self) -> &mut Box<dyn Agent> {
        let goal = self.assistant.current_goal().to_string();
        if !self.agents.contains_key(&goal) {
            let agent = self.make_agent();
            self.agents.insert(goal.clone(), agent);
        }
        self.agents.get_mut(&goal).unwrap()
    }

    pub fn reset_stats(&mut self) {
        self.stats = AgentStats::default();
        self.agent_for_current_goal().reset_stats();
    }

    pub fn reset_agent_for_current_goal(&mut self) {
        self.deadlock_actions.clear();
        self.stats = AgentStats::default();
        self.last_transition = None;
        self.agent_for_current_goal().reset();
    }

    pub fn reset_all_agents(&mut self) {
        for agent in self.agents.values_mut() {
            agent.reset();
        }
    }

    fn update_stats(&mut self, result: ActionResult) {
        match result {
            ActionResult::InProgress | ActionResult::Denied => {}
            ActionResult::Succeeded => {
                self.stats.success_count += 1;
                self.stats.episodes_count += 1;
            }
            ActionResult::Failed => {
                self.stats.failed_count += 1;
                self.stats.episodes_count += 1;
            }
            ActionResult::Deadlock => {
                self.stats.deadlock_count += 1;
                self.stats.episodes_count += 1;
            }
        }
    }

    /// A repeated state within the same episode with no step back out:
    /// `transition` lands on a state this episode already started from.
    fn detect_loop(transition_sequence: &[Transition], transition: &Transition) -> bool {
        transition_sequence
            .iter()
            .any(|recorded| recorded.start_state == transition.end_state)
    }

    fn possible_actions(&mut self, prev_state: &StateRef, available: Vec<ActionRef>) -> Vec<ActionRef> {
        let Some(deadlocked) = self.deadlock_actions.get(prev_state) else {
            return available;
        };
        if deadlocked.is_empty() {
            return available;
        }
        available
            .into_iter()
            .filter(|action| !deadlocked.contains(action))
            .collect()
    }

    /// Starts a new episode if the previous one ended, mirroring
    /// `ProcessLastEpisode`.
    fn process_last_episode(&mut self) -> AssistantResult<()> {
        let episode_open = self.assistant.current_episode().is_some();
        let last_result = self
            .assistant
            .current_episode()
            .map(|episode| episode.is_terminal())
            .unwrap_or(false);

        if !episode_open || last_result {
            if episode_open {
                self.assistant.store_current_episode(true);
            }
            self.assistant.new_episode()?;
            self.new_episode_started = true;
        }
        Ok(())
    }

    /// Chooses and takes one action, pruning known deadlock actions and
    /// detecting loops. Assumes an episode is already open (callers go
    /// through [`Self::train`], which opens one via `process_last_episode`).
    /// Grounded in `CyberSystemAgent::Act` / `ProcessActionResult`.
    fn act(&mut self) -> AssistantResult<ActionResult> {
        let prev_state = self
            .assistant
            .last_state()
            .cloned()
            .expect("episode opened by process_last_episode");

        let available = self.assistant.cyber_system().available_actions(true);
        let model = dscenkit_core::get_model(self.assistant.cyber_system().system_name());
        let available_refs: Vec<ActionRef> = available
            .into_iter()
            .map(|action| model.canonicalize_action(action))
            .collect();

        let possible = if self.loop_detection_enabled {
            self.possible_actions(&prev_state, available_refs)
        } else {
            available_refs
        };
        let alternative_action_count = possible.len().saturating_sub(1);

        if possible.is_empty() {
            let result = ActionResult::Deadlock;
            self.update_stats(result);
            return Ok(result);
        }

        let chosen_index = {
            let experience = self.assistant.current_experience();
            let agent = self.agents.entry(self.assistant.current_goal().to_string()).or_insert_with(|| {
                match &self.custom_agent_maker {
                    Some(maker) => maker(),
                    None => Box::new(RLAgent::default()),
                }
            });
            agent.choose_action(experience, &possible, &prev_state, self.learning_enabled)
        };

        let Some(index) = chosen_index else {
            let result = ActionResult::Deadlock;
            self.update_stats(result);
            return Ok(result);
        };

        let chosen_action: Action = (*possible[index]).clone();
        // `update_xp` is false here: storage happens in `process_last_episode`
        // on the following call, which needs the episode to still be open
        // below to read back its transition sequence for loop detection.
        let mut action_result = self.assistant.take_action(&chosen_action, false)?;
        if action_result == ActionResult::Denied {
            return Ok(action_result);
        }

        let transition_sequence: Vec<Transition> = self
            .assistant
            .current_episode()
            .map(|episode| episode.transition_sequence.clone())
            .unwrap_or_default();
        let chosen_transition = transition_sequence
            .last()
            .cloned()
            .expect("take_action appended a transition");
        self.last_transition = Some(chosen_transition.clone());

        if action_result == ActionResult::Deadlock {
            self.deadlock_actions
                .entry(prev_state.clone())
                .or_default()
                .push(chosen_transition.action_taken.clone());
        }

        if self.loop_detection_enabled && action_result == ActionResult::InProgress {
            let loop_detected = Self::detect_loop(&transition_sequence, &chosen_transition);
            if loop_detected {
                if alternative_action_count == 0 {
                    action_result = ActionResult::Deadlock;
                    if let Some(role) = dscenkit_core::get_model(self.assistant.cyber_system().system_name())
                        .role(self.assistant.current_goal())
                    {
                        role.override_state_result(chosen_transition.end_state.clone(), dscenkit_core::StateResult::Deadlock);
                    }
                    if let Some(episode) = self.assistant_current_episode_mut() {
                        episode.result = dscenkit_core::StateResult::Deadlock;
                    }
                }
                self.deadlock_actions
                    .entry(prev_state.clone())
                    .or_default()
                    .push(chosen_transition.action_taken.clone());
            }
        }

        if self.learning_enabled {
            let experience = self.assistant.current_experience();
            let agent = self.agents.get_mut(&self.assistant.current_goal().to_string()).expect("agent created above");
            agent.learn(
                experience,
                &transition_sequence,
                action_result.as_state_result().unwrap_or(dscenkit_core::StateResult::InProgress),
            );
            self.stats.action_choice_count = agent.action_choice_count();
            self.stats.exploration_action_count = agent.exploration_action_count();
        }

        self.update_stats(action_result);
        Ok(action_result)
    }

    fn assistant_current_episode_mut(&mut self) -> Option<&mut dscenkit_xp::Episode> {
        // Episode access is mediated through Assistant's own API; exposed
        // here only for the in-progress-loop deadlock override above.
        self.assistant.current_episode_mut()
    }

    /// Runs one `act` and, if the action was denied, starts a fresh episode
    /// before reporting it. Grounded in `CyberSystemAgent::Train`.
    pub fn train(&mut self) -> AssistantResult<ActionResult> {
        self.process_last_episode()?;
        let result = self.act()?;
        if result == ActionResult::Denied {
            self.assistant.new_episode()?;
            self.new_episode_started = true;
        }
        Ok(result)
    }
}
