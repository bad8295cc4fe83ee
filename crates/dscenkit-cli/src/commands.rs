//! The numbered steps behind each subcommand, in the spirit of
//! `reev-runner::main`'s `[n/7]`-style progress log, but emitted through
//! `tracing` instead of `println!`.

use crate::config::RunConfig;
use crate::registry::{self, default_goal};
use anyhow::{Context, Result};
use dscenkit_agent::{Agent, RLAgent, RLConfig};
use dscenkit_assistant::{Assistant, CyberSystemAgent, SharedActor, SharedArena};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

fn build_assistant(system: &str, goal: &str) -> Result<Assistant> {
    let cyber_system = registry::build_system(system)?;
    let mut assistant = Assistant::new(system, cyber_system);
    assistant
        .set_current_goal(goal)
        .context("setting current goal")?;
    Ok(assistant)
}

pub fn train(
    system: &str,
    goal: Option<&str>,
    episodes: u32,
    config: Option<&Path>,
    save: Option<&Path>,
) -> Result<()> {
    let run_config = match config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig {
            system: system.to_string(),
            goal: goal
                .map(str::to_string)
                .unwrap_or_else(|| default_goal(system).to_string()),
            episodes,
            rl: RLConfig::default(),
        },
    };

    info!(system = %run_config.system, goal = %run_config.goal, episodes = run_config.episodes, "[1/3] training configuration resolved");

    RLAgent::default()
        .try_set_config(run_config.rl)
        .context("invalid RL configuration")?;

    let assistant = build_assistant(&run_config.system, &run_config.goal)?;
    let mut agent = CyberSystemAgent::new(assistant);
    let rl_config = run_config.rl;
    agent.set_custom_agent_maker(move || Box::new(RLAgent::new(rl_config)));

    info!("[2/3] running {} episodes", run_config.episodes);
    for episode in 0..run_config.episodes {
        let result = agent.train()?;
        if episode % 20 == 0 || episode + 1 == run_config.episodes {
            info!(
                episode,
                ?result,
                stats = ?agent.stats,
                "training progress"
            );
        }
    }

    info!(stats = ?agent.stats, "[3/3] training finished");
    if let Some(path) = save {
        agent
            .assistant
            .save_experience(&run_config.goal, path)
            .context("saving experience")?;
        info!(path = %path.display(), "saved experience");
    }
    Ok(())
}

pub fn render(system: &str) -> Result<()> {
    let goal = default_goal(system);
    let mut assistant = build_assistant(system, goal)?;
    assistant.new_episode()?;
    let info = assistant.cyber_system().system_info("")?;
    println!("{info}");
    Ok(())
}

pub fn hints(system: &str, goal: Option<&str>, experience: &Path, max_steps: u32) -> Result<()> {
    let goal = goal.map(str::to_string).unwrap_or_else(|| default_goal(system).to_string());
    let mut assistant = build_assistant(system, &goal)?;
    assistant
        .load_experience(goal.clone(), experience)
        .with_context(|| format!("loading experience from {}", experience.display()))?;
    assistant.new_episode()?;

    for step in 0..max_steps {
        println!("{}", assistant.cyber_system().system_info("")?);
        let suggested = assistant.suggested_actions();
        let forbidden = assistant.forbidden_actions();
        println!(
            "step {step}: suggested={:?} forbidden={:?}",
            suggested.iter().map(|a| a.to_display_string()).collect::<Vec<_>>(),
            forbidden.iter().map(|a| a.to_display_string()).collect::<Vec<_>>(),
        );

        let available = assistant.cyber_system().available_actions(true);
        let Some(chosen) = available.into_iter().next() else {
            println!("no available actions, stopping");
            break;
        };
        let result = assistant.take_action(&chosen, false)?;
        println!("took {} -> {result:?}", chosen.to_display_string());
        if result.is_terminal() {
            break;
        }
    }
    Ok(())
}

pub fn arena(system: &str, goal: Option<&str>, episodes: u32) -> Result<()> {
    let goal = goal.map(str::to_string).unwrap_or_else(|| default_goal(system).to_string());

    let actor_a: SharedActor = Arc::new(Mutex::new(build_assistant(system, &goal)?));
    let actor_b: SharedActor = Arc::new(Mutex::new(build_assistant(system, &goal)?));
    let arena = SharedArena::with_actors(vec![actor_a.clone(), actor_b.clone()]);

    let mut agent_a = RLAgent::default();

    for episode in 0..episodes {
        arena.new_episode(&actor_a)?;

        loop {
            let (state, available) = {
                let mut guard = actor_a.lock().expect("actor mutex poisoned");
                let state = guard
                    .last_state()
                    .cloned()
                    .expect("new_episode started an episode");
                let system_actions = guard.cyber_system().available_actions(true);
                let model = dscenkit_core::get_model(guard.cyber_system().system_name());
                let available = system_actions
                    .into_iter()
                    .map(|action| model.canonicalize_action(action))
                    .collect::<Vec<_>>();
                (state, available)
            };

            if available.is_empty() {
                break;
            }

            let chosen_index = {
                let mut guard = actor_a.lock().expect("actor mutex poisoned");
                let experience = guard.current_experience();
                agent_a.choose_action(experience, &available, &state, true)
            };
            let Some(index) = chosen_index else {
                break;
            };
            let action = (*available[index]).clone();

            let result = arena.take_action(&actor_a, &action, true)?;

            let transition = actor_a
                .lock()
                .expect("actor mutex poisoned")
                .last_transition();
            if let Some(transition) = transition {
                let mut guard = actor_a.lock().expect("actor mutex poisoned");
                let episode_result = result.as_state_result().unwrap_or(dscenkit_core::StateResult::InProgress);
                let experience = guard.current_experience();
                agent_a.learn(experience, std::slice::from_ref(&transition), episode_result);
            }

            if result.is_terminal() {
                actor_a.lock().expect("actor mutex poisoned").store_current_episode(true);
                break;
            }
        }

        if episode % 20 == 0 || episode + 1 == episodes {
            let stats_a = actor_a
                .lock()
                .expect("actor mutex poisoned")
                .experience(&goal)
                .map(|xp| xp.episodes.len())
                .unwrap_or(0);
            let stats_b = actor_b
                .lock()
                .expect("actor mutex poisoned")
                .experience(&goal)
                .map(|xp| xp.episodes.len())
                .unwrap_or(0);
            info!(episode, actor_a_episodes = stats_a, actor_b_episodes = stats_b, "arena progress");
        }
    }

    Ok(())
}
