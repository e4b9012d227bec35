//! Hamlet - headless village run
//!
//! Spawns a small village, lets the villagers decide and learn for a number
//! of ticks, then prints per-villager statistics.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use hamlet_mind::brain::AgentStats;
use hamlet_mind::core::config::BrainConfig;
use hamlet_mind::core::error::Result;
use hamlet_mind::simulation::{SimConfig, Village, VillageEvent};
use serde::Serialize;
use tokio::runtime::Runtime;

/// Run a headless village and report what the villagers learned
#[derive(Parser, Debug)]
#[command(name = "hamlet")]
#[command(about = "Run a headless village simulation and print villager statistics")]
struct Args {
    /// Number of villagers
    #[arg(long, default_value_t = 8)]
    agents: usize,

    /// Ticks to simulate
    #[arg(long, default_value_t = 2000)]
    ticks: u64,

    /// Random seed for deterministic layouts and decisions
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Brain configuration file (TOML); defaults apply to missing keys
    #[arg(long)]
    config: Option<PathBuf>,

    /// Never attach a learned policy
    #[arg(long)]
    rule_only: bool,

    /// Print statistics as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct RunReport {
    ticks: u64,
    clock_ms: u64,
    actions_completed: usize,
    shelters_completed: usize,
    mean_reward: f32,
    villagers: Vec<AgentStats>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hamlet_mind=info")),
        )
        .init();

    let args = Args::parse();

    let brain_config = match &args.config {
        Some(path) => BrainConfig::load(path)?,
        None => BrainConfig::default(),
    };
    let sim = SimConfig {
        agents: args.agents,
        seed: args.seed,
        rule_only: args.rule_only,
        ..SimConfig::default()
    };

    // Policy initialisation runs on the runtime's blocking pool
    let rt = Runtime::new()?;
    let _guard = rt.enter();

    let mut village = Village::new(brain_config, sim)?;
    if !args.rule_only {
        let ready = rt.block_on(village.wait_for_policies(Duration::from_secs(3)));
        tracing::info!("{} of {} learned policies ready", ready, args.agents);
    }

    let events = village.run(args.ticks);

    let rewards: Vec<f32> = events
        .iter()
        .filter_map(|e| match e {
            VillageEvent::ActionCompleted { reward, .. } => Some(*reward),
            _ => None,
        })
        .collect();
    let shelters_completed = events
        .iter()
        .filter(|e| matches!(e, VillageEvent::ShelterCompleted { .. }))
        .count();
    let mean_reward = if rewards.is_empty() {
        0.0
    } else {
        rewards.iter().sum::<f32>() / rewards.len() as f32
    };

    let report = RunReport {
        ticks: args.ticks,
        clock_ms: village.clock_ms(),
        actions_completed: rewards.len(),
        shelters_completed,
        mean_reward,
        villagers: village.stats(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    println!("\n=== HAMLET ===");
    println!(
        "{} ticks, {:.1} simulated minutes",
        report.ticks,
        report.clock_ms as f32 / 60_000.0
    );
    println!(
        "{} actions completed, mean reward {:+.3}, {} shelters finished",
        report.actions_completed, report.mean_reward, report.shelters_completed
    );
    println!();
    println!(
        "{:<8} {:>6} {:>8} {:>8} {:>8} {:>6} {:>6} {:>7}",
        "name", "learn", "success", "explore", "lr", "stm", "ltm", "policy"
    );
    for stats in &report.villagers {
        println!(
            "{:<8} {:>6} {:>8.2} {:>8.3} {:>8.4} {:>6} {:>6} {:>7?}",
            stats.name,
            stats.learning.decisions,
            stats.success_rate,
            stats.exploration_rate,
            stats.learning_rate,
            stats.memory.short_term,
            stats.memory.long_term,
            stats.policy_status,
        );
    }
}
