//! Pathforge - Entry Point
//!
//! Command-line front end for the planner: runs a simulated learning
//! session against a catalog, plans a fixed-horizon timestep schedule, or
//! generates synthetic benchmark catalogs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pathforge::catalog::CourseCatalog;
use pathforge::core::config::PlannerConfig;
use pathforge::core::error::Result;
use pathforge::datagen::{self, InstanceGenerator, Tier};
use pathforge::graph::PrerequisiteGraph;
use pathforge::planner::PathModelBuilder;
use pathforge::session::{LearningSession, SessionOutcome, SimulatedLearner};
use pathforge::solver::native::NativeSolver;
use pathforge::sprint::cluster::DistanceMetric;
use pathforge::sprint::SprintOrdering;

#[derive(Parser)]
#[command(name = "pathforge", about = "Adaptive learning-path planner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a closed-loop session with a simulated learner
    Run {
        /// Path to lessons.json
        #[arg(long)]
        lessons: PathBuf,
        /// Path to activities.json
        #[arg(long)]
        activities: PathBuf,
        /// Seed for the solver and the simulated learner
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Upper bound on activities per sprint
        #[arg(long, default_value_t = 5)]
        max_sprint_size: usize,
        /// Distance metric for splitting oversized depth groups
        #[arg(long, value_enum, default_value = "jaccard")]
        cluster_metric: DistanceMetric,
        /// Ordering of the finished sprints
        #[arg(long, value_enum, default_value = "depth-group")]
        sprint_ordering: SprintOrdering,
    },
    /// Plan a fixed-horizon timestep schedule from zero mastery
    Schedule {
        #[arg(long)]
        lessons: PathBuf,
        #[arg(long)]
        activities: PathBuf,
        /// Number of timesteps in the horizon
        #[arg(long, default_value_t = 12)]
        horizon: usize,
    },
    /// Generate synthetic benchmark catalogs
    Generate {
        #[arg(long, value_enum)]
        tier: Tier,
        /// How many instances to produce
        #[arg(long, default_value_t = 3)]
        instances: u32,
        /// Output directory; one subdirectory per instance
        #[arg(long, default_value = "benchmarks")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pathforge=info".into()),
        )
        .init();

    match Cli::parse().command {
        Command::Run {
            lessons,
            activities,
            seed,
            max_sprint_size,
            cluster_metric,
            sprint_ordering,
        } => {
            let mut config = PlannerConfig::default();
            config.solver_seed = seed;
            config.max_sprint_size = max_sprint_size;
            config.cluster_metric = cluster_metric;
            config.sprint_ordering = sprint_ordering;
            run_session(&lessons, &activities, config, seed)
        }
        Command::Schedule {
            lessons,
            activities,
            horizon,
        } => plan_schedule(&lessons, &activities, horizon),
        Command::Generate {
            tier,
            instances,
            out,
        } => generate(tier, instances, &out),
    }
}

fn run_session(
    lessons: &PathBuf,
    activities: &PathBuf,
    config: PlannerConfig,
    seed: u64,
) -> Result<()> {
    let catalog = CourseCatalog::load(lessons, activities)?;
    let targets = catalog.lessons().keys().cloned().collect();

    let mut session = LearningSession::new(
        &catalog,
        targets,
        Default::default(),
        config,
        SimulatedLearner::new(seed),
    )?;
    let report = session.run();

    for log in &report.sprint_history {
        let ids: Vec<String> = log.activities.iter().map(|id| id.to_string()).collect();
        println!("sprint {:>3}: {}", log.sprint_id, ids.join(", "));
    }
    match &report.outcome {
        SessionOutcome::Done => println!("all targets met after {} sprints", report.sprint_history.len()),
        SessionOutcome::Stuck(reason) => println!("session stuck: {reason:?}"),
    }
    Ok(())
}

fn plan_schedule(lessons: &PathBuf, activities: &PathBuf, horizon: usize) -> Result<()> {
    let catalog = CourseCatalog::load(lessons, activities)?;
    let graph = PrerequisiteGraph::build(catalog.lessons())?;
    let config = PlannerConfig::default();
    let plan =
        PathModelBuilder::new(&catalog, &graph).plan_timesteps(horizon, &config, &NativeSolver::new())?;

    for (i, slot) in plan.steps.iter().enumerate() {
        match slot {
            Some(id) => println!("step {:>3}: {id}", i + 1),
            None => println!("step {:>3}: -", i + 1),
        }
    }
    println!("{} of {} steps active", plan.active_steps, horizon);
    Ok(())
}

fn generate(tier: Tier, instances: u32, out: &PathBuf) -> Result<()> {
    for instance in 0..instances {
        let catalog = InstanceGenerator::new(tier, instance).generate()?;
        let dir = out.join(format!("instance_{:02}", instance + 1));
        datagen::write_json(&catalog, &dir)?;
        println!(
            "instance {:02}: {} lessons, {} activities -> {}",
            instance + 1,
            catalog.lessons().len(),
            catalog.activities().len(),
            dir.display()
        );
    }
    Ok(())
}
