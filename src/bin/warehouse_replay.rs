//! Scripted warehouse run exercising record, scrub, diverge and reverse play.
//!
//! Usage:
//!   cargo run --features demo --bin warehouse-replay
//!   cargo run --features demo --bin warehouse-replay -- --config session.json --json
//!   RUST_LOG=rewindable=debug cargo run --features demo --bin warehouse-replay

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use glam::Vec3;
use rewindable::{
    AgentId, ItemId, ItemKind, Pose, RewindError, RewindResult, Session, SessionConfig, SimWorld, TickOutcome,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Replay a scripted warehouse session and print what the engine did.
#[derive(Parser, Debug)]
#[command(name = "warehouse-replay")]
#[command(about = "Scripted record/rewind demo for the rewindable engine")]
struct Args {
    /// JSON session configuration (defaults are used for missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Print the final statistics as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("warehouse-replay: {err}");
            return ExitCode::from(2);
        }
    };

    match run(config, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("warehouse-replay: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<SessionConfig, String> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    SessionConfig::from_json_str(&text).map_err(|err| err.to_string())
}

struct Scene {
    session: Session,
    world: SimWorld,
    frame: f64,
}

impl Scene {
    fn new(config: SessionConfig, fps: u32) -> RewindResult<Self> {
        Ok(Self {
            session: Session::new(config)?,
            world: SimWorld::new(config.hold_offset),
            frame: 1.0 / f64::from(fps.max(1)),
        })
    }

    /// Walk `agent` in a straight line to `to`, one frame at a time, for `seconds`.
    fn walk(&mut self, agent: AgentId, to: Vec3, seconds: f64) -> RewindResult<()> {
        let from = self.world.agent(agent).map_or(Vec3::ZERO, |a| a.pose.position);
        let frames = (seconds / self.frame).ceil().max(1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = frames as u32;
        for step in 1..=steps {
            #[allow(clippy::cast_possible_truncation)]
            let f = (f64::from(step) / frames) as f32;
            self.world.move_agent(agent, Pose::at(from.lerp(to, f)))?;
            let outcome = self.session.tick(&mut self.world, self.frame);
            self.report(outcome);
        }
        Ok(())
    }

    fn report(&self, outcome: TickOutcome) {
        if let Some(pass) = outcome.record {
            for event in pass.events {
                tracing::info!(?event, at = self.session.now(), "item event");
            }
        }
    }
}

fn run(config: SessionConfig, args: &Args) -> RewindResult<()> {
    let mut scene = Scene::new(config, args.fps)?;

    let robot: AgentId = scene.session.register_agent()?;
    let helper: AgentId = scene.session.register_agent()?;
    scene.world.add_agent(robot, Pose::IDENTITY);
    scene.world.add_agent(helper, Pose::at(Vec3::new(0.0, 0.0, 6.0)));

    let parcel: ItemId = scene.session.register_item(ItemKind::Box, Vec3::new(6.0, 0.0, 0.0))?;
    let drum: ItemId = scene.session.register_item(ItemKind::Cylinder, Vec3::new(6.0, 0.0, 6.0))?;
    scene.world.add_item(parcel, Pose::at(Vec3::new(2.0, 0.0, 0.0)));
    scene.world.add_item(drum, Pose::at(Vec3::new(2.0, 0.0, 6.0)));

    // Forward: both robots fetch and deliver.
    scene.session.play(1.0);
    scene.walk(robot, Vec3::new(2.0, 0.0, 0.0), 1.0)?;
    scene.world.pick_up(robot, parcel)?;
    scene.walk(helper, Vec3::new(2.0, 0.0, 6.0), 1.0)?;
    scene.world.pick_up(helper, drum)?;
    scene.walk(robot, Vec3::new(6.0, 0.0, 0.0), 1.5)?;
    scene.world.drop_item(robot, Pose::at(Vec3::new(6.0, 0.0, 0.0)))?;
    scene.walk(helper, Vec3::new(6.0, 0.0, 6.0), 1.5)?;
    scene.world.drop_item(helper, Pose::at(Vec3::new(6.0, 0.0, 6.0)))?;
    scene.walk(robot, Vec3::ZERO, 0.5)?;
    tracing::info!(status = ?scene.session.status(), now = scene.session.now(), "delivery finished");

    // Scrub back into the carry.
    let report = scene.session.jump_to(&mut scene.world, 2.5);
    tracing::info!(
        held = report.held.len(),
        issues = report.issues.len(),
        status = ?scene.session.status(),
        "scrubbed to 2.5"
    );

    // Diverge: the helper drops the drum off target.
    scene.session.play(1.0);
    if let Some(pass) = scene.session.record_now(&mut scene.world) {
        tracing::info!(truncated = pass.truncated, "recorded over the old future");
    }
    scene.world.drop_item(helper, Pose::at(Vec3::new(3.0, 0.0, 3.0)))?;
    scene.walk(helper, Vec3::new(0.0, 0.0, 6.0), 1.0)?;

    // Reverse playback until time reaches zero.
    scene.session.play(-2.0);
    while scene.session.clock().is_playing() {
        let outcome = scene.session.tick(&mut scene.world, scene.frame);
        if outcome.advance.is_none() {
            break;
        }
    }
    tracing::info!(now = scene.session.now(), "reverse playback stopped");

    let stats = scene.session.stats();
    if args.json {
        let json = serde_json::to_string_pretty(&stats).map_err(|err| RewindError::internal(err.to_string()))?;
        println!("{json}");
    } else {
        println!(
            "agents: {} snapshots, items: {} snapshots, now {:.2}s of {:.2}s",
            stats.agents.snapshots, stats.items.snapshots, stats.now, stats.max_time
        );
    }
    Ok(())
}
