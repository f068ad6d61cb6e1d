use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use redwire_core::{
    GridWorld, Interaction, LoadReport, Position, Simulation, TICKS_PER_SECOND, TickReport,
};
use redwire_store::{WorldStore, default_base_dir, list_worlds};

/// Actor id the CLI uses for connector tool sessions.
const CLI_ACTOR: &str = "cli";

#[derive(Parser)]
#[command(name = "redwire", about = "Wireless redstone chain network simulator")]
struct Cli {
    /// World to operate on
    #[arg(long, global = true)]
    world: Option<String>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place a chain at X,Y,Z
    Place {
        #[arg(allow_hyphen_values = true)]
        pos: Position,
    },

    /// Break the chain at X,Y,Z
    Remove {
        #[arg(allow_hyphen_values = true)]
        pos: Position,
    },

    /// Pair two chains with the connector tool
    Connect {
        #[arg(allow_hyphen_values = true)]
        a: Position,
        #[arg(allow_hyphen_values = true)]
        b: Position,
    },

    /// Remove the connection between two chains
    Disconnect {
        #[arg(allow_hyphen_values = true)]
        a: Position,
        #[arg(allow_hyphen_values = true)]
        b: Position,
    },

    /// Set a redstone source at X,Y,Z (0 removes it)
    Power {
        #[arg(allow_hyphen_values = true)]
        pos: Position,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=15))]
        level: u8,
    },

    /// Advance the simulation by N ticks
    Tick {
        #[arg(default_value_t = 1)]
        count: u64,
    },

    /// Run the simulation in real time until stopped
    Run {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Ticks per second
        #[arg(long, default_value_t = TICKS_PER_SECOND)]
        tps: u32,
    },

    /// List chains and cables
    Show {
        /// Print the full JSON export instead
        #[arg(long)]
        json: bool,
    },

    /// Show world statistics
    Stats,

    /// Export the world to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import a world from a JSON file, replacing the current one.
    /// The world keeps its own redwire.toml config; the export's config is
    /// only compared against it.
    Import {
        /// Input file path
        path: PathBuf,
    },

    /// List saved worlds
    Worlds,
}

fn open_world(cli: &Cli) -> Result<WorldStore> {
    WorldStore::open(cli.world.as_deref(), None).context("failed to open world store")
}

fn load(world: &WorldStore) -> Result<Simulation<GridWorld>> {
    let (sim, report) = world.load().context("failed to load world")?;
    print_repairs(&report);
    Ok(sim)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Place { pos } => cmd_place(&cli, *pos),
        Commands::Remove { pos } => cmd_remove(&cli, *pos),
        Commands::Connect { a, b } => cmd_connect(&cli, *a, *b),
        Commands::Disconnect { a, b } => cmd_disconnect(&cli, *a, *b),
        Commands::Power { pos, level } => cmd_power(&cli, *pos, *level),
        Commands::Tick { count } => cmd_tick(&cli, *count),
        Commands::Run { ticks, tps } => cmd_run(&cli, *ticks, *tps).await,
        Commands::Show { json } => cmd_show(&cli, *json),
        Commands::Stats => cmd_stats(&cli),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
        Commands::Worlds => cmd_worlds(),
    }
}

// ---------------------------------------------------------------------------
// Advisory pidfile for `run`
// ---------------------------------------------------------------------------

fn pidfile_path(world: &WorldStore) -> PathBuf {
    world.base_dir().join(format!("run-{}.pid", world.name()))
}

/// Check for an existing pidfile and log accordingly, then write our own.
fn acquire_pidfile(world: &WorldStore) -> Option<PathBuf> {
    let path = pidfile_path(world);
    if let Ok(content) = std::fs::read_to_string(&path)
        && let Ok(pid) = content.trim().parse::<u32>()
    {
        if is_process_alive(pid) {
            tracing::warn!(
                "another redwire run (PID {pid}) is driving world '{}'; last save wins",
                world.name()
            );
        } else {
            tracing::info!("cleaned up stale pidfile (PID {pid} is dead)");
            let _ = std::fs::remove_file(&path);
        }
    }

    match std::fs::File::create(&path) {
        Ok(mut f) => {
            let _ = write!(f, "{}", std::process::id());
            tracing::info!("wrote pidfile: {}", path.display());
            Some(path)
        }
        Err(e) => {
            tracing::warn!("failed to write pidfile: {e}");
            None
        }
    }
}

fn release_pidfile(path: &Path) {
    let _ = std::fs::remove_file(path);
    tracing::info!("removed pidfile: {}", path.display());
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    // kill(pid, 0) checks existence without sending a signal
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    false
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_place(cli: &Cli, pos: Position) -> Result<()> {
    let world = open_world(cli)?;
    let mut sim = load(&world)?;
    if !sim.place_chain(pos) {
        bail!("a chain already exists at {pos}");
    }
    world.save(&sim).context("failed to save world")?;
    println!("placed chain at {pos}");
    Ok(())
}

fn cmd_remove(cli: &Cli, pos: Position) -> Result<()> {
    let world = open_world(cli)?;
    let mut sim = load(&world)?;
    let Some(peers) = sim.remove_chain(pos) else {
        bail!("no chain at {pos}");
    };
    world.save(&sim).context("failed to save world")?;
    println!("removed chain at {pos} ({} connections dropped)", peers.len());
    Ok(())
}

fn cmd_connect(cli: &Cli, a: Position, b: Position) -> Result<()> {
    let world = open_world(cli)?;
    let mut sim = load(&world)?;
    let actor = CLI_ACTOR.to_string();

    match sim.use_connector(&actor, a, true) {
        Interaction::AnchorSet(_) => {}
        _ => bail!("no chain at {a}"),
    }
    match sim.use_connector(&actor, b, true) {
        Interaction::Attempted { result: Ok(()), .. } => {}
        Interaction::Attempted {
            result: Err(err), ..
        } => bail!("cannot connect {a} and {b}: {err}"),
        Interaction::Ignored | Interaction::AnchorSet(_) => bail!("no chain at {b}"),
    }

    world.save(&sim).context("failed to save world")?;
    println!("connected {a} <-> {b}");
    Ok(())
}

fn cmd_disconnect(cli: &Cli, a: Position, b: Position) -> Result<()> {
    let world = open_world(cli)?;
    let mut sim = load(&world)?;
    if sim.disconnect(a, b) {
        world.save(&sim).context("failed to save world")?;
        println!("disconnected {a} <-> {b}");
    } else {
        println!("{a} and {b} were not connected");
    }
    Ok(())
}

fn cmd_power(cli: &Cli, pos: Position, level: u8) -> Result<()> {
    let world = open_world(cli)?;
    let mut sim = load(&world)?;
    sim.set_source(pos, level);
    world.save(&sim).context("failed to save world")?;
    if level == 0 {
        println!("removed source at {pos}");
    } else {
        println!("source at {pos} set to {level}");
    }
    Ok(())
}

fn cmd_tick(cli: &Cli, count: u64) -> Result<()> {
    let world = open_world(cli)?;
    let mut sim = load(&world)?;

    let mut changes = 0;
    for _ in 0..count {
        let report = sim.tick();
        changes += report.changed.len();
        print_report(&report);
    }

    world.save(&sim).context("failed to save world")?;
    println!("now at tick {} ({changes} signal changes)", sim.current_tick());
    Ok(())
}

async fn cmd_run(cli: &Cli, ticks: Option<u64>, tps: u32) -> Result<()> {
    if tps == 0 {
        bail!("--tps must be at least 1");
    }
    let world = open_world(cli)?;
    let mut sim = load(&world)?;
    tracing::info!("running world '{}' at {tps} tps", world.name());

    let pidfile = acquire_pidfile(&world);
    let result = run_loop(&world, &mut sim, ticks, tps).await;
    let saved = world.save(&sim).context("failed to save world");

    if let Some(path) = pidfile {
        release_pidfile(&path);
    }
    let ran = result?;
    saved?;
    println!("stopped at tick {} after {ran} ticks", sim.current_tick());
    Ok(())
}

/// Fixed-rate tick loop. Saves every backstop interval. Returns ticks run.
async fn run_loop(
    world: &WorldStore,
    sim: &mut Simulation<GridWorld>,
    limit: Option<u64>,
    tps: u32,
) -> Result<u64> {
    let period = (Duration::from_secs(1) / tps).max(Duration::from_micros(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let save_every = u64::from(sim.config().update_interval_ticks);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut ran = 0u64;
    while limit.is_none_or(|limit| ran < limit) {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown requested");
                break;
            }
            _ = interval.tick() => {
                let report = step(sim);
                ran += 1;
                print_report(&report);
                if ran % save_every == 0 {
                    world.save(sim).context("failed to save world")?;
                }
            }
        }
    }
    Ok(ran)
}

/// One tick of the long-running loop. Notifications have no consumer here,
/// so they are drained to keep memory flat.
fn step(sim: &mut Simulation<GridWorld>) -> TickReport {
    let report = sim.tick();
    sim.world_mut().drain_notifications();
    report
}

fn cmd_show(cli: &Cli, json: bool) -> Result<()> {
    let world = open_world(cli)?;
    if json {
        let export = world
            .export_json_string()
            .context("failed to serialize world")?;
        println!("{export}");
        return Ok(());
    }

    let sim = load(&world)?;
    let network = sim.network();
    if network.is_empty() {
        println!("(no chains)");
        return Ok(());
    }
    for record in network.records() {
        let peers: Vec<String> = record.connections.iter().map(|p| p.to_string()).collect();
        let pending = if record.pending_loss_ticks > 0 {
            format!("  (clears in {})", record.pending_loss_ticks)
        } else {
            String::new()
        };
        println!(
            "chain {:<16} signal {:>2}{pending}  peers [{}]",
            record.position.to_string(),
            record.cached_signal,
            peers.join(" ")
        );
    }
    for cable in network.cable_segments() {
        println!("cable {} -> {}  signal {}", cable.from, cable.to, cable.signal);
    }
    for (pos, power) in sim.world().sources() {
        println!("source {pos}  power {power}");
    }
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let world = open_world(cli)?;
    let sim = load(&world)?;
    let network = sim.network();
    let cfg = sim.config();
    let powered = network.nodes().filter(|n| n.cached_signal() > 0).count();

    println!("world:       {}", world.name());
    println!("tick:        {}", sim.current_tick());
    println!("chains:      {}", network.len());
    println!("connections: {}", network.connection_count());
    println!("powered:     {powered}");
    println!("sources:     {}", sim.world().sources().count());
    println!(
        "config:      distance={} cap={} interval={} loss_delay={}",
        cfg.max_connection_distance,
        cfg.max_connections_per_chain,
        cfg.update_interval_ticks,
        cfg.signal_loss_delay_ticks
    );
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let world = open_world(cli)?;
    world
        .export_json_file(path)
        .with_context(|| format!("failed to export to {}", path.display()))?;
    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let world = open_world(cli)?;
    let imported = world
        .import_json_file(path)
        .context("failed to import JSON")?;
    print_repairs(&imported.report);
    if imported.config != *world.config() {
        eprintln!(
            "note: export config differs from this world's config; the world config applies"
        );
    }

    let sim = load(&world)?;
    println!(
        "imported from {}. chains={}, connections={}, tick={}",
        path.display(),
        sim.network().len(),
        sim.network().connection_count(),
        sim.current_tick()
    );
    Ok(())
}

fn cmd_worlds() -> Result<()> {
    let names = list_worlds(&default_base_dir()).context("failed to list worlds")?;
    if names.is_empty() {
        println!("(no worlds)");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn print_report(report: &TickReport) {
    for change in &report.changed {
        println!(
            "tick {}: {} {} -> {}",
            report.tick, change.pos, change.from, change.to
        );
    }
    for failure in &report.failures {
        eprintln!("tick {}: {failure}", report.tick);
    }
    if report.repaired > 0 {
        eprintln!("tick {}: repaired {} connections", report.tick, report.repaired);
    }
}

fn print_repairs(report: &LoadReport) {
    if report.pruned() > 0 {
        eprintln!("pruned {} broken references while loading", report.pruned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redwire_core::NetworkConfig;

    #[test]
    fn test_step_drains_notifications() {
        let mut sim: Simulation<GridWorld> =
            Simulation::new(NetworkConfig::default(), GridWorld::new());
        let (a, b) = (Position::new(0, 0, 0), Position::new(4, 0, 0));
        sim.place_chain(a);
        sim.place_chain(b);
        sim.connect(a, b).unwrap();

        let lever = a.offset(0, 1, 0);
        for level in [15, 0, 15, 0] {
            sim.set_source(lever, level);
            for _ in 0..3 {
                step(&mut sim);
                assert!(sim.world().notifications().is_empty());
            }
        }
        assert_eq!(sim.network().node(b).unwrap().cached_signal(), 0);
    }
}
