//! Command line harness for the brace reinforcement engine

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use brace_core::{
    import_urdf, Assembly, AssemblyId, ImportOptions, PassReport, ReinforcementManager,
    ReinforcementSettings,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "brace", about = "Joint reinforcement for rigid body assemblies", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulated lifecycle over an assembly (.ron) or robot (.urdf)
    Reinforce {
        input: PathBuf,
        /// Settings file; defaults are used when omitted
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Write the reinforced assembly here
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write the default settings
    Settings {
        /// Print to stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brace_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Reinforce {
            input,
            settings,
            output,
        } => reinforce(&input, settings.as_deref(), output.as_deref()),
        Commands::Settings { output } => write_settings(output.as_deref()),
    }
}

fn load_assembly(path: &Path) -> Result<Assembly> {
    let is_urdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("urdf"));
    if is_urdf {
        import_urdf(path, &ImportOptions::default())
            .with_context(|| format!("failed to import {}", path.display()))
    } else {
        Assembly::load(path).with_context(|| format!("failed to load {}", path.display()))
    }
}

fn reinforce(input: &Path, settings: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let settings = match settings {
        Some(path) => ReinforcementSettings::load(path)
            .with_context(|| format!("failed to load settings {}", path.display()))?,
        None => ReinforcementSettings::default(),
    };
    let mut assembly = load_assembly(input)?;
    let id = assembly.id;
    tracing::info!("Loaded '{}' with {} bodies", assembly.name, assembly.body_count());

    let mut manager = ReinforcementManager::new(settings);
    let mut reports: Vec<PassReport> = manager
        .on_assembly_entered_simulation(&mut assembly)
        .into_iter()
        .collect();

    let mut world: HashMap<AssemblyId, Assembly> = HashMap::new();
    world.insert(id, assembly);
    while manager.pending_deferrals() > 0 {
        reports.extend(manager.step(&mut world).into_iter().map(|(_, report)| report));
    }

    // Gravity is never eased by this harness; finish the ramp so tolerances are restored
    if let Some(assembly) = world.get_mut(&id) {
        assembly.easing_gravity = false;
    }
    manager.step(&mut world);

    let assembly = world
        .remove(&id)
        .context("assembly vanished during stepping")?;

    if reports.is_empty() {
        println!("'{}' was not reinforced (phase {:?})", assembly.name, manager.phase(id));
    }
    for report in &reports {
        println!("{}: {}", assembly.name, report);
        for (reason, count) in &report.skipped {
            println!("  skipped {}: {}", reason, count);
        }
    }

    let joints = manager.reinforcement_joints(id);
    println!("{} reinforcement joint(s)", joints.len());
    for record in &joints {
        let Some(joint) = assembly.joint(record.joint) else {
            continue;
        };
        let name = |body| {
            assembly
                .body(body)
                .map(|b| b.name.clone())
                .unwrap_or_else(|| body.to_string())
        };
        let connected = record.connected.map(name).unwrap_or_else(|| "world".to_string());
        println!(
            "  {:?} {} -> {} (force {}, torque {})",
            joint.kind,
            name(record.host),
            connected,
            joint.break_force,
            joint.break_torque
        );
    }

    if let Some(path) = output {
        assembly
            .save(path)
            .with_context(|| format!("failed to save {}", path.display()))?;
        tracing::info!("Saved reinforced assembly to {}", path.display());
    }
    Ok(())
}

fn write_settings(output: Option<&Path>) -> Result<()> {
    let settings = ReinforcementSettings::default();
    match output {
        Some(path) => {
            settings
                .save(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Wrote default settings to {}", path.display());
        }
        None => {
            let bytes = settings.to_bytes()?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
    }
    Ok(())
}
