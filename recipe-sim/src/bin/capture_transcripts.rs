use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use recipe_core::recipes::RecipeKind;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::Session;

/// Replays scripted kitchen sessions into transcript files.
#[derive(Parser, Debug)]
#[command(name = "capture-transcripts", version, about)]
struct Args {
    /// Directory the transcripts are written to
    #[arg(long, default_value = "transcripts")]
    out_dir: PathBuf,
}

const JOLLOF_SCRIPT: &[&str] = &[
    "help",
    "action",
    "action undo",
    "action",
    "action",
    "action",
    "timer start",
    "action",
    "action",
    "action",
    "action",
    "action",
    "action",
    "action",
    "action",
    "action",
    "instant",
    "instant",
    "status",
    "tick 1.5s",
    "tick 1500ms",
    "timer start",
    "tick 4s",
    "timer stop",
    "timer start",
    "tick 5s",
    "complete",
    "status",
];

const FUFU_SCRIPT: &[&str] = &[
    "action",
    "action",
    "action",
    "action",
    "instant",
    "instant",
    "timer start",
    "tick 5s",
    "timer start",
    "tick 2500ms",
    "tick 2.5s",
    "instant",
    "action",
    "action",
    "action",
    "action",
    "instant",
    "action",
    "action",
    "action",
    "instant",
    "action",
    "action",
    "action",
    "timer start",
    "tick 3s",
    "reset",
    "help reset",
    "status",
];

fn main() -> Result<()> {
    let args = Args::parse();
    record(&args, RecipeKind::JollofRice, JOLLOF_SCRIPT)?;
    record(&args, RecipeKind::Fufu, FUFU_SCRIPT)?;
    Ok(())
}

fn record(args: &Args, kind: RecipeKind, script: &[&str]) -> Result<()> {
    let recipe = kind.recipe()?;
    let path = args.out_dir.join(format!("{kind}.log"));
    let mut session = Session::new(recipe, Some(&path))
        .with_context(|| format!("failed to create {}", path.display()))?;

    session.start()?;
    for line in script {
        let _ = session.handle_command(line)?;
    }
    println!("{kind}: wrote {}", path.display());
    Ok(())
}
