mod config;
mod session;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use recipe_core::recipes::{Recipe, RecipeKind};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use session::Session;

/// Interactive kitchen console for the recipe progression engine.
#[derive(Parser, Debug)]
#[command(name = "recipe-sim", version, about)]
struct Args {
    /// Built-in recipe to cook (`jollof` or `fufu`)
    #[arg(long, default_value = "jollof", value_parser = parse_recipe_kind)]
    recipe: RecipeKind,

    /// Load the recipe from a TOML file instead
    #[arg(long, conflicts_with = "recipe")]
    recipe_file: Option<PathBuf>,

    /// Write a timestamped transcript of the session
    #[arg(long)]
    transcript: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let recipe = load(&args)?;
    info!(recipe = recipe.name(), steps = recipe.len(), "session starting");

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(recipe, args.transcript.as_deref())
        .context("failed to open transcript")?;
    let mut line = String::new();

    writeln!(
        writer,
        "Recipe simulator ready. Type `help` for commands or `exit` to quit."
    )?;
    for response in session.start()? {
        writeln!(writer, "{response}")?;
    }

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_command(trimmed)? {
            writeln!(writer, "{response}")?;
        }
    }

    info!(
        transitions = session.journal().total_recorded(),
        complete = session.is_complete(),
        "session finished"
    );
    Ok(())
}

fn load(args: &Args) -> Result<Recipe> {
    match &args.recipe_file {
        Some(path) => config::load_recipe(path),
        None => args
            .recipe
            .recipe()
            .with_context(|| format!("built-in recipe {} is invalid", args.recipe)),
    }
}

fn parse_recipe_kind(tag: &str) -> Result<RecipeKind, String> {
    RecipeKind::from_tag(tag).ok_or_else(|| format!("unknown recipe `{tag}`, expected jollof or fufu"))
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// Logs go to stderr so stdout stays a clean console.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("recipe_core=info,recipe_sim=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}
