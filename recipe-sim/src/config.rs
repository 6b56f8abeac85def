//! TOML recipe files.
//!
//! ```toml
//! name = "pepper-soup"
//!
//! [[steps]]
//! id = "chop"
//! description = "Chop the peppers"
//! utensil = "Knife"
//! policy = "actions"   # instant | actions | seconds | auto
//! quantity = 3         # count, or whole seconds for seconds/auto
//! effect = "board-peppers"
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

use recipe_core::recipes::{CompletionPolicy, PolicyKind, Recipe, StepSpec};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeFile {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<StepEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepEntry {
    pub id: String,
    pub description: String,
    pub utensil: String,
    pub policy: String,
    pub quantity: Option<u32>,
    pub effect: Option<String>,
}

impl StepEntry {
    fn policy(&self) -> Result<CompletionPolicy> {
        let kind = PolicyKind::from_tag(&self.policy)
            .ok_or_else(|| anyhow!("step `{}` has unknown policy `{}`", self.id, self.policy))?;

        if kind == PolicyKind::Instant {
            return Ok(CompletionPolicy::Instant);
        }

        let Some(quantity) = self.quantity else {
            bail!("step `{}` needs a quantity for {kind} completion", self.id);
        };
        let seconds = Duration::from_secs(u64::from(quantity));

        Ok(match kind {
            PolicyKind::Instant => CompletionPolicy::Instant,
            PolicyKind::ActionCount => CompletionPolicy::ActionCount(quantity),
            PolicyKind::TimeElapsed => CompletionPolicy::TimeElapsed(seconds),
            PolicyKind::Auto => CompletionPolicy::Auto(seconds),
        })
    }
}

impl RecipeFile {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid recipe file")
    }

    /// Validates the file through the same path as the built-in recipes.
    pub fn build(&self) -> Result<Recipe> {
        let policies = self
            .steps
            .iter()
            .map(StepEntry::policy)
            .collect::<Result<Vec<_>>>()?;

        let specs: Vec<StepSpec<'_>> = self
            .steps
            .iter()
            .zip(policies)
            .map(|(entry, policy)| {
                let spec = StepSpec::new(&entry.id, &entry.description, &entry.utensil, policy);
                match &entry.effect {
                    Some(effect) => spec.with_side_effect(effect),
                    None => spec,
                }
            })
            .collect();

        Recipe::from_specs(&self.name, &specs)
            .with_context(|| format!("recipe `{}` failed validation", self.name))
    }
}

/// Reads, parses and validates a recipe file.
pub fn load_recipe(path: &Path) -> Result<Recipe> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read recipe file {}", path.display()))?;
    RecipeFile::parse(&text)
        .and_then(|file| file.build())
        .with_context(|| format!("failed to load recipe from {}", path.display()))
}
