//! Recipe data structures shared by every host.
//!
//! A [`Recipe`] is an ordered list of [`StepDefinition`]s, each carrying the
//! [`CompletionPolicy`] the sequencer enforces. Recipes are validated once,
//! when they are built from borrowed [`StepSpec`] blueprints, and are
//! immutable afterwards. Built-in recipes live in [`jollof`] and [`fufu`] as
//! `const` templates so they cost nothing until a session selects one.

use core::fmt;
use core::time::Duration;

use heapless::{String, Vec};

pub mod fufu;
pub mod jollof;

pub use fufu::{FUFU_TEMPLATE, fufu_template};
pub use jollof::{JOLLOF_RICE_TEMPLATE, jollof_rice_template};

/// Longest recipe we expect to author (Fufu) plus headroom.
pub const MAX_RECIPE_STEPS: usize = 16;
/// Maximum byte length of a step id.
pub const MAX_STEP_ID_LEN: usize = 32;
/// Maximum byte length of a step description.
pub const MAX_DESCRIPTION_LEN: usize = 96;
/// Maximum byte length of short labels (recipe names, utensils, effect tags).
pub const MAX_LABEL_LEN: usize = 32;

/// Stable key sensors bind to at authoring time.
pub type StepId = String<MAX_STEP_ID_LEN>;
/// Human-readable step text shown on the step board.
pub type StepText = String<MAX_DESCRIPTION_LEN>;
/// Short bounded label.
pub type Label = String<MAX_LABEL_LEN>;

/// Rule deciding when a step is satisfied.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompletionPolicy {
    /// Completes on a single instant report.
    Instant,
    /// Completes once the tally reaches the count.
    ActionCount(u32),
    /// Completes after the sensor-driven timer runs continuously this long.
    TimeElapsed(Duration),
    /// Completes this long after the step becomes current, with no start signal.
    Auto(Duration),
}

impl CompletionPolicy {
    /// Returns the policy discriminant without its quantity.
    #[must_use]
    pub const fn kind(self) -> PolicyKind {
        match self {
            CompletionPolicy::Instant => PolicyKind::Instant,
            CompletionPolicy::ActionCount(_) => PolicyKind::ActionCount,
            CompletionPolicy::TimeElapsed(_) => PolicyKind::TimeElapsed,
            CompletionPolicy::Auto(_) => PolicyKind::Auto,
        }
    }

    /// Number of actions required, for count-based steps.
    #[must_use]
    pub const fn required_actions(self) -> Option<u32> {
        match self {
            CompletionPolicy::ActionCount(count) => Some(count),
            _ => None,
        }
    }

    /// Duration required, for timed and automatic steps.
    #[must_use]
    pub const fn required_duration(self) -> Option<Duration> {
        match self {
            CompletionPolicy::TimeElapsed(duration) | CompletionPolicy::Auto(duration) => {
                Some(duration)
            }
            _ => None,
        }
    }

    /// Returns `false` when a quantity-bearing policy carries zero.
    #[must_use]
    pub const fn has_positive_quantity(self) -> bool {
        match self {
            CompletionPolicy::Instant => true,
            CompletionPolicy::ActionCount(count) => count > 0,
            CompletionPolicy::TimeElapsed(duration) | CompletionPolicy::Auto(duration) => {
                !duration.is_zero()
            }
        }
    }
}

impl fmt::Display for CompletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionPolicy::Instant => f.write_str("instant"),
            CompletionPolicy::ActionCount(count) => write!(f, "actions({count})"),
            CompletionPolicy::TimeElapsed(duration) => {
                f.write_str("seconds(")?;
                write_duration(f, *duration)?;
                f.write_str(")")
            }
            CompletionPolicy::Auto(duration) => {
                f.write_str("auto(")?;
                write_duration(f, *duration)?;
                f.write_str(")")
            }
        }
    }
}

/// Completion policy without its quantity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PolicyKind {
    Instant,
    ActionCount,
    TimeElapsed,
    Auto,
}

impl PolicyKind {
    /// Short tag used by recipe files and console output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Instant => "instant",
            PolicyKind::ActionCount => "actions",
            PolicyKind::TimeElapsed => "seconds",
            PolicyKind::Auto => "auto",
        }
    }

    /// Parses a tag produced by [`PolicyKind::as_str`] (case insensitive).
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        [
            PolicyKind::Instant,
            PolicyKind::ActionCount,
            PolicyKind::TimeElapsed,
            PolicyKind::Auto,
        ]
        .into_iter()
        .find(|kind| kind.as_str().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque data handed to observers untouched (which objects to highlight,
/// which texture to swap in).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SideEffectTag(Label);

impl SideEffectTag {
    /// Returns the tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SideEffectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed blueprint for a step. Built-in recipes store these as `const`
/// tables; file-backed recipes borrow them from parsed text.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StepSpec<'a> {
    pub id: &'a str,
    pub description: &'a str,
    pub utensil: &'a str,
    pub policy: CompletionPolicy,
    pub side_effect: Option<&'a str>,
}

impl<'a> StepSpec<'a> {
    #[must_use]
    pub const fn new(
        id: &'a str,
        description: &'a str,
        utensil: &'a str,
        policy: CompletionPolicy,
    ) -> Self {
        Self {
            id,
            description,
            utensil,
            policy,
            side_effect: None,
        }
    }

    /// Attaches a side-effect tag.
    #[must_use]
    pub const fn with_side_effect(mut self, tag: &'a str) -> Self {
        self.side_effect = Some(tag);
        self
    }
}

/// Immutable description of one recipe step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepDefinition {
    pub id: StepId,
    pub description: StepText,
    pub utensil: Label,
    pub policy: CompletionPolicy,
    pub side_effect: Option<SideEffectTag>,
}

impl StepDefinition {
    /// Validates a blueprint and copies it into bounded storage.
    ///
    /// `index` is only used to label errors.
    pub fn from_spec(index: usize, spec: &StepSpec<'_>) -> Result<Self, ConfigError> {
        if spec.id.is_empty() {
            return Err(ConfigError::EmptyStepId { index });
        }

        let id: StepId = bounded(spec.id).ok_or(ConfigError::FieldTooLong {
            index,
            field: "id",
            limit: MAX_STEP_ID_LEN,
        })?;

        if !spec.policy.has_positive_quantity() {
            return Err(ConfigError::NonPositiveQuantity {
                id,
                policy: spec.policy.kind(),
            });
        }

        let description = bounded(spec.description).ok_or(ConfigError::FieldTooLong {
            index,
            field: "description",
            limit: MAX_DESCRIPTION_LEN,
        })?;
        let utensil = bounded(spec.utensil).ok_or(ConfigError::FieldTooLong {
            index,
            field: "utensil",
            limit: MAX_LABEL_LEN,
        })?;
        let side_effect = match spec.side_effect {
            Some(tag) => Some(SideEffectTag(bounded(tag).ok_or(
                ConfigError::FieldTooLong {
                    index,
                    field: "side effect",
                    limit: MAX_LABEL_LEN,
                },
            )?)),
            None => None,
        };

        Ok(Self {
            id,
            description,
            utensil,
            policy: spec.policy,
            side_effect,
        })
    }

    /// Returns the policy discriminant.
    #[must_use]
    pub const fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }
}

/// Errors raised while building a recipe. All of them are fatal at startup.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("recipe has no steps")]
    EmptyRecipe,
    #[error("recipe has {count} steps, at most {limit} are supported", limit = MAX_RECIPE_STEPS)]
    TooManySteps { count: usize },
    #[error("recipe name exceeds {limit} bytes", limit = MAX_LABEL_LEN)]
    NameTooLong,
    #[error("step {index} has an empty id")]
    EmptyStepId { index: usize },
    #[error("step id `{id}` appears more than once")]
    DuplicateStepId { id: StepId },
    #[error("step `{id}` needs a positive quantity for {policy} completion")]
    NonPositiveQuantity { id: StepId, policy: PolicyKind },
    #[error("{field} of step {index} exceeds {limit} bytes")]
    FieldTooLong {
        index: usize,
        field: &'static str,
        limit: usize,
    },
}

/// Ordered, validated list of steps. Ids are unique.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Recipe {
    name: Label,
    steps: Vec<StepDefinition, MAX_RECIPE_STEPS>,
}

impl Recipe {
    /// Builds a recipe, rejecting empty recipes, duplicate ids, zero
    /// quantities and over-long fields.
    pub fn from_specs(name: &str, specs: &[StepSpec<'_>]) -> Result<Self, ConfigError> {
        if specs.is_empty() {
            return Err(ConfigError::EmptyRecipe);
        }
        if specs.len() > MAX_RECIPE_STEPS {
            return Err(ConfigError::TooManySteps { count: specs.len() });
        }

        let name = bounded(name).ok_or(ConfigError::NameTooLong)?;
        let mut steps: Vec<StepDefinition, MAX_RECIPE_STEPS> = Vec::new();

        for (index, spec) in specs.iter().enumerate() {
            let step = StepDefinition::from_spec(index, spec)?;
            if steps.iter().any(|existing| existing.id == step.id) {
                return Err(ConfigError::DuplicateStepId { id: step.id });
            }
            steps
                .push(step)
                .map_err(|_| ConfigError::TooManySteps { count: specs.len() })?;
        }

        Ok(Self { name, steps })
    }

    /// Returns the recipe name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the recipe name as a bounded label.
    #[must_use]
    pub fn label(&self) -> &Label {
        &self.name
    }

    /// Returns the ordered steps.
    #[must_use]
    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false` for a validated recipe.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Looks up a step by position.
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    /// Returns the position of the step with `id`.
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id.as_str() == id)
    }

    /// Looks up a step by id.
    #[must_use]
    pub fn step_by_id(&self, id: &str) -> Option<&StepDefinition> {
        self.index_of(id).and_then(|index| self.step(index))
    }
}

/// Built-in recipes shipped with the game.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RecipeKind {
    JollofRice,
    Fufu,
}

impl RecipeKind {
    /// Every built-in recipe.
    pub const ALL: [RecipeKind; 2] = [RecipeKind::JollofRice, RecipeKind::Fufu];

    /// Canonical recipe name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RecipeKind::JollofRice => "jollof-rice",
            RecipeKind::Fufu => "fufu",
        }
    }

    /// Accepts the canonical name or its short form (`jollof`).
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case("jollof") || tag.eq_ignore_ascii_case("jollof-rice") {
            Some(RecipeKind::JollofRice)
        } else if tag.eq_ignore_ascii_case("fufu") {
            Some(RecipeKind::Fufu)
        } else {
            None
        }
    }

    /// Returns the `const` template for this recipe.
    #[must_use]
    pub const fn template(self) -> RecipeTemplate {
        match self {
            RecipeKind::JollofRice => JOLLOF_RICE_TEMPLATE,
            RecipeKind::Fufu => FUFU_TEMPLATE,
        }
    }

    /// Builds the validated recipe.
    pub fn recipe(self) -> Result<Recipe, ConfigError> {
        self.template().build()
    }
}

impl fmt::Display for RecipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable recipe blueprint shared across hosts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RecipeTemplate {
    pub kind: RecipeKind,
    pub steps: &'static [StepSpec<'static>],
}

impl RecipeTemplate {
    #[must_use]
    pub const fn new(kind: RecipeKind, steps: &'static [StepSpec<'static>]) -> Self {
        Self { kind, steps }
    }

    /// Returns the ordered step blueprints.
    #[must_use]
    pub const fn steps(&self) -> &'static [StepSpec<'static>] {
        self.steps
    }

    /// Returns the number of steps in the template.
    #[must_use]
    pub const fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Validates the template into a [`Recipe`].
    pub fn build(&self) -> Result<Recipe, ConfigError> {
        Recipe::from_specs(self.kind.as_str(), self.steps)
    }
}

fn bounded<const N: usize>(value: &str) -> Option<String<N>> {
    let mut text = String::new();
    text.push_str(value).ok()?;
    Some(text)
}

/// Writes the coarsest exact unit: `5s`, `1500ms`, `500us` or `20ns`.
pub(crate) fn write_duration<W: fmt::Write>(writer: &mut W, duration: Duration) -> fmt::Result {
    let nanos = duration.subsec_nanos();
    if nanos == 0 {
        write!(writer, "{}s", duration.as_secs())
    } else if nanos % 1_000_000 == 0 {
        write!(writer, "{}ms", duration.as_millis())
    } else if nanos % 1_000 == 0 {
        write!(writer, "{}us", duration.as_micros())
    } else {
        write!(writer, "{}ns", duration.as_nanos())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::string::ToString;

    use super::*;

    const TWO_STEPS: [StepSpec<'static>; 2] = [
        StepSpec::new(
            "chop",
            "Chop the peppers",
            "Knife",
            CompletionPolicy::ActionCount(3),
        ),
        StepSpec::new(
            "simmer",
            "Simmer the soup",
            "Pot",
            CompletionPolicy::TimeElapsed(Duration::from_secs(4)),
        )
        .with_side_effect("pot-steam"),
    ];

    #[test]
    fn recipe_lookup_by_id_and_index() {
        let recipe = Recipe::from_specs("pepper-soup", &TWO_STEPS).expect("recipe should build");

        assert_eq!(recipe.name(), "pepper-soup");
        assert_eq!(recipe.len(), 2);
        assert_eq!(recipe.index_of("simmer"), Some(1));
        assert_eq!(recipe.index_of("boil"), None);

        let simmer = recipe.step_by_id("simmer").expect("simmer step missing");
        assert_eq!(simmer.utensil.as_str(), "Pot");
        assert_eq!(
            simmer.side_effect.as_ref().map(SideEffectTag::as_str),
            Some("pot-steam")
        );
        assert_eq!(recipe.step(0).map(|step| step.id.as_str()), Some("chop"));
    }

    #[test]
    fn empty_recipe_is_rejected() {
        assert_eq!(
            Recipe::from_specs("nothing", &[]),
            Err(ConfigError::EmptyRecipe)
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let specs = [
            StepSpec::new("stir", "Stir", "Spoon", CompletionPolicy::Instant),
            StepSpec::new("stir", "Stir again", "Spoon", CompletionPolicy::Instant),
        ];

        match Recipe::from_specs("stew", &specs) {
            Err(ConfigError::DuplicateStepId { id }) => assert_eq!(id.as_str(), "stir"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn zero_quantities_are_rejected() {
        let policies = [
            CompletionPolicy::ActionCount(0),
            CompletionPolicy::TimeElapsed(Duration::ZERO),
            CompletionPolicy::Auto(Duration::ZERO),
        ];

        for policy in policies {
            let specs = [StepSpec::new("broken", "Broken", "Pot", policy)];
            assert!(matches!(
                Recipe::from_specs("broken", &specs),
                Err(ConfigError::NonPositiveQuantity { .. })
            ));
        }
    }

    #[test]
    fn instant_steps_ignore_quantity() {
        let specs = [StepSpec::new("boil", "Boil", "Pot", CompletionPolicy::Instant)];
        assert!(Recipe::from_specs("boil", &specs).is_ok());
    }

    #[test]
    fn empty_and_oversized_fields_are_rejected() {
        let empty = [StepSpec::new("", "Nameless", "Pot", CompletionPolicy::Instant)];
        assert_eq!(
            Recipe::from_specs("nameless", &empty),
            Err(ConfigError::EmptyStepId { index: 0 })
        );

        let long_id = "a-step-id-that-is-far-too-long-for-the-board";
        let oversized = [StepSpec::new(long_id, "Long", "Pot", CompletionPolicy::Instant)];
        assert_eq!(
            Recipe::from_specs("long", &oversized),
            Err(ConfigError::FieldTooLong {
                index: 0,
                field: "id",
                limit: MAX_STEP_ID_LEN,
            })
        );
    }

    #[test]
    fn too_many_steps_are_rejected() {
        let spec = StepSpec::new("same", "Same", "Pot", CompletionPolicy::Instant);
        let specs = [spec; MAX_RECIPE_STEPS + 1];
        assert_eq!(
            Recipe::from_specs("long", &specs),
            Err(ConfigError::TooManySteps {
                count: MAX_RECIPE_STEPS + 1
            })
        );
    }

    #[test]
    fn policy_labels_render_quantities() {
        assert_eq!(CompletionPolicy::Instant.to_string(), "instant");
        assert_eq!(CompletionPolicy::ActionCount(3).to_string(), "actions(3)");
        assert_eq!(
            CompletionPolicy::TimeElapsed(Duration::from_secs(5)).to_string(),
            "seconds(5s)"
        );
        assert_eq!(
            CompletionPolicy::Auto(Duration::from_millis(1_500)).to_string(),
            "auto(1500ms)"
        );
        assert_eq!(
            CompletionPolicy::Auto(Duration::from_micros(500)).to_string(),
            "auto(500us)"
        );
        assert_eq!(
            CompletionPolicy::TimeElapsed(Duration::from_nanos(1_000_020)).to_string(),
            "seconds(1000020ns)"
        );
        assert_eq!(PolicyKind::from_tag("SECONDS"), Some(PolicyKind::TimeElapsed));
        assert_eq!(PolicyKind::from_tag("sometimes"), None);
    }

    #[test]
    fn recipe_kind_accepts_short_tags() {
        assert_eq!(RecipeKind::from_tag("Jollof"), Some(RecipeKind::JollofRice));
        assert_eq!(RecipeKind::from_tag("jollof-rice"), Some(RecipeKind::JollofRice));
        assert_eq!(RecipeKind::from_tag("fufu"), Some(RecipeKind::Fufu));
        assert_eq!(RecipeKind::from_tag("egusi"), None);
    }
}
