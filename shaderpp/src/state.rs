use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::config::{PreprocessorConfig, ShaderLoader};
use crate::error::{ErrorKind, PreprocessError};
use crate::macro_def::MacroDefinition;

/// Mutable state for one top-level preprocessing run.
///
/// A state is created per root [`preprocess`](crate::preprocess) call, or
/// supplied by the caller to share a macro/include universe across a
/// dependency tree. Includes thread the same state through the recursion,
/// so macros and include deduplication are global to the whole compilation
/// unit. Never share one state across concurrent runs.
pub struct PreprocessorState {
    /// Ordered by name so expansion passes visit macros in a stable
    /// order; runs over the same input always report the same error.
    pub(crate) macros: BTreeMap<String, MacroDefinition>,
    /// Open `#if`/`#ifdef` blocks; must return to zero at the root end.
    pub(crate) condition_depth: i32,
    /// For each open block, whether the matching `#else` branch must be
    /// skipped (true when the `if` branch was taken).
    pub(crate) skip_stack_else: Vec<bool>,
    /// Canonical paths already included anywhere in this run.
    pub(crate) includes: HashSet<String>,
    pub(crate) include_depth: usize,
    /// First error wins; later errors are not recorded.
    pub(crate) error: Option<PreprocessError>,
    pub(crate) loader: Option<ShaderLoader>,
    pub(crate) include_depth_limit: usize,
    pub(crate) expansion_pass_limit: usize,
}

impl Default for PreprocessorState {
    fn default() -> Self {
        Self::from_config(&PreprocessorConfig::default())
    }
}

impl PreprocessorState {
    /// Build a state with the built-in macros injected: the platform name
    /// macro (body `true`) and `EDITOR` (`true` or `false`), followed by
    /// any user defines from the configuration.
    #[must_use]
    pub fn from_config(config: &PreprocessorConfig) -> Self {
        let mut state = PreprocessorState {
            macros: BTreeMap::new(),
            condition_depth: 0,
            skip_stack_else: Vec::new(),
            includes: HashSet::new(),
            include_depth: 0,
            error: None,
            loader: config.loader.clone(),
            include_depth_limit: config.include_depth_limit,
            expansion_pass_limit: config.expansion_pass_limit,
        };

        state.define(&config.platform, "true");
        state.define("EDITOR", if config.editor { "true" } else { "false" });
        for (name, body) in &config.defines {
            state.define(name, body);
        }
        state
    }

    /// Define a plain substitution macro, overwriting any existing entry.
    /// Redefinition is only an error at the `#define` directive level.
    pub fn define<N: AsRef<str>, B: AsRef<str>>(&mut self, name: N, body: B) {
        debug!("define {} = {:?}", name.as_ref(), body.as_ref());
        self.macros.insert(
            name.as_ref().to_string(),
            MacroDefinition::plain(body.as_ref()),
        );
    }

    /// Remove a macro definition. Removing an undefined name is a no-op.
    pub fn undef(&mut self, name: &str) {
        debug!("undef {name}");
        self.macros.remove(name);
    }

    /// Check if a macro is defined.
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// The current macro table, ordered by name.
    #[must_use]
    pub fn macros(&self) -> &BTreeMap<String, MacroDefinition> {
        &self.macros
    }

    /// The first error recorded during the run, if any.
    #[must_use]
    pub fn error(&self) -> Option<&PreprocessError> {
        self.error.as_ref()
    }

    /// Record an error at a 0-based line. Only the first error of a run is
    /// kept; everything after it short-circuits.
    pub(crate) fn set_error(&mut self, kind: ErrorKind, line: usize) {
        if self.error.is_none() {
            self.error = Some(PreprocessError::at(kind, line));
        }
    }
}
