use std::rc::Rc;

use thiserror::Error;

/// A shader resource resolved by the loader collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedShader {
    /// The raw shader code, starting with its `shader_type ...;`
    /// declaration.
    pub code: String,
    /// The loader's normalized identity for this resource, used to
    /// deduplicate diamond includes.
    pub canonical_path: String,
}

/// Errors a [`ShaderLoader`] can report.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// No resource exists at the given path.
    #[error("shader not found: {0}")]
    NotFound(String),
    /// The path resolved to a resource that is not a shader.
    #[error("resource is not a shader: {0}")]
    NotAShader(String),
    /// Anything else the loader wants to surface.
    #[error("{0}")]
    Other(String),
}

/// Type alias for the include resolution callback.
///
/// The preprocessor never touches storage itself; every `#include` path
/// goes through one of these.
pub type ShaderLoader = Rc<dyn Fn(&str) -> Result<LoadedShader, LoadError>>;

/// Configuration for a preprocessing run.
pub struct PreprocessorConfig {
    /// Name of the built-in platform macro, defined with body `true`.
    pub platform: String,
    /// Whether the host is an editor/tooling context. Controls the body
    /// of the built-in `EDITOR` macro.
    pub editor: bool,
    /// Extra plain macros defined before user code runs.
    pub defines: Vec<(String, String)>,
    /// `#include` recursion ceiling.
    pub include_depth_limit: usize,
    /// Upper bound on fixpoint macro expansion passes per line.
    pub expansion_pass_limit: usize,
    /// Include resolution callback.
    pub loader: Option<ShaderLoader>,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self::runtime()
    }
}

impl PreprocessorConfig {
    /// Configuration for a runtime host (`EDITOR` is `false`).
    #[must_use]
    pub fn runtime() -> Self {
        PreprocessorConfig {
            platform: host_platform_macro(),
            editor: false,
            defines: Vec::new(),
            include_depth_limit: 25,
            expansion_pass_limit: 64,
            loader: None,
        }
    }

    /// Configuration for an editor host (`EDITOR` is `true`).
    #[must_use]
    pub fn editor() -> Self {
        PreprocessorConfig {
            editor: true,
            ..Self::runtime()
        }
    }

    /// Override the platform macro name.
    #[must_use]
    pub fn with_platform<S: Into<String>>(mut self, platform: S) -> Self {
        self.platform = platform.into();
        self
    }

    /// Set the include resolution callback.
    #[must_use]
    pub fn with_loader<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<LoadedShader, LoadError> + 'static,
    {
        self.loader = Some(Rc::new(f));
        self
    }

    /// Add a plain macro defined before user code runs.
    #[must_use]
    pub fn with_define<S: Into<String>>(mut self, name: S, body: S) -> Self {
        self.defines.push((name.into(), body.into()));
        self
    }
}

/// The host OS name as a macro identifier, e.g. `LINUX` or `WINDOWS`.
fn host_platform_macro() -> String {
    std::env::consts::OS.replace(' ', "_").to_uppercase()
}
