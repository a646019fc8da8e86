use log::debug;

use crate::config::LoadError;
use crate::error::ErrorKind;
use crate::preprocessor::Preprocessor;
use crate::state::PreprocessorState;
use crate::token::{Tokenizer, tokens_to_string};

impl From<&LoadError> for ErrorKind {
    fn from(err: &LoadError) -> Self {
        match err {
            LoadError::NotAShader(_) => ErrorKind::WrongResourceType,
            LoadError::NotFound(_) | LoadError::Other(_) => ErrorKind::IncludeLoadFailed,
        }
    }
}

impl Preprocessor {
    /// Handle `#include "path"`.
    ///
    /// The path is resolved through the loader collaborator, its
    /// `shader_type ...;` prefix is stripped, and the remainder is
    /// preprocessed recursively against the same state. The result is
    /// flattened onto a single line so the parent's line numbers after the
    /// directive stay untouched.
    pub(crate) fn process_include(
        &mut self,
        tokenizer: &mut Tokenizer,
        state: &mut PreprocessorState,
    ) {
        let line = tokenizer.line();

        tokenizer.advance('"');
        let mut path = tokens_to_string(&tokenizer.advance('"'));
        path.pop(); // closing quote
        tokenizer.skip_whitespace();

        if path.is_empty() || tokenizer.peek() != Some('\n') {
            state.set_error(ErrorKind::InvalidIncludePath, line);
            return;
        }

        let Some(loader) = state.loader.clone() else {
            state.set_error(ErrorKind::IncludeLoadFailed, line);
            return;
        };

        let loaded = match loader(&path) {
            Ok(loaded) => loaded,
            Err(err) => {
                debug!("include {path:?} failed to load: {err}");
                state.set_error(ErrorKind::from(&err), line);
                return;
            }
        };

        if loaded.code.is_empty() {
            state.set_error(ErrorKind::EmptyInclude, line);
            return;
        }

        let Some(type_end) = loaded.code.find(';') else {
            state.set_error(ErrorKind::MissingShaderType, line);
            return;
        };

        if state.includes.contains(&loaded.canonical_path) {
            // Already included anywhere in this run, silently skip.
            debug!("include {path:?} already processed, skipping");
            return;
        }
        state.includes.insert(loaded.canonical_path.clone());

        state.include_depth += 1;
        if state.include_depth > state.include_depth_limit {
            state.set_error(ErrorKind::MaxIncludeDepth, line);
            return;
        }

        // Drop the "shader_type xyz;" prefix of the included file.
        let included = &loaded.code[type_end + 1..];
        debug!("including {path:?} ({} bytes)", included.len());

        let mut processor = Preprocessor::new(included);
        // Cram the included unit onto one line to preserve the parent's
        // line numbers.
        let result = processor.run(state, false).replace('\n', " ");
        self.push_str(&result);

        if state.error.is_some() && self.root {
            // The error came from somewhere down the root's include chain;
            // anchor it to the #include the user can actually see.
            if let Some(err) = state.error.as_mut() {
                err.line = line + 1;
            }
        }

        state.include_depth -= 1;
    }
}
