use crate::comment::CommentStripper;
use crate::config::PreprocessorConfig;
use crate::error::{ErrorKind, PreprocessError};
use crate::eval;
use crate::expand::{self, ERROR_SENTINEL};
use crate::macro_def::MacroDefinition;
use crate::state::PreprocessorState;
use crate::token::{Tokenizer, tokens_to_string};

/// The shader source preprocessor.
///
/// One instance processes one translation unit. Includes spawn a nested
/// instance over the included text, sharing the caller's
/// [`PreprocessorState`] so macros and include deduplication accumulate
/// across the whole dependency tree.
pub struct Preprocessor {
    pub(crate) code: String,
    pub(crate) output: Vec<char>,
    /// Whether this instance owns its state, i.e. is processing the root
    /// translation unit. Errors from the root's include chain are
    /// re-anchored to the root's `#include` line.
    pub(crate) root: bool,
}

impl Preprocessor {
    /// Create a preprocessor over raw shader source.
    #[must_use]
    pub fn new<S: Into<String>>(code: S) -> Self {
        Preprocessor {
            code: code.into(),
            output: Vec::new(),
            root: false,
        }
    }

    /// Preprocess as a root translation unit, with a fresh state built
    /// from `config`.
    ///
    /// # Errors
    /// Returns the first [`PreprocessError`] recorded during the run.
    pub fn preprocess(&mut self, config: &PreprocessorConfig) -> Result<String, PreprocessError> {
        let mut state = PreprocessorState::from_config(config);
        let text = self.run(&mut state, true);
        match state.error.take() {
            Some(err) => Err(err),
            None => Ok(text),
        }
    }

    /// Preprocess sharing an externally supplied state. Used when a root
    /// shader preprocesses a dependency: macros defined here stay visible
    /// to later units, and already-included paths stay deduplicated.
    ///
    /// The error (if any) is both returned and left in `state` for the
    /// caller to inspect.
    ///
    /// # Errors
    /// Returns the first [`PreprocessError`] recorded during the run.
    pub fn preprocess_with_state(
        &mut self,
        state: &mut PreprocessorState,
    ) -> Result<String, PreprocessError> {
        let text = self.run(state, false);
        match state.error() {
            Some(err) => Err(err.clone()),
            None => Ok(text),
        }
    }

    /// Drive the whole pipeline: strip comments, walk tokens, dispatch
    /// directives, expand each completed output line. Returns the
    /// preprocessed text, or a sentinel once an error is in `state`.
    pub(crate) fn run(&mut self, state: &mut PreprocessorState, root: bool) -> String {
        self.output.clear();
        self.root = root;

        if state.error.is_some() {
            return ERROR_SENTINEL.to_string();
        }

        let stripped = match CommentStripper::new(&self.code).strip() {
            Ok(stripped) => stripped,
            Err(err) => {
                if state.error.is_none() {
                    state.error = Some(err);
                }
                return ERROR_SENTINEL.to_string();
            }
        };

        let mut tokenizer = Tokenizer::new(&stripped);
        let mut last_size = 0;

        loop {
            let token = tokenizer.get_token();

            // Newlines consumed inside directives come back here so the
            // output keeps the original line count.
            for generated in tokenizer.take_generated() {
                self.output.push(generated.character);
            }

            let Some(token) = token else {
                break;
            };

            // TODO only recognize directives at the beginning of a line
            if token.character == '#' {
                self.process_directive(&mut tokenizer, state);
            } else {
                if token.character == '\n' {
                    self.expand_output_suffix(last_size, tokenizer.line(), state);
                    last_size = self.output.len();
                }
                self.output.push(token.character);
            }

            if state.error.is_some() {
                return ERROR_SENTINEL.to_string();
            }
        }

        self.expand_output_suffix(last_size, tokenizer.line(), state);
        if state.error.is_some() {
            return ERROR_SENTINEL.to_string();
        }

        if self.root && state.condition_depth != 0 {
            state.set_error(ErrorKind::UnterminatedConditional, tokenizer.line());
            return ERROR_SENTINEL.to_string();
        }

        self.output.iter().collect()
    }

    /// Re-expand the unexpanded output suffix accumulated since the last
    /// completed line.
    fn expand_output_suffix(&mut self, start: usize, line: usize, state: &mut PreprocessorState) {
        let text: String = self.output[start..].iter().collect();

        // The tokenizer already sits on the next line.
        let expanded = expand::expand_macros(&text, line.saturating_sub(1), state);

        self.output.truncate(start);
        self.push_str(&expanded);
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.output.extend(text.chars());
    }

    fn process_directive(&mut self, tokenizer: &mut Tokenizer, state: &mut PreprocessorState) {
        let directive = tokenizer.get_identifier();

        match directive.as_str() {
            "if" => self.process_if(tokenizer, state),
            "ifdef" => self.process_ifdef(tokenizer, state),
            "else" => self.process_else(tokenizer, state),
            "endif" => self.process_endif(tokenizer, state),
            "define" => self.process_define(tokenizer, state),
            "undef" => self.process_undef(tokenizer, state),
            "include" => self.process_include(tokenizer, state),
            _ => state.set_error(ErrorKind::UnknownDirective, tokenizer.line()),
        }
    }

    fn process_if(&mut self, tokenizer: &mut Tokenizer, state: &mut PreprocessorState) {
        let line = tokenizer.line();

        let body = tokens_to_string(&tokenizer.advance('\n'));
        let body = body.trim();
        if body.is_empty() {
            state.set_error(ErrorKind::MissingCondition, line);
            return;
        }

        let body = expand::expand_macros(body, line, state);
        if state.error.is_some() {
            return;
        }

        // The condition must come out as a boolean constant.
        let value = eval::evaluate(&body);
        let success = match value {
            Some(0) => false,
            Some(1) => true,
            _ => {
                state.set_error(ErrorKind::InvalidCondition, line);
                return;
            }
        };
        self.start_branch_condition(tokenizer, state, success);
    }

    fn process_ifdef(&mut self, tokenizer: &mut Tokenizer, state: &mut PreprocessorState) {
        let line = tokenizer.line();

        let label = tokenizer.get_identifier();
        if label.is_empty() {
            state.set_error(ErrorKind::InvalidMacroName, line);
            return;
        }

        tokenizer.skip_whitespace();
        if tokenizer.peek() != Some('\n') {
            state.set_error(ErrorKind::InvalidIfdef, line);
            return;
        }
        tokenizer.advance('\n');

        let success = state.is_defined(&label);
        self.start_branch_condition(tokenizer, state, success);
    }

    /// Open an `#if`/`#ifdef` block. When the condition fails, scan ahead
    /// for the sibling `#else`/`#endif` and resume right before it; the
    /// directive itself is then processed normally by the main loop.
    fn start_branch_condition(
        &mut self,
        tokenizer: &mut Tokenizer,
        state: &mut PreprocessorState,
        success: bool,
    ) {
        state.condition_depth += 1;

        if success {
            state.skip_stack_else.push(true);
        } else {
            match self.next_directive(tokenizer, state, &["else", "endif"]) {
                Some(directive) if directive == "else" => state.skip_stack_else.push(false),
                Some(_) => state.skip_stack_else.push(true),
                None => {} // error already recorded
            }
        }
    }

    fn process_else(&mut self, tokenizer: &mut Tokenizer, state: &mut PreprocessorState) {
        if state.skip_stack_else.is_empty() {
            state.set_error(ErrorKind::UnmatchedElse, tokenizer.line());
            return;
        }
        tokenizer.advance('\n');

        let skip = state.skip_stack_else.pop().unwrap_or(false);
        if skip {
            self.next_directive(tokenizer, state, &["endif"]);
        }
    }

    fn process_endif(&mut self, tokenizer: &mut Tokenizer, state: &mut PreprocessorState) {
        state.condition_depth -= 1;
        if state.condition_depth < 0 {
            state.set_error(ErrorKind::UnmatchedEndif, tokenizer.line());
            return;
        }
        tokenizer.advance('\n');
    }

    fn process_define(&mut self, tokenizer: &mut Tokenizer, state: &mut PreprocessorState) {
        let line = tokenizer.line();

        let label = tokenizer.get_identifier();
        if label.is_empty() {
            state.set_error(ErrorKind::InvalidMacroName, line);
            return;
        }

        if state.is_defined(&label) {
            state.set_error(ErrorKind::MacroRedefinition, line);
            return;
        }

        if tokenizer.peek() == Some('(') {
            // Parameterized macro.
            tokenizer.get_token();

            let mut parameters = Vec::new();
            loop {
                let name = tokenizer.get_identifier();
                if name.is_empty() {
                    state.set_error(ErrorKind::InvalidArgumentName, line);
                    return;
                }
                parameters.push(name);

                tokenizer.skip_whitespace();
                match tokenizer.get_token().map(|t| t.character) {
                    Some(')') => break,
                    Some(',') => {}
                    _ => {
                        state.set_error(ErrorKind::ExpectedComma, line);
                        return;
                    }
                }
            }

            let body = tokens_to_string(&tokenizer.advance('\n'));
            log::debug!("define {label}({}) = {:?}", parameters.join(","), body.trim());
            state.macros.insert(
                label,
                MacroDefinition {
                    parameters,
                    body: body.trim().to_string(),
                },
            );
        } else {
            // Plain substitution macro.
            let body = tokens_to_string(&tokenizer.advance('\n'));
            state.define(&label, body.trim());
        }
    }

    fn process_undef(&mut self, tokenizer: &mut Tokenizer, state: &mut PreprocessorState) {
        let line = tokenizer.line();

        let label = tokenizer.get_identifier();
        if label.is_empty() {
            state.set_error(ErrorKind::InvalidMacroName, line);
            return;
        }

        tokenizer.skip_whitespace();
        if tokenizer.peek() != Some('\n') {
            state.set_error(ErrorKind::InvalidUndef, line);
            return;
        }

        state.undef(&label);
    }

    /// Scan forward for the next sibling directive out of `directives`,
    /// ignoring the contents of nested `#if`/`#ifdef` blocks. Leaves the
    /// cursor on the `#` of the found directive and returns its name.
    fn next_directive(
        &mut self,
        tokenizer: &mut Tokenizer,
        state: &mut PreprocessorState,
        directives: &[&str],
    ) -> Option<String> {
        let line = tokenizer.line();
        let mut nesting = 0i32;

        loop {
            if tokenizer.advance('#').is_empty() {
                break;
            }

            let id = tokenizer.peek_identifier();
            if id.is_empty() {
                break;
            }

            if nesting == 0 && directives.contains(&id.as_str()) {
                tokenizer.backtrack('#');
                return Some(id);
            }

            if id == "ifdef" || id == "if" {
                nesting += 1;
            } else if id == "endif" {
                nesting -= 1;
            }
        }

        state.set_error(ErrorKind::MissingBranchDirective, line);
        None
    }
}
