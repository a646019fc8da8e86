//! Word-boundary macro substitution.
//!
//! Expansion runs once per physical output line. A single pass scans the
//! macro table and substitutes each matched name; the outer loop repeats
//! passes until a pass substitutes nothing, so macros that expand into
//! other macro invocations resolve fully. The loop is bounded by the
//! configured pass limit, which turns self-referential macros like
//! `#define X X` into a structured error instead of a hang.

use std::collections::BTreeMap;

use log::trace;

use crate::error::ErrorKind;
use crate::macro_def::MacroDefinition;
use crate::state::PreprocessorState;
use crate::token::is_identifier_continue;

/// Placeholder returned once an error is recorded; never compiled.
pub(crate) const ERROR_SENTINEL: &str = "<error>";

/// Expand `line` to a fixpoint. On failure the error is recorded in
/// `state` at `line_number` (0-based) and the sentinel is returned.
pub(crate) fn expand_macros(
    line: &str,
    line_number: usize,
    state: &mut PreprocessorState,
) -> String {
    let mut result = line.to_string();

    for pass in 0..state.expansion_pass_limit {
        match expand_macros_once(&result, &state.macros) {
            Ok((next, true)) => {
                trace!("expansion pass {pass}: {result:?} -> {next:?}");
                result = next;
            }
            Ok((next, false)) => return next,
            Err(kind) => {
                state.set_error(kind, line_number);
                return ERROR_SENTINEL.to_string();
            }
        }
    }

    state.set_error(ErrorKind::ExpansionLimitExceeded, line_number);
    ERROR_SENTINEL.to_string()
}

/// One substitution pass over every macro in the table, visited in name
/// order. Returns the new text and whether anything was substituted.
fn expand_macros_once(
    line: &str,
    macros: &BTreeMap<String, MacroDefinition>,
) -> Result<(String, bool), ErrorKind> {
    let mut result = line.to_string();
    let mut expanded = false;

    for (name, define) in macros {
        let Some((start, end)) = find_word(&result, name) else {
            continue;
        };

        if define.is_parameterized() {
            // The argument list must open directly after the name.
            if result[end..].chars().next() != Some('(') {
                return Err(ErrorKind::MissingArgumentParen);
            }
            let Some(close) = find_closing_paren(&result, end) else {
                return Err(ErrorKind::MissingArgumentParen);
            };

            let args = split_arguments(&result[end + 1..close]);
            if args.len() != define.parameters.len() {
                return Err(ErrorKind::ArgumentCountMismatch);
            }

            let mut body = define.body.clone();
            for (parameter, arg) in define.parameters.iter().zip(&args) {
                body = replace_word_all(&body, parameter, arg);
            }

            result = format!("{} {} {}", &result[..start], body, &result[close + 1..]);
        } else {
            result = replace_word_all(&result, name, &define.body);
        }

        expanded = true;
    }

    Ok((result, expanded))
}

/// Find `word` in `text` at an identifier boundary. Byte offsets of the
/// match start and end, or `None`.
pub(crate) fn find_word(text: &str, word: &str) -> Option<(usize, usize)> {
    if word.is_empty() {
        return None;
    }

    let mut from = 0;
    while let Some(pos) = text[from..].find(word) {
        let start = from + pos;
        let end = start + word.len();

        let before_ok = !text[..start]
            .chars()
            .next_back()
            .is_some_and(is_identifier_continue);
        let after_ok = !text[end..].chars().next().is_some_and(is_identifier_continue);

        if before_ok && after_ok {
            return Some((start, end));
        }

        from = start + text[start..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Replace every boundary-safe occurrence of `word`. The replacement text
/// is never rescanned, so a body that mentions its own name terminates.
pub(crate) fn replace_word_all(text: &str, word: &str, replacement: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some((start, end)) = find_word(rest, word) {
        result.push_str(&rest[..start]);
        result.push_str(replacement);
        rest = &rest[end..];
    }
    result.push_str(rest);
    result
}

/// Byte offset of the parenthesis closing the one at `open`, honoring
/// nesting.
fn find_closing_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split an argument list on top-level commas, trimming each argument.
fn split_arguments(inner: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in inner.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    args.push(current.trim().to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreprocessorConfig;

    fn state_with(defines: &[(&str, &[&str], &str)]) -> PreprocessorState {
        let mut state = PreprocessorState::from_config(&PreprocessorConfig::runtime());
        for (name, parameters, body) in defines {
            state.macros.insert(
                (*name).to_string(),
                MacroDefinition {
                    parameters: parameters.iter().map(|p| (*p).to_string()).collect(),
                    body: (*body).to_string(),
                },
            );
        }
        state
    }

    #[test]
    fn line_without_macros_is_unchanged() {
        let mut state = state_with(&[]);
        assert_eq!(expand_macros("vec3 color;", 0, &mut state), "vec3 color;");
        assert!(state.error().is_none());
    }

    #[test]
    fn word_boundary_prevents_substring_expansion() {
        let mut state = state_with(&[("FOO", &[], "1")]);
        assert_eq!(expand_macros("FOOBAR", 0, &mut state), "FOOBAR");
        assert_eq!(expand_macros("x = FOO;", 0, &mut state), "x = 1;");
    }

    #[test]
    fn parameterized_substitution() {
        let mut state = state_with(&[("ADD", &["a", "b"], "(a+b)")]);
        let out = expand_macros("ADD(1,2)", 0, &mut state);
        assert!(out.contains("(1+2)"), "got {out:?}");
    }

    #[test]
    fn nested_parentheses_in_arguments() {
        let mut state = state_with(&[("ADD", &["a", "b"], "(a+b)")]);
        let out = expand_macros("ADD(f(1,2),3)", 0, &mut state);
        assert!(out.contains("(f(1,2)+3)"), "got {out:?}");
    }

    #[test]
    fn chained_expansion_reaches_fixpoint() {
        let mut state = state_with(&[("A", &[], "B"), ("B", &[], "2")]);
        assert_eq!(expand_macros("x = A;", 0, &mut state), "x = 2;");
    }

    #[test]
    fn argument_count_mismatch_is_an_error() {
        let mut state = state_with(&[("ADD", &["a", "b"], "(a+b)")]);
        let out = expand_macros("ADD(1)", 3, &mut state);
        assert_eq!(out, ERROR_SENTINEL);
        let err = state.error().cloned();
        assert_eq!(
            err.map(|e| (e.kind, e.line)),
            Some((ErrorKind::ArgumentCountMismatch, 4))
        );
    }

    #[test]
    fn missing_parenthesis_is_an_error() {
        let mut state = state_with(&[("ADD", &["a", "b"], "(a+b)")]);
        expand_macros("ADD(1,2", 0, &mut state);
        assert_eq!(
            state.error().map(|e| e.kind.clone()),
            Some(ErrorKind::MissingArgumentParen)
        );
    }

    #[test]
    fn self_referential_macro_hits_the_pass_limit() {
        let mut state = state_with(&[("X", &[], "X")]);
        let out = expand_macros("X", 0, &mut state);
        assert_eq!(out, ERROR_SENTINEL);
        assert_eq!(
            state.error().map(|e| e.kind.clone()),
            Some(ErrorKind::ExpansionLimitExceeded)
        );
    }

    #[test]
    fn error_selection_follows_name_order() {
        // Two different defective invocations on one line; the macro
        // first in name order decides which error is reported, every run.
        let defines: &[(&str, &[&str], &str)] =
            &[("ALPHA", &["x"], "x"), ("BETA", &["y"], "y")];
        for _ in 0..16 {
            let mut state = state_with(defines);
            let out = expand_macros("ALPHA(1,2); BETA;", 0, &mut state);
            assert_eq!(out, ERROR_SENTINEL);
            assert_eq!(
                state.error().map(|e| e.kind.clone()),
                Some(ErrorKind::ArgumentCountMismatch)
            );
        }
    }

    #[test]
    fn split_arguments_handles_nesting_and_trim() {
        assert_eq!(split_arguments("1, f(a, b) , 3"), vec!["1", "f(a, b)", "3"]);
        assert_eq!(split_arguments(""), vec![""]);
    }

    #[test]
    fn find_word_respects_boundaries() {
        assert_eq!(find_word("xFOO FOOy FOO", "FOO"), Some((10, 13)));
        assert_eq!(find_word("FOO_BAR", "FOO"), None);
    }
}
