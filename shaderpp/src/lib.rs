#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # Shader Source Preprocessor
//!
//! This library preprocesses shader source text before it is handed to a
//! shader compiler front end: it strips C-like comments, runs
//! `#if`/`#ifdef`/`#else`/`#endif` conditional compilation, substitutes
//! `#define` macros (plain and parameterized) and resolves `#include`
//! directives through a pluggable loader.
//!
//! Output line numbers match the input: comment bodies keep their
//! newlines, directive lines collapse to blank lines and included files
//! are flattened onto the `#include` line. Diagnostics are structured
//! `{kind, line}` records; the first error aborts the run.
//!
//! ## Example
//!
//! ```
//! use shaderpp::{preprocess, PreprocessorConfig};
//!
//! let source = "#define SCALE 2\nx = SCALE;\n";
//! let output = preprocess(source, &PreprocessorConfig::editor())?;
//! assert!(output.contains("x = 2;"));
//! # Ok::<(), shaderpp::PreprocessError>(())
//! ```
//!
//! Includes go through a [`ShaderLoader`] callback; the library never
//! touches storage itself. Included files must start with a
//! `shader_type ...;` declaration, which is stripped before splicing.

mod comment;
mod config;
mod error;
mod eval;
mod expand;
mod include;
mod macro_def;
mod preprocessor;
mod state;
mod token;

pub use config::{LoadError, LoadedShader, PreprocessorConfig, ShaderLoader};
pub use error::{ErrorKind, PreprocessError};
pub use macro_def::MacroDefinition;
pub use preprocessor::Preprocessor;
pub use state::PreprocessorState;

/// Directive keywords exposed for syntax-highlighting collaborators.
///
/// `if` and `else` are shader-language keywords already and are not
/// repeated here.
pub const DIRECTIVE_KEYWORDS: [&str; 5] = ["include", "define", "undef", "ifdef", "endif"];

/// Preprocess shader source with the given configuration.
///
/// Convenience wrapper that builds a fresh [`PreprocessorState`] (with the
/// built-in platform and `EDITOR` macros) and runs the source as a root
/// translation unit.
///
/// # Errors
/// Returns the first [`PreprocessError`] recorded during the run: lexical,
/// directive-syntax, macro-expansion, structural or include errors, all
/// anchored to a 1-based source line.
pub fn preprocess(code: &str, config: &PreprocessorConfig) -> Result<String, PreprocessError> {
    Preprocessor::new(code).preprocess(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn editor_config_with_files(files: &[(&str, &str)]) -> PreprocessorConfig {
        let files: Vec<(String, String)> = files
            .iter()
            .map(|(p, c)| ((*p).to_string(), (*c).to_string()))
            .collect();
        PreprocessorConfig::editor().with_loader(move |path| {
            files
                .iter()
                .find(|(p, _)| p == path)
                .map(|(p, c)| LoadedShader {
                    code: c.clone(),
                    canonical_path: format!("res://{p}"),
                })
                .ok_or_else(|| LoadError::NotFound(path.to_string()))
        })
    }

    fn run(src: &str) -> String {
        match preprocess(src, &PreprocessorConfig::editor()) {
            Ok(out) => out,
            Err(e) => panic!("unexpected preprocess error: {e}"),
        }
    }

    fn run_err(src: &str) -> PreprocessError {
        match preprocess(src, &PreprocessorConfig::editor()) {
            Ok(out) => panic!("expected an error, got {out:?}"),
            Err(e) => e,
        }
    }

    #[test]
    fn plain_macro_substitution() {
        let out = run("#define PI 3.14\nfloat x = PI;\n");
        assert_eq!(out, "\nfloat x = 3.14;\n");
    }

    #[test]
    fn parameterized_macro_substitution() {
        let out = run("#define ADD(a,b) (a+b)\nint z = ADD(1, 2);\n");
        assert!(out.contains("(1+2)"), "got {out:?}");
    }

    #[test]
    fn substring_of_longer_identifier_is_not_expanded() {
        let out = run("#define FOO 1\nFOOBAR\ny = FOO;\n");
        assert!(out.contains("FOOBAR"));
        assert!(out.contains("y = 1;"));
    }

    #[test]
    fn ifdef_with_undefined_macro_takes_else_branch() {
        let src = "#ifdef X\nA\n#else\nB\n#endif\n";
        let out = run(src);
        assert!(out.contains('B'));
        assert!(!out.contains('A'));
        // Blank lines stand in for everything skipped.
        assert_eq!(out.matches('\n').count(), src.matches('\n').count());
    }

    #[test]
    fn ifdef_with_defined_macro_takes_if_branch() {
        let out = run("#define X 1\n#ifdef X\nA\n#else\nB\n#endif\n");
        assert!(out.contains('A'));
        assert!(!out.contains('B'));
    }

    #[test]
    fn editor_builtin_selects_editor_branch() {
        let src = "#define SCALE 2\n#ifdef EDITOR\nx = SCALE;\n#else\nx = 1;\n#endif\n";
        let out = run(src);
        assert!(out.contains("x = 2;"));
        assert!(!out.contains("x = 1;"));
        assert_eq!(out.matches('\n').count(), src.matches('\n').count());
    }

    #[test]
    fn if_evaluates_arithmetic_conditions() {
        let out = run("#if 1 + 2 == 3\nA\n#else\nB\n#endif\n");
        assert!(out.contains('A'));
        assert!(!out.contains('B'));
    }

    #[test]
    fn if_expands_macros_before_evaluating() {
        let out = run("#define LEVEL 2\n#if LEVEL == 2\nA\n#endif\n");
        assert!(out.contains('A'));
    }

    #[test]
    fn if_editor_builtin_is_true_in_editor_config() {
        let out = run("#if EDITOR\nA\n#else\nB\n#endif\n");
        assert!(out.contains('A'));
    }

    #[test]
    fn if_editor_builtin_is_false_in_runtime_config() {
        let src = "#if EDITOR\nA\n#else\nB\n#endif\n";
        let out = match preprocess(src, &PreprocessorConfig::runtime()) {
            Ok(out) => out,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert!(out.contains('B'));
    }

    #[test]
    fn non_boolean_condition_is_rejected() {
        let err = run_err("#if 5\nA\n#endif\n");
        assert_eq!(err.kind, ErrorKind::InvalidCondition);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn missing_condition_is_rejected() {
        let err = run_err("#if\nA\n#endif\n");
        assert_eq!(err.kind, ErrorKind::MissingCondition);
    }

    #[test]
    fn nested_conditionals_skip_as_a_block() {
        let src = "#ifdef X\n#ifdef Y\nA\n#endif\nB\n#else\nC\n#endif\n";
        let out = run(src);
        assert!(out.contains('C'));
        assert!(!out.contains('A'));
        assert!(!out.contains('B'));
    }

    #[test]
    fn macro_redefinition_errors_at_second_definition() {
        let err = run_err("#define FOO 1\n#define FOO 2\n");
        assert_eq!(err.kind, ErrorKind::MacroRedefinition);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn undef_allows_redefinition() {
        let out = run("#define FOO 1\n#undef FOO\n#define FOO 2\nx = FOO;\n");
        assert!(out.contains("x = 2;"));
    }

    #[test]
    fn undefined_macro_is_left_alone_after_undef() {
        let out = run("#define FOO 1\n#undef FOO\nx = FOO;\n");
        assert!(out.contains("x = FOO;"));
    }

    #[test]
    fn unknown_directive_is_an_error() {
        let err = run_err("#version 450\n");
        assert_eq!(err.kind, ErrorKind::UnknownDirective);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn unmatched_endif_is_an_error() {
        let err = run_err("#endif\n");
        assert_eq!(err.kind, ErrorKind::UnmatchedEndif);
    }

    #[test]
    fn unmatched_else_is_an_error() {
        let err = run_err("#else\n");
        assert_eq!(err.kind, ErrorKind::UnmatchedElse);
    }

    #[test]
    fn unterminated_conditional_is_an_error() {
        let err = run_err("#ifdef EDITOR\nx;\n");
        assert_eq!(err.kind, ErrorKind::UnterminatedConditional);
    }

    #[test]
    fn skipped_branch_without_endif_is_an_error() {
        let err = run_err("#ifdef X\nA\n");
        assert_eq!(err.kind, ErrorKind::MissingBranchDirective);
    }

    #[test]
    fn argument_count_mismatch_reports_use_site() {
        let err = run_err("#define ADD(a,b) (a+b)\ny = ADD(1);\n");
        assert_eq!(err.kind, ErrorKind::ArgumentCountMismatch);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn comments_are_stripped_with_lines_preserved() {
        let src = "// header\nx = 1; /* mid\nspan */ y = 2;\n";
        let out = run(src);
        assert!(out.contains("x = 1;"));
        assert!(out.contains("y = 2;"));
        assert!(!out.contains("header"));
        assert_eq!(out.matches('\n').count(), src.matches('\n').count());
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = run_err("x;\n/* open\n");
        assert_eq!(err.kind, ErrorKind::BlockCommentMismatch);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn include_makes_macros_visible_to_the_parent() {
        let config = editor_config_with_files(&[(
            "inc.glsl",
            "shader_type spatial;\n#define FOO 42\n",
        )]);
        let out = match preprocess("#include \"inc.glsl\"\nx = FOO;\n", &config) {
            Ok(out) => out,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert!(out.contains("x = 42;"));
    }

    #[test]
    fn diamond_include_is_spliced_once() {
        let config = editor_config_with_files(&[(
            "common.glsl",
            "shader_type spatial;const int K = 7;\n",
        )]);
        let src = "#include \"common.glsl\"\n#include \"common.glsl\"\ny;\n";
        let out = match preprocess(src, &config) {
            Ok(out) => out,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(out.matches("const int K = 7;").count(), 1);
        assert!(out.contains("y;"));
    }

    #[test]
    fn included_file_is_flattened_to_one_line() {
        let config = editor_config_with_files(&[(
            "multi.glsl",
            "shader_type spatial;\nA;\nB;\n",
        )]);
        let src = "#include \"multi.glsl\"\nafter;\n";
        let out = match preprocess(src, &config) {
            Ok(out) => out,
            Err(e) => panic!("unexpected error: {e}"),
        };
        // Everything from the include lands before the first newline.
        let first_line = out.split('\n').next().unwrap_or("");
        assert!(first_line.contains("A;"));
        assert!(first_line.contains("B;"));
        assert_eq!(out.matches('\n').count(), src.matches('\n').count());
    }

    #[test]
    fn include_depth_ceiling_is_enforced() {
        let config = PreprocessorConfig::editor().with_loader(|path| {
            let n: usize = path.trim_start_matches("dep").parse().unwrap_or(0);
            Ok(LoadedShader {
                code: format!("shader_type spatial;\n#include \"dep{}\"\n", n + 1),
                canonical_path: format!("res://{path}"),
            })
        });
        let err = match preprocess("#include \"dep0\"\n", &config) {
            Ok(out) => panic!("expected an error, got {out:?}"),
            Err(e) => e,
        };
        assert_eq!(err.kind, ErrorKind::MaxIncludeDepth);
        // Anchored to the root's #include, not a line 25 files deep.
        assert_eq!(err.line, 1);
    }

    #[test]
    fn include_load_failure_is_an_error() {
        let config = editor_config_with_files(&[]);
        let err = match preprocess("#include \"missing.glsl\"\n", &config) {
            Ok(out) => panic!("expected an error, got {out:?}"),
            Err(e) => e,
        };
        assert_eq!(err.kind, ErrorKind::IncludeLoadFailed);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn include_of_non_shader_resource_is_an_error() {
        let config = PreprocessorConfig::editor()
            .with_loader(|path| Err(LoadError::NotAShader(path.to_string())));
        let err = match preprocess("#include \"tex.png\"\n", &config) {
            Ok(out) => panic!("expected an error, got {out:?}"),
            Err(e) => e,
        };
        assert_eq!(err.kind, ErrorKind::WrongResourceType);
    }

    #[test]
    fn include_without_shader_type_is_an_error() {
        let config = editor_config_with_files(&[("bad.glsl", "no type declaration\n")]);
        let err = match preprocess("#include \"bad.glsl\"\n", &config) {
            Ok(out) => panic!("expected an error, got {out:?}"),
            Err(e) => e,
        };
        assert_eq!(err.kind, ErrorKind::MissingShaderType);
    }

    #[test]
    fn empty_include_is_an_error() {
        let config = editor_config_with_files(&[("empty.glsl", "")]);
        let err = match preprocess("#include \"empty.glsl\"\n", &config) {
            Ok(out) => panic!("expected an error, got {out:?}"),
            Err(e) => e,
        };
        assert_eq!(err.kind, ErrorKind::EmptyInclude);
    }

    #[test]
    fn unquoted_include_path_is_an_error() {
        let config = editor_config_with_files(&[]);
        let err = match preprocess("#include abc\n", &config) {
            Ok(out) => panic!("expected an error, got {out:?}"),
            Err(e) => e,
        };
        assert_eq!(err.kind, ErrorKind::InvalidIncludePath);
    }

    #[test]
    fn external_state_carries_macros_between_runs() {
        let mut state = PreprocessorState::from_config(&PreprocessorConfig::editor());
        state.define("FOO", "7");

        let out = match Preprocessor::new("x = FOO;\n#define BAR 2\n").preprocess_with_state(&mut state) {
            Ok(out) => out,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert!(out.contains("x = 7;"));
        assert!(state.is_defined("BAR"));
    }

    #[test]
    fn directive_keywords_for_highlighting() {
        assert_eq!(
            DIRECTIVE_KEYWORDS,
            ["include", "define", "undef", "ifdef", "endif"]
        );
    }
}
