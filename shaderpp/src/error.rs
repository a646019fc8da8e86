use thiserror::Error;

/// A preprocessing error anchored to a source line.
///
/// Lines are 1-based; line 0 means the location could not be determined.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} (line {line})")]
pub struct PreprocessError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// 1-based line in the translation unit the error belongs to.
    pub line: usize,
}

impl PreprocessError {
    /// Build an error from a 0-based tokenizer line.
    pub(crate) fn at(kind: ErrorKind, zero_based_line: usize) -> Self {
        PreprocessError {
            kind,
            line: zero_based_line + 1,
        }
    }
}

/// The kinds of errors the preprocessor can report.
///
/// Every variant maps to one of the failure modes of comment stripping,
/// directive processing, macro expansion or include resolution. The first
/// error recorded in a run wins; later ones are discarded.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A `/* */` comment was opened but never closed, or closed twice.
    #[error("block comment mismatch")]
    BlockCommentMismatch,
    /// A `#` directive whose name is not part of the shader language.
    #[error("unknown directive")]
    UnknownDirective,
    /// `#if` with nothing after it.
    #[error("missing condition")]
    MissingCondition,
    /// The `#if` condition did not evaluate to a boolean constant.
    #[error("condition evaluation error")]
    InvalidCondition,
    /// `#define`/`#ifdef`/`#undef` name is not a valid identifier.
    #[error("invalid macro name")]
    InvalidMacroName,
    /// `#define` of a name that already has a definition.
    #[error("macro redefinition")]
    MacroRedefinition,
    /// A `#define` parameter is not a valid identifier.
    #[error("invalid argument name")]
    InvalidArgumentName,
    /// Malformed `#define` parameter list.
    #[error("expected a comma in the macro argument list")]
    ExpectedComma,
    /// Trailing junk after the `#ifdef` name.
    #[error("invalid ifdef")]
    InvalidIfdef,
    /// Trailing junk after the `#undef` name.
    #[error("invalid undef")]
    InvalidUndef,
    /// `#else` without an open `#if`/`#ifdef`.
    #[error("unmatched else")]
    UnmatchedElse,
    /// `#endif` without an open `#if`/`#ifdef`.
    #[error("unmatched endif")]
    UnmatchedEndif,
    /// An `#if`/`#ifdef` was still open at the end of the root unit.
    #[error("unterminated conditional")]
    UnterminatedConditional,
    /// A skipped branch has no matching `#else`/`#endif` before the end.
    #[error("can't find matching branch directive")]
    MissingBranchDirective,
    /// A parameterized macro use without a parenthesized argument list.
    #[error("missing macro argument parenthesis")]
    MissingArgumentParen,
    /// A macro invocation with the wrong number of arguments.
    #[error("invalid macro argument count")]
    ArgumentCountMismatch,
    /// The fixpoint expansion loop exceeded its pass limit, which almost
    /// always means a self-referential macro such as `#define X X`.
    #[error("macro expansion pass limit exceeded")]
    ExpansionLimitExceeded,
    /// `#include` path is missing, unquoted or followed by junk.
    #[error("invalid include path")]
    InvalidIncludePath,
    /// The loader could not resolve the include path.
    #[error("shader include load failed")]
    IncludeLoadFailed,
    /// The loader resolved the path to something that is not a shader.
    #[error("shader include resource type is wrong")]
    WrongResourceType,
    /// The included shader has no code.
    #[error("shader include is empty")]
    EmptyInclude,
    /// The included shader has no `shader_type ...;` declaration.
    #[error("shader include shader_type not found")]
    MissingShaderType,
    /// The include chain went deeper than the configured ceiling.
    #[error("shader max include depth exceeded")]
    MaxIncludeDepth,
}
