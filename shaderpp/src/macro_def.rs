/// A `#define` entry in the macro table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MacroDefinition {
    /// Formal parameter names, in declaration order. Empty for plain
    /// substitution macros.
    pub parameters: Vec<String>,
    /// Replacement text, stored with surrounding whitespace trimmed.
    pub body: String,
}

impl MacroDefinition {
    /// A plain substitution macro.
    pub fn plain<S: Into<String>>(body: S) -> Self {
        MacroDefinition {
            parameters: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether this macro takes arguments.
    #[must_use]
    pub fn is_parameterized(&self) -> bool {
        !self.parameters.is_empty()
    }
}
