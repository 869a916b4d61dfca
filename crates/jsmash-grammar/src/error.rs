//! Generation-time errors.

use jsmash_core::ChoiceError;
use thiserror::Error;

use crate::grammar::Category;

/// Errors that can occur while generating text.
///
/// All of them are contract violations in a generator or in the grammar
/// tables. None are recoverable: a session that hits one stops, since
/// carrying on would break reproducibility.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GrammarError {
    /// A fragment passed to the token assembler was not text.
    #[error("fragment {index} passed to cat is not text")]
    NonTextFragment { index: usize },

    /// A weighted or uniform selection was malformed.
    #[error("invalid choice: {0}")]
    Choice(#[from] ChoiceError),

    /// A category table has no productions at all.
    #[error("category {category} has no productions")]
    EmptyCategory { category: Category },

    /// A category table has no terminal production to fall back on.
    #[error("category {category} has no terminal production")]
    NoTerminal { category: Category },

    /// The generator registry is empty.
    #[error("generator registry is empty")]
    EmptyRegistry,

    /// Two registry entries share a name.
    #[error("generator {name} registered twice")]
    DuplicateGenerator { name: String },

    /// Generation was started with a negative depth budget.
    #[error("negative starting depth {depth}")]
    NegativeDepth { depth: i32 },

    /// An option is outside its valid range.
    #[error("invalid option {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

/// Result type for generators.
pub type GeneratorResult<T> = std::result::Result<T, GrammarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_error_converts() {
        let err: GrammarError = ChoiceError::EmptySet.into();
        assert!(matches!(err, GrammarError::Choice(ChoiceError::EmptySet)));
        assert!(err.to_string().contains("empty set"));
    }

    #[test]
    fn test_display_names_category() {
        let err = GrammarError::NoTerminal {
            category: Category::LValue,
        };
        assert_eq!(err.to_string(), "category lvalue has no terminal production");
    }
}
