//! Fragments accepted by the token assembler.

/// A piece of generated output handed to [`crate::GenCtx::cat`].
///
/// Only [`Fragment::Text`] is accepted. Lists exist so that a generator
/// returning a structured value instead of text is caught at the assembler
/// rather than silently stringified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Literal text
    Text(String),
    /// A nested sequence, rejected by the assembler
    List(Vec<Fragment>),
}

impl Fragment {
    /// Borrow the text, if this is a text fragment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Fragment::Text(s) => Some(s),
            Fragment::List(_) => None,
        }
    }

    /// True for text fragments.
    pub fn is_text(&self) -> bool {
        matches!(self, Fragment::Text(_))
    }
}

impl From<&str> for Fragment {
    fn from(s: &str) -> Self {
        Fragment::Text(s.to_string())
    }
}

impl From<String> for Fragment {
    fn from(s: String) -> Self {
        Fragment::Text(s)
    }
}

impl From<&String> for Fragment {
    fn from(s: &String) -> Self {
        Fragment::Text(s.clone())
    }
}

impl From<Vec<Fragment>> for Fragment {
    fn from(parts: Vec<Fragment>) -> Self {
        Fragment::List(parts)
    }
}

/// Assemble fragments through a [`crate::GenCtx`].
///
/// Arguments are evaluated left to right before the assembler runs, so the
/// order of draws matches the order of the arguments.
///
/// ```
/// use jsmash_grammar::{cat, Engine, GrammarOptions};
/// use jsmash_core::Mt19937;
///
/// let engine = Engine::new(GrammarOptions::quiet()).unwrap();
/// let mut rng = Mt19937::new(1);
/// let mut ctx = engine.context(&mut rng);
/// assert_eq!(cat!(ctx, "a", String::from("b"), "c").unwrap(), "abc");
/// ```
#[macro_export]
macro_rules! cat {
    ($ctx:expr, $($part:expr),* $(,)?) => {{
        let parts: ::std::vec::Vec<$crate::Fragment> = ::std::vec![$($crate::Fragment::from($part)),*];
        $ctx.cat(parts)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let owned = String::from("b");
        assert_eq!(Fragment::from("a").as_text(), Some("a"));
        assert_eq!(Fragment::from(&owned).as_text(), Some("b"));
        assert!(!Fragment::from(vec![Fragment::from("x")]).is_text());
    }
}
