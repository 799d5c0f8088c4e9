//! Accumulated, line-numbered error text.

use std::fmt::{self, Write};

/// Error lines gathered during one parse, in the order they were found.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    text: String,
}

impl Diagnostics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record `message` as `At line N: message`.
    pub(crate) fn push(&mut self, line: u64, message: impl fmt::Display) {
        // Writing into a String cannot fail.
        let _ = writeln!(self.text, "At line {line}: {message}");
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub(crate) fn into_string(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::Diagnostics;

    #[test]
    fn lines_accumulate_in_order() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        diagnostics.push(3, "first");
        diagnostics.push(7, format_args!("second {}", 2));
        assert!(!diagnostics.is_empty());
        assert_eq!(
            diagnostics.into_string(),
            "At line 3: first\nAt line 7: second 2\n"
        );
    }
}
