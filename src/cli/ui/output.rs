use console::style;

/// Status lines for humans. Everything goes to stderr so stdout stays
/// clean for diagram text and JSON.
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", style("✓").green(), message);
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        eprintln!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        eprintln!("\n{}", style(message).bold());
        eprintln!("{}", "─".repeat(40));
    }

    /// `label: value` with the label dimmed
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        eprintln!("  {:<12} {}", style(label).dim(), value);
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
