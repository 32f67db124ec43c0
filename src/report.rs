//! Pass/fail ledger and run summary
//!
//! The reporter is handed through the scenario by `&mut` reference; there is
//! no process-wide ledger. One check name maps to exactly one recorded
//! outcome, so the summary reads one-to-one with the human-readable names.

use colored::Colorize;

/// Ordered ledgers of check outcomes
#[derive(Debug, Default)]
pub struct Reporter {
    passed: Vec<String>,
    failed: Vec<String>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a passing check and print its progress line
    pub fn ok(&mut self, name: &str, detail: &str) {
        if detail.is_empty() {
            println!("  {} {}", "✓".green(), name);
        } else {
            println!("  {} {}  {}", "✓".green(), name, detail.dimmed());
        }
        self.passed.push(name.to_string());
    }

    /// Record a failing check and print its progress line
    pub fn fail(&mut self, name: &str, reason: &str) {
        println!("  {} {}  {}", "✗".red(), name, reason.red());
        self.failed.push(name.to_string());
    }

    pub fn passed(&self) -> &[String] {
        &self.passed
    }

    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    /// Print the final summary and yield whether everything passed
    pub fn summary(&self) -> bool {
        let total = self.passed.len() + self.failed.len();
        println!("\n{}", "=".repeat(50));
        println!("Results: {}/{} passed", self.passed.len(), total);

        if self.failed.is_empty() {
            println!("{}", "All checks passed".green().bold());
        } else {
            println!("{}", "Failed:".red().bold());
            for name in &self.failed {
                println!("  - {name}");
            }
        }

        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledgers_keep_order() {
        let mut report = Reporter::new();
        report.ok("first", "");
        report.fail("second", "boom");
        report.ok("third", "detail");

        assert_eq!(report.passed(), ["first", "third"]);
        assert_eq!(report.failed(), ["second"]);
        assert!(!report.summary());
    }

    #[test]
    fn test_all_passed() {
        let mut report = Reporter::new();
        report.ok("only", "");
        assert!(report.summary());
    }
}
