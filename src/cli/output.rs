//! Shared CLI output helpers.
//!
//! Color scheme (respects NO_COLOR):
//! - Green: success, added entries
//! - Red: errors, removed entries
//! - Yellow: warnings, renamed entries
//! - Blue: edited entries
//! - Cyan: keys, hints
//! - Dim: secondary info

use console::{style, StyledObject};

const RULE_WIDTH: usize = 56;

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// Style `value`, or leave it plain when colors are off.
pub fn styled<D>(value: D) -> StyledObject<D> {
    let s = style(value);
    if colors_enabled() {
        s
    } else {
        s.force_styling(false)
    }
}

/// Print a success message with checkmark.
pub fn success(msg: &str) {
    println!("{} {}", styled("✓").green(), msg);
}

/// Print an error message to stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", styled("✗").red(), msg);
}

/// Print a warning message.
pub fn warn(msg: &str) {
    println!("{} {}", styled("⚠").yellow(), msg);
}

/// Print a hint to stderr.
///
/// Example: `→ run: kvt contexts`
pub fn hint(msg: &str) {
    eprintln!("{} {}", styled("→").cyan(), styled(msg).cyan());
}

/// Print a bold section header.
pub fn header(title: &str) {
    println!("{}", styled(title).bold());
}

/// Print a horizontal rule.
pub fn rule() {
    println!("{}", styled("─".repeat(RULE_WIDTH)).dim());
}

/// Format a secret key for inline use.
pub fn key(k: &str) -> String {
    styled(k).cyan().to_string()
}

/// Format secondary text for inline use.
pub fn dim(text: &str) -> String {
    styled(text).dim().to_string()
}
