//! UI helpers for CLI display.

use console::{style, StyledObject};

use somqc_core::grade::Letter;

/// Check if color output is disabled via `NO_COLOR` env var.
#[must_use]
pub fn is_color_disabled() -> bool {
    std::env::var("NO_COLOR").is_ok()
}

/// Print a styled header.
pub fn print_header(text: &str) {
    if is_color_disabled() {
        println!("=== {text} ===");
    } else {
        println!("{}", style(format!("=== {text} ===")).bold().cyan());
    }
}

/// Print a success message.
pub fn print_success(text: &str) {
    if is_color_disabled() {
        println!("[OK] {text}");
    } else {
        println!("{} {text}", style("[OK]").green().bold());
    }
}

/// Print a warning message.
pub fn print_warning(text: &str) {
    if is_color_disabled() {
        eprintln!("[WARN] {text}");
    } else {
        eprintln!("{} {text}", style("[WARN]").yellow().bold());
    }
}

/// Print an error message.
pub fn print_error(text: &str) {
    if is_color_disabled() {
        eprintln!("[ERROR] {text}");
    } else {
        eprintln!("{} {text}", style("[ERROR]").red().bold());
    }
}

/// Letter grade colored by severity.
#[must_use]
pub fn styled_grade(letter: Letter) -> StyledObject<&'static str> {
    let styled = style(letter.as_str()).bold();
    if is_color_disabled() {
        return styled;
    }
    match letter {
        Letter::A | Letter::B => styled.green(),
        Letter::C => styled.yellow(),
        Letter::D | Letter::F => styled.red(),
    }
}
