// UI helpers shared by the commands and the shell: spinners from
// `indicatif`, confirmation prompts from `dialoguer` and a few styled status
// lines. Kept small and synchronous like the rest of the CLI.

use crossterm::style::Stylize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Start a spinner on stderr. Finish it with `finish_and_clear` once the
/// blocking call returns. Nothing is drawn when stderr is not a terminal.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Yes/no prompt defaulting to "no". A failed prompt (no terminal) is a "no".
pub fn confirm(prompt: &str) -> bool {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "!".yellow().bold(), message);
}

/// Print an indented block of follow-up commands.
pub fn next_steps(lines: &[&str]) {
    println!();
    println!("You can now use:");
    for line in lines {
        println!("  {}", line);
    }
}
