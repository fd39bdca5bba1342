// UI layer: interactive prompts with `dialoguer`, a spinner from `indicatif`
// while a run is in flight, and `crossterm` for styling and key polling.
// Steps only see the `Prompter` trait, so they can be driven by a mock.

use crate::error::CliError;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::style::{style, Stylize};
use crossterm::terminal;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{FuzzySelect, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::time::Duration;

/// Terminal interactions needed by the session steps.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter {
    /// Single choice from `items`. `None` when the user escapes.
    fn select(&self, prompt: &str, items: &[String]) -> Result<Option<usize>, CliError>;
    /// Type-to-filter choice from `items`. `None` when the user escapes.
    fn fuzzy_select(&self, prompt: &str, items: &[String]) -> Result<Option<usize>, CliError>;
    /// Free text; empty input is accepted.
    fn text(&self, prompt: &str) -> Result<String, CliError>;
    fn begin_wait(&self, message: &str);
    /// Non-blocking check for Escape / Ctrl-C while waiting.
    fn cancel_requested(&self) -> bool;
    fn end_wait(&self);
    fn say(&self, speaker: &str, text: &str);
    fn warn(&self, text: &str);
}

/// Prompter backed by the real terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
    spinner: RefCell<Option<ProgressBar>>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        TerminalPrompter {
            theme: ColorfulTheme::default(),
            spinner: RefCell::new(None),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn select(&self, prompt: &str, items: &[String]) -> Result<Option<usize>, CliError> {
        let choice = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_opt()?;
        Ok(choice)
    }

    fn fuzzy_select(&self, prompt: &str, items: &[String]) -> Result<Option<usize>, CliError> {
        let choice = FuzzySelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_opt()?;
        Ok(choice)
    }

    fn text(&self, prompt: &str) -> Result<String, CliError> {
        let value: String = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(value)
    }

    fn begin_wait(&self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("{} (Esc to cancel)", message));
        spinner.enable_steady_tick(Duration::from_millis(100));
        // Raw mode lets Escape and Ctrl-C arrive as key events.
        if let Err(e) = terminal::enable_raw_mode() {
            tracing::debug!(error = %e, "raw mode unavailable, cancel keys disabled");
        }
        *self.spinner.borrow_mut() = Some(spinner);
    }

    fn cancel_requested(&self) -> bool {
        while let Ok(true) = event::poll(Duration::ZERO) {
            match event::read() {
                Ok(Event::Key(key)) if is_cancel_key(&key) => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
        false
    }

    fn end_wait(&self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::debug!(error = %e, "could not leave raw mode");
        }
        if let Some(spinner) = self.spinner.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }

    fn say(&self, speaker: &str, text: &str) {
        println!("{} {}", style(format!("{}:", speaker)).bold().cyan(), text);
    }

    fn warn(&self, text: &str) {
        eprintln!("{} {}", style("warning:").bold().yellow(), text);
    }
}

fn is_cancel_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
