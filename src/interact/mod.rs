//! Methods for user input and interaction.
//!
//! Color helpers, a y/n confirmation prompt, and terminal selection menus.
//! The prompt logic is written over generic readers and writers so it can be
//! exercised without a terminal; only [`single_choice`] and [`multi_choice`]
//! need a real TTY.

mod menu;

pub use menu::{Menu, MenuOutcome};

use crate::error::{ToolsError, ToolsResult};
use colored::Colorize;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{read, Event, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use std::io::{BufRead, Write};

/// Wrap an input string so that it prints with blue coloring escape codes.
pub fn blue(msg: &str) -> String {
    msg.blue().to_string()
}

/// Wrap an input string so that it prints with red coloring escape codes.
pub fn red(msg: &str) -> String {
    msg.red().to_string()
}

/// Wrap an input string so that it prints with yellow coloring escape codes.
pub fn yellow(msg: &str) -> String {
    msg.yellow().to_string()
}

/// Wrap an input string so that it prints with bold red coloring escape codes.
pub fn bold_red(msg: &str) -> String {
    msg.red().bold().to_string()
}

/// Get confirmation from the user regarding a message on stdin/stdout.
///
/// With `silent` set, input is skipped and the answer is yes.
pub fn confirm(msg: &str, yes_is_default: bool, silent: bool) -> ToolsResult<bool> {
    if silent {
        return Ok(true);
    }
    let stdin = std::io::stdin();
    confirm_from(&mut stdin.lock(), &mut std::io::stdout(), msg, yes_is_default)
}

/// [`confirm`] over explicit reader and writer, for non-terminal callers.
///
/// Re-prompts on anything other than `y`, `n`, or an empty line (which picks
/// the default).
pub fn confirm_from<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    msg: &str,
    yes_is_default: bool,
) -> ToolsResult<bool> {
    let options = if yes_is_default { "(Y/n)" } else { "(y/N)" };
    let default = if yes_is_default { "y" } else { "n" };

    loop {
        write!(output, "{msg} {options} ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(ToolsError::interrupted("input closed during confirmation"));
        }

        let mut response = line.trim().to_lowercase();
        if response.is_empty() {
            response = default.to_string();
        }

        match response.as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            other => writeln!(output, "Incorrect response '{other}'")?,
        }
    }
}

/// Prompt the user with a visual menu and return the single item they choose.
///
/// `trim_suffix`, when given, is removed from the end of the selected choice.
/// Useful when choices are decorated, e.g. the top entry carries a
/// `" (latest)"` marker that callers are not interested in.
pub fn single_choice(
    choices: Vec<String>,
    prompt: &str,
    indicator: &str,
    trim_suffix: Option<&str>,
) -> ToolsResult<String> {
    let mut menu = Menu::new(choices, prompt, indicator)?;
    let indices = run_menu(&mut menu)?;
    let selected = menu.resolve(&indices).remove(0);
    Ok(match trim_suffix {
        Some(suffix) => selected.strip_suffix(suffix).unwrap_or(&selected).to_string(),
        None => selected,
    })
}

/// Prompt the user with a menu and return the (potentially multiple) items they choose.
///
/// At least one selection is required to submit.
pub fn multi_choice(
    choices: Vec<String>,
    prompt: &str,
    indicator: &str,
) -> ToolsResult<Vec<String>> {
    let mut menu = Menu::new(choices, prompt, indicator)?.multiselect(1);
    let indices = run_menu(&mut menu)?;
    Ok(menu.resolve(&indices))
}

/// Restores the terminal when dropped, so an early return or panic cannot
/// leave raw mode enabled.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> ToolsResult<Self> {
        enable_raw_mode()?;
        execute!(std::io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(std::io::stdout(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

fn run_menu(menu: &mut Menu) -> ToolsResult<Vec<usize>> {
    let _guard = TerminalGuard::enter()?;
    let mut stdout = std::io::stdout();

    loop {
        queue!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        for (row, line) in menu.render_lines().iter().enumerate() {
            queue!(stdout, MoveTo(0, row as u16))?;
            write!(stdout, "{line}")?;
        }
        stdout.flush()?;

        let event = read()?;
        let Event::Key(key) = event else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match menu.handle_key(&key) {
            MenuOutcome::Pending => {}
            MenuOutcome::Submitted(indices) => return Ok(indices),
            MenuOutcome::Aborted => {
                return Err(ToolsError::interrupted("selection menu aborted"))
            }
        }
    }
}
