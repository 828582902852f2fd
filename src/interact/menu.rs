//! Selection menu state machine.
//!
//! [`Menu`] holds the cursor, selection set, and rendering for a choice list.
//! It consumes key events and reports an outcome; the terminal loop that
//! feeds it lives in the parent module, so everything here is testable
//! without a TTY.

use crate::error::{ToolsError, ToolsResult};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Result of feeding one key event to a [`Menu`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuOutcome {
    /// Keep the menu open
    Pending,
    /// The user submitted; indices of the chosen entries
    Submitted(Vec<usize>),
    /// The user aborted with Esc or Ctrl-C
    Aborted,
}

/// Interactive choice menu state.
#[derive(Debug, Clone)]
pub struct Menu {
    choices: Vec<String>,
    prompt: String,
    indicator: String,
    cursor: usize,
    multiselect: bool,
    min_selection: usize,
    selected: Vec<bool>,
}

impl Menu {
    /// Create a single-choice menu over the given entries.
    pub fn new(choices: Vec<String>, prompt: &str, indicator: &str) -> ToolsResult<Self> {
        if choices.is_empty() {
            return Err(ToolsError::interrupted("no choices to present"));
        }
        let selected = vec![false; choices.len()];
        Ok(Self {
            choices,
            prompt: prompt.to_string(),
            indicator: indicator.to_string(),
            cursor: 0,
            multiselect: false,
            min_selection: 0,
            selected,
        })
    }

    /// Allow multiple selections, requiring at least `min` on submit.
    pub fn multiselect(mut self, min: usize) -> Self {
        self.multiselect = true;
        self.min_selection = min;
        self
    }

    /// Index the cursor currently rests on.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor up, wrapping to the bottom.
    pub fn move_up(&mut self) {
        self.cursor = if self.cursor == 0 { self.choices.len() - 1 } else { self.cursor - 1 };
    }

    /// Move the cursor down, wrapping to the top.
    pub fn move_down(&mut self) {
        self.cursor = (self.cursor + 1) % self.choices.len();
    }

    /// Toggle selection of the entry under the cursor (multi-select only).
    pub fn toggle(&mut self) {
        if self.multiselect {
            self.selected[self.cursor] = !self.selected[self.cursor];
        }
    }

    fn chosen(&self) -> Vec<usize> {
        if self.multiselect {
            (0..self.choices.len()).filter(|&i| self.selected[i]).collect()
        } else {
            vec![self.cursor]
        }
    }

    /// Process one key event and report the menu's outcome.
    pub fn handle_key(&mut self, event: &KeyEvent) -> MenuOutcome {
        match (event.code, event.modifiers) {
            (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => MenuOutcome::Aborted,
            (KeyCode::Esc, _) => MenuOutcome::Aborted,
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => {
                self.move_up();
                MenuOutcome::Pending
            }
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => {
                self.move_down();
                MenuOutcome::Pending
            }
            (KeyCode::Char(' '), _) => {
                self.toggle();
                MenuOutcome::Pending
            }
            (KeyCode::Enter, _) => {
                let chosen = self.chosen();
                if self.multiselect && chosen.len() < self.min_selection {
                    return MenuOutcome::Pending;
                }
                MenuOutcome::Submitted(chosen)
            }
            _ => MenuOutcome::Pending,
        }
    }

    /// Render the prompt and entries as display lines.
    pub fn render_lines(&self) -> Vec<String> {
        let pad = " ".repeat(self.indicator.chars().count());
        let mut lines = vec![self.prompt.clone()];
        for (i, choice) in self.choices.iter().enumerate() {
            let lead = if i == self.cursor { &self.indicator } else { &pad };
            if self.multiselect {
                let mark = if self.selected[i] { "[x]" } else { "[ ]" };
                lines.push(format!("{lead} {mark} {choice}"));
            } else {
                lines.push(format!("{lead} {choice}"));
            }
        }
        lines
    }

    /// Map chosen indices back to owned choice strings.
    pub fn resolve(&self, indices: &[usize]) -> Vec<String> {
        indices.iter().map(|&i| self.choices[i].clone()).collect()
    }
}
