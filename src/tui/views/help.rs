use crate::backend::BackendResponse;
use crate::tui::input::Key;
use crate::tui::screen::Terminal;
use crate::tui::views::{View, ViewAction};
use std::io;
use std::time::Instant;

const HELP_TEXT: &str = "\
mailstat - Email Analytics
==========================

Dashboard
---------
  q           Quit
  s           Sync emails (disabled while a sync is running)
  g           Reload analytics (not while a sync is running)
  e/Enter     Open the email browser
  j/k         Scroll charts
  ?           Show this help

Email Browser
-------------
  q/Escape    Back to dashboard
  j/k/Up/Down Move cursor
  n/Right     Next page
  p/Left      Previous page
  /           Edit search (applied 500ms after the last keystroke)
  a           Set received-after date (YYYY-MM-DD, empty clears)
  s           Cycle sort: Domain, Sender, Date
  Enter/Space Expand or collapse the group under the cursor
  Click       Select a row and expand or collapse its group
  g           Refresh current page
  PgDn/PgUp   Move cursor by a screen
  Home/End    Jump to first/last row

Search / Date Input
-------------------
  Enter       Finish editing
  Escape      Finish editing (date input: discard)
  Backspace   Delete last character
  Ctrl-u      Clear input
";

pub struct HelpView {
    lines: Vec<&'static str>,
    scroll: usize,
}

impl HelpView {
    pub fn new() -> Self {
        HelpView {
            lines: HELP_TEXT.lines().collect(),
            scroll: 0,
        }
    }
}

impl View for HelpView {
    fn render(&self, term: &mut Terminal) -> io::Result<()> {
        term.clear()?;

        let visible_rows = (term.rows as usize).saturating_sub(1);
        for (i, line) in self.lines.iter().skip(self.scroll).take(visible_rows).enumerate() {
            term.move_to(1 + i as u16, 1)?;
            let is_header = !line.is_empty()
                && !line.starts_with(' ')
                && !line.starts_with('-')
                && !line.starts_with('=');
            if is_header {
                term.set_bold()?;
            }
            term.write_truncated(line, term.cols)?;
            term.reset_attr()?;
        }

        let status = format!(
            " Help | line {}/{} | q:close j:down k:up",
            self.scroll + 1,
            self.lines.len()
        );
        term.write_bar(term.rows, &status)?;

        term.flush()
    }

    fn handle_key(&mut self, key: Key, _now: Instant, term_rows: u16) -> ViewAction {
        let last = self.lines.len().saturating_sub(1);
        let page = (term_rows as usize).saturating_sub(1);
        match key {
            Key::Char('q') | Key::Char('?') | Key::Escape => return ViewAction::Pop,
            Key::Char('j') | Key::Down | Key::ScrollDown => self.scroll = (self.scroll + 1).min(last),
            Key::Char('k') | Key::Up | Key::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            Key::PageDown | Key::Char(' ') => self.scroll = (self.scroll + page).min(last),
            Key::PageUp => self.scroll = self.scroll.saturating_sub(page),
            Key::Home => self.scroll = 0,
            Key::End => self.scroll = last,
            _ => {}
        }
        ViewAction::Continue
    }

    fn on_response(&mut self, _response: &BackendResponse) -> bool {
        false
    }
}
