use crate::backend::{BackendCommand, BackendResponse};
use crate::browser::expansion::ExpansionSet;
use crate::browser::query::EmailQueryState;
use crate::browser::render::{self, Row, Table};
use crate::tui::input::Key;
use crate::tui::screen::Terminal;
use crate::tui::views::help::HelpView;
use crate::tui::views::{fit_column, View, ViewAction};
use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

const TABLE_TOP: u16 = 6;

enum InputMode {
    Normal,
    Search,
    AfterDate(String),
}

pub struct EmailBrowserView {
    cmd_tx: mpsc::Sender<BackendCommand>,
    query: EmailQueryState,
    expansion: ExpansionSet,
    mode: InputMode,
    cursor: usize,
    date_error: Option<String>,
}

impl EmailBrowserView {
    pub fn new(cmd_tx: mpsc::Sender<BackendCommand>, debounce: Duration) -> Self {
        let mut view = EmailBrowserView {
            cmd_tx,
            query: EmailQueryState::new(debounce),
            expansion: ExpansionSet::new(),
            mode: InputMode::Normal,
            cursor: 0,
            date_error: None,
        };
        view.dispatch_fetch();
        view
    }

    /// Send a fetch if the fetch key changed since the last request.
    fn dispatch_fetch(&mut self) {
        if let Some(key) = self.query.poll_fetch() {
            let _ = self.cmd_tx.send(BackendCommand::QueryEmails { key });
        }
    }

    fn table(&self) -> Table<'_> {
        render::render(
            self.query.results_sort(),
            self.query.results(),
            &self.expansion,
        )
    }

    fn row_count(&self) -> usize {
        self.table().rows.len()
    }

    fn clamp_cursor(&mut self) {
        let count = self.row_count();
        if self.cursor >= count {
            self.cursor = count.saturating_sub(1);
        }
    }

    fn toggle_at(&mut self, index: usize) {
        let key = self
            .table()
            .rows
            .get(index)
            .and_then(|row| row.group_key().cloned());
        if let Some(key) = key {
            self.expansion.toggle(&key);
            // Keep the cursor on the group header after collapsing from a member row.
            let header = self.table().rows.iter().position(|row| {
                matches!(row, Row::GroupHeader { .. }) && row.group_key() == Some(&key)
            });
            if let Some(pos) = header {
                if index > pos && !self.expansion.is_expanded(&key) {
                    self.cursor = pos;
                }
            }
            self.clamp_cursor();
        }
    }

    fn scroll_offset(&self, visible: usize) -> usize {
        if visible == 0 || self.cursor < visible {
            0
        } else {
            self.cursor - visible + 1
        }
    }

    fn controls_line(&self) -> String {
        let mut search = match self.mode {
            InputMode::Search => format!("[{}_]", self.query.search_input()),
            _ => format!("[{}]", self.query.search_input()),
        };
        if self.query.search_pending() {
            search.push('~');
        }
        let after = match &self.mode {
            InputMode::AfterDate(buf) => format!("[{}_]", buf),
            _ => format!("[{}]", self.query.after_date().unwrap_or("")),
        };
        format!(
            "Search: {}  After: {}  Sort: {}",
            search,
            after,
            self.query.sort().label()
        )
    }

    fn handle_search_key(&mut self, key: Key, now: Instant) {
        match key {
            Key::Enter | Key::Escape => self.mode = InputMode::Normal,
            Key::Backspace => self.query.pop_search_char(now),
            Key::Ctrl('u') => self.query.set_search_input("", now),
            Key::Char(c) => self.query.push_search_char(c, now),
            _ => {}
        }
    }

    fn handle_date_key(&mut self, key: Key) {
        let InputMode::AfterDate(buf) = &mut self.mode else {
            return;
        };
        match key {
            Key::Char(c) if c.is_ascii_digit() || c == '-' => buf.push(c),
            Key::Backspace => {
                buf.pop();
            }
            Key::Ctrl('u') => buf.clear(),
            Key::Enter => {
                let input = buf.clone();
                self.mode = InputMode::Normal;
                match self.query.set_after_date(&input) {
                    Ok(()) => self.date_error = None,
                    Err(e) => self.date_error = Some(e),
                }
            }
            Key::Escape => self.mode = InputMode::Normal,
            _ => {}
        }
    }
}

/// Column widths for `ncols` columns across `width` terminal cells.
fn column_widths(ncols: usize, width: usize) -> Vec<usize> {
    let gaps = ncols.saturating_sub(1);
    let usable = width.saturating_sub(gaps);
    if ncols == 5 {
        let sender = (usable / 4).max(8);
        let fixed = sender + 11 + 11 + 24;
        vec![sender, usable.saturating_sub(fixed).max(8), 11, 11, 24]
    } else {
        let fixed = 8 + 24;
        vec![usable.saturating_sub(fixed).max(10), 8, 24]
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| fit_column(cell, *w))
        .collect::<Vec<_>>()
        .join(" ")
}

impl View for EmailBrowserView {
    fn render(&self, term: &mut Terminal) -> io::Result<()> {
        term.clear()?;

        term.move_to(1, 1)?;
        term.set_bold()?;
        term.write_truncated("Emails", term.cols)?;
        term.reset_attr()?;

        term.move_to(2, 1)?;
        term.write_truncated(&self.controls_line(), term.cols)?;

        term.move_to(3, 1)?;
        if let Some(err) = self.date_error.as_deref().or(self.query.error()) {
            term.set_error()?;
            term.write_truncated(err, term.cols)?;
            term.reset_attr()?;
        } else if self.query.is_loading() {
            term.write_truncated("Loading...", term.cols)?;
        } else {
            term.write_truncated(&self.query.pagination_label(), term.cols)?;
        }

        let table = self.table();
        let widths = column_widths(table.headers.len(), term.cols as usize);
        let header_cells: Vec<String> = table.headers.iter().map(|h| h.to_string()).collect();

        term.move_to(4, 1)?;
        term.set_bold()?;
        term.write_truncated(&format_row(&header_cells, &widths), term.cols)?;
        term.reset_attr()?;

        term.move_to(5, 1)?;
        term.write_str(&"-".repeat(term.cols as usize))?;

        if table.rows.is_empty() && !self.query.is_loading() {
            term.move_to(TABLE_TOP, 1)?;
            term.write_truncated("No emails.", term.cols)?;
        }

        let visible = (term.rows as usize).saturating_sub(TABLE_TOP as usize);
        let offset = self.scroll_offset(visible);
        for (i, row) in table.rows.iter().enumerate().skip(offset).take(visible) {
            term.move_to(TABLE_TOP + (i - offset) as u16, 1)?;
            if i == self.cursor {
                term.set_reverse()?;
            }
            if matches!(row, Row::GroupHeader { .. }) {
                term.set_bold()?;
            }
            term.write_truncated(&format_row(&row.cells(), &widths), term.cols)?;
            term.reset_attr()?;
        }

        let status = match self.mode {
            InputMode::Search => " Search: type to filter | RET/ESC:done C-u:clear".to_string(),
            InputMode::AfterDate(_) => " After date (YYYY-MM-DD, empty clears) | RET:apply ESC:cancel".to_string(),
            InputMode::Normal => format!(
                " Page {}/{} | q:back n/p:page /:search a:after s:sort RET:expand g:refresh",
                self.query.page(),
                self.query.total_pages()
            ),
        };
        term.write_bar(term.rows, &status)?;

        term.flush()
    }

    fn handle_key(&mut self, key: Key, now: Instant, term_rows: u16) -> ViewAction {
        match self.mode {
            InputMode::Search => {
                self.handle_search_key(key, now);
                self.dispatch_fetch();
                return ViewAction::Continue;
            }
            InputMode::AfterDate(_) => {
                self.handle_date_key(key);
                self.dispatch_fetch();
                return ViewAction::Continue;
            }
            InputMode::Normal => {}
        }

        let page = (term_rows as usize).saturating_sub(TABLE_TOP as usize).max(1);
        let action = match key {
            Key::Char('q') | Key::Escape => ViewAction::Pop,
            Key::Char('/') => {
                self.mode = InputMode::Search;
                ViewAction::Continue
            }
            Key::Char('a') => {
                let current = self.query.after_date().unwrap_or("").to_string();
                self.mode = InputMode::AfterDate(current);
                ViewAction::Continue
            }
            Key::Char('s') => {
                self.query.cycle_sort();
                ViewAction::Continue
            }
            Key::Char('n') | Key::Right => {
                if self.query.next_page() {
                    self.cursor = 0;
                }
                ViewAction::Continue
            }
            Key::Char('p') | Key::Left => {
                if self.query.prev_page() {
                    self.cursor = 0;
                }
                ViewAction::Continue
            }
            Key::Char('j') | Key::Down | Key::ScrollDown => {
                if self.cursor + 1 < self.row_count() {
                    self.cursor += 1;
                }
                ViewAction::Continue
            }
            Key::Char('k') | Key::Up | Key::ScrollUp => {
                self.cursor = self.cursor.saturating_sub(1);
                ViewAction::Continue
            }
            Key::PageDown => {
                self.cursor += page;
                self.clamp_cursor();
                ViewAction::Continue
            }
            Key::PageUp => {
                self.cursor = self.cursor.saturating_sub(page);
                ViewAction::Continue
            }
            Key::Home => {
                self.cursor = 0;
                ViewAction::Continue
            }
            Key::End => {
                self.cursor = self.row_count().saturating_sub(1);
                ViewAction::Continue
            }
            Key::Enter | Key::Char(' ') => {
                self.toggle_at(self.cursor);
                ViewAction::Continue
            }
            Key::MouseClick { row, .. } if row >= TABLE_TOP => {
                let visible = (term_rows as usize).saturating_sub(TABLE_TOP as usize);
                let index = self.scroll_offset(visible) + (row - TABLE_TOP) as usize;
                if index < self.row_count() {
                    self.cursor = index;
                    self.toggle_at(index);
                }
                ViewAction::Continue
            }
            Key::Char('g') => {
                let key = self.query.refresh();
                let _ = self.cmd_tx.send(BackendCommand::QueryEmails { key });
                ViewAction::Continue
            }
            Key::Char('?') => ViewAction::Push(Box::new(HelpView::new())),
            _ => ViewAction::Continue,
        };
        self.dispatch_fetch();
        action
    }

    fn on_response(&mut self, response: &BackendResponse) -> bool {
        match response {
            BackendResponse::Emails { key, result } => {
                let applied = self.query.apply_result(key, result.clone());
                if applied {
                    self.clamp_cursor();
                }
                applied
            }
            _ => false,
        }
    }

    fn on_tick(&mut self, now: Instant) -> bool {
        if self.query.tick(now) {
            self.dispatch_fetch();
            return true;
        }
        false
    }

    fn on_close(&mut self) {
        self.query.cancel_pending_search();
    }
}
