use crate::backend::{BackendCommand, BackendResponse};
use crate::chart;
use crate::dashboard::{Dashboard, DashboardRequest};
use crate::tui::input::Key;
use crate::tui::screen::Terminal;
use crate::tui::views::email_browser::EmailBrowserView;
use crate::tui::views::help::HelpView;
use crate::tui::views::{View, ViewAction};
use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

pub struct DashboardView {
    cmd_tx: mpsc::Sender<BackendCommand>,
    state: Dashboard,
    base_url: String,
    debounce: Duration,
    chart_entries: usize,
    scroll: usize,
}

impl DashboardView {
    pub fn new(
        cmd_tx: mpsc::Sender<BackendCommand>,
        base_url: String,
        debounce: Duration,
        chart_entries: usize,
    ) -> Self {
        let mut view = DashboardView {
            cmd_tx,
            state: Dashboard::new(),
            base_url,
            debounce,
            chart_entries,
            scroll: 0,
        };
        let request = view.state.mount();
        view.dispatch(request);
        view
    }

    fn dispatch(&self, request: DashboardRequest) {
        let cmd = match request {
            DashboardRequest::LoadAnalytics => BackendCommand::FetchAnalytics,
            DashboardRequest::Sync => BackendCommand::Sync,
        };
        let _ = self.cmd_tx.send(cmd);
    }

    fn chart_lines(&self, width: usize) -> Vec<String> {
        let Some(analytics) = self.state.visible_analytics() else {
            return Vec::new();
        };
        let mut lines = chart::bar_chart(
            "Top Email Senders",
            &chart::sender_entries(analytics),
            width,
            self.chart_entries,
        );
        lines.push(String::new());
        lines.extend(chart::bar_chart(
            "Top Email Domains",
            &chart::domain_entries(analytics),
            width,
            self.chart_entries,
        ));
        lines
    }
}

impl View for DashboardView {
    fn render(&self, term: &mut Terminal) -> io::Result<()> {
        term.clear()?;

        term.move_to(1, 1)?;
        term.set_bold()?;
        let title = format!("mailstat - Email Analytics ({})", self.base_url);
        term.write_truncated(&title, term.cols)?;
        term.reset_attr()?;

        term.move_to(2, 1)?;
        let sync_label = if self.state.is_busy() {
            "[ Syncing... ]"
        } else {
            "[ s: Sync Emails ]"
        };
        if self.state.is_busy() {
            term.set_dim()?;
        }
        term.write_truncated(sync_label, term.cols)?;
        term.reset_attr()?;

        term.move_to(3, 1)?;
        term.write_str(&"-".repeat(term.cols as usize))?;

        if let Some(err) = self.state.error() {
            term.move_to(4, 1)?;
            term.set_error()?;
            term.write_truncated(&format!("Error: {}", err), term.cols)?;
            term.reset_attr()?;
        } else {
            let lines = self.chart_lines(term.cols as usize);
            let max_items = (term.rows as usize).saturating_sub(4);
            if lines.is_empty() {
                term.move_to(4, 1)?;
                term.write_truncated("Loading analytics...", term.cols)?;
            }
            for (i, line) in lines.iter().skip(self.scroll).take(max_items).enumerate() {
                term.move_to(4 + i as u16, 1)?;
                let is_title = !line.starts_with(' ') && !line.starts_with('=');
                if is_title {
                    term.set_bold()?;
                }
                term.write_truncated(line, term.cols)?;
                term.reset_attr()?;
            }
        }

        let status = match self.state.last_sync_message() {
            Some(msg) => format!(" {} | q:quit s:sync e:emails g:reload ?:help", msg),
            None => " q:quit s:sync e:emails g:reload ?:help".to_string(),
        };
        term.write_bar(term.rows, &status)?;

        term.flush()
    }

    fn handle_key(&mut self, key: Key, _now: Instant, term_rows: u16) -> ViewAction {
        let page = (term_rows as usize).saturating_sub(4);
        match key {
            Key::Char('q') => ViewAction::Quit,
            Key::Char('s') => {
                if let Some(request) = self.state.begin_sync() {
                    log_info!("[Dashboard] sync requested");
                    self.dispatch(request);
                }
                ViewAction::Continue
            }
            Key::Char('g') => {
                if let Some(request) = self.state.reload() {
                    self.dispatch(request);
                }
                ViewAction::Continue
            }
            Key::Char('e') | Key::Enter => {
                let view = EmailBrowserView::new(self.cmd_tx.clone(), self.debounce);
                ViewAction::Push(Box::new(view))
            }
            Key::Char('?') => ViewAction::Push(Box::new(HelpView::new())),
            Key::Char('j') | Key::Down | Key::ScrollDown => {
                self.scroll += 1;
                ViewAction::Continue
            }
            Key::Char('k') | Key::Up | Key::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(1);
                ViewAction::Continue
            }
            Key::PageDown => {
                self.scroll += page;
                ViewAction::Continue
            }
            Key::PageUp => {
                self.scroll = self.scroll.saturating_sub(page);
                ViewAction::Continue
            }
            Key::Home => {
                self.scroll = 0;
                ViewAction::Continue
            }
            _ => ViewAction::Continue,
        }
    }

    fn on_response(&mut self, response: &BackendResponse) -> bool {
        match response {
            BackendResponse::Analytics(result) => {
                self.state.on_analytics(result.clone());
                let total_lines = self.chart_lines(80).len();
                self.scroll = self.scroll.min(total_lines.saturating_sub(1));
                true
            }
            BackendResponse::Synced(result) => {
                if let Some(request) = self.state.on_sync_result(result.clone()) {
                    self.dispatch(request);
                }
                true
            }
            BackendResponse::Emails { .. } => false,
        }
    }
}
