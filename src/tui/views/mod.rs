pub mod dashboard;
pub mod email_browser;
pub mod help;

use super::input::Key;
use super::screen::Terminal;
use crate::backend::BackendResponse;
use std::io;
use std::time::Instant;

pub enum ViewAction {
    Continue,
    Push(Box<dyn View>),
    Pop,
    Quit,
}

pub trait View {
    fn render(&self, term: &mut Terminal) -> io::Result<()>;
    fn handle_key(&mut self, key: Key, now: Instant, term_rows: u16) -> ViewAction;
    /// Handle a response from the backend thread.
    /// Returns true if the view consumed the response and should re-render.
    fn on_response(&mut self, response: &BackendResponse) -> bool;
    /// Advance timers. Returns true if view state changed and should re-render.
    fn on_tick(&mut self, _now: Instant) -> bool {
        false
    }
    /// Called when the view is popped off the stack.
    fn on_close(&mut self) {}
}

pub struct ViewStack {
    views: Vec<Box<dyn View>>,
}

impl ViewStack {
    pub fn new(initial: Box<dyn View>) -> Self {
        ViewStack {
            views: vec![initial],
        }
    }

    pub fn render_current(&self, term: &mut Terminal) -> io::Result<()> {
        if let Some(view) = self.views.last() {
            view.render(term)?;
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: Key, now: Instant, term_rows: u16) -> Option<ViewAction> {
        self.views
            .last_mut()
            .map(|view| view.handle_key(key, now, term_rows))
    }

    /// Route a backend response to all views (top-most can trigger re-render).
    pub fn handle_response(&mut self, response: &BackendResponse) -> bool {
        let top = self.views.len().saturating_sub(1);
        let mut needs_render = false;
        for (idx, view) in self.views.iter_mut().enumerate() {
            if view.on_response(response) && idx == top {
                needs_render = true;
            }
        }
        needs_render
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        let top = self.views.len().saturating_sub(1);
        let mut needs_render = false;
        for (idx, view) in self.views.iter_mut().enumerate() {
            if view.on_tick(now) && idx == top {
                needs_render = true;
            }
        }
        needs_render
    }

    pub fn push(&mut self, view: Box<dyn View>) {
        self.views.push(view);
    }

    pub fn pop(&mut self) -> bool {
        if self.views.len() > 1 {
            if let Some(mut view) = self.views.pop() {
                view.on_close();
            }
            true
        } else {
            false
        }
    }
}

/// Pad or cut `s` to exactly `width` characters.
pub fn fit_column(s: &str, width: usize) -> String {
    let cut = crate::chart::truncate_label(s, width);
    let len = cut.chars().count();
    format!("{}{}", cut, " ".repeat(width.saturating_sub(len)))
}
