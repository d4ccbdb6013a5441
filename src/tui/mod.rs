pub mod input;
pub mod screen;
pub mod views;

use crate::api::client::AnalyticsClient;
use crate::backend::{self, BackendCommand};
use crate::config::Config;
use input::read_key;
use screen::Terminal;
use std::io;
use std::time::Instant;
use views::dashboard::DashboardView;
use views::{ViewAction, ViewStack};

pub fn run(client: AnalyticsClient, config: &Config) -> io::Result<()> {
    let base_url = client.base_url().to_string();
    let (cmd_tx, resp_rx) = backend::spawn(client);
    let mut term = Terminal::new(config.ui.mouse)?;

    let dashboard = DashboardView::new(
        cmd_tx.clone(),
        base_url,
        config.ui.debounce,
        config.ui.chart_entries,
    );
    let mut stack = ViewStack::new(Box::new(dashboard));

    stack.render_current(&mut term)?;

    loop {
        let mut needs_render = term.check_resize();

        while let Ok(response) = resp_rx.try_recv() {
            if stack.handle_response(&response) {
                needs_render = true;
            }
        }

        if stack.tick(Instant::now()) {
            needs_render = true;
        }

        if needs_render {
            stack.render_current(&mut term)?;
        }

        // Blocks for at most the terminal read timeout.
        let Some(key) = read_key() else {
            continue;
        };
        let action = match stack.handle_key(key, Instant::now(), term.rows) {
            Some(action) => action,
            None => break,
        };

        match action {
            ViewAction::Continue => {}
            ViewAction::Push(view) => stack.push(view),
            ViewAction::Pop => {
                if !stack.pop() {
                    break;
                }
            }
            ViewAction::Quit => break,
        }
        stack.render_current(&mut term)?;
    }

    let _ = cmd_tx.send(BackendCommand::Shutdown);

    Ok(())
}
