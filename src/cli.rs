use crate::api::client::AnalyticsClient;
use crate::api::types::SortMode;
use crate::backend::{self, BackendCommand, BackendResponse};
use crate::browser::expansion::{ExpansionSet, GroupKey};
use crate::browser::query::{EmailQueryState, FetchKey};
use crate::browser::render;
use crate::config::Config;
use crate::dashboard::{Dashboard, DashboardRequest};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::time::Instant;

struct CliState {
    cmd_tx: mpsc::Sender<BackendCommand>,
    resp_rx: mpsc::Receiver<BackendResponse>,
    base_url: String,
    dashboard: Dashboard,
    query: EmailQueryState,
    expansion: ExpansionSet,
}

impl CliState {
    fn send_cmd(&self, cmd: BackendCommand) -> Result<(), String> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| "backend channel closed".to_string())
    }

    fn recv_resp(&self) -> Result<BackendResponse, String> {
        self.resp_rx
            .recv()
            .map_err(|_| "backend channel closed".to_string())
    }

    fn run_dashboard_request(&mut self, request: DashboardRequest) -> Result<(), String> {
        let cmd = match request {
            DashboardRequest::LoadAnalytics => BackendCommand::FetchAnalytics,
            DashboardRequest::Sync => BackendCommand::Sync,
        };
        self.send_cmd(cmd)?;
        match self.recv_resp()? {
            BackendResponse::Analytics(result) => {
                self.dashboard.on_analytics(result);
                Ok(())
            }
            BackendResponse::Synced(result) => match self.dashboard.on_sync_result(result) {
                Some(next) => self.run_dashboard_request(next),
                None => Ok(()),
            },
            BackendResponse::Emails { .. } => Err("unexpected response from backend".to_string()),
        }
    }

    fn fetch_emails(&mut self, key: FetchKey) -> Result<(), String> {
        self.send_cmd(BackendCommand::QueryEmails { key })?;
        match self.recv_resp()? {
            BackendResponse::Emails { key, result } => {
                self.query.apply_result(&key, result);
                Ok(())
            }
            _ => Err("unexpected response from backend".to_string()),
        }
    }

    /// Fetch if the fetch key changed since the last request.
    fn fetch_if_changed(&mut self) -> Result<(), String> {
        match self.query.poll_fetch() {
            Some(key) => self.fetch_emails(key),
            None => Ok(()),
        }
    }
}

fn ok_response(data: Value) -> Value {
    let mut obj = match data {
        Value::Object(m) => m,
        _ => {
            let mut m = serde_json::Map::new();
            m.insert("data".to_string(), data);
            m
        }
    };
    obj.insert("ok".to_string(), Value::Bool(true));
    Value::Object(obj)
}

fn err_response(msg: &str) -> Value {
    json!({"ok": false, "error": msg})
}

fn serialize_table(state: &CliState) -> Value {
    let table = render::render(
        state.query.results_sort(),
        state.query.results(),
        &state.expansion,
    );
    let rows: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            json!({
                "kind": row.kind(),
                "cells": row.cells(),
                "group": row.group_key().map(|k| json!({"kind": k.kind(), "key": k.value()})),
            })
        })
        .collect();

    let mut payload = json!({
        "headers": table.headers,
        "row_count": rows.len(),
        "rows": rows,
        "page": state.query.page(),
        "total_pages": state.query.total_pages(),
        "total": state.query.total(),
        "pagination": state.query.pagination_label(),
        "sort_by": state.query.results_sort().as_param(),
        "loading": state.query.is_loading(),
    });
    match state.query.error() {
        Some(err) => {
            payload["ok"] = json!(false);
            payload["error"] = json!(err);
            payload
        }
        None => ok_response(payload),
    }
}

fn serialize_dashboard(dashboard: &Dashboard) -> Value {
    let payload = json!({
        "analytics": dashboard.visible_analytics(),
        "can_sync": dashboard.can_sync(),
        "sync_message": dashboard.last_sync_message(),
    });
    match dashboard.error() {
        Some(err) => {
            let mut payload = payload;
            payload["ok"] = json!(false);
            payload["error"] = json!(err);
            payload
        }
        None => ok_response(payload),
    }
}

fn dispatch(state: &mut CliState, input: &Value) -> Value {
    let command = match input.get("command").and_then(|v| v.as_str()) {
        Some(c) => c,
        None => return err_response("missing 'command' field"),
    };

    match command {
        "status" => cmd_status(state),
        "analytics" => cmd_analytics(state),
        "sync" => cmd_sync(state),
        "query" => cmd_query(state, input),
        "next_page" => cmd_page(state, true),
        "prev_page" => cmd_page(state, false),
        "refresh" => cmd_refresh(state),
        "toggle" => cmd_toggle(state, input),
        "render" => serialize_table(state),
        _ => err_response(&format!("unknown command '{}'", command)),
    }
}

// --- Command handlers ---

fn cmd_status(state: &CliState) -> Value {
    ok_response(json!({
        "base_url": state.base_url,
        "page": state.query.page(),
        "sort_by": state.query.sort().as_param(),
        "search": state.query.debounced_search(),
        "after_date": state.query.after_date(),
        "expanded_groups": state.expansion.len(),
        "syncing": state.dashboard.is_busy(),
    }))
}

fn cmd_analytics(state: &mut CliState) -> Value {
    let request = state.dashboard.mount();
    if let Err(e) = state.run_dashboard_request(request) {
        return err_response(&e);
    }
    serialize_dashboard(&state.dashboard)
}

fn cmd_sync(state: &mut CliState) -> Value {
    let Some(request) = state.dashboard.begin_sync() else {
        return err_response("sync already in progress");
    };
    if let Err(e) = state.run_dashboard_request(request) {
        return err_response(&e);
    }
    serialize_dashboard(&state.dashboard)
}

fn cmd_query(state: &mut CliState, input: &Value) -> Value {
    if let Some(sort) = input.get("sort_by").and_then(|v| v.as_str()) {
        match SortMode::from_param(sort) {
            Some(mode) => state.query.set_sort(mode),
            None => return err_response(&format!("unknown sort_by '{}'", sort)),
        }
    }
    if let Some(page) = input.get("page").and_then(|v| v.as_u64()) {
        state.query.set_page(page.min(u32::MAX as u64) as u32);
    }
    if let Some(after) = input.get("after_date") {
        let after = after.as_str().unwrap_or("");
        if let Err(e) = state.query.set_after_date(after) {
            return err_response(&e);
        }
    }
    if let Some(search) = input.get("search") {
        // One-shot commands have no keystrokes to coalesce; let the edit settle at once.
        let now = Instant::now();
        state
            .query
            .set_search_input(search.as_str().unwrap_or(""), now);
        state.query.tick(now + state.query.debounce_delay());
    }

    if let Err(e) = state.fetch_if_changed() {
        return err_response(&e);
    }
    serialize_table(state)
}

fn cmd_page(state: &mut CliState, forward: bool) -> Value {
    let moved = if forward {
        state.query.next_page()
    } else {
        state.query.prev_page()
    };
    if !moved {
        return err_response(if forward {
            "already on the last page"
        } else {
            "already on the first page"
        });
    }
    if let Err(e) = state.fetch_if_changed() {
        return err_response(&e);
    }
    serialize_table(state)
}

fn cmd_refresh(state: &mut CliState) -> Value {
    let key = state.query.refresh();
    if let Err(e) = state.fetch_emails(key) {
        return err_response(&e);
    }
    serialize_table(state)
}

fn cmd_toggle(state: &mut CliState, input: &Value) -> Value {
    let kind = input.get("kind").and_then(|v| v.as_str()).unwrap_or("");
    let value = match input.get("key").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err_response("missing 'key' field"),
    };
    let key = match GroupKey::parse(kind, value) {
        Some(k) => k,
        None => return err_response("'kind' must be 'sender' or 'domain'"),
    };
    let expanded = state.expansion.toggle(&key);
    let mut resp = serialize_table(state);
    resp["expanded"] = json!(expanded);
    resp
}

pub fn run_cli(client: AnalyticsClient, config: &Config) {
    let base_url = client.base_url().to_string();
    let (cmd_tx, resp_rx) = backend::spawn(client);

    let mut state = CliState {
        cmd_tx,
        resp_rx,
        base_url,
        dashboard: Dashboard::new(),
        query: EmailQueryState::new(config.ui.debounce),
        expansion: ExpansionSet::new(),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(trimmed) {
            Ok(input) => dispatch(&mut state, &input),
            Err(e) => err_response(&format!("JSON parse error: {}", e)),
        };
        let _ = serde_json::to_writer(&mut stdout, &response);
        let _ = stdout.write_all(b"\n");
        let _ = stdout.flush();
    }

    let _ = state.cmd_tx.send(BackendCommand::Shutdown);
}

pub fn print_help_cli() {
    print!(
        r#"mailstat --cli: JSON-over-stdin/stdout mode
===========================================

Protocol: Newline-Delimited JSON (NDJSON)
- Send one JSON object per line to stdin
- Receive one JSON response per line from stdout
- Responses have {{"ok": true, ...}} on success or {{"ok": false, "error": "..."}} on failure

Dashboard
---------
analytics: Load the analytics summary.
   > {{"command": "analytics"}}
   < {{"ok": true, "analytics": {{"top_senders": [...], "top_domains": [...]}}, "can_sync": true, "sync_message": null}}

sync: Trigger backend ingestion, then reload analytics.
   > {{"command": "sync"}}
   < {{"ok": true, "analytics": {{...}}, "can_sync": true, "sync_message": "Processed 12 new messages"}}
   On failure the analytics are withheld: {{"ok": false, "error": "...", "analytics": null, "can_sync": true}}

Email Browser
-------------
query: Update any of the query parameters, fetch if they changed, and render.
   > {{"command": "query", "sort_by": "date", "search": "invoice", "after_date": "2024-01-01", "page": 1}}
   sort_by: domain_frequency (default) | sender_frequency | date
   after_date: YYYY-MM-DD, or "" to clear. search: "" clears.
   Changing filters does not reset the page.
   < {{"ok": true, "headers": [...], "rows": [{{"kind": "email", "cells": [...], "group": null}}],
       "row_count": 2, "page": 1, "total_pages": 1, "total": 2,
       "pagination": "Showing 1 to 2 of 2 results", "sort_by": "date", "loading": false}}
   A failed fetch keeps the previous rows and reports {{"ok": false, "error": "..."}} alongside them.

next_page / prev_page: Move one page and fetch.
   > {{"command": "next_page"}}

refresh: Re-fetch the current page.
   > {{"command": "refresh"}}

toggle: Expand or collapse a group (persists across pages and refreshes).
   > {{"command": "toggle", "kind": "domain", "key": "example.com"}}
   < {{"ok": true, "expanded": true, "rows": [...], ...}}

render: Render the current rows without fetching.
   > {{"command": "render"}}

status: Current query parameters.
   > {{"command": "status"}}
   < {{"ok": true, "base_url": "...", "page": 1, "sort_by": "domain_frequency", "search": "", "after_date": null, "expanded_groups": 0, "syncing": false}}
"#
    );
}
