
use mock_api::MockApiServer;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};

struct CliHarness {
    child: Child,
    stdin: std::process::ChildStdin,
    reader: BufReader<std::process::ChildStdout>,
    server: MockApiServer,
    _config_dir: tempfile::TempDir,
}

impl CliHarness {
    fn start() -> Self {
        Self::start_with_ui_config("")
    }

    fn start_with_ui_config(ui_config: &str) -> Self {
        let server = MockApiServer::start();
        let config_dir = tempfile::tempdir().expect("create temp dir");
        let config_path = config_dir.path().join("config.toml");

        let config_content = format!(
            r#"[api]
base_url = "{}/api"
timeout_secs = 5

[ui]
{}
"#,
            server.url(),
            ui_config
        );
        std::fs::write(&config_path, config_content).expect("write config");

        let bin = env!("CARGO_BIN_EXE_mailstat");
        let mut child = Command::new(bin)
            .arg("--cli")
            .arg(format!("--config={}", config_path.display()))
            .env_remove("MAILSTAT_API_URL")
            .env("MAILSTAT_LOG", config_dir.path().join("mailstat.log"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn mailstat --cli");

        let stdin = child.stdin.take().expect("take stdin");
        let stdout = child.stdout.take().expect("take stdout");
        let reader = BufReader::new(stdout);

        CliHarness {
            child,
            stdin,
            reader,
            server,
            _config_dir: config_dir,
        }
    }

    fn send(&mut self, cmd: Value) -> Value {
        let line = serde_json::to_string(&cmd).expect("serialize command");
        writeln!(self.stdin, "{}", line).expect("write to stdin");
        self.stdin.flush().expect("flush stdin");

        let mut response_line = String::new();
        self.reader
            .read_line(&mut response_line)
            .expect("read response");
        serde_json::from_str(response_line.trim()).expect("parse response JSON")
    }

    fn email_requests(&self) -> Vec<String> {
        self.server
            .requests()
            .into_iter()
            .filter(|r| r.starts_with("GET /api/emails"))
            .collect()
    }
}

impl Drop for CliHarness {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn test_status_defaults() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "status"}));

    assert_eq!(resp["ok"], true);
    assert_eq!(resp["base_url"], format!("{}/api", h.server.url()));
    assert_eq!(resp["page"], 1);
    assert_eq!(resp["sort_by"], "domain_frequency");
    assert_eq!(resp["search"], "");
    assert!(resp["after_date"].is_null());
    assert_eq!(resp["expanded_groups"], 0);
    assert_eq!(resp["syncing"], false);
}

#[test]
fn test_unknown_command() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "bogus"}));
    assert_eq!(resp["ok"], false);
    assert!(resp["error"].as_str().unwrap().contains("unknown command"));

    let resp = h.send(json!({"no_command": true}));
    assert_eq!(resp["ok"], false);
    assert!(resp["error"].as_str().unwrap().contains("missing 'command'"));
}

#[test]
fn test_invalid_json_keeps_session_alive() {
    let mut h = CliHarness::start();
    writeln!(h.stdin, "{{not json").expect("write to stdin");
    h.stdin.flush().expect("flush stdin");
    let mut line = String::new();
    h.reader.read_line(&mut line).expect("read response");
    let resp: Value = serde_json::from_str(line.trim()).expect("parse response JSON");
    assert_eq!(resp["ok"], false);
    assert!(resp["error"].as_str().unwrap().contains("JSON parse error"));

    let resp = h.send(json!({"command": "status"}));
    assert_eq!(resp["ok"], true);
}

#[test]
fn test_analytics_loads() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "analytics"}));

    assert_eq!(resp["ok"], true, "analytics failed: {:?}", resp);
    assert_eq!(resp["can_sync"], true);
    let senders = resp["analytics"]["top_senders"].as_array().expect("top_senders");
    assert_eq!(senders.len(), 2);
    assert_eq!(senders[0]["email"], "news@acme.com");
    assert_eq!(senders[0]["count"], 3);
    let domains = resp["analytics"]["top_domains"].as_array().expect("top_domains");
    assert_eq!(domains[0]["domain"], "acme.com");
    assert_eq!(domains[0]["count"], 5);
}

#[test]
fn test_sync_reloads_analytics() {
    let mut h = CliHarness::start();
    h.send(json!({"command": "analytics"}));
    let resp = h.send(json!({"command": "sync"}));

    assert_eq!(resp["ok"], true, "sync failed: {:?}", resp);
    assert_eq!(resp["sync_message"], "Processed 3 new messages");
    assert_eq!(resp["can_sync"], true);
    assert!(resp["analytics"]["top_domains"].is_array());

    // Sync is followed by exactly one reload, after the sync itself.
    let requests = h.server.requests();
    let sync_pos = requests
        .iter()
        .position(|r| r == "POST /api/sync")
        .expect("sync request");
    let reloads = requests[sync_pos..]
        .iter()
        .filter(|r| r.as_str() == "GET /api/analytics")
        .count();
    assert_eq!(reloads, 1);
}

#[test]
fn test_sync_failure_replaces_charts() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "analytics"}));
    assert_eq!(resp["ok"], true);

    h.server.set_fail_sync(true);
    let resp = h.send(json!({"command": "sync"}));

    assert_eq!(resp["ok"], false);
    assert!(resp["error"].as_str().unwrap().contains("500"));
    assert!(resp["analytics"].is_null());
    assert_eq!(resp["can_sync"], true);

    // A later successful load clears the error.
    h.server.set_fail_sync(false);
    let resp = h.send(json!({"command": "analytics"}));
    assert_eq!(resp["ok"], true);
    assert!(resp["analytics"]["top_senders"].is_array());
}

#[test]
fn test_query_date_mode_with_search() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "query", "sort_by": "date", "search": "invoice"}));

    assert_eq!(resp["ok"], true, "query failed: {:?}", resp);
    assert_eq!(resp["sort_by"], "date");
    assert_eq!(resp["row_count"], 2);
    assert_eq!(resp["total"], 2);
    assert_eq!(resp["total_pages"], 1);
    assert_eq!(resp["pagination"], "Showing 1 to 2 of 2 results");
    assert_eq!(resp["loading"], false);
    assert_eq!(
        resp["headers"],
        json!(["Sender", "Subject", "From Sender", "From Domain", "Date"])
    );

    let rows = resp["rows"].as_array().unwrap();
    assert_eq!(rows[0]["kind"], "email");
    assert!(rows[0]["group"].is_null());
    assert_eq!(rows[0]["cells"][0], "Acme Billing <billing@acme.com>");
    assert_eq!(rows[0]["cells"][1], "Invoice #1001");
    assert_eq!(rows[0]["cells"][4], "Mar 5, 2024 14:07");

    let requests = h.email_requests();
    let last = requests.last().expect("emails request");
    assert!(last.contains("search=invoice"), "request: {}", last);
    assert!(last.contains("sort_by=date"), "request: {}", last);
    assert!(last.contains("page_size=50"), "request: {}", last);
}

#[test]
fn test_unset_filters_are_omitted() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "query", "sort_by": "date"}));
    assert_eq!(resp["ok"], true);
    assert_eq!(resp["row_count"], 5);

    let requests = h.email_requests();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].contains("search="), "request: {}", requests[0]);
    assert!(!requests[0].contains("after_date="), "request: {}", requests[0]);
    assert!(requests[0].contains("page=1"), "request: {}", requests[0]);
}

#[test]
fn test_after_date_filter() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "query", "sort_by": "date", "after_date": "2024-01-01"}));
    assert_eq!(resp["ok"], true);
    assert_eq!(resp["row_count"], 3);
    assert!(h
        .email_requests()
        .last()
        .unwrap()
        .contains("after_date=2024-01-01"));

    let resp = h.send(json!({"command": "status"}));
    assert_eq!(resp["after_date"], "2024-01-01");

    // Clearing the date widens the results again.
    let resp = h.send(json!({"command": "query", "after_date": ""}));
    assert_eq!(resp["row_count"], 5);
}

#[test]
fn test_invalid_after_date_rejected() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "query", "after_date": "01/02/2024"}));
    assert_eq!(resp["ok"], false);
    assert!(resp["error"].as_str().unwrap().contains("YYYY-MM-DD"));
    assert!(h.email_requests().is_empty());
}

#[test]
fn test_unchanged_query_does_not_refetch() {
    let mut h = CliHarness::start();
    h.send(json!({"command": "query", "sort_by": "date"}));
    h.send(json!({"command": "query", "sort_by": "date"}));
    assert_eq!(h.email_requests().len(), 1);

    let resp = h.send(json!({"command": "refresh"}));
    assert_eq!(resp["ok"], true);
    assert_eq!(h.email_requests().len(), 2);
}

#[test]
fn test_domain_group_expand_and_collapse() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "query"}));

    assert_eq!(resp["ok"], true, "query failed: {:?}", resp);
    assert_eq!(resp["sort_by"], "domain_frequency");
    assert_eq!(resp["headers"], json!(["Domain", "Emails", "Latest"]));
    assert_eq!(resp["row_count"], 1);
    let header = &resp["rows"][0];
    assert_eq!(header["kind"], "group");
    assert_eq!(header["group"]["kind"], "domain");
    assert_eq!(header["group"]["key"], "acme.com");
    assert_eq!(header["cells"][0], "▸ acme.com");
    assert_eq!(header["cells"][1], "5");

    let resp = h.send(json!({"command": "toggle", "kind": "domain", "key": "acme.com"}));
    assert_eq!(resp["expanded"], true);
    assert_eq!(resp["row_count"], 6);
    let rows = resp["rows"].as_array().unwrap();
    assert_eq!(rows[0]["cells"][0], "▾ acme.com");
    assert!(rows[1..].iter().all(|r| r["kind"] == "member"));
    assert_eq!(rows[1]["cells"][0], "    Invoice #1001 (billing@acme.com)");

    let resp = h.send(json!({"command": "toggle", "kind": "domain", "key": "acme.com"}));
    assert_eq!(resp["expanded"], false);
    assert_eq!(resp["row_count"], 1);
}

#[test]
fn test_expansion_survives_mode_changes() {
    let mut h = CliHarness::start();
    h.send(json!({"command": "query"}));
    h.send(json!({"command": "toggle", "kind": "domain", "key": "acme.com"}));

    let resp = h.send(json!({"command": "query", "sort_by": "sender_frequency"}));
    assert_eq!(resp["row_count"], 2);
    assert_eq!(resp["rows"][0]["group"]["key"], "news@acme.com");

    let resp = h.send(json!({"command": "query", "sort_by": "domain_frequency"}));
    assert_eq!(resp["row_count"], 6);

    let resp = h.send(json!({"command": "status"}));
    assert_eq!(resp["expanded_groups"], 1);
}

#[test]
fn test_toggle_validation() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "toggle", "kind": "folder", "key": "x"}));
    assert_eq!(resp["ok"], false);

    let resp = h.send(json!({"command": "toggle", "kind": "sender"}));
    assert_eq!(resp["ok"], false);
    assert!(resp["error"].as_str().unwrap().contains("missing 'key'"));
}

#[test]
fn test_page_bounds() {
    let mut h = CliHarness::start();
    h.send(json!({"command": "query", "sort_by": "date"}));

    let resp = h.send(json!({"command": "prev_page"}));
    assert_eq!(resp["ok"], false);
    assert!(resp["error"].as_str().unwrap().contains("first page"));

    let resp = h.send(json!({"command": "next_page"}));
    assert_eq!(resp["ok"], false);
    assert!(resp["error"].as_str().unwrap().contains("last page"));
    assert_eq!(h.email_requests().len(), 1);
}

#[test]
fn test_page_kept_when_filters_change() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "query", "sort_by": "date", "page": 3}));
    assert_eq!(resp["page"], 3);
    assert_eq!(resp["row_count"], 0);

    let resp = h.send(json!({"command": "query", "search": "acme"}));
    assert_eq!(resp["page"], 3);
    assert!(h.email_requests().last().unwrap().contains("page=3"));
}

#[test]
fn test_fetch_failure_keeps_rows() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "query", "sort_by": "date", "search": "invoice"}));
    assert_eq!(resp["row_count"], 2);

    h.server.set_fail_emails(true);
    let resp = h.send(json!({"command": "refresh"}));
    assert_eq!(resp["ok"], false);
    assert!(resp["error"]
        .as_str()
        .unwrap()
        .contains("Failed to fetch emails"));
    assert_eq!(resp["row_count"], 2);

    h.server.set_fail_emails(false);
    let resp = h.send(json!({"command": "refresh"}));
    assert_eq!(resp["ok"], true);
    assert!(resp["error"].is_null());
}

#[test]
fn test_render_without_fetch() {
    let mut h = CliHarness::start();
    let resp = h.send(json!({"command": "render"}));
    assert_eq!(resp["ok"], true);
    assert_eq!(resp["row_count"], 0);
    assert_eq!(resp["pagination"], "Showing 1 to 0 of 0 results");
    assert!(h.email_requests().is_empty());
}

#[test]
fn test_debounce_config_accepted() {
    let mut h = CliHarness::start_with_ui_config("debounce_ms = 50\nchart_entries = 5");
    let resp = h.send(json!({"command": "query", "sort_by": "date", "search": "digest"}));
    assert_eq!(resp["ok"], true);
    assert_eq!(resp["row_count"], 1);
}
