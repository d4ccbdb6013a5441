use crate::api::client::AnalyticsClient;
use crate::api::types::{Analytics, ResultSet, SyncOutcome};
use crate::browser::query::FetchKey;
use std::sync::mpsc;
use std::thread;

/// Commands sent from the UI thread to the backend thread.
pub enum BackendCommand {
    FetchAnalytics,
    Sync,
    QueryEmails { key: FetchKey },
    Shutdown,
}

/// Responses sent from the backend thread to the UI thread.
pub enum BackendResponse {
    Analytics(Result<Analytics, String>),
    Synced(Result<SyncOutcome, String>),
    Emails {
        key: FetchKey,
        result: Result<ResultSet, String>,
    },
}

/// Spawn the backend thread. Returns the command sender and response receiver.
pub fn spawn(
    client: AnalyticsClient,
) -> (
    mpsc::Sender<BackendCommand>,
    mpsc::Receiver<BackendResponse>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<BackendCommand>();
    let (resp_tx, resp_rx) = mpsc::channel::<BackendResponse>();

    thread::spawn(move || {
        backend_loop(client, cmd_rx, resp_tx);
    });

    (cmd_tx, resp_rx)
}

fn backend_loop(
    client: AnalyticsClient,
    cmd_rx: mpsc::Receiver<BackendCommand>,
    resp_tx: mpsc::Sender<BackendResponse>,
) {
    log_info!("[Backend] started for {}", client.base_url());
    while let Ok(cmd) = cmd_rx.recv() {
        let response = match cmd {
            BackendCommand::FetchAnalytics => {
                BackendResponse::Analytics(client.fetch_analytics().map_err(|e| e.to_string()))
            }
            BackendCommand::Sync => {
                BackendResponse::Synced(client.sync_emails().map_err(|e| e.to_string()))
            }
            BackendCommand::QueryEmails { key } => {
                let result = client.fetch_emails(&key).map_err(|e| e.to_string());
                BackendResponse::Emails { key, result }
            }
            BackendCommand::Shutdown => break,
        };
        if resp_tx.send(response).is_err() {
            break;
        }
    }
    log_info!("[Backend] stopped");
}
