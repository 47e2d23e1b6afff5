use std::sync::Arc;
use std::time::Duration;

use gridwatch_core::{ResourceKind, Scope, Snapshot};
use gridwatch_store::{spawn_session, SessionCommand, SessionConfig, SessionHandle};
use gridwatch_table::{FilterState, TableModel};
use serde_json::{json, Value};
use tokio::sync::watch;

fn scope() -> Scope {
    Scope::new("c", "k", Some("default"), ResourceKind::Pods)
}

fn snap(rows: Vec<Value>) -> SessionCommand {
    SessionCommand::Snapshot(Snapshot { scope: scope(), rows })
}

async fn settle(epoch_rx: &mut watch::Receiver<u64>, target: u64) {
    while *epoch_rx.borrow_and_update() < target {
        epoch_rx.changed().await.expect("session alive");
    }
}

fn flag(h: &SessionHandle, name: &str) -> Option<bool> {
    h.current().rows.rows().iter().find(|r| r.name == name).map(|r| r.has_updated)
}

#[tokio::test(start_paused = true)]
async fn highlight_expires_while_row_is_filtered_out() {
    let (tx, handle) = spawn_session(SessionConfig::default());
    let mut epoch_rx = handle.subscribe_epoch();
    tx.send(SessionCommand::Subscribe(scope())).await.unwrap();
    tx.send(snap(vec![json!({"name": "web", "ready": "1/3"}), json!({"name": "db", "ready": "1/1"})])).await.unwrap();
    tx.send(snap(vec![json!({"name": "web", "ready": "2/3"}), json!({"name": "db", "ready": "1/1"})])).await.unwrap();
    settle(&mut epoch_rx, 3).await;
    assert_eq!(flag(&handle, "web"), Some(true));

    let mut model = TableModel::for_kind(ResourceKind::Pods);
    let only_db = Arc::new(FilterState::default().with_column_filter("name", ["db"]));
    let view = model.view(&handle.current().rows, &only_db);
    let visible: Vec<&str> = view.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(visible, vec!["db"]);

    tokio::time::sleep(Duration::from_millis(2000)).await;
    settle(&mut epoch_rx, 4).await;
    assert_eq!(flag(&handle, "web"), Some(false));

    let everything = Arc::new(FilterState::default());
    let view = model.view(&handle.current().rows, &everything);
    let web = view.rows.iter().find(|r| r.name == "web").expect("web visible again");
    assert!(!web.has_updated);
}
