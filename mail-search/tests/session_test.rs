//! Integration tests for the search session event loop

use mail_search::mock::{ScriptedReply, ScriptedTransport};
use mail_search::query::PaginationDefaults;
use mail_search::sanitize::MarkupSanitizer;
use mail_search::{
    RequestGateway, RequestTarget, SearchCommand, SearchController, SearchEvent, SearchSession,
    SearchSnapshot, SessionHandle,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const WAIT: Duration = Duration::from_secs(5);

fn start(replies: Vec<ScriptedReply>) -> (SessionHandle, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::with_replies(replies));
    let controller = SearchController::new(
        RequestGateway::new(transport.clone()),
        RequestTarget::post("http://localhost:8080/api/mails/search"),
        PaginationDefaults::default(),
    );
    let handle = SearchSession::spawn(controller, Arc::new(MarkupSanitizer::new()));
    (handle, transport)
}

fn page(subjects: &[&str], total: u64) -> ScriptedReply {
    let mails: Vec<_> = subjects
        .iter()
        .enumerate()
        .map(|(i, subject)| json!({ "id": i + 1, "subject": subject }))
        .collect();
    ScriptedReply::json(
        200,
        json!({ "msg": "success", "data": { "mails": mails, "total": total }, "status": 200 }),
    )
}

async fn wait_until(
    handle: &SessionHandle,
    condition: impl FnMut(&SearchSnapshot) -> bool,
) -> SearchSnapshot {
    let mut snapshots = handle.snapshots();
    let snapshot = tokio::time::timeout(WAIT, snapshots.wait_for(condition))
        .await
        .expect("timed out waiting for session state")
        .expect("session stopped");
    snapshot.clone()
}

async fn next_event(events: &mut broadcast::Receiver<SearchEvent>) -> SearchEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_rapid_typing_keeps_latest_result() {
    let (handle, transport) = start(vec![
        page(&["stale"], 1).after(Duration::from_millis(300)),
        page(&["fresh", "fresh too"], 2).after(Duration::from_millis(10)),
    ]);

    handle
        .send(SearchCommand::SetFreeText("e".to_string()))
        .await
        .unwrap();
    // Make sure the first request is on the wire before superseding it
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle
        .send(SearchCommand::SetFreeText("en".to_string()))
        .await
        .unwrap();

    let snapshot = wait_until(&handle, |s| !s.loading && s.total > 0).await;
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.records[0].subject, "fresh");
    assert_eq!(snapshot.error, None);

    // Outlive the stale reply's delay; nothing may overwrite the result
    tokio::time::sleep(Duration::from_millis(400)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.records[0].subject, "fresh");

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].cancel.is_cancelled());
    assert_eq!(requests[1].body["query"], "en");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_free_text_is_sanitized() {
    let (handle, transport) = start(vec![page(&["a"], 1)]);

    handle
        .send(SearchCommand::SetFreeText("  <b>gas</b>   pipeline ".to_string()))
        .await
        .unwrap();
    wait_until(&handle, |s| s.total == 1).await;

    assert_eq!(transport.requests()[0].body["query"], "gas pipeline");
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_events_show_repeated_error() {
    let (handle, _) = start(vec![
        ScriptedReply::json(500, json!({ "error": "db down", "status": 500 })),
        ScriptedReply::json(500, json!({ "error": "db down", "status": 500 })),
    ]);
    let mut events = handle.subscribe();

    handle.send(SearchCommand::Refresh).await.unwrap();
    assert_eq!(next_event(&mut events).await, SearchEvent::LoadingChanged(true));
    assert_eq!(next_event(&mut events).await, SearchEvent::ErrorCleared);
    assert_eq!(
        next_event(&mut events).await,
        SearchEvent::ErrorRaised("db down".to_string())
    );
    assert_eq!(next_event(&mut events).await, SearchEvent::LoadingChanged(false));

    handle.send(SearchCommand::Refresh).await.unwrap();
    assert_eq!(next_event(&mut events).await, SearchEvent::LoadingChanged(true));
    assert_eq!(next_event(&mut events).await, SearchEvent::ErrorCleared);
    assert_eq!(
        next_event(&mut events).await,
        SearchEvent::ErrorRaised("db down".to_string())
    );

    let snapshot = wait_until(&handle, |s| !s.loading).await;
    assert_eq!(snapshot.error.as_deref(), Some("db down"));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dismiss_error() {
    let (handle, _) = start(vec![ScriptedReply::json(500, json!({ "error": "db down" }))]);

    handle.send(SearchCommand::Refresh).await.unwrap();
    wait_until(&handle, |s| s.error.is_some()).await;

    handle.send(SearchCommand::DismissError).await.unwrap();
    let snapshot = wait_until(&handle, |s| s.error.is_none()).await;
    assert!(!snapshot.loading);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_paging_commands() {
    let (handle, transport) = start(vec![
        page(&["a"; 10], 25),
        page(&["b"; 10], 25),
        page(&["a"; 10], 25),
    ]);

    handle.send(SearchCommand::Refresh).await.unwrap();
    wait_until(&handle, |s| !s.loading && s.max_page == 3).await;

    handle.send(SearchCommand::NextPage).await.unwrap();
    wait_until(&handle, |s| !s.loading && s.page == 2).await;

    handle.send(SearchCommand::PreviousPage).await.unwrap();
    wait_until(&handle, |s| !s.loading && s.page == 1).await;

    let pages: Vec<_> = transport
        .requests()
        .iter()
        .map(|r| r.body["page"].as_u64())
        .collect();
    assert_eq!(pages, vec![Some(1), Some(2), Some(1)]);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unchanged_command_sends_nothing() {
    let (handle, transport) = start(vec![]);

    handle.send(SearchCommand::SetPage(0)).await.unwrap();
    handle.send(SearchCommand::SetPageSize(10)).await.unwrap();
    handle.send(SearchCommand::PreviousPage).await.unwrap();
    handle.shutdown().await.unwrap();

    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_shutdown_closes_snapshots() {
    let (handle, _) = start(vec![]);
    let snapshots = handle.snapshots();
    handle.shutdown().await.unwrap();

    assert!(snapshots.has_changed().is_err());
}
