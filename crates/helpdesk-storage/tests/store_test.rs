use std::sync::Arc;

use helpdesk_core::{
    Comment, Error, Identity, Priority, Ticket, TicketPatch, TicketStatus, TicketStore,
    compute_deadline,
};
use helpdesk_storage::{MemoryStore, Storage};
use tempfile::TempDir;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

async fn sqlite_store() -> (TempDir, Storage) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(Some(dir.path().join("test.db"))).await.unwrap();
    (dir, storage)
}

fn ticket_at(title: &str, created_at: OffsetDateTime) -> Ticket {
    Ticket::new(
        title.to_string(),
        format!("{} description", title),
        Priority::Critical,
        "user-1".to_string(),
        created_at,
        compute_deadline(Priority::Critical, created_at).unwrap(),
    )
}

fn comment(text: &str, at: OffsetDateTime) -> Comment {
    let author = Identity {
        id: "agent-1".to_string(),
        name: "Grace".to_string(),
    };
    Comment::new(&author, text.to_string(), at)
}

async fn check_crud(store: &dyn TicketStore) {
    let t0 = datetime!(2024-01-01 00:00 UTC);
    let ticket = ticket_at("Laptop will not boot", t0);
    let id = store.create(&ticket).await.unwrap();
    assert_eq!(id, ticket.id);

    let loaded = store.get(&id).await.unwrap();
    assert_eq!(loaded, ticket);
    assert_eq!(loaded.sla_deadline, datetime!(2024-01-01 01:00 UTC));

    store.delete(&id).await.unwrap();
    assert!(matches!(store.get(&id).await, Err(Error::NotFound(_))));
    assert!(matches!(store.delete(&id).await, Err(Error::NotFound(_))));
}

async fn check_rejects_invalid(store: &dyn TicketStore) {
    let mut ticket = ticket_at("x", datetime!(2024-01-01 00:00 UTC));
    ticket.title = String::new();
    assert!(matches!(
        store.create(&ticket).await,
        Err(Error::Validation { field: "title", .. })
    ));
    assert!(store.list().await.unwrap().is_empty());
}

async fn check_list_order(store: &dyn TicketStore) {
    let t0 = datetime!(2024-01-01 00:00 UTC);
    let oldest = ticket_at("oldest", t0);
    let middle = ticket_at("middle", t0 + Duration::minutes(5));
    let newest = ticket_at("newest", t0 + Duration::hours(2));
    for ticket in [&middle, &newest, &oldest] {
        store.create(ticket).await.unwrap();
    }

    let titles: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, ["newest", "middle", "oldest"]);
}

async fn check_patch(store: &dyn TicketStore) {
    let t0 = datetime!(2024-01-01 00:00 UTC);
    let ticket = ticket_at("Email bounce", t0);
    store.create(&ticket).await.unwrap();

    let now = t0 + Duration::minutes(30);
    let updated = store
        .update(&ticket.id, &TicketPatch::status(TicketStatus::Resolved), now)
        .await
        .unwrap();

    assert_eq!(updated.status, TicketStatus::Resolved);
    assert_eq!(updated.updated_at, now);
    assert_eq!(updated.title, ticket.title);
    assert_eq!(updated.description, ticket.description);
    assert_eq!(updated.priority, ticket.priority);
    assert_eq!(updated.created_by, ticket.created_by);
    assert_eq!(updated.sla_deadline, ticket.sla_deadline);
    assert_eq!(store.get(&ticket.id).await.unwrap(), updated);

    let reassigned = store
        .update(
            &ticket.id,
            &TicketPatch {
                priority: Some(Priority::Low),
                assigned_to: Some(Some("agent-9".to_string())),
                ..Default::default()
            },
            now + Duration::minutes(1),
        )
        .await
        .unwrap();
    assert_eq!(reassigned.priority, Priority::Low);
    assert_eq!(reassigned.assigned_to.as_deref(), Some("agent-9"));
    assert_eq!(reassigned.sla_deadline, ticket.sla_deadline);

    let cleared = store
        .update(
            &ticket.id,
            &TicketPatch {
                assigned_to: Some(None),
                ..Default::default()
            },
            now + Duration::minutes(2),
        )
        .await
        .unwrap();
    assert_eq!(cleared.assigned_to, None);

    let missing = store
        .update("no-such-ticket", &TicketPatch::status(TicketStatus::Closed), now)
        .await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

async fn check_comments(store: &dyn TicketStore) {
    let t0 = datetime!(2024-01-01 00:00 UTC);
    let ticket = ticket_at("Badge reader", t0);
    store.create(&ticket).await.unwrap();

    let mut expected = Vec::new();
    for (i, text) in ["first", "second", "third"].into_iter().enumerate() {
        let at = t0 + Duration::minutes(i as i64 + 1);
        let c = comment(text, at);
        expected.push(c.clone());
        let after = store.append_comment(&ticket.id, &c, at).await.unwrap();
        assert_eq!(after.comments, expected);
        assert_eq!(after.updated_at, at);
    }

    let reloaded = store.get(&ticket.id).await.unwrap();
    assert_eq!(reloaded.comments, expected);
    assert_eq!(store.list().await.unwrap()[0].comments, expected);

    let missing = store
        .append_comment("no-such-ticket", &comment("hello", t0), t0)
        .await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

async fn check_concurrent_appends(store: Arc<dyn TicketStore>) {
    let t0 = datetime!(2024-01-01 00:00 UTC);
    let ticket = ticket_at("Concurrent", t0);
    store.create(&ticket).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        let id = ticket.id.clone();
        handles.push(tokio::spawn(async move {
            let at = t0 + Duration::seconds(i);
            store
                .append_comment(&id, &comment(&format!("note {}", i), at), at)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let loaded = store.get(&ticket.id).await.unwrap();
    assert_eq!(loaded.comments.len(), 16);
    let mut ids: Vec<&str> = loaded.comments.iter().map(|c| c.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
}

/// Patches and comment appends racing on one ticket must all land
async fn check_concurrent_updates_and_appends(store: Arc<dyn TicketStore>) {
    let t0 = datetime!(2024-01-01 00:00 UTC);
    let ticket = ticket_at("Mixed writers", t0);
    store.create(&ticket).await.unwrap();

    let patches = [
        TicketPatch::status(TicketStatus::Resolved),
        TicketPatch {
            priority: Some(Priority::Low),
            ..Default::default()
        },
        TicketPatch {
            assigned_to: Some(Some("agent-9".to_string())),
            ..Default::default()
        },
        TicketPatch {
            description: Some("Reproduced on two laptops".to_string()),
            ..Default::default()
        },
    ];

    let mut handles = Vec::new();
    for (i, patch) in patches.into_iter().enumerate() {
        let writer = Arc::clone(&store);
        let id = ticket.id.clone();
        handles.push(tokio::spawn(async move {
            let at = t0 + Duration::seconds(i as i64 + 1);
            writer.update(&id, &patch, at).await
        }));

        for j in 0..3 {
            let writer = Arc::clone(&store);
            let id = ticket.id.clone();
            handles.push(tokio::spawn(async move {
                let at = t0 + Duration::seconds(i as i64 + 1);
                writer
                    .append_comment(&id, &comment(&format!("note {}-{}", i, j), at), at)
                    .await
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let loaded = store.get(&ticket.id).await.unwrap();
    assert_eq!(loaded.comments.len(), 12);
    assert_eq!(loaded.status, TicketStatus::Resolved);
    assert_eq!(loaded.priority, Priority::Low);
    assert_eq!(loaded.assigned_to.as_deref(), Some("agent-9"));
    assert_eq!(loaded.description, "Reproduced on two laptops");
    assert_eq!(loaded.sla_deadline, ticket.sla_deadline);
    assert!(loaded.updated_at >= t0 + Duration::seconds(1));
}

#[tokio::test]
async fn test_sqlite_crud() {
    let (_dir, storage) = sqlite_store().await;
    check_crud(&storage).await;
}

#[tokio::test]
async fn test_sqlite_rejects_invalid() {
    let (_dir, storage) = sqlite_store().await;
    check_rejects_invalid(&storage).await;
}

#[tokio::test]
async fn test_sqlite_list_order() {
    let (_dir, storage) = sqlite_store().await;
    check_list_order(&storage).await;
}

#[tokio::test]
async fn test_sqlite_patch() {
    let (_dir, storage) = sqlite_store().await;
    check_patch(&storage).await;
}

#[tokio::test]
async fn test_sqlite_comments() {
    let (_dir, storage) = sqlite_store().await;
    check_comments(&storage).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_concurrent_appends() {
    let (_dir, storage) = sqlite_store().await;
    check_concurrent_appends(Arc::new(storage)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_concurrent_updates_and_appends() {
    let (_dir, storage) = sqlite_store().await;
    check_concurrent_updates_and_appends(Arc::new(storage)).await;
}

#[tokio::test]
async fn test_sqlite_in_memory() {
    let storage = Storage::in_memory().await.unwrap();
    check_comments(&storage).await;
}

#[tokio::test]
async fn test_sqlite_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("helpdesk.db");
    let ticket = ticket_at("Survives restart", datetime!(2024-05-01 09:15:30.250 UTC));

    let storage = Storage::new(Some(path.clone())).await.unwrap();
    storage.create(&ticket).await.unwrap();
    storage.close().await;

    let reopened = Storage::new(Some(path)).await.unwrap();
    assert_eq!(reopened.get(&ticket.id).await.unwrap(), ticket);
}

#[tokio::test]
async fn test_memory_crud() {
    check_crud(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_rejects_invalid() {
    check_rejects_invalid(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_list_order() {
    check_list_order(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_patch() {
    check_patch(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_memory_comments() {
    check_comments(&MemoryStore::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_concurrent_appends() {
    check_concurrent_appends(Arc::new(MemoryStore::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_concurrent_updates_and_appends() {
    check_concurrent_updates_and_appends(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn test_memory_rejects_duplicate_id() {
    let store = MemoryStore::new();
    let ticket = ticket_at("dup", datetime!(2024-01-01 00:00 UTC));
    store.create(&ticket).await.unwrap();
    assert!(matches!(store.create(&ticket).await, Err(Error::Storage(_))));
    assert_eq!(store.len(), 1);
}
