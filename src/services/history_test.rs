use super::*;
use crate::state::test_helpers::dummy_exchange;

fn query(user_id: Option<&str>, conversation_id: Option<&str>, limit: usize) -> HistoryQuery {
    HistoryQuery { user_id: user_id.map(str::to_string), conversation_id: conversation_id.map(str::to_string), limit }
}

// =============================================================================
// capacity
// =============================================================================

#[tokio::test]
async fn pushing_past_cap_evicts_oldest_first() {
    let store = MemoryHistory::new(1000);
    for i in 0..1001 {
        store
            .append(dummy_exchange("u", "c", &format!("m{i}")))
            .await
            .unwrap();
    }
    assert_eq!(store.len(), 1000);

    let page = store.list(&query(None, None, 1000)).await.unwrap();
    assert_eq!(page.total, 1000);
    assert_eq!(page.items.first().unwrap().user_message, "m1");
    assert_eq!(page.items.last().unwrap().user_message, "m1000");
}

#[tokio::test]
async fn zero_capacity_is_clamped_to_one() {
    let store = MemoryHistory::new(0);
    store.append(dummy_exchange("u", "c", "a")).await.unwrap();
    store.append(dummy_exchange("u", "c", "b")).await.unwrap();
    assert_eq!(store.len(), 1);
    assert!(!store.is_empty());
}

#[tokio::test]
async fn concurrent_appends_never_overshoot_cap() {
    let store = std::sync::Arc::new(MemoryHistory::new(50));
    let mut handles = Vec::new();
    for t in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..40 {
                store
                    .append(dummy_exchange("u", "c", &format!("t{t}-{i}")))
                    .await
                    .unwrap();
                assert!(store.len() <= 50);
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    assert_eq!(store.len(), 50);
}

// =============================================================================
// list
// =============================================================================

#[tokio::test]
async fn list_filters_by_user_and_conversation() {
    let store = MemoryHistory::new(100);
    store.append(dummy_exchange("alice", "c1", "a1")).await.unwrap();
    store.append(dummy_exchange("bob", "c2", "b1")).await.unwrap();
    store.append(dummy_exchange("alice", "c3", "a2")).await.unwrap();
    store.append(dummy_exchange("alice", "c1", "a3")).await.unwrap();

    let alice = store.list(&query(Some("alice"), None, 50)).await.unwrap();
    assert_eq!(alice.total, 3);
    let messages: Vec<&str> = alice.items.iter().map(|e| e.user_message.as_str()).collect();
    assert_eq!(messages, ["a1", "a2", "a3"]);

    let alice_c1 = store.list(&query(Some("alice"), Some("c1"), 50)).await.unwrap();
    assert_eq!(alice_c1.total, 2);

    let nobody = store.list(&query(Some("carol"), None, 50)).await.unwrap();
    assert_eq!(nobody.total, 0);
    assert!(nobody.items.is_empty());
}

#[tokio::test]
async fn list_limit_keeps_most_recent_and_reports_total() {
    let store = MemoryHistory::new(100);
    for i in 0..10 {
        store
            .append(dummy_exchange("u", "c", &format!("m{i}")))
            .await
            .unwrap();
    }
    let page = store.list(&query(Some("u"), None, 3)).await.unwrap();
    assert_eq!(page.total, 10);
    let messages: Vec<&str> = page.items.iter().map(|e| e.user_message.as_str()).collect();
    assert_eq!(messages, ["m7", "m8", "m9"]);
}

// =============================================================================
// recent
// =============================================================================

#[tokio::test]
async fn recent_returns_last_n_of_conversation_in_order() {
    let store = MemoryHistory::new(100);
    for i in 0..5 {
        store
            .append(dummy_exchange("u", "c1", &format!("c1-{i}")))
            .await
            .unwrap();
        store
            .append(dummy_exchange("u", "c2", &format!("c2-{i}")))
            .await
            .unwrap();
    }
    let window = store.recent("c1", 3).await.unwrap();
    let messages: Vec<&str> = window.iter().map(|e| e.user_message.as_str()).collect();
    assert_eq!(messages, ["c1-2", "c1-3", "c1-4"]);

    assert!(store.recent("missing", 3).await.unwrap().is_empty());
    assert!(store.recent("c1", 0).await.unwrap().is_empty());
}
