use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use shoplist_api_client::{
    ApiClient, DataStore, HttpSession, HttpStore, PollingFeed,
};
use shoplist_core::config::FeedSettings;
use shoplist_core::{ListItem, ShoppingList};
use shoplist_e2e::spawn;
use shoplist_sync::{ItemsOutcome, ItemsView, ListsView};

const WAIT: Duration = Duration::from_secs(5);

struct Client {
    session: HttpSession,
    store: HttpStore,
    feed: PollingFeed,
}

/// Independent client stack against the stub, polling fast enough for
/// tests to observe convergence quickly.
fn connect(base_url: &str) -> Client {
    let api = Arc::new(ApiClient::new(base_url, Duration::from_secs(5)).unwrap());
    Client {
        session: HttpSession::new(Arc::clone(&api)),
        store: HttpStore::new(Arc::clone(&api)),
        feed: PollingFeed::new(
            api,
            FeedSettings {
                poll_interval_ms: 25,
                poll_limit: 100,
            },
        ),
    }
}

async fn signed_in(base_url: &str, email: &str) -> Client {
    let client = connect(base_url);
    client.session.sign_in(email, "hunter2").await.unwrap();
    client
}

#[tokio::test]
async fn item_added_in_one_session_reaches_the_other() {
    let (url, stub) = spawn().await.unwrap();
    let owner = stub.add_user("alice@example.com", "hunter2");

    let watcher = signed_in(&url, "alice@example.com").await;
    let editor = signed_in(&url, "alice@example.com").await;

    let list = ShoppingList::new(owner, "Courses");
    editor.store.insert_list(&list).await.unwrap();

    let mut view = ItemsView::open(&watcher.session, watcher.store, watcher.feed, list.clone())
        .await
        .unwrap();
    assert!(view.is_live());
    assert!(view.items().is_empty());

    let milk = ListItem::new(list.id, "Milk");
    editor.store.insert_item(&milk).await.unwrap();

    let event = timeout(WAIT, view.next_change())
        .await
        .expect("no change arrived")
        .expect("feed ended");
    assert!(view.apply_change(&event).changed());
    assert_eq!(view.items().len(), 1);
    assert_eq!(view.items()[0].id, milk.id);

    view.dispose();
}

#[tokio::test]
async fn collaborator_toggle_and_delete_converge() {
    let (url, stub) = spawn().await.unwrap();
    let owner = stub.add_user("alice@example.com", "hunter2");

    let watcher = signed_in(&url, "alice@example.com").await;
    let editor = signed_in(&url, "alice@example.com").await;

    let list = ShoppingList::new(owner, "Courses");
    editor.store.insert_list(&list).await.unwrap();
    let milk = ListItem::new(list.id, "Milk");
    let bread = ListItem::new(list.id, "Bread");
    editor.store.insert_item(&milk).await.unwrap();
    editor.store.insert_item(&bread).await.unwrap();

    let mut view = ItemsView::open(&watcher.session, watcher.store, watcher.feed, list.clone())
        .await
        .unwrap();
    assert_eq!(view.items().len(), 2);

    editor.store.set_item_checked(milk.id, true).await.unwrap();
    editor.store.delete_item(bread.id).await.unwrap();

    // Two events, in log order; positions never move on update.
    while view.items().len() != 1 || !view.get(milk.id).unwrap().is_checked {
        let event = timeout(WAIT, view.next_change())
            .await
            .expect("views did not converge")
            .expect("feed ended");
        view.apply_change(&event);
    }
    assert_eq!(view.items()[0].id, milk.id);

    view.dispose();
}

#[tokio::test]
async fn own_echo_is_absorbed_without_duplicates() {
    let (url, stub) = spawn().await.unwrap();
    let owner = stub.add_user("alice@example.com", "hunter2");

    let client = signed_in(&url, "alice@example.com").await;
    let list = ShoppingList::new(owner, "Courses");
    client.store.insert_list(&list).await.unwrap();

    let mut view = ItemsView::open(&client.session, client.store, client.feed, list.clone())
        .await
        .unwrap();

    view.add("Milk").await.unwrap();
    assert_eq!(view.items().len(), 1);

    let event = timeout(WAIT, view.next_change())
        .await
        .expect("echo never arrived")
        .expect("feed ended");
    assert!(!view.apply_change(&event).changed());
    assert_eq!(view.items().len(), 1);

    view.dispose();
}

#[tokio::test]
async fn deleting_the_watched_list_ends_the_view() {
    let (url, stub) = spawn().await.unwrap();
    let owner = stub.add_user("alice@example.com", "hunter2");

    let watcher = signed_in(&url, "alice@example.com").await;
    let editor = signed_in(&url, "alice@example.com").await;

    let list = ShoppingList::new(owner, "Courses");
    editor.store.insert_list(&list).await.unwrap();
    let milk = ListItem::new(list.id, "Milk");
    editor.store.insert_item(&milk).await.unwrap();

    let mut view = ItemsView::open(&watcher.session, watcher.store, watcher.feed, list.clone())
        .await
        .unwrap();

    editor.store.delete_list(list.id).await.unwrap();
    assert!(stub.lists().is_empty());
    assert!(stub.items().is_empty());

    // The cascade delivers the item deletes and then the list delete.
    let outcome = loop {
        let event = timeout(WAIT, view.next_change())
            .await
            .expect("deletion never arrived")
            .expect("feed ended");
        match view.apply_change(&event) {
            ItemsOutcome::ListGone => break ItemsOutcome::ListGone,
            _ => continue,
        }
    };
    assert_eq!(outcome, ItemsOutcome::ListGone);
}

#[tokio::test]
async fn lists_view_sees_lists_created_elsewhere() {
    let (url, stub) = spawn().await.unwrap();
    let owner = stub.add_user("alice@example.com", "hunter2");

    let watcher = signed_in(&url, "alice@example.com").await;
    let editor = signed_in(&url, "alice@example.com").await;

    let mut view = ListsView::open(&watcher.session, watcher.store, watcher.feed)
        .await
        .unwrap();
    assert!(view.lists().is_empty());

    let list = ShoppingList::new(owner, "Courses");
    editor.store.insert_list(&list).await.unwrap();

    let event = timeout(WAIT, view.next_change())
        .await
        .expect("create never arrived")
        .expect("feed ended");
    assert!(view.apply_change(&event).changed());
    assert_eq!(view.lists()[0].id, list.id);

    view.dispose();
}

#[tokio::test]
async fn changes_before_subscribing_are_not_replayed() {
    let (url, stub) = spawn().await.unwrap();
    let owner = stub.add_user("alice@example.com", "hunter2");

    let editor = signed_in(&url, "alice@example.com").await;
    let list = ShoppingList::new(owner, "Courses");
    editor.store.insert_list(&list).await.unwrap();
    let milk = ListItem::new(list.id, "Milk");
    editor.store.insert_item(&milk).await.unwrap();

    let watcher = signed_in(&url, "alice@example.com").await;
    let mut view = ItemsView::open(&watcher.session, watcher.store, watcher.feed, list.clone())
        .await
        .unwrap();
    // The snapshot carries the pre-existing item; the feed must not
    // deliver its historical insert again.
    assert_eq!(view.items().len(), 1);

    let bread = ListItem::new(list.id, "Bread");
    editor.store.insert_item(&bread).await.unwrap();

    let event = timeout(WAIT, view.next_change())
        .await
        .expect("no change arrived")
        .expect("feed ended");
    assert_eq!(event.seq as usize, stub.change_log_len());
    assert!(view.apply_change(&event).changed());
    assert_eq!(view.items().len(), 2);

    view.dispose();
}
