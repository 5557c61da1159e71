use anyhow::Result;
use uuid::Uuid;

use shoplist_api_client::SessionProvider;
use shoplist_sync::{ItemsOutcome, ItemsView, ListsView};

use crate::backend::{self, Backend};
use crate::config;
use crate::list_ref;
use crate::output;

pub async fn run_watch(list: Option<&str>) -> Result<()> {
    let cfg = config::load()?;
    let owner = backend::owner_id(&cfg)?;
    let be = backend::build(&cfg)?;

    match list {
        Some(reference) => watch_items(be, owner, reference).await,
        None => watch_lists(be).await,
    }
}

async fn watch_lists(be: Backend) -> Result<()> {
    let Backend {
        session,
        store,
        feed,
    } = be;
    let mut auth_events = session.subscribe();
    let mut view = ListsView::open(&session, store, feed).await?;

    if !view.is_live() {
        println!("(live updates unavailable; showing a snapshot)");
    }
    output::print_lists(view.lists());
    println!("Watching your lists; Ctrl+C to stop.");

    loop {
        tokio::select! {
            event = view.next_change() => {
                match event {
                    Some(event) => {
                        if view.apply_change(&event).changed() {
                            println!();
                            output::print_lists(view.lists());
                        }
                    }
                    None => println!("Live updates ended; Ctrl+C to stop."),
                }
            }
            auth = auth_events.recv() => {
                if let Ok(event) = auth {
                    if view.handle_auth_event(&event) {
                        println!("Signed out; leaving.");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    view.dispose();
    Ok(())
}

async fn watch_items(be: Backend, owner: Uuid, reference: &str) -> Result<()> {
    let Backend {
        session,
        store,
        feed,
    } = be;
    let list = list_ref::resolve(&store, owner, reference).await?;
    let mut auth_events = session.subscribe();
    let mut view = ItemsView::open(&session, store, feed, list).await?;

    if !view.is_live() {
        println!("(live updates unavailable; showing a snapshot)");
    }
    output::print_items(view.list(), view.items());
    println!("Watching '{}'; Ctrl+C to stop.", view.list().name);

    loop {
        tokio::select! {
            event = view.next_change() => {
                match event {
                    Some(event) => match view.apply_change(&event) {
                        ItemsOutcome::ListGone => {
                            println!("The list was deleted; leaving.");
                            break;
                        }
                        outcome if outcome.changed() => {
                            println!();
                            output::print_items(view.list(), view.items());
                        }
                        _ => {}
                    },
                    None => println!("Live updates ended; Ctrl+C to stop."),
                }
            }
            auth = auth_events.recv() => {
                if let Ok(event) = auth {
                    if view.handle_auth_event(&event) {
                        println!("Signed out; leaving.");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    view.dispose();
    Ok(())
}
