use anyhow::{Result, bail};

use shoplist_api_client::DataStore;
use shoplist_core::ListItem;

use crate::ItemsAction;
use crate::backend;
use crate::config;
use crate::list_ref;
use crate::output;

pub async fn run_items(list_ref: &str, action: Option<ItemsAction>) -> Result<()> {
    let cfg = config::load()?;
    let owner = backend::owner_id(&cfg)?;
    let be = backend::build(&cfg)?;
    let list = list_ref::resolve(&be.store, owner, list_ref).await?;

    match action {
        None => {
            let items = be.store.fetch_items(list.id).await?;
            output::print_items(&list, &items);
        }
        Some(ItemsAction::Add { name }) => {
            let item = ListItem::new(list.id, &name);
            be.store.insert_item(&item).await?;
            println!("Added '{}' ({})", item.name, item.id);
        }
        Some(ItemsAction::Check { id }) => {
            let items = be.store.fetch_items(list.id).await?;
            let Some(item) = items.iter().find(|i| i.id == id) else {
                bail!("no item with id {id} in '{}'", list.name);
            };
            let checked = !item.is_checked;
            be.store.set_item_checked(id, checked).await?;
            println!(
                "{} '{}'",
                if checked { "Checked" } else { "Unchecked" },
                item.name,
            );
        }
        Some(ItemsAction::Rm { id }) => {
            be.store.delete_item(id).await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}
