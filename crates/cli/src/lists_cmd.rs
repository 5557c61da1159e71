use anyhow::Result;

use shoplist_api_client::DataStore;
use shoplist_core::ShoppingList;

use crate::ListsAction;
use crate::backend;
use crate::config;
use crate::output;

pub async fn run_lists(action: Option<ListsAction>) -> Result<()> {
    let cfg = config::load()?;
    let owner = backend::owner_id(&cfg)?;
    let be = backend::build(&cfg)?;

    match action {
        None => {
            let lists = be.store.fetch_lists(owner).await?;
            output::print_lists(&lists);
        }
        Some(ListsAction::Add { name }) => {
            let list = ShoppingList::new(owner, &name);
            be.store.insert_list(&list).await?;
            println!("Created '{}' ({})", list.name, list.id);
        }
        Some(ListsAction::Rename { id, name }) => {
            be.store.rename_list(id, &name).await?;
            println!("Renamed {id} to '{name}'");
        }
        Some(ListsAction::Rm { id }) => {
            be.store.delete_list(id).await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}
