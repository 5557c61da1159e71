use anyhow::{Result, bail};
use uuid::Uuid;

use shoplist_api_client::DataStore;
use shoplist_core::ShoppingList;

/// Resolve a user-supplied list reference: a full UUID, or the exact name
/// of one of the owner's lists.
pub async fn resolve<S: DataStore>(
    store: &S,
    owner: Uuid,
    reference: &str,
) -> Result<ShoppingList> {
    let lists = store.fetch_lists(owner).await?;

    if let Ok(id) = Uuid::parse_str(reference) {
        match lists.into_iter().find(|l| l.id == id) {
            Some(list) => return Ok(list),
            None => bail!("no list with id {id}"),
        }
    }

    let mut named: Vec<_> = lists.into_iter().filter(|l| l.name == reference).collect();
    match named.len() {
        0 => bail!("no list named '{reference}'"),
        1 => Ok(named.remove(0)),
        _ => bail!("several lists are named '{reference}'; use the id"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoplist_api_client::memory::MemoryStore;
    use shoplist_core::testing;

    #[tokio::test]
    async fn resolves_by_id_and_by_name() {
        let owner = Uuid::new_v4();
        let list = testing::list_for(owner, "Courses");
        let store = MemoryStore::new();
        store.seed_lists(vec![list.clone()]);

        let by_id = resolve(&store, owner, &list.id.to_string()).await.unwrap();
        assert_eq!(by_id.id, list.id);

        let by_name = resolve(&store, owner, "Courses").await.unwrap();
        assert_eq!(by_name.id, list.id);
    }

    #[tokio::test]
    async fn ambiguous_name_is_rejected() {
        let owner = Uuid::new_v4();
        let store = MemoryStore::new();
        store.seed_lists(vec![
            testing::list_for(owner, "Courses"),
            testing::list_for(owner, "Courses"),
        ]);

        assert!(resolve(&store, owner, "Courses").await.is_err());
        assert!(resolve(&store, owner, "Autre").await.is_err());
    }
}
