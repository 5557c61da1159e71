use std::sync::Arc;

use uuid::Uuid;

use shoplist_core::{ListItem, ShoppingList, Table};

use crate::client::ApiClient;
use crate::error::ApiResult;

/// Data Store contract: table-scoped CRUD for lists and items.
///
/// Rows are fully formed client-side (ids included) before insertion, so an
/// optimistic local insert and the echoed change event agree on the id.
/// Fetches return rows ordered by creation time descending.
#[allow(async_fn_in_trait)]
pub trait DataStore {
    async fn fetch_lists(&self, owner: Uuid) -> ApiResult<Vec<ShoppingList>>;
    async fn insert_list(&self, list: &ShoppingList) -> ApiResult<()>;
    async fn rename_list(&self, id: Uuid, name: &str) -> ApiResult<()>;
    async fn delete_list(&self, id: Uuid) -> ApiResult<()>;

    async fn fetch_items(&self, list_id: Uuid) -> ApiResult<Vec<ListItem>>;
    async fn insert_item(&self, item: &ListItem) -> ApiResult<()>;
    async fn set_item_checked(&self, id: Uuid, is_checked: bool) -> ApiResult<()>;
    async fn delete_item(&self, id: Uuid) -> ApiResult<()>;
}

/// Data store backed by the backend row endpoints.
#[derive(Clone)]
pub struct HttpStore {
    api: Arc<ApiClient>,
}

impl HttpStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl DataStore for HttpStore {
    async fn fetch_lists(&self, owner: Uuid) -> ApiResult<Vec<ShoppingList>> {
        self.api.select_lists(owner).await
    }

    async fn insert_list(&self, list: &ShoppingList) -> ApiResult<()> {
        self.api.insert_row(Table::Lists, list).await
    }

    async fn rename_list(&self, id: Uuid, name: &str) -> ApiResult<()> {
        self.api
            .update_row(Table::Lists, id, &serde_json::json!({ "name": name }))
            .await
    }

    async fn delete_list(&self, id: Uuid) -> ApiResult<()> {
        self.api.delete_row(Table::Lists, id).await
    }

    async fn fetch_items(&self, list_id: Uuid) -> ApiResult<Vec<ListItem>> {
        self.api.select_items(list_id).await
    }

    async fn insert_item(&self, item: &ListItem) -> ApiResult<()> {
        self.api.insert_row(Table::Items, item).await
    }

    async fn set_item_checked(&self, id: Uuid, is_checked: bool) -> ApiResult<()> {
        self.api
            .update_row(
                Table::Items,
                id,
                &serde_json::json!({ "is_checked": is_checked }),
            )
            .await
    }

    async fn delete_item(&self, id: Uuid) -> ApiResult<()> {
        self.api.delete_row(Table::Items, id).await
    }
}
