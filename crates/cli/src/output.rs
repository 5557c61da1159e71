use shoplist_core::{ListItem, ShoppingList};

pub fn print_lists(lists: &[ShoppingList]) {
    if lists.is_empty() {
        println!("No lists yet. Create one with `shoplist lists add <name>`.");
        return;
    }
    for list in lists {
        println!("{}  {}", list.id, list.name);
    }
}

pub fn print_items(list: &ShoppingList, items: &[ListItem]) {
    println!("{} ({} items)", list.name, items.len());
    if items.is_empty() {
        println!("  (empty)");
        return;
    }
    for item in items {
        let mark = if item.is_checked { "x" } else { " " };
        println!("  [{mark}] {}  {}", item.id, item.name);
    }
}
