//! Cache key builders
//!
//! One place for every cache key so writers and readers cannot drift.

pub fn food_items() -> String {
    "cache:food:items".into()
}

pub fn food_item(id: &str) -> String {
    format!("cache:food:item:{id}")
}

pub fn ingredients() -> String {
    "cache:ingredients:all".into()
}

pub fn ingredient(id: &str) -> String {
    format!("cache:ingredient:{id}")
}

pub fn inventory_dashboard() -> String {
    "cache:inventory:dashboard".into()
}

pub fn alerts(is_read: bool) -> String {
    format!("cache:alerts:{}", if is_read { "read" } else { "unread" })
}

pub fn orders_page(page: u32, page_size: u32) -> String {
    format!("cache:orders:{page}:{page_size}")
}

/// Matches every paginated orders entry
pub const ORDERS_PATTERN: &str = "cache:orders:*";
