use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::model::Product;
use crate::time::epoch_millis;

pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Recent,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl FromStr for SortKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recent" => Ok(SortKey::Recent),
            "price_asc" => Ok(SortKey::PriceAsc),
            "price_desc" => Ok(SortKey::PriceDesc),
            "name_asc" => Ok(SortKey::NameAsc),
            "name_desc" => Ok(SortKey::NameDesc),
            _ => Err(()),
        }
    }
}

/// The UI-selected inputs the list derivation depends on. Nothing else
/// feeds the pipeline, so identical queries give identical output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery {
    /// Empty set means "no category filter".
    pub categories: BTreeSet<String>,
    pub sort: SortKey,
    pub page: usize,
}

/// Result of one derivation: the slice to render plus the full
/// filtered-and-sorted sequence (the caller needs the total for its
/// pagination controls).
#[derive(Debug, Clone)]
pub struct Derived {
    pub page_items: Vec<Product>,
    pub all: Vec<Product>,
    pub page: usize,
}

impl Derived {
    pub fn total(&self) -> usize {
        self.all.len()
    }

    pub fn page_count(&self) -> usize {
        self.all.len().div_ceil(PAGE_SIZE)
    }
}

/// Derive the current page: active filter, then category filter, then a
/// stable sort, then the page slice. Pure function over its inputs.
pub fn derive(products: &[Product], query: &PageQuery) -> Derived {
    let mut all: Vec<Product> = products
        .iter()
        .filter(|p| p.is_active)
        .filter(|p| {
            query.categories.is_empty()
                || p.categories.iter().any(|c| query.categories.contains(c))
        })
        .cloned()
        .collect();

    // Vec::sort_by is stable, so equal keys fall through to the tie-break
    // comparators below rather than input order.
    all.sort_by(|a, b| compare(a, b, query.sort));

    let start = query.page.saturating_mul(PAGE_SIZE);
    let page_items: Vec<Product> = all.iter().skip(start).take(PAGE_SIZE).cloned().collect();

    Derived { page_items, all, page: query.page }
}

fn compare(a: &Product, b: &Product, sort: SortKey) -> Ordering {
    match sort {
        SortKey::PriceAsc => a
            .price
            .cmp(&b.price)
            .then_with(|| collate(&a.name, &b.name)),
        SortKey::PriceDesc => b
            .price
            .cmp(&a.price)
            .then_with(|| collate(&a.name, &b.name)),
        SortKey::NameAsc => collate(&a.name, &b.name),
        SortKey::NameDesc => collate(&b.name, &a.name),
        SortKey::Recent => compare_recency(a, b).then_with(|| collate(&a.name, &b.name)),
    }
}

/// Descending by the most recent of insert/update. Records whose dates do
/// not normalize sort last, they are "unknown", not an error.
fn compare_recency(a: &Product, b: &Product) -> Ordering {
    match (recency(a), recency(b)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn recency(p: &Product) -> Option<i64> {
    match (epoch_millis(&p.update_date), epoch_millis(&p.insert_date)) {
        (Some(u), Some(i)) => Some(u.max(i)),
        (Some(u), None) => Some(u),
        (None, Some(i)) => Some(i),
        (None, None) => None,
    }
}

/// Name ordering used for the name sorts and every tie-break. Unicode
/// case folding first, byte order as the final discriminator.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::DateValue;

    fn product(id: &str, name: &str, price: u64, active: bool, cats: &[&str], updated: &str) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            price,
            categories: cats.iter().map(|c| c.to_string()).collect(),
            main_image_url: "https://cdn.example/x.jpg".to_string(),
            image_urls: vec!["https://cdn.example/x.jpg".to_string()],
            is_active: active,
            insert_date: DateValue::Text(updated.to_string()),
            update_date: DateValue::Text(updated.to_string()),
        }
    }

    fn query(sort: SortKey, page: usize, cats: &[&str]) -> PageQuery {
        PageQuery {
            categories: cats.iter().map(|c| c.to_string()).collect(),
            sort,
            page,
        }
    }

    #[test]
    fn recent_sort_puts_newest_first() {
        // Scenario A from the list behavior notes.
        let products = vec![
            product("1", "B", 100, true, &["x"], "2025-01-01"),
            product("2", "A", 200, true, &["x"], "2025-02-01"),
        ];
        let out = derive(&products, &query(SortKey::Recent, 0, &[]));
        let names: Vec<&str> = out.page_items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn price_asc_orders_by_price() {
        let products = vec![
            product("1", "B", 100, true, &["x"], "2025-01-01"),
            product("2", "A", 200, true, &["x"], "2025-02-01"),
        ];
        let out = derive(&products, &query(SortKey::PriceAsc, 0, &[]));
        let prices: Vec<u64> = out.page_items.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![100, 200]);
    }

    #[test]
    fn inactive_products_never_appear() {
        let products = vec![
            product("1", "hidden", 100, false, &["x"], "2025-01-01"),
            product("2", "shown", 200, true, &["x"], "2025-01-01"),
        ];
        for sort in [SortKey::Recent, SortKey::PriceAsc, SortKey::PriceDesc, SortKey::NameAsc, SortKey::NameDesc] {
            let out = derive(&products, &query(sort, 0, &[]));
            assert!(out.all.iter().all(|p| p.id != "1"), "inactive leaked under {:?}", sort);
        }
        let filtered = derive(&products, &query(SortKey::Recent, 0, &["x"]));
        assert!(filtered.all.iter().all(|p| p.id != "1"));
    }

    #[test]
    fn category_filter_is_intersection_not_subset() {
        let products = vec![
            product("1", "multi", 100, true, &["a", "b"], "2025-01-01"),
            product("2", "other", 100, true, &["c"], "2025-01-01"),
        ];
        // Selecting {a, z}: product 1 matches on "a" alone.
        let out = derive(&products, &query(SortKey::NameAsc, 0, &["a", "z"]));
        assert_eq!(out.all.len(), 1);
        assert_eq!(out.all[0].id, "1");
    }

    #[test]
    fn filtering_never_introduces_new_products() {
        let products: Vec<Product> = (0..30)
            .map(|i| {
                let cat = if i % 2 == 0 { "even" } else { "odd" };
                product(&i.to_string(), &format!("p{i:02}"), i, i % 3 != 0, &[cat], "2025-01-01")
            })
            .collect();
        let unfiltered = derive(&products, &query(SortKey::NameAsc, 0, &[]));
        let filtered = derive(&products, &query(SortKey::NameAsc, 0, &["even"]));
        for p in &filtered.all {
            assert!(unfiltered.all.iter().any(|q| q.id == p.id));
            assert!(p.categories.contains(&"even".to_string()));
        }
    }

    #[test]
    fn derivation_is_idempotent() {
        let products: Vec<Product> = (0..50)
            .map(|i| product(&i.to_string(), &format!("p{}", i % 7), (i % 5) as u64, true, &["x"], "2025-01-01"))
            .collect();
        let q = query(SortKey::PriceAsc, 1, &["x"]);
        let first = derive(&products, &q);
        let second = derive(&products, &q);
        let ids = |d: &Derived| d.all.iter().map(|p| p.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        let page_ids = |d: &Derived| d.page_items.iter().map(|p| p.id.clone()).collect::<Vec<_>>();
        assert_eq!(page_ids(&first), page_ids(&second));
    }

    #[test]
    fn equal_sort_keys_break_ties_by_name() {
        // Same price, deliberately shuffled input order.
        let products = vec![
            product("1", "cherry", 100, true, &["x"], "2025-01-01"),
            product("2", "apple", 100, true, &["x"], "2025-01-01"),
            product("3", "banana", 100, true, &["x"], "2025-01-01"),
        ];
        let out = derive(&products, &query(SortKey::PriceAsc, 0, &[]));
        let names: Vec<&str> = out.all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "banana", "cherry"]);
    }

    #[test]
    fn concatenated_pages_reproduce_the_full_sequence() {
        let products: Vec<Product> = (0..53)
            .map(|i| product(&i.to_string(), &format!("p{i:03}"), i, true, &["x"], "2025-01-01"))
            .collect();
        let full = derive(&products, &query(SortKey::NameAsc, 0, &[]));
        assert_eq!(full.page_count(), 3);

        let mut joined = Vec::new();
        for page in 0..full.page_count() {
            let out = derive(&products, &query(SortKey::NameAsc, page, &[]));
            joined.extend(out.page_items.iter().map(|p| p.id.clone()));
        }
        let expected: Vec<String> = full.all.iter().map(|p| p.id.clone()).collect();
        assert_eq!(joined, expected);
    }

    #[test]
    fn out_of_range_page_is_empty_not_an_error() {
        // Scenario F: page 5 against 10 items.
        let products: Vec<Product> = (0..10)
            .map(|i| product(&i.to_string(), &format!("p{i}"), i, true, &["x"], "2025-01-01"))
            .collect();
        let out = derive(&products, &query(SortKey::Recent, 5, &[]));
        assert!(out.page_items.is_empty());
        assert_eq!(out.total(), 10);
    }

    #[test]
    fn unknown_dates_sort_last_under_recent() {
        let mut stale = product("1", "stale", 100, true, &["x"], "2025-06-01");
        stale.insert_date = DateValue::Text("???".to_string());
        stale.update_date = DateValue::Text("???".to_string());
        let fresh = product("2", "fresh", 100, true, &["x"], "2024-01-01");
        let out = derive(&[stale, fresh], &query(SortKey::Recent, 0, &[]));
        assert_eq!(out.all.last().map(|p| p.id.as_str()), Some("1"));
    }
}
