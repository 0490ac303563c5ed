use serde::Serialize;

use crate::products::model::Product;

/// One cart line: the product snapshot plus how many of it.
#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

/// Session-scoped shopping cart. Same holder discipline as the list
/// state: one writer context, lives for the session, cleared explicitly.
#[derive(Debug, Default, Clone)]
pub struct CartState {
    items: Vec<CartItem>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Adding an already-carted product bumps its quantity instead of
    /// creating a second line.
    pub fn add(&mut self, product: &Product) {
        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            item.quantity += 1;
        } else {
            self.items.push(CartItem { product: product.clone(), quantity: 1 });
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|i| i.product.id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total units across all lines (badge count).
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::DateValue;

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            name: format!("product {}", id),
            description: String::new(),
            price: 1000,
            categories: vec!["x".to_string()],
            main_image_url: "https://cdn.example/x.jpg".to_string(),
            image_urls: vec!["https://cdn.example/x.jpg".to_string()],
            is_active: true,
            insert_date: DateValue::Millis(0),
            update_date: DateValue::Millis(0),
        }
    }

    #[test]
    fn repeated_add_increments_quantity() {
        let mut cart = CartState::new();
        cart.add(&product("a"));
        cart.add(&product("a"));
        cart.add(&product("b"));
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn remove_drops_the_whole_line() {
        let mut cart = CartState::new();
        cart.add(&product("a"));
        cart.add(&product("a"));
        cart.remove("a");
        assert!(cart.items().is_empty());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn clear_empties_everything() {
        let mut cart = CartState::new();
        cart.add(&product("a"));
        cart.add(&product("b"));
        cart.clear();
        assert_eq!(cart.item_count(), 0);
    }
}
