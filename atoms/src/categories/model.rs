use serde::{Deserialize, Serialize};

// ========== CATEGORY ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Position in storefront menus, ascending.
    pub order: i64,
}
