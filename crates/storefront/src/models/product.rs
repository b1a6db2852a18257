//! Catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aurelia_core::{ProductCategory, ProductId};

/// Maximum products per listing page.
pub const MAX_PER_PAGE: u32 = 100;

/// Default products per listing page.
pub const DEFAULT_PER_PAGE: u32 = 24;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// URL-safe unique identifier (e.g. `rose-gold-solitaire-ring`).
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: ProductCategory,
    /// Primary metal or material (e.g. "18k Yellow Gold").
    pub material: String,
    pub gemstone: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub image_url: Option<String>,
    pub is_featured: bool,
    /// Inactive products are hidden from the catalog and cannot be ordered.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

/// Data required to create a product.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewProduct {
    /// Derived from the name when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ProductCategory,
    pub material: String,
    #[serde(default)]
    pub gemstone: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

impl NewProduct {
    /// Validate field constraints and fill in the slug.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid field.
    pub fn normalize(mut self) -> Result<Self, String> {
        self.name = self.name.trim().to_string();
        self.material = self.material.trim().to_string();

        if self.name.is_empty() || self.name.len() > 200 {
            return Err("name must be between 1 and 200 characters".to_string());
        }
        if self.material.is_empty() {
            return Err("material is required".to_string());
        }
        validate_price(self.price)?;
        if self.stock_quantity < 0 {
            return Err("stock_quantity cannot be negative".to_string());
        }

        let slug = match self.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => slugify(s),
            _ => slugify(&self.name),
        };
        if slug.is_empty() {
            return Err("slug must contain at least one letter or digit".to_string());
        }
        self.slug = Some(slug);

        Ok(self)
    }

    /// The slug, derived from the name if `normalize` has not run.
    #[must_use]
    pub fn slug(&self) -> String {
        self.slug
            .clone()
            .unwrap_or_else(|| slugify(&self.name))
    }
}

/// Partial update of a product. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    pub material: Option<String>,
    /// `Some(None)` clears the gemstone.
    #[serde(default, deserialize_with = "double_option")]
    pub gemstone: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    /// Validate the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name
            && (name.trim().is_empty() || name.len() > 200)
        {
            return Err("name must be between 1 and 200 characters".to_string());
        }
        if let Some(material) = &self.material
            && material.trim().is_empty()
        {
            return Err("material cannot be empty".to_string());
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(stock) = self.stock_quantity
            && stock < 0
        {
            return Err("stock_quantity cannot be negative".to_string());
        }
        Ok(())
    }

    /// Apply the update to an in-memory product.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            product.description.clone_from(description);
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(material) = &self.material {
            product.material = material.trim().to_string();
        }
        if let Some(gemstone) = &self.gemstone {
            product.gemstone.clone_from(gemstone);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock_quantity {
            product.stock_quantity = stock;
        }
        if let Some(image_url) = &self.image_url {
            product.image_url.clone_from(image_url);
        }
        if let Some(featured) = self.is_featured {
            product.is_featured = featured;
        }
        if let Some(active) = self.is_active {
            product.is_active = active;
        }
    }
}

/// Distinguish an absent field from an explicit `null`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_price(price: Decimal) -> Result<(), String> {
    if price <= Decimal::ZERO {
        return Err("price must be greater than zero".to_string());
    }
    if price.scale() > 2 {
        return Err("price cannot have more than two decimal places".to_string());
    }
    Ok(())
}

/// Lower-case, ASCII-alphanumeric slug with single dashes.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// Parse a sort parameter, defaulting to newest for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            "name" => Self::Name,
            _ => Self::Newest,
        }
    }

    /// SQL `ORDER BY` clause. Every variant ends with `id` so pages are stable.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id DESC",
            Self::PriceAsc => "price ASC, id ASC",
            Self::PriceDesc => "price DESC, id DESC",
            Self::Name => "name ASC, id ASC",
        }
    }

    /// Compare two products the same way `order_by` does.
    #[must_use]
    pub fn compare(self, a: &Product, b: &Product) -> std::cmp::Ordering {
        match self {
            Self::Newest => b
                .created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id)),
            Self::PriceAsc => a.price.cmp(&b.price).then_with(|| a.id.cmp(&b.id)),
            Self::PriceDesc => b.price.cmp(&a.price).then_with(|| b.id.cmp(&a.id)),
            Self::Name => a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)),
        }
    }
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<ProductCategory>,
    /// Case-insensitive substring match against the material.
    pub material: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock_only: bool,
    pub featured: Option<bool>,
    pub sort: ProductSort,
    pub pagination: Pagination,
}

impl ProductFilter {
    /// Whether a product passes every filter (listing never includes inactive products).
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        product.is_active
            && self.category.is_none_or(|c| product.category == c)
            && self.material.as_deref().is_none_or(|m| {
                product
                    .material
                    .to_lowercase()
                    .contains(&m.to_lowercase())
            })
            && self.min_price.is_none_or(|p| product.price >= p)
            && self.max_price.is_none_or(|p| product.price <= p)
            && (!self.in_stock_only || product.in_stock())
            && self.featured.is_none_or(|f| product.is_featured == f)
    }
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Clamp user input into valid bounds.
    #[must_use]
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.per_page as i64
    }

    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        let per_page = u64::from(pagination.per_page);
        let total_pages = u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX);
        Self {
            items,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
            total_pages,
        }
    }

    /// Slice an already-filtered, already-sorted collection.
    #[must_use]
    pub fn from_sorted(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as u64;
        let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
        let items = all
            .into_iter()
            .skip(offset)
            .take(pagination.per_page as usize)
            .collect();
        Self::new(items, total, pagination)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_product(name: &str, price: i64) -> NewProduct {
        NewProduct {
            slug: None,
            name: name.to_string(),
            description: String::new(),
            category: ProductCategory::Rings,
            material: "18k Gold".to_string(),
            gemstone: None,
            price: Decimal::new(price, 2),
            stock_quantity: 3,
            image_url: None,
            is_featured: false,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Rose Gold  Solitaire Ring"), "rose-gold-solitaire-ring");
        assert_eq!(slugify("  Émeraude -- Drop!  "), "meraude-drop");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_normalize_derives_slug() {
        let product = new_product("  Pearl Drop Earrings ", 12_000)
            .normalize()
            .unwrap();
        assert_eq!(product.name, "Pearl Drop Earrings");
        assert_eq!(product.slug.as_deref(), Some("pearl-drop-earrings"));
    }

    #[test]
    fn test_normalize_rejects_bad_price() {
        assert!(new_product("Ring", 0).normalize().is_err());

        let mut fractional = new_product("Ring", 100);
        fractional.price = Decimal::new(1_001, 3);
        assert!(fractional.normalize().is_err());
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let update: ProductUpdate = serde_json::from_str(r#"{"gemstone": null}"#).unwrap();
        assert_eq!(update.gemstone, Some(None));
        assert_eq!(update.image_url, None);
    }

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination::new(Some(0), Some(1_000));
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, MAX_PER_PAGE);
        assert_eq!(Pagination::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn test_page_from_sorted() {
        let page = Page::from_sorted((1..=25).collect::<Vec<_>>(), Pagination::new(Some(3), Some(10)));
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
    }
}
