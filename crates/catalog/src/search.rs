//! Storefront product search: text terms, filters, sort orders, pagination.
//!
//! `search` is the reference implementation used by the in-memory store. The
//! Postgres store expresses the same rules in SQL.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, Money, Page, PageRequest, ProductId};

use crate::Product;

/// Storefront sort order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortOrder {
    #[default]
    Name,
    PriceAsc,
    PriceDesc,
    Relevance,
    TopRated,
}

/// Filters accepted by the storefront listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSearchFilters {
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub min_price: Option<Money>,
    #[serde(default)]
    pub max_price: Option<Money>,
    #[serde(default)]
    pub in_stock_only: bool,
    #[serde(default)]
    pub sort: ProductSortOrder,
}

/// Lowercased search terms split on whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTerms(Vec<String>);

impl SearchTerms {
    pub fn parse(term: Option<&str>) -> Self {
        let terms = term
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        Self(terms)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Every term must appear in the name or in the description.
    pub fn matches(&self, product: &Product) -> bool {
        let name = product.name.to_lowercase();
        let description = product.description.as_deref().unwrap_or_default().to_lowercase();
        self.0
            .iter()
            .all(|t| name.contains(t.as_str()) || description.contains(t.as_str()))
    }
}

/// Relevance score: two points per term found in the name, one per term
/// found in the description.
pub fn relevance(product: &Product, terms: &SearchTerms) -> u32 {
    let name = product.name.to_lowercase();
    let description = product.description.as_deref().unwrap_or_default().to_lowercase();
    terms
        .0
        .iter()
        .map(|t| {
            let in_name = if name.contains(t.as_str()) { 2 } else { 0 };
            let in_description = if description.contains(t.as_str()) { 1 } else { 0 };
            in_name + in_description
        })
        .sum()
}

impl ProductSearchFilters {
    /// Non-text filters (category, price window, stock).
    pub fn accepts(&self, product: &Product) -> bool {
        if let Some(category_id) = self.category_id {
            if product.category_id != category_id {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }
        !self.in_stock_only || product.in_stock()
    }
}

/// Filter, sort and paginate `products`.
///
/// `ratings` holds the average rating of every reviewed product; products
/// missing from it are treated as unrated and sort last under `TopRated`.
pub fn search(
    products: &[Product],
    filters: &ProductSearchFilters,
    ratings: &HashMap<ProductId, f64>,
    page: PageRequest,
) -> Page<Product> {
    let terms = SearchTerms::parse(filters.term.as_deref());

    let mut matched: Vec<&Product> = products
        .iter()
        .filter(|p| terms.matches(p) && filters.accepts(p))
        .collect();

    // Id breaks name ties so paging is stable across stores.
    let by_name = |a: &&Product, b: &&Product| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id));
    match filters.sort {
        ProductSortOrder::Name => matched.sort_by(by_name),
        ProductSortOrder::PriceAsc => {
            matched.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| by_name(a, b)))
        }
        ProductSortOrder::PriceDesc => {
            matched.sort_by(|a, b| b.price.cmp(&a.price).then_with(|| by_name(a, b)))
        }
        ProductSortOrder::Relevance if terms.is_empty() => matched.sort_by(by_name),
        ProductSortOrder::Relevance => matched.sort_by(|a, b| {
            relevance(b, &terms)
                .cmp(&relevance(a, &terms))
                .then_with(|| by_name(a, b))
        }),
        ProductSortOrder::TopRated => matched.sort_by(|a, b| {
            compare_ratings(ratings.get(&a.id), ratings.get(&b.id)).then_with(|| by_name(a, b))
        }),
    }

    let owned: Vec<Product> = matched.into_iter().cloned().collect();
    Page::from_vec(owned, page)
}

/// Higher average first; unrated last.
fn compare_ratings(a: Option<&f64>, b: Option<&f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn product(name: &str, description: &str, cents: i64, stock: i64, category_id: CategoryId) -> Product {
        Product {
            id: ProductId::new(),
            name: name.to_string(),
            description: Some(description.to_string()),
            price: Money::from_cents(cents),
            stock,
            image_url: None,
            category_id,
        }
    }

    fn names(page: &Page<Product>) -> Vec<&str> {
        page.items.iter().map(|p| p.name.as_str()).collect()
    }

    fn catalog() -> (Vec<Product>, CategoryId, CategoryId) {
        let papers = CategoryId::new();
        let pipes = CategoryId::new();
        let products = vec![
            product("Seda Slim", "papel de enrolar fino", 800, 5, papers),
            product("Piteira Vidro", "acessorio em vidro para seda", 2500, 0, pipes),
            product("Bong Vidro", "vidro borossilicato", 15000, 2, pipes),
            product("Seda Brown", "papel sem branqueamento", 900, 12, papers),
        ];
        (products, papers, pipes)
    }

    #[test]
    fn every_term_must_match_name_or_description() {
        let (products, _, _) = catalog();
        let filters = ProductSearchFilters {
            term: Some("  SEDA   papel ".into()),
            ..Default::default()
        };
        let page = search(&products, &filters, &HashMap::new(), PageRequest::new(1, 12));
        assert_eq!(names(&page), vec!["Seda Brown", "Seda Slim"]);
    }

    #[test]
    fn blank_term_applies_no_text_filter() {
        let (products, _, _) = catalog();
        let filters = ProductSearchFilters {
            term: Some("   ".into()),
            ..Default::default()
        };
        let page = search(&products, &filters, &HashMap::new(), PageRequest::new(1, 12));
        assert_eq!(page.total_count, 4);
    }

    #[test]
    fn category_price_and_stock_filters_combine() {
        let (products, _, pipes) = catalog();
        let filters = ProductSearchFilters {
            category_id: Some(pipes),
            min_price: Some(Money::from_cents(2500)),
            max_price: Some(Money::from_cents(15000)),
            in_stock_only: true,
            ..Default::default()
        };
        let page = search(&products, &filters, &HashMap::new(), PageRequest::new(1, 12));
        assert_eq!(names(&page), vec!["Bong Vidro"]);
    }

    #[test]
    fn price_sorts() {
        let (products, _, _) = catalog();
        let mut filters = ProductSearchFilters {
            sort: ProductSortOrder::PriceAsc,
            ..Default::default()
        };
        let page = search(&products, &filters, &HashMap::new(), PageRequest::new(1, 12));
        assert_eq!(names(&page), vec!["Seda Slim", "Seda Brown", "Piteira Vidro", "Bong Vidro"]);

        filters.sort = ProductSortOrder::PriceDesc;
        let page = search(&products, &filters, &HashMap::new(), PageRequest::new(1, 12));
        assert_eq!(names(&page)[0], "Bong Vidro");
    }

    #[test]
    fn relevance_prefers_name_hits() {
        let (products, _, _) = catalog();
        let filters = ProductSearchFilters {
            term: Some("seda".into()),
            sort: ProductSortOrder::Relevance,
            ..Default::default()
        };
        let page = search(&products, &filters, &HashMap::new(), PageRequest::new(1, 12));
        // name hits (2 points) before the description-only hit (1 point)
        assert_eq!(names(&page), vec!["Seda Brown", "Seda Slim", "Piteira Vidro"]);
    }

    #[test]
    fn relevance_without_terms_falls_back_to_name() {
        let (products, _, _) = catalog();
        let filters = ProductSearchFilters {
            sort: ProductSortOrder::Relevance,
            ..Default::default()
        };
        let page = search(&products, &filters, &HashMap::new(), PageRequest::new(1, 12));
        assert_eq!(names(&page), vec!["Bong Vidro", "Piteira Vidro", "Seda Brown", "Seda Slim"]);
    }

    #[test]
    fn top_rated_puts_unrated_last() {
        let (products, _, _) = catalog();
        let mut ratings = HashMap::new();
        ratings.insert(products[3].id, 3.5);
        ratings.insert(products[1].id, 4.8);
        let filters = ProductSearchFilters {
            sort: ProductSortOrder::TopRated,
            ..Default::default()
        };
        let page = search(&products, &filters, &ratings, PageRequest::new(1, 12));
        assert_eq!(names(&page), vec!["Piteira Vidro", "Seda Brown", "Bong Vidro", "Seda Slim"]);
    }

    #[test]
    fn duplicate_names_page_in_id_order() {
        let c = CategoryId::new();
        let mut products: Vec<Product> = (0..6).map(|i| product("Seda", "papel", 100 + i, 1, c)).collect();
        products.reverse();
        let mut expected: Vec<ProductId> = products.iter().map(|p| p.id).collect();
        expected.sort();

        let seen: Vec<ProductId> = (1..=3)
            .flat_map(|n| {
                search(&products, &ProductSearchFilters::default(), &HashMap::new(), PageRequest::new(n, 2)).items
            })
            .map(|p| p.id)
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn pagination_reports_total_before_slicing() {
        let (products, _, _) = catalog();
        let page = search(&products, &ProductSearchFilters::default(), &HashMap::new(), PageRequest::new(2, 3));
        assert_eq!(page.total_count, 4);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages(), 2);
    }

    proptest! {
        #[test]
        fn results_always_satisfy_filters(
            prices in proptest::collection::vec(0i64..10_000, 1..30),
            min in 0i64..5_000,
            span in 0i64..5_000,
        ) {
            let category = CategoryId::new();
            let products: Vec<Product> = prices
                .iter()
                .enumerate()
                .map(|(i, cents)| product(&format!("p{i}"), "", *cents, (i % 3) as i64, category))
                .collect();
            let filters = ProductSearchFilters {
                min_price: Some(Money::from_cents(min)),
                max_price: Some(Money::from_cents(min + span)),
                in_stock_only: true,
                ..Default::default()
            };
            let page = search(&products, &filters, &HashMap::new(), PageRequest::new(1, 100));
            for p in &page.items {
                prop_assert!(p.price.cents() >= min && p.price.cents() <= min + span);
                prop_assert!(p.stock > 0);
            }
        }
    }
}
