//! Search filter set and its two evaluators: SQL generation for the Postgres
//! store and an in-memory predicate with identical semantics.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::domain::{Category, Furnished, Listing, ListingKind, ListingStatus};

/// Optional, independently combinable search predicates (logical AND).
///
/// Query-string values that fail to parse into the expected type are treated
/// as if the filter had not been supplied, so a stray `minPrice=abc` never
/// fails a public search request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    #[serde(rename = "type", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ListingKind>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub furnished: Option<Furnished>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub pet_friendly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

/// Pagination parameters, 1-indexed, same lenient parsing policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageParams {
    #[serde(deserialize_with = "lenient")]
    pub page: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub limit: Option<u64>,
}

impl PageParams {
    pub fn resolve(&self, default_size: u64, max_size: u64) -> (u64, u64) {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(1);
        let size = self.limit.filter(|l| *l >= 1).unwrap_or(default_size).min(max_size);
        (page, size)
    }
}

/// One page of search results with total/count metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage<T> {
    pub items: Vec<T>,
    pub count: usize,
    pub total: u64,
    pub page_count: u64,
    pub page: u64,
}

pub fn page_count(total: u64, page_size: u64) -> u64 {
    total.div_ceil(page_size.max(1))
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse::<T>().ok()))
}

impl SearchFilters {
    /// Generate the WHERE clause for the public search, pinned to published
    /// listings. Placeholders are numbered from `$1`; the caller binds the
    /// returned params in order.
    pub fn to_where_sql(&self) -> (String, Vec<Value>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        let mut arg = |params: &mut Vec<Value>, value: Value| {
            params.push(value);
            format!("${}", params.len())
        };

        conditions.push(format!(
            "\"status\" = {}",
            arg(&mut params, Value::from(ListingStatus::Published.as_str()))
        ));
        if let Some(kind) = self.kind {
            conditions.push(format!("\"type\" = {}", arg(&mut params, Value::from(kind.as_str()))));
        }
        if let Some(category) = self.property_type {
            conditions.push(format!(
                "\"property_type\" = {}",
                arg(&mut params, Value::from(category.as_str()))
            ));
        }
        if let Some(city) = &self.city {
            conditions.push(format!(
                "\"city\" ILIKE {}",
                arg(&mut params, Value::from(contains_pattern(city)))
            ));
        }
        if let Some(bedrooms) = self.bedrooms {
            conditions.push(format!(
                "\"bedrooms\" >= {}",
                arg(&mut params, Value::from(bedrooms as i64))
            ));
        }
        if let Some(min) = self.min_price {
            conditions.push(format!("\"price\" >= {}", arg(&mut params, Value::from(min))));
        }
        if let Some(max) = self.max_price {
            conditions.push(format!("\"price\" <= {}", arg(&mut params, Value::from(max))));
        }
        if let Some(furnished) = self.furnished {
            conditions.push(format!(
                "\"furnished\" = {}",
                arg(&mut params, Value::from(furnished.as_str()))
            ));
        }
        if let Some(pet_friendly) = self.pet_friendly {
            conditions.push(format!(
                "\"pet_friendly\" = {}",
                arg(&mut params, Value::from(pet_friendly))
            ));
        }
        if let Some(keyword) = &self.keyword {
            let pattern = contains_pattern(keyword);
            let first = arg(&mut params, Value::from(pattern.clone()));
            let second = arg(&mut params, Value::from(pattern));
            conditions.push(format!(
                "(\"title\" ILIKE {} OR \"description\" ILIKE {})",
                first, second
            ));
        }

        (conditions.join(" AND "), params)
    }

    /// In-memory evaluation of the same predicate, published-status pin
    /// included.
    pub fn matches(&self, listing: &Listing) -> bool {
        if listing.status != ListingStatus::Published {
            return false;
        }
        if let Some(kind) = self.kind {
            if listing.kind != kind {
                return false;
            }
        }
        if let Some(category) = self.property_type {
            if listing.property_type != category {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !contains_ci(&listing.city, city) {
                return false;
            }
        }
        if let Some(bedrooms) = self.bedrooms {
            if listing.bedrooms < bedrooms {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if listing.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if listing.price > max {
                return false;
            }
        }
        if let Some(furnished) = self.furnished {
            if listing.furnished != furnished {
                return false;
            }
        }
        if let Some(pet_friendly) = self.pet_friendly {
            if listing.pet_friendly != pet_friendly {
                return false;
            }
        }
        if let Some(keyword) = &self.keyword {
            if !contains_ci(&listing.title, keyword) && !contains_ci(&listing.description, keyword) {
                return false;
            }
        }
        true
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Build an ILIKE substring pattern with LIKE metacharacters escaped.
fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ListingInput;
    use serde_json::json;
    use uuid::Uuid;

    fn published(city: &str, price: f64, bedrooms: u32, title: &str) -> Listing {
        let mut listing = ListingInput {
            title: Some(title.to_string()),
            description: Some("desc".to_string()),
            price: Some(price),
            kind: Some(ListingKind::Sale),
            property_type: Some(Category::House),
            bedrooms: Some(bedrooms),
            address: Some("1 Main St".to_string()),
            city: Some(city.to_string()),
            state: Some("CA".to_string()),
            ..Default::default()
        }
        .into_listing(Uuid::new_v4())
        .unwrap();
        listing.status = ListingStatus::Published;
        listing
    }

    #[test]
    fn empty_filters_pin_published_only() {
        let (sql, params) = SearchFilters::default().to_where_sql();
        assert_eq!(sql, "\"status\" = $1");
        assert_eq!(params, vec![Value::from("published")]);

        let mut draft = published("X", 1.0, 0, "t");
        draft.status = ListingStatus::Draft;
        assert!(!SearchFilters::default().matches(&draft));
    }

    #[test]
    fn all_filters_produce_ordered_placeholders() {
        let filters = SearchFilters {
            kind: Some(ListingKind::Rent),
            property_type: Some(Category::Condo),
            city: Some("Austin".to_string()),
            bedrooms: Some(2),
            min_price: Some(1000.0),
            max_price: Some(3000.0),
            furnished: Some(Furnished::SemiFurnished),
            pet_friendly: Some(true),
            keyword: Some("garden".to_string()),
        };
        let (sql, params) = filters.to_where_sql();
        assert_eq!(params.len(), 11);
        assert!(sql.contains("\"city\" ILIKE $4"));
        assert!(sql.contains("(\"title\" ILIKE $10 OR \"description\" ILIKE $11)"));
        assert_eq!(params[3], Value::from("%Austin%"));
        assert_eq!(params[9], Value::from("%garden%"));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        let filters = SearchFilters {
            city: Some("50%_off".to_string()),
            ..Default::default()
        };
        let (_, params) = filters.to_where_sql();
        assert_eq!(params[1], Value::from("%50\\%\\_off%"));
    }

    #[test]
    fn predicate_matches_every_supplied_filter() {
        let listing = published("Springfield", 200_000.0, 3, "Cozy garden home");
        let filters = SearchFilters {
            city: Some("spring".to_string()),
            bedrooms: Some(2),
            min_price: Some(100_000.0),
            max_price: Some(250_000.0),
            keyword: Some("GARDEN".to_string()),
            ..Default::default()
        };
        assert!(filters.matches(&listing));

        let too_expensive = SearchFilters {
            max_price: Some(150_000.0),
            ..filters.clone()
        };
        assert!(!too_expensive.matches(&listing));

        let wrong_city = SearchFilters {
            city: Some("Portland".to_string()),
            ..filters
        };
        assert!(!wrong_city.matches(&listing));
    }

    #[test]
    fn keyword_matches_description_too() {
        let mut listing = published("X", 1.0, 0, "Plain title");
        listing.description = "Has a wraparound porch".to_string();
        let filters = SearchFilters {
            keyword: Some("porch".to_string()),
            ..Default::default()
        };
        assert!(filters.matches(&listing));
    }

    #[test]
    fn malformed_values_are_ignored() {
        let filters: SearchFilters = serde_json::from_value(json!({
            "minPrice": "abc",
            "bedrooms": "two",
            "petFriendly": "yes",
            "type": "lease",
            "city": "Austin"
        }))
        .unwrap();
        assert_eq!(filters.min_price, None);
        assert_eq!(filters.bedrooms, None);
        assert_eq!(filters.pet_friendly, None);
        assert_eq!(filters.kind, None);
        assert_eq!(filters.city.as_deref(), Some("Austin"));
    }

    #[test]
    fn well_formed_values_parse() {
        let filters: SearchFilters = serde_json::from_value(json!({
            "minPrice": "1000",
            "maxPrice": "2500.5",
            "bedrooms": "2",
            "petFriendly": "true",
            "type": "rent",
            "furnished": "semi-furnished"
        }))
        .unwrap();
        assert_eq!(filters.min_price, Some(1000.0));
        assert_eq!(filters.max_price, Some(2500.5));
        assert_eq!(filters.bedrooms, Some(2));
        assert_eq!(filters.pet_friendly, Some(true));
        assert_eq!(filters.kind, Some(ListingKind::Rent));
        assert_eq!(filters.furnished, Some(Furnished::SemiFurnished));
    }

    #[test]
    fn page_math() {
        assert_eq!(page_count(0, 12), 0);
        assert_eq!(page_count(12, 12), 1);
        assert_eq!(page_count(13, 12), 2);

        let params = PageParams {
            page: Some(0),
            limit: Some(500),
        };
        assert_eq!(params.resolve(12, 100), (1, 100));
        assert_eq!(PageParams::default().resolve(12, 100), (1, 12));
    }
}
