use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ApiError;

/// Closed role enumeration. Authorization decisions match on this exhaustively
/// rather than comparing raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "agent" => Ok(Role::Agent),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// Identity record. The password hash is write-only from the API's
/// perspective and never serialized.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: String,
    pub agent_license: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The short profile shape returned by register/login responses.
    pub fn public_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "role": self.role,
            "verified": self.verified,
        })
    }

}

/// Sale vs rent, serialized on the wire as `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Sale,
    Rent,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::Sale => "sale",
            ListingKind::Rent => "rent",
        }
    }
}

impl FromStr for ListingKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(ListingKind::Sale),
            "rent" => Ok(ListingKind::Rent),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Apartment,
    House,
    Villa,
    Condo,
    Townhouse,
    Land,
    Commercial,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Apartment => "apartment",
            Category::House => "house",
            Category::Villa => "villa",
            Category::Condo => "condo",
            Category::Townhouse => "townhouse",
            Category::Land => "land",
            Category::Commercial => "commercial",
        }
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apartment" => Ok(Category::Apartment),
            "house" => Ok(Category::House),
            "villa" => Ok(Category::Villa),
            "condo" => Ok(Category::Condo),
            "townhouse" => Ok(Category::Townhouse),
            "land" => Ok(Category::Land),
            "commercial" => Ok(Category::Commercial),
            _ => Err(()),
        }
    }
}

/// No transition graph is enforced between these states; an authorized update
/// may set any value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Draft,
    Published,
    Pending,
    Sold,
    Rented,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Draft => "draft",
            ListingStatus::Published => "published",
            ListingStatus::Pending => "pending",
            ListingStatus::Sold => "sold",
            ListingStatus::Rented => "rented",
        }
    }
}

impl FromStr for ListingStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ListingStatus::Draft),
            "published" => Ok(ListingStatus::Published),
            "pending" => Ok(ListingStatus::Pending),
            "sold" => Ok(ListingStatus::Sold),
            "rented" => Ok(ListingStatus::Rented),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Furnished {
    Unfurnished,
    SemiFurnished,
    FullyFurnished,
}

impl Furnished {
    pub fn as_str(&self) -> &'static str {
        match self {
            Furnished::Unfurnished => "unfurnished",
            Furnished::SemiFurnished => "semi-furnished",
            Furnished::FullyFurnished => "fully-furnished",
        }
    }
}

impl FromStr for Furnished {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unfurnished" => Ok(Furnished::Unfurnished),
            "semi-furnished" => Ok(Furnished::SemiFurnished),
            "fully-furnished" => Ok(Furnished::FullyFurnished),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A property listing. Wire format is camelCase to match the browser client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: ListingKind,
    pub property_type: Category,
    pub bedrooms: u32,
    pub bathrooms: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqft: Option<f64>,
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    pub images: Vec<String>,
    pub amenities: Vec<String>,
    pub status: ListingStatus,
    pub owner: Uuid,
    #[serde(rename = "geoLocation", skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
    pub pet_friendly: bool,
    pub furnished: Furnished,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const TITLE_MAX_LEN: usize = 120;
pub const DESCRIPTION_MAX_LEN: usize = 2000;

/// Input schema for creating a listing. Deliberately separate from the stored
/// shape: the owner is always taken from the authenticated caller, so it
/// cannot be injected through the request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<ListingKind>,
    pub property_type: Option<Category>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub sqft: Option<f64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub images: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
    pub status: Option<ListingStatus>,
    #[serde(rename = "geoLocation")]
    pub geo: Option<GeoPoint>,
    pub pet_friendly: Option<bool>,
    pub furnished: Option<Furnished>,
}

impl ListingInput {
    /// Validate required fields and build the listing with the caller as owner.
    pub fn into_listing(self, owner: Uuid) -> Result<Listing, ApiError> {
        let mut errors = HashMap::new();
        let mut require = |field: &str, present: bool| {
            if !present {
                errors.insert(field.to_string(), format!("{} is required", field));
            }
        };
        require("title", self.title.as_deref().is_some_and(|s| !s.trim().is_empty()));
        require(
            "description",
            self.description.as_deref().is_some_and(|s| !s.trim().is_empty()),
        );
        require("price", self.price.is_some());
        require("type", self.kind.is_some());
        require("propertyType", self.property_type.is_some());
        require("address", self.address.as_deref().is_some_and(|s| !s.trim().is_empty()));
        require("city", self.city.as_deref().is_some_and(|s| !s.trim().is_empty()));
        require("state", self.state.as_deref().is_some_and(|s| !s.trim().is_empty()));

        if !errors.is_empty() {
            return Err(ApiError::validation("Missing required fields", Some(errors)));
        }

        let now = Utc::now();
        let listing = Listing {
            id: Uuid::new_v4(),
            title: self.title.unwrap_or_default().trim().to_string(),
            description: self.description.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            kind: self.kind.unwrap_or(ListingKind::Sale),
            property_type: self.property_type.unwrap_or(Category::House),
            bedrooms: self.bedrooms.unwrap_or(0),
            bathrooms: self.bathrooms.unwrap_or(0),
            sqft: self.sqft,
            address: self.address.unwrap_or_default(),
            city: self.city.unwrap_or_default().trim().to_string(),
            state: self.state.unwrap_or_default().trim().to_string(),
            zip_code: self.zip_code,
            images: self.images.unwrap_or_default(),
            amenities: self.amenities.unwrap_or_default(),
            status: self.status.unwrap_or(ListingStatus::Draft),
            owner,
            geo: self.geo,
            pet_friendly: self.pet_friendly.unwrap_or(false),
            furnished: self.furnished.unwrap_or(Furnished::Unfurnished),
            created_at: now,
            updated_at: now,
        };
        validate_listing(&listing)?;
        Ok(listing)
    }

    /// Merge provided fields into an existing listing. Absent fields are left
    /// untouched; the merged record is re-validated by the caller.
    pub fn apply_to(self, listing: &mut Listing) {
        if let Some(v) = self.title {
            listing.title = v.trim().to_string();
        }
        if let Some(v) = self.description {
            listing.description = v;
        }
        if let Some(v) = self.price {
            listing.price = v;
        }
        if let Some(v) = self.kind {
            listing.kind = v;
        }
        if let Some(v) = self.property_type {
            listing.property_type = v;
        }
        if let Some(v) = self.bedrooms {
            listing.bedrooms = v;
        }
        if let Some(v) = self.bathrooms {
            listing.bathrooms = v;
        }
        if let Some(v) = self.sqft {
            listing.sqft = Some(v);
        }
        if let Some(v) = self.address {
            listing.address = v;
        }
        if let Some(v) = self.city {
            listing.city = v.trim().to_string();
        }
        if let Some(v) = self.state {
            listing.state = v.trim().to_string();
        }
        if let Some(v) = self.zip_code {
            listing.zip_code = Some(v);
        }
        if let Some(v) = self.images {
            listing.images = v;
        }
        if let Some(v) = self.amenities {
            listing.amenities = v;
        }
        if let Some(v) = self.status {
            listing.status = v;
        }
        if let Some(v) = self.geo {
            listing.geo = Some(v);
        }
        if let Some(v) = self.pet_friendly {
            listing.pet_friendly = v;
        }
        if let Some(v) = self.furnished {
            listing.furnished = v;
        }
        listing.updated_at = Utc::now();
    }
}

/// Range and length checks shared by create and update.
pub fn validate_listing(listing: &Listing) -> Result<(), ApiError> {
    let mut errors = HashMap::new();

    if listing.title.chars().count() > TITLE_MAX_LEN {
        errors.insert(
            "title".to_string(),
            format!("title must be at most {} characters", TITLE_MAX_LEN),
        );
    }
    if listing.description.chars().count() > DESCRIPTION_MAX_LEN {
        errors.insert(
            "description".to_string(),
            format!("description must be at most {} characters", DESCRIPTION_MAX_LEN),
        );
    }
    if !listing.price.is_finite() || listing.price < 0.0 {
        errors.insert("price".to_string(), "price must be a non-negative number".to_string());
    }
    if let Some(sqft) = listing.sqft {
        if !sqft.is_finite() || sqft < 0.0 {
            errors.insert("sqft".to_string(), "sqft must be a non-negative number".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation("Validation failed", Some(errors)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_input() -> ListingInput {
        ListingInput {
            title: Some("Sunny loft".to_string()),
            description: Some("Bright corner unit".to_string()),
            price: Some(250_000.0),
            kind: Some(ListingKind::Sale),
            property_type: Some(Category::Apartment),
            address: Some("1 Main St".to_string()),
            city: Some("Springfield".to_string()),
            state: Some("IL".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn create_defaults_to_draft_and_owner() {
        let owner = Uuid::new_v4();
        let listing = full_input().into_listing(owner).unwrap();
        assert_eq!(listing.status, ListingStatus::Draft);
        assert_eq!(listing.owner, owner);
        assert_eq!(listing.bedrooms, 0);
        assert_eq!(listing.furnished, Furnished::Unfurnished);
        assert!(!listing.pet_friendly);
    }

    #[test]
    fn create_reports_every_missing_field() {
        let err = ListingInput::default().into_listing(Uuid::new_v4()).unwrap_err();
        match err {
            ApiError::Validation {
                field_errors: Some(errors),
                ..
            } => {
                for field in ["title", "description", "price", "type", "propertyType", "address", "city", "state"] {
                    assert!(errors.contains_key(field), "missing error for {}", field);
                }
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn title_over_limit_is_rejected() {
        let mut input = full_input();
        input.title = Some("x".repeat(TITLE_MAX_LEN + 1));
        let err = input.into_listing(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn negative_price_is_rejected_on_merge() {
        let mut listing = full_input().into_listing(Uuid::new_v4()).unwrap();
        let patch = ListingInput {
            price: Some(-1.0),
            ..Default::default()
        };
        patch.apply_to(&mut listing);
        assert!(validate_listing(&listing).is_err());
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let mut listing = full_input().into_listing(Uuid::new_v4()).unwrap();
        let patch = ListingInput {
            status: Some(ListingStatus::Published),
            ..Default::default()
        };
        patch.apply_to(&mut listing);
        assert_eq!(listing.status, ListingStatus::Published);
        assert_eq!(listing.title, "Sunny loft");
        assert!(listing.updated_at >= listing.created_at);
    }

    #[test]
    fn enum_wire_names_round_trip() {
        assert_eq!(serde_json::to_value(Furnished::SemiFurnished).unwrap(), "semi-furnished");
        assert_eq!(serde_json::to_value(ListingKind::Rent).unwrap(), "rent");
        assert_eq!("fully-furnished".parse::<Furnished>(), Ok(Furnished::FullyFurnished));
        assert!("penthouse".parse::<Category>().is_err());
    }

    #[test]
    fn listing_serializes_camel_case() {
        let listing = full_input().into_listing(Uuid::new_v4()).unwrap();
        let value = serde_json::to_value(&listing).unwrap();
        assert!(value.get("propertyType").is_some());
        assert!(value.get("petFriendly").is_some());
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["type"], "sale");
    }
}
