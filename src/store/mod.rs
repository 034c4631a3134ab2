//! Storage traits for the two collections. The production implementation is
//! Postgres-backed; an in-memory implementation backs tests and local
//! development without a database.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Listing, User};
use crate::query::SearchFilters;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert_listing(&self, listing: Listing) -> Result<Listing, StoreError>;
    async fn listing_by_id(&self, id: Uuid) -> Result<Option<Listing>, StoreError>;
    /// Full-record replace keyed by id. `NotFound` if the id is absent.
    async fn update_listing(&self, listing: Listing) -> Result<Listing, StoreError>;
    /// Permanent removal. Returns false if the id was already absent.
    async fn delete_listing(&self, id: Uuid) -> Result<bool, StoreError>;
    /// All listings of one owner regardless of status, newest first.
    async fn listings_by_owner(&self, owner: Uuid) -> Result<Vec<Listing>, StoreError>;
    /// Public search over published listings: one page of items (newest
    /// first) plus the total match count disregarding pagination.
    async fn search_listings(
        &self,
        filters: &SearchFilters,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Listing>, u64), StoreError>;
    /// Newest published listings, used as chat context.
    async fn recent_published(&self, limit: u64) -> Result<Vec<Listing>, StoreError>;
}

/// Convenience supertrait so the router state can hold one store object.
pub trait Store: CredentialStore + ListingStore {}

impl<T: CredentialStore + ListingStore> Store for T {}
