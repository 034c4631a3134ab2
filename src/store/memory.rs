//! In-memory store used by the integration tests and for running the API
//! without a database. Mirrors the Postgres implementation's semantics,
//! including ordering and pagination.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Listing, ListingStatus, User};
use crate::query::SearchFilters;

use super::{CredentialStore, ListingStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    listings: Vec<Listing>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; insertion order breaks timestamp ties so results are stable
/// even when records are created within the same instant.
fn newest_first(listings: &[Listing]) -> Vec<Listing> {
    let mut out: Vec<Listing> = listings.iter().rev().cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn insert_listing(&self, listing: Listing) -> Result<Listing, StoreError> {
        let mut inner = self.inner.write().await;
        inner.listings.push(listing.clone());
        Ok(listing)
    }

    async fn listing_by_id(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.listings.iter().find(|l| l.id == id).cloned())
    }

    async fn update_listing(&self, listing: Listing) -> Result<Listing, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.listings.iter_mut().find(|l| l.id == listing.id) {
            Some(slot) => {
                *slot = listing.clone();
                Ok(listing)
            }
            None => Err(StoreError::NotFound("Property")),
        }
    }

    async fn delete_listing(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.listings.len();
        inner.listings.retain(|l| l.id != id);
        Ok(inner.listings.len() < before)
    }

    async fn listings_by_owner(&self, owner: Uuid) -> Result<Vec<Listing>, StoreError> {
        let inner = self.inner.read().await;
        Ok(newest_first(&inner.listings)
            .into_iter()
            .filter(|l| l.owner == owner)
            .collect())
    }

    async fn search_listings(
        &self,
        filters: &SearchFilters,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Listing>, u64), StoreError> {
        let inner = self.inner.read().await;
        let matches: Vec<Listing> = newest_first(&inner.listings)
            .into_iter()
            .filter(|l| filters.matches(l))
            .collect();
        let total = matches.len() as u64;
        let offset = page.saturating_sub(1).saturating_mul(page_size) as usize;
        let items = matches
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();
        Ok((items, total))
    }

    async fn recent_published(&self, limit: u64) -> Result<Vec<Listing>, StoreError> {
        let inner = self.inner.read().await;
        Ok(newest_first(&inner.listings)
            .into_iter()
            .filter(|l| l.status == ListingStatus::Published)
            .take(limit as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, ListingInput, ListingKind};

    fn listing(owner: Uuid, title: &str, status: ListingStatus) -> Listing {
        let mut listing = ListingInput {
            title: Some(title.to_string()),
            description: Some("d".to_string()),
            price: Some(100.0),
            kind: Some(ListingKind::Sale),
            property_type: Some(Category::House),
            address: Some("1 Main".to_string()),
            city: Some("X".to_string()),
            state: Some("Y".to_string()),
            ..Default::default()
        }
        .into_listing(owner)
        .unwrap();
        listing.status = status;
        listing
    }

    #[tokio::test]
    async fn search_paginates_newest_first() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        for i in 0..5 {
            store
                .insert_listing(listing(owner, &format!("L{}", i), ListingStatus::Published))
                .await
                .unwrap();
        }

        let filters = SearchFilters::default();
        let (items, total) = store.search_listings(&filters, 1, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "L4");

        let (beyond, total) = store.search_listings(&filters, 4, 2).await.unwrap();
        assert_eq!(total, 5);
        assert!(beyond.is_empty());

        // An extreme page number must not overflow the offset computation
        let (far, total) = store.search_listings(&filters, u64::MAX, 2).await.unwrap();
        assert_eq!(total, 5);
        assert!(far.is_empty());
    }

    #[tokio::test]
    async fn delete_is_permanent() {
        let store = MemoryStore::new();
        let l = store
            .insert_listing(listing(Uuid::new_v4(), "L", ListingStatus::Draft))
            .await
            .unwrap();
        assert!(store.delete_listing(l.id).await.unwrap());
        assert!(!store.delete_listing(l.id).await.unwrap());
        assert!(store.listing_by_id(l.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recent_published_skips_drafts() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store
            .insert_listing(listing(owner, "draft", ListingStatus::Draft))
            .await
            .unwrap();
        store
            .insert_listing(listing(owner, "live", ListingStatus::Published))
            .await
            .unwrap();
        let recent = store.recent_published(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].title, "live");
    }
}
