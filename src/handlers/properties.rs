use axum::{
    extract::{Query, State},
    http::HeaderMap,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::{self, Identity};
use crate::domain::{validate_listing, Listing, ListingInput, Role, User};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::query::{page_count, PageParams, SearchFilters, SearchPage};
use crate::response::{ApiResponse, ApiResult};
use crate::routes::AppState;

/// Roles allowed to create listings and use the listing-side AI helpers.
pub(crate) const LISTING_ROLES: &[Role] = &[Role::Seller, Role::Agent, Role::Admin];

/// Replace the raw owner id with a display summary, credential excluded.
fn with_owner(listing: &Listing, owner: Option<&User>, include_phone: bool) -> Value {
    let mut value = serde_json::to_value(listing).unwrap_or_default();
    if let Some(user) = owner {
        let mut summary = json!({
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "role": user.role,
            "verified": user.verified,
        });
        if include_phone {
            summary["phone"] = json!(user.phone);
        }
        value["owner"] = summary;
    }
    value
}

fn is_owner_or_admin(identity: &Identity, listing: &Listing) -> bool {
    listing.owner == identity.id || identity.role == Role::Admin
}

/// GET /api/properties — public search over published listings.
pub async fn search(
    State(state): State<AppState>,
    Query(filters): Query<SearchFilters>,
    Query(paging): Query<PageParams>,
) -> ApiResult<Value> {
    let (page, page_size) = paging.resolve(
        state.config.search.default_page_size,
        state.config.search.max_page_size,
    );
    let (listings, total) = state.store.search_listings(&filters, page, page_size).await?;

    let owner_ids: Vec<Uuid> = listings.iter().map(|l| l.owner).collect();
    let owners: HashMap<Uuid, User> = state
        .store
        .users_by_ids(&owner_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let items: Vec<Value> = listings
        .iter()
        .map(|l| with_owner(l, owners.get(&l.owner), false))
        .collect();
    let page = SearchPage {
        count: items.len(),
        items,
        total,
        page_count: page_count(total, page_size),
        page,
    };
    Ok(ApiResponse::success(serde_json::to_value(page).unwrap_or_default()))
}

/// GET /api/properties/user/my-listings — caller's own listings, any status.
pub async fn my_listings(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Value> {
    let identity = state.authenticate(&headers).await?;
    let listings = state.store.listings_by_owner(identity.id).await?;
    Ok(ApiResponse::success(json!({
        "count": listings.len(),
        "properties": listings,
    })))
}

/// GET /api/properties/:id — single listing with owner detail.
pub async fn get_by_id(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Value> {
    let listing = state
        .store
        .listing_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    let owner = state.store.user_by_id(listing.owner).await?;
    Ok(ApiResponse::success(json!({
        "property": with_owner(&listing, owner.as_ref(), true),
    })))
}

/// POST /api/properties — create, seller/agent/admin only.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(input): ApiJson<ListingInput>,
) -> ApiResult<Value> {
    let identity = state.authenticate(&headers).await?;
    auth::authorize(&identity, LISTING_ROLES)?;

    let listing = input.into_listing(identity.id)?;
    let listing = state.store.insert_listing(listing).await?;
    Ok(ApiResponse::created(json!({ "property": listing })))
}

/// PUT /api/properties/:id — update, owner or admin only.
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    headers: HeaderMap,
    ApiJson(patch): ApiJson<ListingInput>,
) -> ApiResult<Value> {
    let identity = state.authenticate(&headers).await?;
    let mut listing = state
        .store
        .listing_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    if !is_owner_or_admin(&identity, &listing) {
        return Err(ApiError::forbidden("Not authorized to update this property"));
    }

    patch.apply_to(&mut listing);
    validate_listing(&listing)?;
    let listing = state.store.update_listing(listing).await?;
    Ok(ApiResponse::success(json!({ "property": listing })))
}

/// DELETE /api/properties/:id — permanent removal, owner or admin only.
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Value> {
    let identity = state.authenticate(&headers).await?;
    let listing = state
        .store
        .listing_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    if !is_owner_or_admin(&identity, &listing) {
        return Err(ApiError::forbidden("Not authorized to delete this property"));
    }

    state.store.delete_listing(listing.id).await?;
    Ok(ApiResponse::success(json!({ "message": "Property deleted" })))
}
