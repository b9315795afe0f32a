use async_trait::async_trait;
use shared::domain::{BookingId, ServiceId};

pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod pagination;
pub mod query;
pub mod resources;
pub mod session;

pub use config::{load_settings, ClientSettings};
pub use controller::{ListController, ListEvent, ListItem, ListSnapshot, ListStatus, MutationOutcome};
pub use error::{FetchError, MountError, MutationError};
pub use http::HttpMarketplaceClient;
pub use pagination::ListPage;
pub use query::{FilterKey, FilterValue, ListRequest, PageSize, QueryState, ResourceKind};
pub use resources::{BookingList, ServiceList, WishlistList};
pub use session::{Session, SessionProvider, StaticSession};

/// Fetches one page of a remote collection. Timeouts are the implementor's
/// concern.
#[async_trait]
pub trait CollectionFetcher<T>: Send + Sync {
    async fn fetch(&self, kind: ResourceKind, request: ListRequest)
        -> Result<ListPage<T>, FetchError>;
}

#[async_trait]
pub trait BookingActions: Send + Sync {
    async fn cancel_booking(&self, booking_id: &BookingId) -> Result<(), MutationError>;
}

#[async_trait]
pub trait WishlistActions: Send + Sync {
    async fn add_to_wishlist(&self, service_id: &ServiceId) -> Result<(), MutationError>;
    async fn remove_wishlist_item(&self, service_id: &ServiceId) -> Result<(), MutationError>;
}
