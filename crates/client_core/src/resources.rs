//! Bookings, services and wishlist views on top of [`ListController`].

use shared::{
    domain::{BookingId, ServiceId, WishlistItemId},
    protocol::{Booking, Service, WishlistItem},
};

use crate::{
    controller::{ListController, ListItem, MutationOutcome},
    error::MutationError,
    BookingActions, WishlistActions,
};

pub type BookingList = ListController<Booking>;
pub type ServiceList = ListController<Service>;
pub type WishlistList = ListController<WishlistItem>;

impl ListItem for Booking {
    type Id = BookingId;

    fn item_id(&self) -> BookingId {
        self.id.clone()
    }
}

impl ListItem for Service {
    type Id = ServiceId;

    fn item_id(&self) -> ServiceId {
        self.id.clone()
    }
}

impl ListItem for WishlistItem {
    type Id = WishlistItemId;

    fn item_id(&self) -> WishlistItemId {
        self.id.clone()
    }
}

impl ListController<Booking> {
    /// Bookings that already started, finished or were cancelled are rejected
    /// locally and reported on the row, without calling the API.
    pub async fn cancel_booking(
        &self,
        api: &dyn BookingActions,
        booking_id: BookingId,
    ) -> MutationOutcome {
        let status = self.item(&booking_id).await.map(|booking| booking.status);
        let target = booking_id.clone();
        self.mutate(booking_id, || async move {
            match status {
                Some(status) if !status.is_cancellable() => Err(MutationError::NotAllowed(
                    format!("{} bookings cannot be cancelled", status.label().to_lowercase()),
                )),
                _ => api.cancel_booking(&target).await,
            }
        })
        .await
    }
}

impl ListController<WishlistItem> {
    /// Removal is keyed by the row but the API takes the saved service id.
    pub async fn remove_from_wishlist(
        &self,
        api: &dyn WishlistActions,
        item_id: WishlistItemId,
    ) -> MutationOutcome {
        let service_id = self
            .item(&item_id)
            .await
            .and_then(|item| item.service.map(|service| service.id));
        self.mutate(item_id, || async move {
            let Some(service_id) = service_id else {
                return Err(MutationError::NotAllowed(
                    "service information unavailable".to_string(),
                ));
            };
            api.remove_wishlist_item(&service_id).await
        })
        .await
    }
}

impl ListController<Service> {
    pub async fn add_to_wishlist(
        &self,
        api: &dyn WishlistActions,
        service_id: ServiceId,
    ) -> MutationOutcome {
        let target = service_id.clone();
        self.mutate(service_id, || async move { api.add_to_wishlist(&target).await })
            .await
    }
}

#[cfg(test)]
#[path = "tests/resources_tests.rs"]
mod tests;
