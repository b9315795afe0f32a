//! REST collaborator for the marketplace API.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{BookingId, ServiceId},
    error::ApiError,
    protocol::{AddToWishlistRequest, ListEnvelope},
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::ClientSettings,
    error::{FetchError, MutationError},
    pagination::ListPage,
    query::{FilterKey, ListRequest, ResourceKind},
    session::SessionProvider,
    BookingActions, CollectionFetcher, WishlistActions,
};

pub struct HttpMarketplaceClient {
    http: Client,
    base_url: Url,
    session: Arc<dyn SessionProvider>,
}

impl HttpMarketplaceClient {
    pub fn new(base_url: &str, session: Arc<dyn SessionProvider>) -> Result<Self> {
        Self::with_client(Client::new(), base_url, session)
    }

    pub fn from_settings(
        settings: &ClientSettings,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build http client")?;
        Self::with_client(http, &settings.api_base_url, session)
    }

    fn with_client(http: Client, base_url: &str, session: Arc<dyn SessionProvider>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .with_context(|| format!("invalid api base url '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("api base url '{base_url}' cannot carry a path"));
        }
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.current_session() {
            Some(session) => builder.bearer_auth(session.token),
            None => builder,
        }
    }

    fn collection_segments(kind: ResourceKind, request: &ListRequest) -> &'static [&'static str] {
        match kind {
            ResourceKind::Bookings => &["bookings", "user"],
            ResourceKind::Services if request.filter(FilterKey::SearchQuery).is_some() => {
                &["services", "search"]
            }
            ResourceKind::Services => &["services"],
            ResourceKind::Wishlist => &["wishlist"],
        }
    }

    async fn send_mutation(&self, builder: RequestBuilder) -> Result<(), MutationError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|err| MutationError::Network(err.to_string()))?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(error_body(response).await.1.into())
    }
}

async fn error_body(response: Response) -> (u16, ApiError) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, ApiError::from_body(status, &body))
}

#[async_trait]
impl<T> CollectionFetcher<T> for HttpMarketplaceClient
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(
        &self,
        kind: ResourceKind,
        request: ListRequest,
    ) -> Result<ListPage<T>, FetchError> {
        let url = self.endpoint(Self::collection_segments(kind, &request));
        debug!(%kind, %url, page = request.page, "requesting collection page");

        let response = self
            .authorize(self.http.get(url))
            .query(&request.api_params())
            .send()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;

        if !response.status().is_success() {
            let (status, error) = error_body(response).await;
            warn!(%kind, status, message = %error.message, "collection request rejected");
            return Err(FetchError::from_api_error(status, error));
        }

        let status = response.status().as_u16();
        let envelope: ListEnvelope<T> =
            response
                .json()
                .await
                .map_err(|err| FetchError::Server {
                    status,
                    message: format!("malformed {kind} response: {err}"),
                })?;
        let total_count = envelope.total_count();
        Ok(ListPage::new(envelope.items, total_count))
    }
}

#[async_trait]
impl BookingActions for HttpMarketplaceClient {
    async fn cancel_booking(&self, booking_id: &BookingId) -> Result<(), MutationError> {
        let url = self.endpoint(&["bookings", booking_id.as_str(), "cancel"]);
        self.send_mutation(self.http.patch(url)).await
    }
}

#[async_trait]
impl WishlistActions for HttpMarketplaceClient {
    async fn add_to_wishlist(&self, service_id: &ServiceId) -> Result<(), MutationError> {
        let url = self.endpoint(&["wishlist"]);
        let body = AddToWishlistRequest {
            service_id: service_id.clone(),
        };
        self.send_mutation(self.http.post(url).json(&body)).await
    }

    async fn remove_wishlist_item(&self, service_id: &ServiceId) -> Result<(), MutationError> {
        let url = self.endpoint(&["wishlist", service_id.as_str()]);
        self.send_mutation(self.http.delete(url)).await
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
