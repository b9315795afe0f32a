//! Query state for a remote collection: page, page size and filters, plus
//! the projection of that state into the page's location query string.

use std::{collections::BTreeMap, fmt};

use shared::domain::{BookingStatus, CategoryId, PriceType};
use thiserror::Error;
use url::form_urlencoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Bookings,
    Services,
    Wishlist,
}

impl ResourceKind {
    pub fn supported_filters(self) -> &'static [FilterKey] {
        match self {
            ResourceKind::Bookings => &[FilterKey::Status],
            ResourceKind::Services => &[
                FilterKey::CategoryId,
                FilterKey::MinPrice,
                FilterKey::MaxPrice,
                FilterKey::PriceType,
                FilterKey::SearchQuery,
            ],
            ResourceKind::Wishlist => &[],
        }
    }

    pub fn supports(self, key: FilterKey) -> bool {
        self.supported_filters().contains(&key)
    }

    /// Browsing services is public; bookings and the wishlist belong to a user.
    pub fn requires_auth(self) -> bool {
        !matches!(self, ResourceKind::Services)
    }

    pub fn noun(self) -> &'static str {
        match self {
            ResourceKind::Bookings => "bookings",
            ResourceKind::Services => "services",
            ResourceKind::Wishlist => "saved services",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Bookings => "bookings",
            ResourceKind::Services => "services",
            ResourceKind::Wishlist => "wishlist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKey {
    Status,
    MinPrice,
    MaxPrice,
    PriceType,
    CategoryId,
    SearchQuery,
}

impl FilterKey {
    pub const ALL: [FilterKey; 6] = [
        FilterKey::Status,
        FilterKey::MinPrice,
        FilterKey::MaxPrice,
        FilterKey::PriceType,
        FilterKey::CategoryId,
        FilterKey::SearchQuery,
    ];

    /// Query parameter name understood by the marketplace API.
    pub fn api_param(self) -> &'static str {
        match self {
            FilterKey::Status => "status",
            FilterKey::MinPrice => "minPrice",
            FilterKey::MaxPrice => "maxPrice",
            FilterKey::PriceType => "priceType",
            FilterKey::CategoryId => "categoryId",
            FilterKey::SearchQuery => "q",
        }
    }

    /// Parameter name used in the shareable page address.
    pub fn location_param(self) -> &'static str {
        match self {
            FilterKey::Status => "status",
            FilterKey::MinPrice => "minPrice",
            FilterKey::MaxPrice => "maxPrice",
            FilterKey::PriceType => "priceType",
            FilterKey::CategoryId => "category",
            FilterKey::SearchQuery => "query",
        }
    }

    fn parse_location_value(self, kind: ResourceKind, raw: &str) -> Option<FilterValue> {
        let raw = raw.trim();
        let value = match self {
            FilterKey::MinPrice | FilterKey::MaxPrice => {
                raw.parse::<f64>().ok().map(FilterValue::Number)
            }
            FilterKey::Status if kind == ResourceKind::Bookings => {
                BookingStatus::parse(raw).map(FilterValue::from)
            }
            FilterKey::PriceType => PriceType::parse(raw).map(FilterValue::from),
            _ => Some(FilterValue::Text(raw.to_string())),
        };
        value.and_then(FilterValue::normalized)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
}

impl FilterValue {
    pub fn text(value: impl Into<String>) -> Self {
        FilterValue::Text(value.into())
    }

    /// Blank text and non-finite numbers mean "no filter".
    pub fn normalized(self) -> Option<Self> {
        match self {
            FilterValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else if trimmed.len() == text.len() {
                    Some(FilterValue::Text(text))
                } else {
                    Some(FilterValue::Text(trimmed.to_string()))
                }
            }
            FilterValue::Number(value) if value.is_finite() => Some(FilterValue::Number(value)),
            FilterValue::Number(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Text(text) => Some(text),
            FilterValue::Number(_) => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(text) => f.write_str(text),
            FilterValue::Number(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<BookingStatus> for FilterValue {
    fn from(value: BookingStatus) -> Self {
        FilterValue::Text(value.as_str().to_string())
    }
}

impl From<PriceType> for FilterValue {
    fn from(value: PriceType) -> Self {
        FilterValue::Text(value.as_str().to_string())
    }
}

impl From<CategoryId> for FilterValue {
    fn from(value: CategoryId) -> Self {
        FilterValue::Text(value.0)
    }
}

pub type Filters = BTreeMap<FilterKey, FilterValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("page size {0} is not one of 5, 10, 20, 50")]
pub struct InvalidPageSize(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageSize(u32);

impl PageSize {
    pub const OPTIONS: [u32; 4] = [5, 10, 20, 50];
    pub const DEFAULT: PageSize = PageSize(10);

    pub fn new(size: u32) -> Option<Self> {
        Self::OPTIONS.contains(&size).then_some(PageSize(size))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = PageSize> {
        Self::OPTIONS.into_iter().map(PageSize)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for PageSize {
    type Error = InvalidPageSize;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        PageSize::new(value).ok_or(InvalidPageSize(value))
    }
}

impl From<PageSize> for u32 {
    fn from(value: PageSize) -> Self {
        value.0
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What subset of a collection is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub page: u32,
    pub page_size: PageSize,
    pub filters: Filters,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::with_page_size(PageSize::DEFAULT)
    }
}

impl QueryState {
    pub fn with_page_size(page_size: PageSize) -> Self {
        Self {
            page: 1,
            page_size,
            filters: Filters::new(),
        }
    }

    pub fn request(&self) -> ListRequest {
        ListRequest {
            page: self.page,
            page_size: self.page_size,
            filters: self.filters.clone(),
        }
    }

    /// One-way projection into a shareable query string. `page` is omitted on
    /// the first page and `limit` when it matches the default size.
    pub fn to_location_query(&self, default_page_size: PageSize) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.filters {
            serializer.append_pair(key.location_param(), &value.to_string());
        }
        if self.page > 1 {
            serializer.append_pair("page", &self.page.to_string());
        }
        if self.page_size != default_page_size {
            serializer.append_pair("limit", &self.page_size.to_string());
        }
        serializer.finish()
    }

    /// Initial state at mount. Unknown parameters, filters the resource does
    /// not support and malformed values are ignored.
    pub fn from_location_query(kind: ResourceKind, raw: &str, default_page_size: PageSize) -> Self {
        let mut state = Self::with_page_size(default_page_size);
        let raw = raw.trim_start_matches('?');

        for (name, value) in form_urlencoded::parse(raw.as_bytes()) {
            match name.as_ref() {
                "page" => {
                    if let Ok(page) = value.trim().parse::<u32>() {
                        state.page = page.max(1);
                    }
                }
                "limit" | "pageSize" => {
                    if let Some(size) = value.trim().parse::<u32>().ok().and_then(PageSize::new) {
                        state.page_size = size;
                    }
                }
                other => {
                    let Some(key) = FilterKey::ALL
                        .into_iter()
                        .find(|key| key.location_param() == other)
                    else {
                        continue;
                    };
                    if !kind.supports(key) {
                        continue;
                    }
                    if let Some(parsed) = key.parse_location_value(kind, &value) {
                        state.filters.insert(key, parsed);
                    }
                }
            }
        }

        state
    }
}

/// Immutable request handed to the collection fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub page: u32,
    pub page_size: PageSize,
    pub filters: Filters,
}

impl ListRequest {
    pub fn filter(&self, key: FilterKey) -> Option<&FilterValue> {
        self.filters.get(&key)
    }

    /// `page`, `limit` and one parameter per active filter. Absent filters are
    /// never sent, not even as empty strings.
    pub fn api_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("limit", self.page_size.to_string()),
        ];
        params.extend(
            self.filters
                .iter()
                .map(|(key, value)| (key.api_param(), value.to_string())),
        );
        params
    }
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;
