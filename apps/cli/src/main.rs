mod render;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    load_settings, BookingList, ClientSettings, FilterKey, FilterValue, HttpMarketplaceClient,
    ListController, ListItem, ListStatus, MutationOutcome, PageSize, QueryState, ResourceKind,
    ServiceList, SessionProvider, StaticSession, WishlistList,
};
use shared::domain::{BookingId, BookingStatus, PriceType, ServiceId, UserId, WishlistItemId};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "care", about = "Browse services and manage bookings and saved services")]
struct Cli {
    /// Overrides `api_base_url` from marketplace.toml and the environment.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long, env = "MARKETPLACE_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long, env = "MARKETPLACE_USER_ID", default_value = "me")]
    user_id: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// One of 5, 10, 20, 50.
    #[arg(long)]
    page_size: Option<u32>,
}

#[derive(Args, Debug, Clone)]
struct BookingFilterArgs {
    /// pending, confirmed, in-progress, completed, cancelled or all.
    #[arg(long, default_value = "all")]
    status: String,
    #[command(flatten)]
    paging: PageArgs,
}

#[derive(Args, Debug, Clone)]
struct ServiceFilterArgs {
    #[arg(long)]
    query: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    /// hourly, fixed or daily.
    #[arg(long)]
    price_type: Option<String>,
    /// A shareable address query such as `category=c-1&page=2`; explicit flags win.
    #[arg(long)]
    location: Option<String>,
    #[command(flatten)]
    paging: PageArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Bookings(BookingsCommand),
    #[command(subcommand)]
    Services(ServicesCommand),
    #[command(subcommand)]
    Wishlist(WishlistCommand),
}

#[derive(Subcommand, Debug)]
enum BookingsCommand {
    List(BookingFilterArgs),
    /// Cancels a booking shown on the selected page.
    Cancel {
        booking_id: String,
        #[command(flatten)]
        filters: BookingFilterArgs,
    },
}

#[derive(Subcommand, Debug)]
enum ServicesCommand {
    Browse(ServiceFilterArgs),
    /// Adds a service shown on the selected page to the wishlist.
    Save {
        service_id: String,
        #[command(flatten)]
        filters: ServiceFilterArgs,
    },
}

#[derive(Subcommand, Debug)]
enum WishlistCommand {
    List(PageArgs),
    Remove {
        item_id: String,
        #[command(flatten)]
        paging: PageArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url.clone() {
        settings.api_base_url = api_url;
    }
    let session: Arc<dyn SessionProvider> = match cli.token.clone() {
        Some(token) => Arc::new(StaticSession::signed_in(UserId::new(cli.user_id.clone()), token)),
        None => Arc::new(StaticSession::anonymous()),
    };
    let api = Arc::new(HttpMarketplaceClient::from_settings(&settings, session.clone())?);
    info!(api = %settings.api_base_url, "marketplace client ready");

    let app = App {
        settings,
        session,
        api,
    };
    match cli.command {
        Command::Bookings(BookingsCommand::List(filters)) => {
            let bookings = app.bookings(&filters).await?;
            render::bookings(&bookings.snapshot().await);
        }
        Command::Bookings(BookingsCommand::Cancel {
            booking_id,
            filters,
        }) => {
            let bookings = app.bookings(&filters).await?;
            let booking_id = BookingId::new(booking_id);
            let outcome = bookings
                .cancel_booking(app.api.as_ref(), booking_id.clone())
                .await;
            report(outcome, &format!("cancelled booking {booking_id}"))?;
            render::bookings(&bookings.snapshot().await);
        }
        Command::Services(ServicesCommand::Browse(filters)) => {
            let services = app.services(&filters).await?;
            render::services(&services.snapshot().await);
        }
        Command::Services(ServicesCommand::Save {
            service_id,
            filters,
        }) => {
            if !app.session.is_authenticated() {
                bail!("sign in required to save services: visit {}", app.settings.login_path);
            }
            let services = app.services(&filters).await?;
            let service_id = ServiceId::new(service_id);
            let outcome = services
                .add_to_wishlist(app.api.as_ref(), service_id.clone())
                .await;
            report(outcome, &format!("saved service {service_id}"))?;
        }
        Command::Wishlist(WishlistCommand::List(paging)) => {
            let wishlist = app.wishlist(&paging).await?;
            render::wishlist(&wishlist.snapshot().await);
        }
        Command::Wishlist(WishlistCommand::Remove { item_id, paging }) => {
            let wishlist = app.wishlist(&paging).await?;
            let item_id = WishlistItemId::new(item_id);
            let outcome = wishlist
                .remove_from_wishlist(app.api.as_ref(), item_id.clone())
                .await;
            report(outcome, &format!("removed {item_id} from the wishlist"))?;
            render::wishlist(&wishlist.snapshot().await);
        }
    }

    Ok(())
}

struct App {
    settings: ClientSettings,
    session: Arc<dyn SessionProvider>,
    api: Arc<HttpMarketplaceClient>,
}

impl App {
    async fn bookings(&self, args: &BookingFilterArgs) -> Result<Arc<BookingList>> {
        let mut query = self.base_query(&args.paging)?;
        if !args.status.trim().eq_ignore_ascii_case("all") {
            let status = BookingStatus::parse(&args.status)
                .with_context(|| format!("unknown booking status '{}'", args.status))?;
            query.filters.insert(FilterKey::Status, status.into());
        }
        let list = BookingList::with_query(
            ResourceKind::Bookings,
            self.api.clone(),
            self.settings.default_page_size,
            query,
        );
        self.mount(list).await
    }

    async fn services(&self, args: &ServiceFilterArgs) -> Result<Arc<ServiceList>> {
        let mut query = match &args.location {
            Some(location) => QueryState::from_location_query(
                ResourceKind::Services,
                location,
                self.settings.default_page_size,
            ),
            None => QueryState::with_page_size(self.settings.default_page_size),
        };
        apply_paging(&mut query, &args.paging)?;

        let price_type = match &args.price_type {
            Some(raw) => Some(
                PriceType::parse(raw).with_context(|| format!("unknown price type '{raw}'"))?,
            ),
            None => None,
        };
        let explicit = [
            (FilterKey::SearchQuery, args.query.clone().map(FilterValue::from)),
            (FilterKey::CategoryId, args.category.clone().map(FilterValue::from)),
            (FilterKey::MinPrice, args.min_price.map(FilterValue::from)),
            (FilterKey::MaxPrice, args.max_price.map(FilterValue::from)),
            (FilterKey::PriceType, price_type.map(FilterValue::from)),
        ];
        for (key, value) in explicit {
            if let Some(value) = value.and_then(FilterValue::normalized) {
                query.filters.insert(key, value);
            }
        }

        let list = ServiceList::with_query(
            ResourceKind::Services,
            self.api.clone(),
            self.settings.default_page_size,
            query,
        );
        self.mount(list).await
    }

    async fn wishlist(&self, args: &PageArgs) -> Result<Arc<WishlistList>> {
        let query = self.base_query(args)?;
        let list = WishlistList::with_query(
            ResourceKind::Wishlist,
            self.api.clone(),
            self.settings.default_page_size,
            query,
        );
        self.mount(list).await
    }

    fn base_query(&self, args: &PageArgs) -> Result<QueryState> {
        let mut query = QueryState::with_page_size(self.settings.default_page_size);
        apply_paging(&mut query, args)?;
        Ok(query)
    }

    async fn mount<T: ListItem>(
        &self,
        list: Arc<ListController<T>>,
    ) -> Result<Arc<ListController<T>>> {
        list.mount(self.session.as_ref(), &self.settings.login_path)
            .await
            .context("pass --token or set MARKETPLACE_TOKEN")?;
        if let ListStatus::Error(message) = list.status().await {
            bail!("could not load {}: {message}", list.kind().noun());
        }
        Ok(list)
    }
}

/// Explicit flags win over values taken from a location query; page 1 is the
/// flag default and never overrides.
fn apply_paging(query: &mut QueryState, args: &PageArgs) -> Result<()> {
    if args.page != 1 {
        query.page = args.page;
    }
    if let Some(size) = args.page_size {
        query.page_size = PageSize::try_from(size)?;
    }
    Ok(())
}

fn report(outcome: MutationOutcome, success: &str) -> Result<()> {
    match outcome {
        MutationOutcome::Completed => {
            println!("{success}");
            Ok(())
        }
        MutationOutcome::Failed(message) => bail!(message),
        MutationOutcome::Busy => bail!("another change to this item is still in progress"),
        MutationOutcome::UnknownItem => {
            bail!("item is not on the selected page; adjust --page or the filters")
        }
    }
}
