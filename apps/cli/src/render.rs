use client_core::{ListItem, ListSnapshot, ListStatus};
use shared::protocol::{Booking, Service, WishlistItem};

pub fn bookings(snapshot: &ListSnapshot<Booking>) {
    print_list(snapshot, |booking| {
        let cancel_hint = if booking.status.is_cancellable() {
            "  [cancellable]"
        } else {
            ""
        };
        format!(
            "{:<26} {:<11} {}  {} with {}  {} min  ${:.2}{}",
            booking.id,
            booking.status.label(),
            booking.date_time.format("%Y-%m-%d %H:%M"),
            booking.service.title,
            booking.provider.display_name(),
            booking.duration,
            booking.total_price,
            cancel_hint
        )
    });
}

pub fn services(snapshot: &ListSnapshot<Service>) {
    print_list(snapshot, |service| {
        let unit = service
            .price_type
            .map(|price_type| format!("/{}", price_type.as_str()))
            .unwrap_or_default();
        format!("{:<26} {}  ${:.2}{}", service.id, service.title, service.price, unit)
    });
}

pub fn wishlist(snapshot: &ListSnapshot<WishlistItem>) {
    print_list(snapshot, |item| match &item.service {
        Some(service) => {
            let price = service
                .price
                .map(|price| format!("  ${price:.2}"))
                .unwrap_or_default();
            format!("{:<26} {}{}", item.id, service.title, price)
        }
        None => format!("{:<26} Service information unavailable", item.id),
    });
}

fn print_list<T: ListItem>(snapshot: &ListSnapshot<T>, row: impl Fn(&T) -> String) {
    if let ListStatus::Error(message) = &snapshot.status {
        println!("error: {message}");
        return;
    }
    if snapshot.items.is_empty() {
        println!("No {} found.", snapshot.kind.noun());
        return;
    }

    for item in &snapshot.items {
        let id = item.item_id();
        println!("{}", row(item));
        if let Some(error) = snapshot.mutation_error(&id) {
            println!("    ! {error}");
        }
    }

    println!();
    println!("{}", snapshot.summary());
    let window: Vec<String> = snapshot
        .page_window
        .iter()
        .map(|page| {
            if *page == snapshot.query.page {
                format!("[{page}]")
            } else {
                page.to_string()
            }
        })
        .collect();
    println!(
        "{} {} {}   page {} of {}",
        if snapshot.has_previous { "<" } else { " " },
        window.join(" "),
        if snapshot.has_next { ">" } else { " " },
        snapshot.query.page,
        snapshot.total_pages
    );
}
