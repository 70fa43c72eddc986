//! Built-in redemption catalog

use super::models::CatalogEntry;

fn entry(
    id: &str,
    name: &str,
    description: &str,
    points_cost: i64,
    icon: &str,
    badge: Option<&str>,
) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        points_cost,
        icon: icon.to_string(),
        badge: badge.map(str::to_string),
    }
}

/// Catalog used when the config file does not define one
pub fn default_catalog() -> Vec<CatalogEntry> {
    vec![
        entry(
            "canteen-voucher",
            "Canteen Voucher",
            "One free meal at the campus canteen",
            100,
            "utensils",
            Some("Popular"),
        ),
        entry(
            "printing-credits",
            "Printing Credits",
            "50 pages of printing in any campus lab",
            80,
            "printer",
            None,
        ),
        entry(
            "library-fee-waiver",
            "Library Late-Fee Waiver",
            "Clears one overdue-book fine",
            150,
            "book",
            None,
        ),
        entry(
            "campus-store-discount",
            "Campus Store Discount",
            "15% off one purchase at the campus store",
            250,
            "shopping-bag",
            None,
        ),
        entry(
            "day-parking-pass",
            "Day Parking Pass",
            "Free parking in any student lot for one day",
            300,
            "car",
            None,
        ),
        entry(
            "event-ticket",
            "Campus Event Ticket",
            "Admission to a student union event of your choice",
            500,
            "ticket",
            Some("Limited"),
        ),
    ]
}

/// Look up an entry by id
pub fn find<'a>(catalog: &'a [CatalogEntry], id: &str) -> Option<&'a CatalogEntry> {
    catalog.iter().find(|e| e.id == id)
}
