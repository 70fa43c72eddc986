//! Icon reference names and their display glyphs
//!
//! Records store icons by name so they stay serializable; views resolve
//! them here when rendering.

/// Shown when a record carries no icon at all
pub const FALLBACK_GLYPH: &str = "🏅";

static ICONS: &[(&str, &str)] = &[
    ("award", "🏅"),
    ("book", "📚"),
    ("brain", "🧠"),
    ("car", "🚗"),
    ("coins", "🪙"),
    ("gift", "🎁"),
    ("printer", "🖨️"),
    ("puzzle", "🧩"),
    ("shopping-bag", "🛍️"),
    ("star", "⭐"),
    ("target", "🎯"),
    ("ticket", "🎟️"),
    ("trophy", "🏆"),
    ("utensils", "🍽️"),
    ("zap", "⚡"),
];

/// Resolve an icon reference to a glyph.
///
/// Unknown names are returned unchanged, so a literal emoji stored as the
/// icon renders as itself.
pub fn glyph(name: &str) -> &str {
    let name = name.trim();
    if name.is_empty() {
        return FALLBACK_GLYPH;
    }
    ICONS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, glyph)| *glyph)
        .unwrap_or(name)
}

/// Whether `name` is one of the known reference names
pub fn is_known(name: &str) -> bool {
    ICONS.iter().any(|(key, _)| *key == name)
}
