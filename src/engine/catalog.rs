//! Built-in table of well-known games, used to answer searches without a
//! network call.

/// Maximum number of matches returned by [`search_catalog`].
pub const MAX_CATALOG_RESULTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Lowercase search fragment (full name or alias).
    pub key: &'static str,
    pub app_id: u64,
    pub name: &'static str,
}

const fn entry(key: &'static str, app_id: u64, name: &'static str) -> CatalogEntry {
    CatalogEntry { key, app_id, name }
}

/// Rows are matched in this order.
pub static CATALOG: &[CatalogEntry] = &[
    entry("counter-strike 2", 730, "Counter-Strike 2"),
    entry("cs2", 730, "Counter-Strike 2"),
    entry("counter-strike", 10, "Counter-Strike"),
    entry("cs", 10, "Counter-Strike"),
    entry("dota 2", 570, "Dota 2"),
    entry("dota", 570, "Dota 2"),
    entry("team fortress 2", 440, "Team Fortress 2"),
    entry("tf2", 440, "Team Fortress 2"),
    entry("left 4 dead 2", 550, "Left 4 Dead 2"),
    entry("l4d2", 550, "Left 4 Dead 2"),
    entry("garry's mod", 4000, "Garry's Mod"),
    entry("gmod", 4000, "Garry's Mod"),
    entry("rust", 252490, "Rust"),
    entry("apex legends", 1172470, "Apex Legends"),
    entry("apex", 1172470, "Apex Legends"),
    entry("pubg", 578080, "PLAYERUNKNOWN'S BATTLEGROUNDS"),
    entry(
        "playerunknown's battlegrounds",
        578080,
        "PLAYERUNKNOWN'S BATTLEGROUNDS",
    ),
    entry("grand theft auto v", 271590, "Grand Theft Auto V"),
    entry("gta v", 271590, "Grand Theft Auto V"),
    entry("gta 5", 271590, "Grand Theft Auto V"),
    entry("rocket league", 252950, "Rocket League"),
    entry("among us", 945360, "Among Us"),
    entry("fall guys", 1097150, "Fall Guys"),
    entry("destiny 2", 1085660, "Destiny 2"),
    entry("warframe", 230410, "Warframe"),
    entry("terraria", 105600, "Terraria"),
    entry("stardew valley", 413150, "Stardew Valley"),
    entry("civilization vi", 289070, "Sid Meier's Civilization VI"),
    entry("civ 6", 289070, "Sid Meier's Civilization VI"),
    entry("factorio", 427520, "Factorio"),
    entry("minecraft", 1086940, "Minecraft"),
    entry("valheim", 892970, "Valheim"),
    entry("rimworld", 294100, "RimWorld"),
    entry("dead by daylight", 381210, "Dead by Daylight"),
    entry("dbd", 381210, "Dead by Daylight"),
    entry("cities skylines", 255710, "Cities: Skylines"),
    entry("euro truck simulator 2", 227300, "Euro Truck Simulator 2"),
    entry("ets2", 227300, "Euro Truck Simulator 2"),
    entry("cyberpunk 2077", 1091500, "Cyberpunk 2077"),
    entry("witcher 3", 292030, "The Witcher 3: Wild Hunt"),
    entry(
        "skyrim",
        489830,
        "The Elder Scrolls V: Skyrim Special Edition",
    ),
    entry("fallout 4", 377160, "Fallout 4"),
];

/// Case-insensitive substring search over fragment keys and display names.
///
/// Results keep catalog order, contain each app id at most once, and are
/// capped at [`MAX_CATALOG_RESULTS`].
pub fn search_catalog(term: &str) -> Vec<CatalogEntry> {
    let needle = term.trim().to_lowercase();
    let mut results: Vec<CatalogEntry> = Vec::new();

    for entry in CATALOG {
        if results.len() >= MAX_CATALOG_RESULTS {
            break;
        }
        if results.iter().any(|r| r.app_id == entry.app_id) {
            continue;
        }
        if entry.key.contains(&needle) || entry.name.to_lowercase().contains(&needle) {
            results.push(*entry);
        }
    }

    results
}

/// First catalog row for `app_id`.
pub fn lookup(app_id: u64) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.app_id == app_id)
}
