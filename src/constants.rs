/// Source name constants to ensure consistency across the codebase

// Source names (used in CLI and logging)
pub const HOYOLAB_SOURCE: &str = "hoyolab";
pub const LOUNGE_SOURCE: &str = "lounge";
pub const COMING_SOON_SOURCE: &str = "coming_soon";
pub const SOCIAL_FEED_SOURCE: &str = "social_feed";

// Game identifiers as persisted in update records
pub const GAME_ZZZ: &str = "zzz";
pub const GAME_STAR_RAIL: &str = "star_rail";
pub const GAME_NIKKE: &str = "nikke";
pub const GAME_WW: &str = "ww";

/// Get all supported source names, in default run order
pub fn get_supported_sources() -> Vec<&'static str> {
    vec![
        HOYOLAB_SOURCE,
        LOUNGE_SOURCE,
        COMING_SOON_SOURCE,
        SOCIAL_FEED_SOURCE,
    ]
}
