use std::env;

/// Runtime configuration read from environment variables.
///
/// Every parameter has a default; a missing or unparseable variable falls
/// back silently so a bare `subnews_scraper run` always works.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the shared JSON update store
    pub updates_path: String,

    // HoYoLAB
    pub hoyolab_zzz_author: String,
    pub hoyolab_sr_author: String,
    pub hoyolab_limit: usize,

    // Naver game lounge boards
    pub nikke_update_board: String,
    pub nikke_broadcast_board: String,
    pub ww_tuning_board: String,
    pub ww_broadcast_board: String,
    pub lounge_limit: usize,

    // Coming-soon storefront search
    pub target_months: Vec<u32>,
    pub max_pages: u32,

    // Nitter mirrors for the social feed, tried in order
    pub nitter_instances: Vec<String>,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let target_months = env_or("TARGET_MONTHS", "9,10,11,12")
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        let nitter_instances = env_or(
            "NITTER_INSTANCES",
            "nitter.poast.org,nitter.privacydev.net,nitter.net",
        )
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

        Self {
            updates_path: env_or("UPDATES_PATH", "data/updates.json"),
            hoyolab_zzz_author: env_or("HOYOLAB_ZZZ_AUTHOR", "219270333"),
            hoyolab_sr_author: env_or("HOYOLAB_SR_AUTHOR", "172534910"),
            hoyolab_limit: env_parse("HOYOLAB_LIMIT", 20),
            nikke_update_board: env_or(
                "NIKKE_UPDATE_BOARD",
                "https://game.naver.com/lounge/nikke/board/48",
            ),
            nikke_broadcast_board: env_or(
                "NIKKE_BROADCAST_BOARD",
                "https://game.naver.com/lounge/nikke/board/11",
            ),
            ww_tuning_board: env_or(
                "WW_TUNING_BOARD",
                "https://game.naver.com/lounge/WutheringWaves/board/28",
            ),
            ww_broadcast_board: env_or(
                "WW_BROADCAST_BOARD",
                "https://game.naver.com/lounge/WutheringWaves/board/1",
            ),
            lounge_limit: env_parse("LOUNGE_LIMIT", 20),
            target_months,
            max_pages: env_parse("MAX_PAGES", 3),
            nitter_instances,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        // No env vars set in the test runner for these names
        let config = Config::from_env();
        assert_eq!(config.updates_path, "data/updates.json");
        assert_eq!(config.hoyolab_limit, 20);
        assert_eq!(config.target_months, vec![9, 10, 11, 12]);
        assert_eq!(config.nitter_instances.len(), 3);
    }
}
