pub mod coming_soon;
pub mod hoyolab;
pub mod lounge;
pub mod social_feed;

use crate::constants;
use crate::types::UpdateSource;

/// Look up a source implementation by its CLI name.
pub fn create_source(name: &str) -> Option<Box<dyn UpdateSource>> {
    match name {
        constants::HOYOLAB_SOURCE => Some(Box::new(hoyolab::HoyolabSource::new())),
        constants::LOUNGE_SOURCE => Some(Box::new(lounge::LoungeSource::new())),
        constants::COMING_SOON_SOURCE => Some(Box::new(coming_soon::ComingSoonSource::new())),
        constants::SOCIAL_FEED_SOURCE => Some(Box::new(social_feed::SocialFeedSource::new())),
        _ => None,
    }
}
