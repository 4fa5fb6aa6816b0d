//! Official X accounts mirrored through public Nitter RSS instances.
//!
//! No API keys: the first reachable instance from the configured fallback
//! list wins. Feed XML is shallow enough that a couple of regexes beat a
//! whole feed parser; items are gated by per-game keywords before any date
//! extraction happens.

use crate::config::Config;
use crate::constants::{GAME_STAR_RAIL, GAME_ZZZ, SOCIAL_FEED_SOURCE};
use crate::error::{Result, ScraperError};
use crate::http;
use crate::types::{UpdateRecord, UpdateSource};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

const ACCOUNTS: [(&str, &str); 2] = [(GAME_STAR_RAIL, "honkaisr_kr"), (GAME_ZZZ, "ZZZ_KO")];

fn keywords(game_id: &str) -> &'static [&'static str] {
    match game_id {
        GAME_STAR_RAIL => &["워프", "이벤트 워프", "픽업", "확률 UP", "출시"],
        GAME_ZZZ => &["채널", "기간 한정", "픽업", "확률 UP", "출시"],
        _ => &[],
    }
}

pub struct SocialFeedSource;

impl Default for SocialFeedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SocialFeedSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl UpdateSource for SocialFeedSource {
    fn source_name(&self) -> &'static str {
        SOCIAL_FEED_SOURCE
    }

    #[instrument(skip(self, config))]
    async fn fetch_updates(&self, config: &Config) -> Result<Vec<UpdateRecord>> {
        let client = http::client()?;
        let today = Utc::now().date_naive();
        let mut updates = Vec::new();
        let mut reached = false;

        for (game_id, account) in ACCOUNTS {
            let mut items = Vec::new();
            for instance in &config.nitter_instances {
                let feed_url = format!("https://{instance}/{account}/rss");
                match http::get_text(&client, &feed_url).await {
                    Ok(xml) => {
                        items = parse_feed_items(&xml);
                        if !items.is_empty() {
                            info!("{game_id}: {} feed items via {instance}", items.len());
                            break;
                        }
                        debug!("{game_id}: empty feed from {instance}");
                    }
                    Err(e) => warn!("{game_id}: feed fetch via {instance} failed: {e}"),
                }
            }
            if items.is_empty() {
                warn!("{game_id}: all feed instances failed");
                continue;
            }
            reached = true;
            let parsed = parse_feed(game_id, &items, today);
            info!("{game_id}: {} updates from feed", parsed.len());
            updates.extend(parsed);
        }
        // One dead account is partial success; every account dead means the
        // source as a whole was unreachable.
        if !reached {
            return Err(ScraperError::Source {
                message: "no nitter instance returned a feed for any account".to_string(),
            });
        }
        Ok(updates)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub link: String,
    pub published: Option<NaiveDate>,
}

static ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<item>(.*?)</item>").unwrap());
static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<title>(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?</title>").unwrap());
static DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<description>(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?</description>").unwrap()
});
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<link>(.*?)</link>").unwrap());
static PUB_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<pubDate>(.*?)</pubDate>").unwrap());

pub fn parse_feed_items(xml: &str) -> Vec<FeedItem> {
    ITEM.captures_iter(xml)
        .map(|item| {
            let chunk = &item[1];
            let field = |re: &Regex| {
                re.captures(chunk)
                    .map(|caps| caps[1].trim().to_string())
                    .unwrap_or_default()
            };
            let published = PUB_DATE
                .captures(chunk)
                .and_then(|caps| DateTime::parse_from_rfc2822(caps[1].trim()).ok())
                .map(|dt| dt.date_naive());
            FeedItem {
                title: field(&TITLE),
                description: field(&DESCRIPTION),
                link: field(&LINK),
                published,
            }
        })
        .collect()
}

// Tweet-local range forms; the year-explicit one is tried first so the
// short form cannot eat the tail of a four-digit year.
static TWEET_SLASH_YEAR_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})\s*[~\-–—]\s*(\d{4})/(\d{1,2})/(\d{1,2})").unwrap()
});
static TWEET_SLASH_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})/(\d{1,2})\s*[~\-–—]\s*(\d{1,2})/(\d{1,2})").unwrap()
});
static TWEET_KR_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\s*월\s*(\d{1,2})\s*일\s*[~\-–—]\s*(\d{1,2})\s*월\s*(\d{1,2})\s*일")
        .unwrap()
});

pub fn tweet_date_range(text: &str, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    if let Some(caps) = TWEET_SLASH_YEAR_PAIR.captures(text) {
        let start = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )?;
        let end = NaiveDate::from_ymd_opt(
            caps[4].parse().ok()?,
            caps[5].parse().ok()?,
            caps[6].parse().ok()?,
        )?;
        return Some((start, end));
    }
    for re in [&*TWEET_SLASH_PAIR, &*TWEET_KR_PAIR] {
        if let Some(caps) = re.captures(text) {
            let year = today.year();
            let start =
                NaiveDate::from_ymd_opt(year, caps[1].parse().ok()?, caps[2].parse().ok()?)?;
            let end = NaiveDate::from_ymd_opt(year, caps[3].parse().ok()?, caps[4].parse().ok()?)?;
            return Some((start, end));
        }
    }
    None
}

pub fn parse_feed(game_id: &str, items: &[FeedItem], today: NaiveDate) -> Vec<UpdateRecord> {
    let mut updates = Vec::new();
    for item in items {
        let full_text = format!("{}\n{}", item.title, item.description);
        if !keywords(game_id).iter().any(|kw| full_text.contains(kw)) {
            continue;
        }
        debug!("Keyword hit: {}", item.title);

        let (start, end) = match tweet_date_range(&full_text, today) {
            Some((start, end)) => (Some(start), Some(end)),
            // No range in the text: fall back to the publication date
            None => (item.published, None),
        };
        let Some(start) = start else {
            warn!("No usable date for feed item: {}", item.title);
            continue;
        };

        let mut record = UpdateRecord::new(
            game_id,
            "",
            &start.format("%Y-%m-%d").to_string(),
            &item.title,
            &item.link,
        );
        if let Some(end) = end {
            record = record.with_end_date(&end.format("%Y-%m-%d").to_string());
        }
        updates.push(record);
    }
    updates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 29).unwrap()
    }

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<item>
<title><![CDATA[「키레네」 이벤트 워프 9/10 ~ 10/1 진행!]]></title>
<description><![CDATA[확률 UP 안내]]></description>
<link>https://nitter.example/honkaisr_kr/status/1</link>
<pubDate>Fri, 05 Sep 2025 12:00:00 GMT</pubDate>
</item>
<item>
<title><![CDATA[신규 버전 출시 소식]]></title>
<description><![CDATA[자세한 내용은 공식 홈페이지에서]]></description>
<link>https://nitter.example/honkaisr_kr/status/2</link>
<pubDate>Mon, 01 Sep 2025 09:00:00 GMT</pubDate>
</item>
<item>
<title><![CDATA[오늘의 일러스트]]></title>
<description><![CDATA[팬아트 소개]]></description>
<link>https://nitter.example/honkaisr_kr/status/3</link>
<pubDate>Sun, 31 Aug 2025 09:00:00 GMT</pubDate>
</item>
</channel></rss>"#;

    #[test]
    fn feed_items_are_extracted() {
        let items = parse_feed_items(FEED);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "「키레네」 이벤트 워프 9/10 ~ 10/1 진행!");
        assert_eq!(items[0].link, "https://nitter.example/honkaisr_kr/status/1");
        assert_eq!(items[0].published, NaiveDate::from_ymd_opt(2025, 9, 5));
    }

    #[test]
    fn range_in_tweet_text_wins_over_pub_date() {
        let items = parse_feed_items(FEED);
        let records = parse_feed(GAME_STAR_RAIL, &items, today());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].update_date, "2025-09-10");
        assert_eq!(records[0].end_date.as_deref(), Some("2025-10-01"));
    }

    #[test]
    fn pub_date_fallback_without_range() {
        let items = parse_feed_items(FEED);
        let records = parse_feed(GAME_STAR_RAIL, &items, today());
        // second keyword hit ("출시") has no range in its text
        assert_eq!(records[1].update_date, "2025-09-01");
        assert_eq!(records[1].end_date, None);
    }

    #[test]
    fn year_explicit_range_is_not_mangled() {
        let range = tweet_date_range("2025/11/26 ~ 2025/12/16", today()).unwrap();
        assert_eq!(range.0, NaiveDate::from_ymd_opt(2025, 11, 26).unwrap());
        assert_eq!(range.1, NaiveDate::from_ymd_opt(2025, 12, 16).unwrap());
    }

    #[test]
    fn korean_range_in_tweet() {
        let range = tweet_date_range("9월 24일 ~ 10월 15일 픽업", today()).unwrap();
        assert_eq!(range.0, NaiveDate::from_ymd_opt(2025, 9, 24).unwrap());
    }

    #[test]
    fn unreachable_feed_error_is_reportable() {
        let err = ScraperError::Source {
            message: "no nitter instance returned a feed for any account".to_string(),
        };
        assert!(err.to_string().contains("no nitter instance"));
    }

    #[test]
    fn non_keyword_items_are_ignored() {
        let items = parse_feed_items(FEED);
        let records = parse_feed(GAME_STAR_RAIL, &items, today());
        assert!(records.iter().all(|r| !r.description.contains("일러스트")));
    }
}
