//! HoYoLAB official-account post feeds for Zenless Zone Zero and Star Rail.
//!
//! The post list is an account-center page with article anchors; each
//! article body is fetched separately. The markup shifts often, so anchor
//! collection is deliberately loose.

use crate::config::Config;
use crate::constants::{GAME_STAR_RAIL, GAME_ZZZ, HOYOLAB_SOURCE};
use crate::error::Result;
use crate::http;
use crate::normalize::{build_description, md_label, VersionStartCache};
use crate::parser::entity::{corner_bracket_names, corner_bracket_names_before_paren, extract_version};
use crate::parser::korean_date::{find_date_range, find_datetime};
use crate::types::{Post, UpdateRecord, UpdateSource};
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

const BASE: &str = "https://www.hoyolab.com";

pub struct HoyolabSource;

impl Default for HoyolabSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HoyolabSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl UpdateSource for HoyolabSource {
    fn source_name(&self) -> &'static str {
        HOYOLAB_SOURCE
    }

    #[instrument(skip(self, config))]
    async fn fetch_updates(&self, config: &Config) -> Result<Vec<UpdateRecord>> {
        let client = http::client()?;
        let today = Utc::now().date_naive();
        let mut updates = Vec::new();

        for (game_id, author) in [
            (GAME_ZZZ, config.hoyolab_zzz_author.as_str()),
            (GAME_STAR_RAIL, config.hoyolab_sr_author.as_str()),
        ] {
            match fetch_posts(&client, author, config.hoyolab_limit).await {
                Ok(posts) => {
                    info!("{game_id}: fetched {} posts", posts.len());
                    let parsed = match game_id {
                        GAME_ZZZ => parse_zzz(&posts, today),
                        _ => parse_star_rail(&posts, today),
                    };
                    info!("{game_id}: parsed {} updates", parsed.len());
                    updates.extend(parsed);
                }
                Err(e) => warn!("{game_id}: fetching posts failed: {e}"),
            }
        }
        Ok(updates)
    }
}

/// Collect article links from the account post-list page, then pull each
/// article's body text. A failed article fetch leaves the body empty.
async fn fetch_posts(client: &reqwest::Client, author_id: &str, limit: usize) -> Result<Vec<Post>> {
    let url = format!("{BASE}/accountCenter/postList?id={author_id}");
    let html = http::get_text(client, &url).await?;
    let mut posts = extract_post_links(&html, limit);

    for post in &mut posts {
        match http::get_text(client, &post.url).await {
            Ok(article_html) => post.body = page_text(&article_html),
            Err(e) => warn!("Fetching post body failed {}: {e}", post.url),
        }
    }
    Ok(posts)
}

fn extract_post_links(html: &str, limit: usize) -> Vec<Post> {
    let document = Html::parse_document(html);
    let anchor = Selector::parse("a[href*='/article/']").unwrap();
    let mut seen: HashSet<String> = HashSet::new();
    let mut posts = Vec::new();

    for link in document.select(&anchor) {
        let Some(href) = link.value().attr("href") else { continue };
        // Comment permalinks point at the same article
        if href.contains("?reply=") {
            continue;
        }
        let url = if href.starts_with('/') {
            format!("{BASE}{href}")
        } else {
            href.to_string()
        };
        if !seen.insert(url.clone()) {
            continue;
        }
        let title = link.text().collect::<String>().trim().to_string();
        debug!("Found post link: '{title}' -> {url}");
        posts.push(Post { title, body: String::new(), url });
        if posts.len() >= limit {
            break;
        }
    }
    posts
}

/// Whole-page text in the spirit of `document.body.innerText`.
fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Scan update announcements first so ranges stated as `업데이트 후 ~ …`
/// can resolve their start from the version's own update date.
fn start_cache(posts: &[Post], title_markers: &[&str], today: NaiveDate) -> VersionStartCache {
    let mut cache = VersionStartCache::new();
    for post in posts {
        if !title_markers.iter().any(|m| post.title.contains(m)) {
            continue;
        }
        let Some(ver) = extract_version(&format!("{} {}", post.title, post.body)) else {
            continue;
        };
        let stamp = find_datetime(&post.body, today).or_else(|| find_datetime(&post.title, today));
        if let Some(stamp) = stamp {
            debug!("Cached update start for {ver}: {}", stamp.iso_date());
            cache.record(&ver, stamp.date());
        }
    }
    cache
}

pub fn parse_zzz(posts: &[Post], today: NaiveDate) -> Vec<UpdateRecord> {
    let cache = start_cache(posts, &["업데이트 안내"], today);
    let mut results = Vec::new();

    for post in posts {
        let combined = format!("{} {}", post.title, post.body);
        let ver = extract_version(&combined).unwrap_or_default();

        if is_broadcast(&post.title, &post.body, &ver) {
            debug!("Broadcast candidate: {}", post.title);
            let stamp = find_datetime(&post.body, today)
                .or_else(|| find_datetime(&post.title, today));
            let Some(stamp) = stamp else {
                warn!("Broadcast date parse failed: {}", post.title);
                continue;
            };
            let desc = if !ver.is_empty() {
                format!("{ver} 버전 특별 방송")
            } else if post.title.contains("예고") || post.body.contains("예고") {
                "특별 방송 예고".to_string()
            } else {
                "특별 방송".to_string()
            };
            results.push(UpdateRecord::new(GAME_ZZZ, &ver, &stamp.iso(), &desc, &post.url));
            continue;
        }

        // Time-limited character channels, optionally split into 상/하 halves
        if post.title.contains("기간 한정 채널") || (post.title.contains("채널") && !ver.is_empty()) {
            let names = corner_bracket_names(&post.title);
            let char_desc = if names.is_empty() {
                "기간 한정 채널".to_string()
            } else {
                names.join(" / ")
            };
            let phase = channel_phase(&post.title);

            let range = find_date_range(&post.body, today);
            let (start, end) = match range {
                Some(range) => {
                    let start = range.start.or_else(|| cache.lookup(&ver));
                    (start, Some(range.end))
                }
                None => (cache.lookup(&ver), None),
            };

            let (Some(start), Some(end)) = (start, end) else {
                warn!("Channel date parse failed: {} (start={start:?})", post.title);
                continue;
            };
            let desc = build_description(
                &md_label(&start),
                &md_label(&end),
                &[format!("[이벤트] {char_desc}{phase}")],
            );
            results.push(
                UpdateRecord::new(GAME_ZZZ, &ver, &start.format("%Y-%m-%d").to_string(), &desc, &post.url)
                    .with_end_date(&end.format("%Y-%m-%d").to_string()),
            );
        }
    }
    results
}

fn is_broadcast(title: &str, body: &str, ver: &str) -> bool {
    (title.contains("특별") && title.contains("방송"))
        || (body.contains("특별") && body.contains("방송"))
        || (title.contains("방송") && title.contains("예고"))
        || (body.contains("방송") && body.contains("예고"))
        || (!ver.is_empty() && (title.contains("방송") || body.contains("방송")))
}

fn channel_phase(title: &str) -> &'static str {
    if title.contains("상)") || title.contains("(상") || title.contains("상반기") {
        "(상)"
    } else if title.contains("하)") || title.contains("(하") || title.contains("하반기") {
        "(하)"
    } else {
        ""
    }
}

static EVENT_WARP_PHASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"이벤트\s*워프\s*\((\d)\)").unwrap());
// "이벤트 워프 기간은 YYYY/MM/DD X.X 버전 업데이트 후 ..." — start stated inline
static WARP_START_LONG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"이벤트\s*워프\s*기간[은는]?\s*(\d{4})/(\d{1,2})/(\d{1,2})\s+\d+\.\d+\s*버전\s*업데이트\s*후").unwrap()
});
static WARP_START_SHORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})\s+\d+\.\d+\s*버전\s*업데이트\s*후").unwrap()
});

fn warp_inline_start(body: &str) -> Option<NaiveDate> {
    let caps = WARP_START_LONG
        .captures(body)
        .or_else(|| WARP_START_SHORT.captures(body))?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

pub fn parse_star_rail(posts: &[Post], today: NaiveDate) -> Vec<UpdateRecord> {
    let cache = start_cache(posts, &["업데이트 점검 예고", "업데이트 안내"], today);
    let mut results = Vec::new();

    for post in posts {
        let combined = format!("{} {}", post.title, post.body);
        let ver = extract_version(&combined).unwrap_or_default();

        if post.title.contains("프리뷰 스페셜 프로그램") && !ver.is_empty() {
            let stamp = find_datetime(&post.body, today)
                .or_else(|| find_datetime(&post.title, today));
            if let Some(stamp) = stamp {
                results.push(UpdateRecord::new(
                    GAME_STAR_RAIL,
                    &ver,
                    &stamp.iso(),
                    &format!("{ver} 버전 프리뷰 스페셜 프로그램"),
                    &post.url,
                ));
                debug!("Preview special parsed: {ver}");
            }
            continue;
        }

        if let Some(caps) = EVENT_WARP_PHASE.captures(&post.title) {
            if ver.is_empty() {
                continue;
            }
            let phase = &caps[1];
            debug!("Event warp found: {ver} phase {phase}");

            let (start, end) = if phase == "1" {
                // Phase 1 opens with the version update itself
                let start = cache
                    .lookup(&ver)
                    .or_else(|| warp_inline_start(&post.body));
                let end = find_date_range(&post.body, today).map(|r| r.end);
                (start, end)
            } else {
                match find_date_range(&post.body, today) {
                    Some(range) => (range.start.or_else(|| cache.lookup(&ver)), Some(range.end)),
                    None => (None, None),
                }
            };

            let (Some(start), Some(end)) = (start, end) else {
                warn!("Warp({phase}) parse failed for {ver}: start/end unresolved");
                continue;
            };

            let names = corner_bracket_names_before_paren(&post.body);
            let label = if names.is_empty() {
                format!("워프({phase})")
            } else {
                names.iter().take(2).cloned().collect::<Vec<_>>().join(" / ")
            };
            let desc = build_description(
                &md_label(&start),
                &md_label(&end),
                &[format!("[이벤트] {label}")],
            );
            results.push(
                UpdateRecord::new(GAME_STAR_RAIL, &ver, &start.format("%Y-%m-%d").to_string(), &desc, &post.url)
                    .with_end_date(&end.format("%Y-%m-%d").to_string()),
            );
            continue;
        }

        // Generic warp posts name the characters in the title
        if post.title.contains("워프") && !ver.is_empty() {
            let Some(range) = find_date_range(&post.body, today) else {
                continue;
            };
            let Some(start) = range.start else { continue };
            let names = corner_bracket_names(&post.title);
            let label = if names.is_empty() {
                "이벤트 워프".to_string()
            } else {
                names.join(" / ")
            };
            let desc = build_description(
                &md_label(&start),
                &md_label(&range.end),
                &[format!("[이벤트] {label}")],
            );
            results.push(
                UpdateRecord::new(GAME_STAR_RAIL, &ver, &start.format("%Y-%m-%d").to_string(), &desc, &post.url)
                    .with_end_date(&range.end.format("%Y-%m-%d").to_string()),
            );
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 29).unwrap()
    }

    fn post(title: &str, body: &str) -> Post {
        Post {
            title: title.to_string(),
            body: body.to_string(),
            url: "https://www.hoyolab.com/article/1".to_string(),
        }
    }

    #[test]
    fn zzz_broadcast_with_kst_time() {
        let posts = vec![post(
            "2.2 버전 특별 방송 예고",
            "특별 방송은 8월 22일 20:30(KST)에 진행됩니다.",
        )];
        let records = parse_zzz(&posts, today());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].update_date, "2025-08-22T20:30:00+09:00");
        assert_eq!(records[0].version, "2.2");
        assert_eq!(records[0].description, "2.2 버전 특별 방송");
    }

    #[test]
    fn zzz_channel_resolves_start_from_update_announcement() {
        let posts = vec![
            post("2.2 버전 업데이트 안내", "업데이트 시간: 2025/9/24 06:00 (UTC+8)"),
            post(
                "기간 한정 채널 「유자」 (상) 안내",
                "2.2 버전 업데이트 후 ~ 2025/10/15 03:59 동안 진행",
            ),
        ];
        let records = parse_zzz(&posts, today());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.update_date, "2025-09-24");
        assert_eq!(record.end_date.as_deref(), Some("2025-10-15"));
        assert!(record.description.contains("시작일 : 9/24"));
        assert!(record.description.contains("[이벤트] 유자(상)"));
    }

    #[test]
    fn zzz_channel_without_cached_start_is_dropped() {
        let posts = vec![post(
            "기간 한정 채널 「유자」 (상) 안내",
            "2.2 버전 업데이트 후 ~ 2025/10/15 03:59 동안 진행",
        )];
        assert!(parse_zzz(&posts, today()).is_empty());
    }

    #[test]
    fn star_rail_preview_special() {
        let posts = vec![post(
            "3.6 버전 프리뷰 스페셜 프로그램 예고",
            "방송은 9월 5일 20:30(KST) 시작!",
        )];
        let records = parse_star_rail(&posts, today());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].update_date, "2025-09-05T20:30:00+09:00");
        assert_eq!(records[0].description, "3.6 버전 프리뷰 스페셜 프로그램");
    }

    #[test]
    fn star_rail_warp_phase_one_uses_inline_start() {
        let posts = vec![post(
            "3.6 버전 이벤트 워프 (1) 안내",
            "이벤트 워프 기간은 2025/9/10 3.6 버전 업데이트 후 ~ 2025/10/1 11:59 까지입니다. 「키레네(기억)」 등장",
        )];
        let records = parse_star_rail(&posts, today());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.update_date, "2025-09-10");
        assert_eq!(record.end_date.as_deref(), Some("2025-10-01"));
        assert!(record.description.contains("[이벤트] 키레네"));
    }

    #[test]
    fn star_rail_warp_phase_two_reads_full_range() {
        let posts = vec![post(
            "3.6 버전 이벤트 워프 (2) 안내",
            "기간: 2025/10/1 12:00 ~ 2025/10/22 14:59 「트리비(조화)」 확률 UP",
        )];
        let records = parse_star_rail(&posts, today());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].update_date, "2025-10-01");
        assert_eq!(records[0].end_date.as_deref(), Some("2025-10-22"));
    }

    #[test]
    fn extract_post_links_skips_replies_and_duplicates() {
        let html = r#"
            <div>
              <a href="/article/123">2.2 버전 업데이트 안내</a>
              <a href="/article/123?reply=1">댓글</a>
              <a href="/article/123">2.2 버전 업데이트 안내</a>
              <a href="https://www.hoyolab.com/article/456">특별 방송 예고</a>
              <a href="/other/789">기타</a>
            </div>
        "#;
        let posts = extract_post_links(html, 20);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].url, "https://www.hoyolab.com/article/123");
        assert_eq!(posts[1].title, "특별 방송 예고");
    }
}
