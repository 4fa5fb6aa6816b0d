//! Naver game lounge boards for Nikke and Wuthering Waves.
//!
//! Lounge markup changes often, so post discovery just walks every anchor
//! and keeps the ones that look like board/article links.

use crate::config::Config;
use crate::constants::{GAME_NIKKE, GAME_WW, LOUNGE_SOURCE};
use crate::error::Result;
use crate::http;
use crate::normalize::{build_description, md_label, VersionStartCache};
use crate::parser::entity::{extract_version, ssr_recruit};
use crate::parser::korean_date::{find_date_range, find_datetime};
use crate::types::{Post, UpdateRecord, UpdateSource};
use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{info, instrument, warn};

const LOUNGE_BASE: &str = "https://game.naver.com";

pub struct LoungeSource;

impl Default for LoungeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LoungeSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl UpdateSource for LoungeSource {
    fn source_name(&self) -> &'static str {
        LOUNGE_SOURCE
    }

    #[instrument(skip(self, config))]
    async fn fetch_updates(&self, config: &Config) -> Result<Vec<UpdateRecord>> {
        let client = http::client()?;
        let today = Utc::now().date_naive();
        let limit = config.lounge_limit;
        let mut updates = Vec::new();

        match fetch_board_posts(&client, &config.nikke_update_board, limit).await {
            Ok(update_posts) => {
                match fetch_board_posts(&client, &config.nikke_broadcast_board, limit).await {
                    Ok(broadcast_posts) => {
                        let parsed = parse_nikke(&update_posts, &broadcast_posts, today);
                        info!("nikke: parsed {} updates", parsed.len());
                        updates.extend(parsed);
                    }
                    Err(e) => warn!("nikke broadcast board failed: {e}"),
                }
            }
            Err(e) => warn!("nikke update board failed: {e}"),
        }

        match fetch_board_posts(&client, &config.ww_tuning_board, limit).await {
            Ok(tuning_posts) => {
                match fetch_board_posts(&client, &config.ww_broadcast_board, limit).await {
                    Ok(broadcast_posts) => {
                        let parsed = parse_ww(&tuning_posts, &broadcast_posts, today);
                        info!("ww: parsed {} updates", parsed.len());
                        updates.extend(parsed);
                    }
                    Err(e) => warn!("ww broadcast board failed: {e}"),
                }
            }
            Err(e) => warn!("ww tuning board failed: {e}"),
        }

        Ok(updates)
    }
}

async fn fetch_board_posts(
    client: &reqwest::Client,
    board_url: &str,
    limit: usize,
) -> Result<Vec<Post>> {
    let html = http::get_text(client, board_url).await?;
    let mut posts = extract_board_links(&html, limit);

    for post in &mut posts {
        match http::get_text(client, &post.url).await {
            Ok(post_html) => post.body = page_text(&post_html),
            Err(e) => warn!("Fetching lounge post failed {}: {e}", post.url),
        }
    }
    Ok(posts)
}

fn extract_board_links(html: &str, limit: usize) -> Vec<Post> {
    let document = Html::parse_document(html);
    let anchor = Selector::parse("a").unwrap();
    let mut posts = Vec::new();

    for link in document.select(&anchor) {
        let title = link.text().collect::<String>().trim().to_string();
        let Some(href) = link.value().attr("href") else { continue };
        if title.is_empty() || href.is_empty() {
            continue;
        }
        let url = if href.starts_with('/') {
            format!("{LOUNGE_BASE}{href}")
        } else {
            href.to_string()
        };
        if !url.contains("board") && !url.contains("article") {
            continue;
        }
        posts.push(Post { title, body: String::new(), url });
        if posts.len() >= limit {
            break;
        }
    }
    posts
}

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

static BARE_MONTH_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})월\s*(\d{1,2})일").unwrap());

/// Fallback when no explicit range is written: the first two bare
/// `M월 D일` mentions are taken as the boundaries.
fn first_two_dates(text: &str, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = BARE_MONTH_DAY.captures_iter(text).filter_map(|caps| {
        NaiveDate::from_ymd_opt(today.year(), caps[1].parse().ok()?, caps[2].parse().ok()?)
    });
    let start = dates.next()?;
    let end = dates.next()?;
    Some((start, end))
}

pub fn parse_nikke(
    update_posts: &[Post],
    broadcast_posts: &[Post],
    today: NaiveDate,
) -> Vec<UpdateRecord> {
    let mut out = Vec::new();

    for post in update_posts {
        if !post.title.contains("업데이트 소식 사전 안내") || !post.body.contains("모집에 합류") {
            continue;
        }
        let recruit = ssr_recruit(&post.body).unwrap_or_else(|| "모집".to_string());

        let boundaries = match find_date_range(&post.body, today) {
            Some(range) => range.start.map(|start| (start, range.end)),
            None => first_two_dates(&post.body, today),
        };
        let Some((start, end)) = boundaries else {
            warn!("Recruit range parse failed: {}", post.title);
            continue;
        };
        let desc = build_description(
            &md_label(&start),
            &md_label(&end),
            &[format!("[신규] {recruit}")],
        );
        out.push(
            UpdateRecord::new(GAME_NIKKE, "", &start.format("%Y-%m-%d").to_string(), &desc, &post.url)
                .with_end_date(&end.format("%Y-%m-%d").to_string()),
        );
    }

    for post in broadcast_posts {
        if post.title.contains("특별 방송") && post.title.contains("안내") {
            if let Some(stamp) = find_datetime(&post.body, today) {
                out.push(UpdateRecord::new(GAME_NIKKE, "", &stamp.iso(), "특별 방송", &post.url));
            }
        }
    }
    out
}

pub fn parse_ww(
    tuning_posts: &[Post],
    broadcast_posts: &[Post],
    today: NaiveDate,
) -> Vec<UpdateRecord> {
    // Maintenance pre-announcements carry the version's update date
    let mut cache = VersionStartCache::new();
    for post in tuning_posts {
        if !post.title.contains("업데이트 점검 사전 공지") {
            continue;
        }
        let Some(ver) = extract_version(&post.title) else { continue };
        if let Some(stamp) = find_datetime(&post.body, today) {
            cache.record(&ver, stamp.date());
        }
    }

    let mut out = Vec::new();
    for post in tuning_posts {
        if !post.title.contains("캐릭터 이벤트 튜닝") {
            continue;
        }
        let ver = extract_version(&format!("{} {}", post.title, post.body)).unwrap_or_default();

        let (start, end) = match find_date_range(&post.body, today) {
            Some(range) => {
                let start = range.start.or_else(|| {
                    if post.body.contains("업데이트 이후") && !ver.is_empty() {
                        cache.lookup(&ver)
                    } else {
                        None
                    }
                });
                (start, Some(range.end))
            }
            None => (None, None),
        };
        let (Some(start), Some(end)) = (start, end) else {
            warn!("Tuning range parse failed: {}", post.title);
            continue;
        };

        let desc = build_description(
            &md_label(&start),
            &md_label(&end),
            &["[이벤트] 캐릭터 이벤트 튜닝".to_string()],
        );
        out.push(
            UpdateRecord::new(GAME_WW, &ver, &start.format("%Y-%m-%d").to_string(), &desc, &post.url)
                .with_end_date(&end.format("%Y-%m-%d").to_string()),
        );
    }

    for post in broadcast_posts {
        if post.title.contains("프리뷰 특별 방송") {
            if let Some(stamp) = find_datetime(&post.body, today) {
                out.push(UpdateRecord::new(GAME_WW, "", &stamp.iso(), "프리뷰 특별 방송", &post.url));
            }
        }
    }
    out
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
            url: "https://game.naver.com/lounge/x/board/1/123".to_string(),
        }
    }

    #[test]
    fn nikke_recruit_with_explicit_range() {
        let update_posts = vec![post(
            "업데이트 소식 사전 안내",
            "신규 캐릭터 SSR 홍련 [모집에 합류]\n모집기간: 9월 24일 ~ 10월 15일",
        )];
        let records = parse_nikke(&update_posts, &[], today());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.game_id, "nikke");
        assert_eq!(record.update_date, "2025-09-24");
        assert_eq!(record.end_date.as_deref(), Some("2025-10-15"));
        assert!(record.description.contains("[신규] SSR 홍련 [모집에 합류]"));
    }

    #[test]
    fn nikke_recruit_falls_back_to_first_two_dates() {
        let update_posts = vec![post(
            "업데이트 소식 사전 안내",
            "모집에 합류!\n시작: 9월 24일 점검 후\n종료: 10월 15일 점검 전",
        )];
        let records = parse_nikke(&update_posts, &[], today());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].update_date, "2025-09-24");
        assert_eq!(records[0].end_date.as_deref(), Some("2025-10-15"));
    }

    #[test]
    fn nikke_broadcast() {
        let broadcast_posts = vec![post("특별 방송 안내", "9월 5일 20:00(KST) 방송")];
        let records = parse_nikke(&[], &broadcast_posts, today());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].update_date, "2025-09-05T20:00:00+09:00");
        assert_eq!(records[0].description, "특별 방송");
    }

    #[test]
    fn ww_broadcast_with_hour_only_time() {
        let broadcast_posts = vec![post("2.8 프리뷰 특별 방송 안내", "방송은 9월 19일 20시(KST) 시작")];
        let records = parse_ww(&[], &broadcast_posts, today());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].update_date, "2025-09-19T20:00:00+09:00");
    }

    #[test]
    fn ww_tuning_resolves_start_from_maintenance_notice() {
        let tuning_posts = vec![
            post("2.8 버전 업데이트 점검 사전 공지", "점검 시작: 9월 25일 10:00(KST)"),
            post(
                "캐릭터 이벤트 튜닝 안내",
                "2.8 버전 업데이트 이후 ~ 2025/10/16 09:59 까지",
            ),
        ];
        let records = parse_ww(&tuning_posts, &[], today());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.version, "2.8");
        assert_eq!(record.update_date, "2025-09-25");
        assert_eq!(record.end_date.as_deref(), Some("2025-10-16"));
        assert!(record.description.contains("[이벤트] 캐릭터 이벤트 튜닝"));
    }

    #[test]
    fn ww_tuning_without_start_is_dropped() {
        let tuning_posts = vec![post(
            "캐릭터 이벤트 튜닝 안내",
            "2.8 버전 업데이트 이후 ~ 2025/10/16 09:59 까지",
        )];
        assert!(parse_ww(&tuning_posts, &[], today()).is_empty());
    }

    #[test]
    fn board_links_are_absolutized_and_filtered() {
        let html = r#"
            <ul>
              <li><a href="/lounge/nikke/board/48/100">업데이트 소식 사전 안내</a></li>
              <li><a href="https://game.naver.com/lounge/nikke/board/48/101">공지</a></li>
              <li><a href="/profile/me">프로필</a></li>
            </ul>
        "#;
        let posts = extract_board_links(html, 20);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].url, "https://game.naver.com/lounge/nikke/board/48/100");
    }
}
