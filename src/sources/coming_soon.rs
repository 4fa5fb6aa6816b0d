//! Steam coming-soon search scraping for upcoming releases.
//!
//! Search rows give name, release text, price and tag strings; the
//! appdetails API and the store page fill in genres, a summary and a
//! high-resolution header image. Release text in the koreana locale is
//! normalized to ISO where possible and kept verbatim otherwise.

use crate::config::Config;
use crate::constants::COMING_SOON_SOURCE;
use crate::error::Result;
use crate::http;
use crate::normalize::clean_description;
use crate::store::UpdateStore;
use crate::types::{UpdateRecord, UpdateSource};
use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

const SEARCH_URL: &str =
    "https://store.steampowered.com/search/?filter=popularcomingsoon&os=win&l=koreana&cc=kr&page=";
const APPDETAILS_URL: &str = "https://store.steampowered.com/api/appdetails";

pub struct ComingSoonSource;

impl Default for ComingSoonSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ComingSoonSource {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComingSoonEntry {
    pub name: String,
    pub release_date: String,
    pub price: String,
    pub genres: String,
    pub appid: String,
    pub url: String,
    pub platform: String,
    pub header_image: String,
}

#[async_trait::async_trait]
impl UpdateSource for ComingSoonSource {
    fn source_name(&self) -> &'static str {
        COMING_SOON_SOURCE
    }

    #[instrument(skip(self, config))]
    async fn fetch_updates(&self, config: &Config) -> Result<Vec<UpdateRecord>> {
        let client = http::client()?;
        let today = Utc::now().date_naive();

        let mut entries = Vec::new();
        for page in 1..=config.max_pages {
            match http::get_text(&client, &format!("{SEARCH_URL}{page}")).await {
                Ok(html) => entries.extend(parse_search_page(&html, today)),
                Err(e) => warn!("Search page {page} failed: {e}"),
            }
        }
        let entries = dedup_entries(entries);
        info!("Collected {} coming-soon entries", entries.len());

        let mut updates = Vec::new();
        for entry in &entries {
            if !in_month_window(&entry.release_date, &config.target_months) {
                continue;
            }
            let details = if entry.appid.is_empty() {
                Value::Null
            } else {
                fetch_appdetails(&client, &entry.appid).await.unwrap_or_else(|e| {
                    debug!("appdetails failed for {}: {e}", entry.appid);
                    Value::Null
                })
            };
            let store_tags = if entry.appid.is_empty() {
                Vec::new()
            } else {
                fetch_store_tags(&client, &entry.appid).await.unwrap_or_else(|e| {
                    debug!("store tags failed for {}: {e}", entry.appid);
                    Vec::new()
                })
            };
            updates.push(build_update(entry, &details, store_tags));
        }

        // Lexicographic sort works because dates are zero-padded ISO
        updates.sort_by(|a, b| a.update_date.cmp(&b.update_date));
        Ok(updates)
    }

    /// Coming-soon entries are refreshed, not appended: previous storefront
    /// records inside the target month window are replaced by this batch.
    /// Only records with a provably in-window date are pruned; `TBA` and
    /// vague-window entries stay until a later run resolves their date.
    fn merge_into(
        &self,
        store: &UpdateStore,
        config: &Config,
        records: &[UpdateRecord],
    ) -> Result<usize> {
        let months = config.target_months.clone();
        store.replace_matching(
            |record| {
                (record.game_id.starts_with("steam_") || record.game_id.starts_with("coming_"))
                    && parsed_month_in_window(&record.update_date, &months)
            },
            records,
        )
    }
}

// ex: "2025년 9월 26일" in the koreana locale
static RELEASE_KR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일").unwrap());
static RELEASE_KR_NO_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})월\s*(\d{1,2})일").unwrap());

/// Normalize storefront release text: ISO when a full date can be read,
/// the raw text when it is a vague window ("2025년 4분기"), `TBA` when empty.
pub fn normalize_release_date(text: &str, today: NaiveDate) -> String {
    if let Some(caps) = RELEASE_KR.captures(text) {
        if let Some(date) = NaiveDate::from_ymd_opt(
            caps[1].parse().unwrap_or(0),
            caps[2].parse().unwrap_or(0),
            caps[3].parse().unwrap_or(0),
        ) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    if let Some(caps) = RELEASE_KR_NO_YEAR.captures(text) {
        if let Some(date) = NaiveDate::from_ymd_opt(
            today.year(),
            caps[1].parse().unwrap_or(0),
            caps[2].parse().unwrap_or(0),
        ) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    if text.is_empty() {
        "TBA".to_string()
    } else {
        text.to_string()
    }
}

/// Month filter for the fetch direction: only parseable ISO dates are
/// filtered; vague or TBA entries are kept. An empty window keeps everything.
fn in_month_window(update_date: &str, months: &[u32]) -> bool {
    if months.is_empty() {
        return true;
    }
    match NaiveDate::parse_from_str(update_date, "%Y-%m-%d") {
        Ok(date) => months.contains(&date.month()),
        Err(_) => true,
    }
}

/// Month filter for the prune direction: a record can only be claimed by the
/// window when its date actually parses. The two directions must disagree on
/// unparseable dates, or every refresh would delete the TBA entries it just
/// chose to keep fetching.
fn parsed_month_in_window(update_date: &str, months: &[u32]) -> bool {
    match NaiveDate::parse_from_str(update_date, "%Y-%m-%d") {
        Ok(date) => months.is_empty() || months.contains(&date.month()),
        Err(_) => false,
    }
}

pub fn parse_search_page(html: &str, today: NaiveDate) -> Vec<ComingSoonEntry> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("a.search_result_row").unwrap();
    let title_sel = Selector::parse("span.title").unwrap();
    let released_sel = Selector::parse("div.search_released").unwrap();
    let price_sel = Selector::parse("div.search_price").unwrap();
    let tags_sel = Selector::parse("div.search_tags").unwrap();

    let mut entries = Vec::new();
    for row in document.select(&row_sel) {
        let text_of = |sel: &Selector| {
            row.select(sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .unwrap_or_default()
        };

        let name = text_of(&title_sel);
        let date_txt = text_of(&released_sel);
        let price_txt = text_of(&price_sel);
        let genres = text_of(&tags_sel);
        let url = row.value().attr("href").unwrap_or_default().to_string();
        let appid = row.value().attr("data-ds-appid").unwrap_or_default().to_string();

        let platform = if genres.contains("Switch") || genres.contains("Nintendo") {
            "switch"
        } else {
            "steam"
        };

        entries.push(ComingSoonEntry {
            name,
            release_date: normalize_release_date(&date_txt, today),
            price: if price_txt.is_empty() { "미표기".to_string() } else { price_txt },
            genres,
            appid,
            url,
            platform: platform.to_string(),
            header_image: extract_header_image(&row),
        });
    }
    entries
}

// header.jpg first, capsule art as fallback
const HEADER_IMAGE_SELECTORS: [&str; 5] = [
    "img[src*='header.jpg']",
    "img.game_header_image_full",
    "img[class*='header']",
    "img[src*='capsule_616x353']",
    "img[src*='capsule']",
];

fn extract_header_image(row: &scraper::ElementRef<'_>) -> String {
    for selector in HEADER_IMAGE_SELECTORS {
        let sel = Selector::parse(selector).unwrap();
        if let Some(src) = row.select(&sel).next().and_then(|img| img.value().attr("src")) {
            if src.is_empty() {
                continue;
            }
            if let Some(rest) = src.strip_prefix("//") {
                return format!("https://{rest}");
            }
            if src.starts_with('/') {
                return format!("https://store.steampowered.com{src}");
            }
            return src.to_string();
        }
    }
    String::new()
}

/// De-duplicate by appid, falling back to (name, release_date).
pub fn dedup_entries(entries: Vec<ComingSoonEntry>) -> Vec<ComingSoonEntry> {
    let mut seen: HashSet<String> = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            let key = if entry.appid.is_empty() {
                format!("{}|{}", entry.name, entry.release_date)
            } else {
                entry.appid.clone()
            };
            seen.insert(key)
        })
        .collect()
}

async fn fetch_appdetails(client: &reqwest::Client, appid: &str) -> Result<Value> {
    let url = format!(
        "{APPDETAILS_URL}?appids={appid}&filters=basic,genres,categories&cc=KR&l=koreana"
    );
    let data = http::get_json(client, &url).await?;
    Ok(data
        .get(appid)
        .and_then(|entry| entry.get("data"))
        .cloned()
        .unwrap_or(Value::Null))
}

const TAG_SELECTORS: [&str; 5] = [
    "a.app_tag",
    ".app_tag",
    "[data-tooltip-text]",
    ".popular_tags a",
    ".game_tag",
];

async fn fetch_store_tags(client: &reqwest::Client, appid: &str) -> Result<Vec<String>> {
    let url = format!("https://store.steampowered.com/app/{appid}/?l=koreana&cc=kr");
    let html = http::get_text(client, &url).await?;
    Ok(extract_tags(&html))
}

fn extract_tags(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut tags: Vec<String> = Vec::new();
    for selector in TAG_SELECTORS {
        let sel = Selector::parse(selector).unwrap();
        for el in document.select(&sel) {
            let tag = el.text().collect::<String>().trim().to_string();
            // Overlong matches are layout noise, not tags
            if !tag.is_empty() && tag.chars().count() < 50 && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

pub fn build_update(entry: &ComingSoonEntry, details: &Value, store_tags: Vec<String>) -> UpdateRecord {
    let mut tags = store_tags;
    if tags.is_empty() {
        for key in ["genres", "categories"] {
            if let Some(items) = details.get(key).and_then(Value::as_array) {
                for item in items {
                    if let Some(desc) = item.get("description").and_then(Value::as_str) {
                        let desc = desc.to_string();
                        if !tags.contains(&desc) {
                            tags.push(desc);
                        }
                    }
                }
            }
        }
    }

    let summary = details
        .get("short_description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let header_image = details
        .get("header_image")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(&entry.header_image);

    let game_id = if entry.appid.is_empty() {
        format!("coming_{}", entry.name)
    } else {
        format!("steam_{}", entry.appid)
    };
    let description = clean_description(&format!("발매예정 · {} · {}", entry.genres, entry.price));

    let mut extra = Map::new();
    extra.insert("name".to_string(), Value::String(entry.name.clone()));
    extra.insert("platform".to_string(), Value::String(entry.platform.clone()));
    extra.insert("tags".to_string(), Value::String(tags.join(", ")));
    extra.insert("summary".to_string(), Value::String(summary.to_string()));
    extra.insert("header_image".to_string(), Value::String(header_image.to_string()));

    let mut record = UpdateRecord::new(&game_id, "", &entry.release_date, &description, &entry.url);
    record.extra = extra;
    record
}
