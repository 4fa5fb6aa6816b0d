//! Assembly of canonical update records from parsed fields, plus the
//! text-cleanup rules shared with the `cleanup` maintenance pass.

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

/// `M/D` display form used inside descriptions, deliberately unpadded.
pub fn md_label(date: &NaiveDate) -> String {
    format!("{}/{}", date.month(), date.day())
}

/// Build the multi-line range description:
///
/// ```text
/// 시작일 : 9/24
/// 종료일 : 10/15
/// [이벤트] 유자
/// ```
///
/// Without both boundaries only the trailing lines are emitted.
pub fn build_description(start_md: &str, end_md: &str, lines: &[String]) -> String {
    let mut out: Vec<String> = if !start_md.is_empty() && !end_md.is_empty() {
        vec![format!("시작일 : {start_md}"), format!("종료일 : {end_md}")]
    } else {
        Vec::new()
    };
    out.extend(lines.iter().cloned());
    out.join("\n")
}

// Placeholder fragments left behind when a storefront row had no price or
// genre. Trial order matters: the broad rule first, then the leftovers.
const PLACEHOLDER_FRAGMENTS: [&str; 3] = [" · 미표기", " · · 미표기", " · ·"];

/// Strip unknown-price/genre placeholder fragments from a description.
/// Idempotent: a second application is a no-op.
pub fn clean_description(description: &str) -> String {
    let mut cleaned = description.to_string();
    for fragment in PLACEHOLDER_FRAGMENTS {
        if cleaned.contains(fragment) {
            cleaned = cleaned.replace(fragment, "");
        }
    }
    cleaned
}

/// Per-run mapping of version label → resolved update start date.
///
/// Ranges announced as `업데이트 후 ~ <end>` name no start of their own; it
/// has to come from the `업데이트 안내` / `점검 예고` post for the same
/// version, which is scanned first. Kept as an explicit value threaded
/// through the parsing pass so the parsers stay reentrant.
#[derive(Debug, Default)]
pub struct VersionStartCache {
    starts: HashMap<String, NaiveDate>,
}

impl VersionStartCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, version: &str, start: NaiveDate) {
        self.starts.insert(version.to_string(), start);
    }

    pub fn lookup(&self, version: &str) -> Option<NaiveDate> {
        self.starts.get(version).copied()
    }
}
