use anyhow::Result;
use serde_json::json;
use subnews_scraper::store::UpdateStore;
use subnews_scraper::types::UpdateRecord;
use tempfile::tempdir;

fn sample_record() -> UpdateRecord {
    UpdateRecord::new(
        "zzz",
        "2.1",
        "2025-09-24",
        "[이벤트] 테스트",
        "https://www.hoyolab.com/article/1",
    )
}

#[test]
fn merge_into_empty_store_then_repeat_is_noop() -> Result<()> {
    let dir = tempdir()?;
    let store = UpdateStore::new(dir.path().join("updates.json"));

    let added = store.merge(&[sample_record()])?;
    assert_eq!(added, 1);

    let collection = store.load()?;
    assert_eq!(collection.len(), 1);
    assert_eq!(collection[0], sample_record());

    // Second merge with the identical record leaves the store unchanged
    let added = store.merge(&[sample_record()])?;
    assert_eq!(added, 0);
    assert_eq!(store.load()?.len(), 1);
    Ok(())
}

#[test]
fn dedup_applies_within_a_single_batch() -> Result<()> {
    let dir = tempdir()?;
    let store = UpdateStore::new(dir.path().join("updates.json"));

    let added = store.merge(&[sample_record(), sample_record()])?;
    assert_eq!(added, 1);
    Ok(())
}

#[test]
fn descriptions_differing_past_40_chars_are_duplicates() -> Result<()> {
    let dir = tempdir()?;
    let store = UpdateStore::new(dir.path().join("updates.json"));

    let head = "가".repeat(40);
    let mut first = sample_record();
    first.description = format!("{head}첫번째 꼬리");
    let mut second = sample_record();
    second.description = format!("{head}두번째 꼬리");

    let added = store.merge(&[first.clone(), second])?;
    assert_eq!(added, 1);
    assert_eq!(store.load()?[0].description, first.description);
    Ok(())
}

#[test]
fn missing_file_loads_as_empty() -> Result<()> {
    let dir = tempdir()?;
    let store = UpdateStore::new(dir.path().join("nonexistent.json"));
    assert!(store.load()?.is_empty());
    Ok(())
}

#[test]
fn corrupt_file_is_an_error_and_left_untouched() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("updates.json");
    std::fs::write(&path, "[{ truncated garbage")?;

    let store = UpdateStore::new(&path);
    assert!(store.load().is_err());
    assert!(store.merge(&[sample_record()]).is_err());

    // The broken file must survive for inspection, not be clobbered
    assert_eq!(std::fs::read_to_string(&path)?, "[{ truncated garbage");
    Ok(())
}

#[test]
fn unknown_keys_survive_read_modify_write() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("updates.json");
    let stored = json!([{
        "game_id": "steam_12345",
        "version": "",
        "update_date": "2025-09-26",
        "description": "발매예정 · 액션",
        "url": "https://store.steampowered.com/app/12345/",
        "name": "예시 게임",
        "platform": "steam",
        "wishlist_count": 4321
    }]);
    std::fs::write(&path, serde_json::to_string_pretty(&stored)?)?;

    let store = UpdateStore::new(&path);
    store.merge(&[sample_record()])?;

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(raw[0]["wishlist_count"], json!(4321));
    assert_eq!(raw[0]["name"], json!("예시 게임"));
    assert_eq!(raw.as_array().unwrap().len(), 2);
    Ok(())
}

#[test]
fn save_leaves_no_temp_file_behind() -> Result<()> {
    let dir = tempdir()?;
    let store = UpdateStore::new(dir.path().join("updates.json"));
    store.merge(&[sample_record()])?;

    let names: Vec<String> = std::fs::read_dir(dir.path())?
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["updates.json"]);
    Ok(())
}

#[test]
fn end_date_is_omitted_from_json_when_absent() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("updates.json");
    let store = UpdateStore::new(&path);
    store.merge(&[sample_record()])?;

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert!(raw[0].get("end_date").is_none());
    Ok(())
}

#[test]
fn replace_matching_refreshes_storefront_records() -> Result<()> {
    let dir = tempdir()?;
    let store = UpdateStore::new(dir.path().join("updates.json"));

    let mut old_steam = UpdateRecord::new("steam_1", "", "2025-09-01", "발매예정 · 액션", "");
    old_steam
        .extra
        .insert("name".into(), json!("구버전 항목"));
    let unrelated = sample_record();
    store.merge(&[old_steam, unrelated.clone()])?;

    let fresh = UpdateRecord::new("steam_2", "", "2025-09-26", "발매예정 · RPG", "");
    store.replace_matching(|r| r.game_id.starts_with("steam_"), &[fresh.clone()])?;

    let collection = store.load()?;
    assert_eq!(collection.len(), 2);
    assert!(collection.iter().any(|r| r.game_id == "steam_2"));
    assert!(collection.iter().all(|r| r.game_id != "steam_1"));
    assert!(collection.contains(&unrelated));
    Ok(())
}

#[test]
fn cleanup_strips_placeholders_and_duplicates() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("updates.json");
    let stored = json!([
        {
            "game_id": "steam_1", "version": "", "update_date": "2025-09-26",
            "description": "발매예정 · 액션 · 미표기", "url": "",
            "name": "게임", "platform": "steam"
        },
        {
            "game_id": "steam_1_dup", "version": "", "update_date": "2025-09-26",
            "description": "발매예정 · 액션", "url": "",
            "name": "게임", "platform": "steam"
        }
    ]);
    std::fs::write(&path, serde_json::to_string_pretty(&stored)?)?;

    let store = UpdateStore::new(&path);
    let (cleaned, removed) = store.cleanup()?;
    assert_eq!(cleaned, 1);
    assert_eq!(removed, 1);

    let collection = store.load()?;
    assert_eq!(collection.len(), 1);
    assert_eq!(collection[0].description, "발매예정 · 액션");
    Ok(())
}
