use charades_companion::store::{self, SettingUpsert};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::time::SystemTime;

fn temp_database() -> (String, PathBuf) {
    let tmp_dir = std::env::temp_dir();
    let mut hasher = DefaultHasher::new();
    SystemTime::now().hash(&mut hasher);
    let db_path = tmp_dir.join(format!("test_db_{}.sqlite", hasher.finish()));
    let database_url = format!("sqlite:{}", db_path.to_str().unwrap());
    (database_url, db_path)
}

fn cleanup(db_path: &PathBuf) {
    let _ = std::fs::remove_file(format!("{}-wal", db_path.to_string_lossy()));
    let _ = std::fs::remove_file(format!("{}-shm", db_path.to_string_lossy()));
    let _ = std::fs::remove_file(db_path);
}

fn setting(key: &str, value: &str, description: Option<&str>) -> SettingUpsert {
    SettingUpsert {
        key: key.to_string(),
        value: value.to_string(),
        description: description.map(str::to_string),
    }
}

#[tokio::test]
async fn settings_crud_roundtrip() {
    let (database_url, db_path) = temp_database();
    let store = store::spawn(&database_url).await.unwrap();

    assert!(store.get_setting("theme").await.unwrap().is_none());
    assert!(store.get_all_settings().await.unwrap().is_empty());

    store
        .set_setting(setting("theme", "dark", Some("UI theme")))
        .await
        .unwrap();
    store
        .set_setting(setting("locale", "en-US", None))
        .await
        .unwrap();

    assert_eq!(
        store.get_setting("theme").await.unwrap().as_deref(),
        Some("dark")
    );

    // Overwrite by key keeps a single row.
    store
        .set_setting(setting("theme", "light", Some("UI theme")))
        .await
        .unwrap();
    assert_eq!(
        store.get_setting("theme").await.unwrap().as_deref(),
        Some("light")
    );

    // Ordered by key.
    let all = store.get_all_settings().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].key, "locale");
    assert_eq!(all[1].key, "theme");
    assert_eq!(all[1].description.as_deref(), Some("UI theme"));

    assert!(store.delete_setting("theme").await.unwrap());
    assert!(!store.delete_setting("theme").await.unwrap());
    assert!(store.get_setting("theme").await.unwrap().is_none());

    cleanup(&db_path);
}
