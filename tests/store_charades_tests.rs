use charades_companion::store::{self, CharadeSetCreate, CharadeSetPatch};
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

fn set(name: &str, is_active: bool) -> CharadeSetCreate {
    CharadeSetCreate {
        name: name.to_string(),
        channels: r#"["ashplays"]"#.to_string(),
        words: r#"["jump","dance"]"#.to_string(),
        settings: "{}".to_string(),
        is_active,
    }
}

#[tokio::test]
async fn charade_set_crud_roundtrip() {
    let (database_url, db_path) = temp_database();
    let store = store::spawn(&database_url).await.unwrap();

    assert!(store.list_charade_sets().await.unwrap().is_empty());

    let movies = store.create_charade_set(set("Movies", true)).await.unwrap();
    let animals = store.create_charade_set(set("Animals", false)).await.unwrap();
    assert!(movies > 0 && animals > movies);

    let fetched = store.get_charade_set(movies).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Movies");
    assert_eq!(fetched.words, r#"["jump","dance"]"#);
    assert!(fetched.is_active);

    // Ordered by name; active filter excludes the inactive set.
    let all = store.list_charade_sets().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "Animals");
    assert_eq!(all[1].name, "Movies");

    let active = store.list_active_charade_sets().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, movies);

    cleanup(&db_path);
}

#[tokio::test]
async fn charade_set_partial_patch() {
    let (database_url, db_path) = temp_database();
    let store = store::spawn(&database_url).await.unwrap();

    let id = store.create_charade_set(set("Movies", true)).await.unwrap();

    let patch = CharadeSetPatch {
        name: Some("Movies 2".to_string()),
        is_active: Some(false),
        ..Default::default()
    };
    assert!(store.update_charade_set(id, patch).await.unwrap());

    let updated = store.get_charade_set(id).await.unwrap().unwrap();
    assert_eq!(updated.name, "Movies 2");
    assert!(!updated.is_active);
    // Untouched fields survive the patch.
    assert_eq!(updated.channels, r#"["ashplays"]"#);
    assert_eq!(updated.words, r#"["jump","dance"]"#);

    // Empty patch and unknown id are both no-ops.
    assert!(
        !store
            .update_charade_set(id, CharadeSetPatch::default())
            .await
            .unwrap()
    );
    let missing = CharadeSetPatch {
        name: Some("ghost".to_string()),
        ..Default::default()
    };
    assert!(!store.update_charade_set(9999, missing).await.unwrap());

    assert!(store.delete_charade_set(id).await.unwrap());
    assert!(!store.delete_charade_set(id).await.unwrap());
    assert!(store.get_charade_set(id).await.unwrap().is_none());

    cleanup(&db_path);
}
