use std::path::PathBuf;

use junction_core::relay::{FileMailbox, MemoryMailbox, OverrideMailbox, RelayError};
use junction_core::settings::{JsonFileStore, SettingsStore};
use junction_ir::types::{Direction, TimingConfig};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("junction-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_file_mailbox_last_write_wins() {
    let dir = scratch_dir("mailbox-lww");
    let mailbox = FileMailbox::new(dir.join("slot.json"));

    mailbox.write_pending_override(Direction::East).unwrap();
    mailbox.write_pending_override(Direction::West).unwrap();

    let pending = mailbox.take_pending_override().unwrap().unwrap();
    assert_eq!(pending.direction, Direction::West);
    assert!(pending.requested_at_ms > 0);
    assert!(mailbox.take_pending_override().unwrap().is_none());

    // Nothing but the (now absent) slot is left behind.
    let leftovers: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
    assert!(leftovers.is_empty());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_file_mailbox_empty_slot() {
    let dir = scratch_dir("mailbox-empty");
    let mailbox = FileMailbox::new(dir.join("nested").join("slot.json"));
    assert!(mailbox.take_pending_override().unwrap().is_none());

    mailbox.write_pending_override(Direction::South).unwrap();
    assert_eq!(
        mailbox.take_pending_override().unwrap().map(|p| p.direction),
        Some(Direction::South)
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_file_mailbox_malformed_slot_is_consumed() {
    let dir = scratch_dir("mailbox-bad");
    let path = dir.join("slot.json");
    std::fs::write(&path, "not json").unwrap();

    let mailbox = FileMailbox::new(&path);
    assert!(matches!(
        mailbox.take_pending_override(),
        Err(RelayError::Json(_))
    ));
    assert!(!path.exists());
    assert!(mailbox.take_pending_override().unwrap().is_none());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_memory_mailbox_clones_share_slot() {
    let writer = MemoryMailbox::new();
    let reader = writer.clone();
    writer.write_pending_override(Direction::North).unwrap();
    assert_eq!(
        reader.take_pending_override().unwrap().map(|p| p.direction),
        Some(Direction::North)
    );
    assert!(writer.take_pending_override().unwrap().is_none());
}

#[test]
fn test_json_file_store_round_trip() {
    let dir = scratch_dir("settings");
    let store = JsonFileStore::new(dir.join("settings.json"));
    assert_eq!(store.load().unwrap(), None);

    let config = TimingConfig {
        base_time_secs: 45,
        congestion_weight: 7,
        yellow_time_secs: 2,
    };
    store.save(&config).unwrap();
    assert_eq!(store.load().unwrap(), Some(config));

    let text = std::fs::read_to_string(store.path()).unwrap();
    assert!(text.contains("\"baseTime\": 45"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_json_file_store_clamps_stored_values() {
    let dir = scratch_dir("settings-clamp");
    let path = dir.join("settings.json");
    std::fs::write(&path, r#"{"baseTime": 5, "congestionWeight": 0}"#).unwrap();

    let loaded = JsonFileStore::new(&path).load().unwrap().unwrap();
    assert_eq!(loaded.base_time_secs, 10);
    assert_eq!(loaded.congestion_weight, 5);
    assert_eq!(loaded.yellow_time_secs, 3);
    let _ = std::fs::remove_dir_all(&dir);
}
