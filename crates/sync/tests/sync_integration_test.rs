use skillcap_core::{ConfigurationMap, NoNames, PROTOCOL_VERSION, Settings, SkillConfigEntry, SourceMode, StoreSettings};
use skillcap_sync::{BroadcastOutcome, ChannelLink, PeerLink, Runtime, SyncPhase};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn settings_in(dir: &Path) -> Settings {
    Settings {
        store: StoreSettings {
            dir: Some(dir.join("config")),
            fallback_dir: Some(dir.join("fallback")),
            ..StoreSettings::default()
        },
        ..Settings::default()
    }
}

fn write_skill_file(dir: &Path, text: &str) {
    fs::create_dir_all(dir.join("config")).unwrap();
    fs::write(dir.join("config").join("skilllimitconfig.yaml"), text).unwrap();
}

#[tokio::test]
async fn test_authority_to_dependent_end_to_end() {
    let server_dir = TempDir::new().unwrap();
    let client_dir = TempDir::new().unwrap();
    write_skill_file(server_dir.path(), "Swords:\n  cap: 300\n  bonusCap: 150\n  relative: false\n");
    write_skill_file(client_dir.path(), "Swords: 900\nAxes: 900\n");

    let link = Arc::new(ChannelLink::new());
    let server = Runtime::authoritative(settings_in(server_dir.path()), Arc::new(NoNames), link.clone());
    let client = Runtime::dependent(settings_in(client_dir.path()), Arc::new(NoNames));
    assert_eq!(client.get_cap("Swords"), 900);
    assert_eq!(client.phase(), SyncPhase::Unsynced);

    let (peer, frames) = link.connect();
    assert!(server.on_peer_active(peer, PROTOCOL_VERSION));
    assert!(link.disconnect(peer));

    assert_eq!(client.run_receiver(frames).await, 1);
    assert_eq!(client.source_mode(), SourceMode::Authoritative);
    assert_eq!(client.phase(), SyncPhase::Received);
    assert_eq!(client.get_cap("Swords"), 300);
    assert_eq!(client.get_bonus_cap("Swords"), 150);
    assert!(!client.is_relative("Swords"));
    assert_eq!(client.get_cap("Axes"), 250);

    client.reload();
    assert_eq!(client.get_cap("Swords"), 300);
}

#[tokio::test]
async fn test_server_change_reaches_connected_peer() {
    let server_dir = TempDir::new().unwrap();
    let client_dir = TempDir::new().unwrap();
    write_skill_file(server_dir.path(), "Swords: 300\n");

    let link = Arc::new(ChannelLink::new());
    let server = Runtime::authoritative(settings_in(server_dir.path()), Arc::new(NoNames), link.clone());
    let client = Runtime::dependent(settings_in(client_dir.path()), Arc::new(NoNames));

    let (peer, mut frames) = link.connect();
    assert!(server.on_peer_active(peer, PROTOCOL_VERSION));
    let first = frames.recv().await.unwrap();
    assert!(frames.try_recv().is_err());

    assert_eq!(server.broadcast_if_changed(), Some(BroadcastOutcome::Unchanged));

    let mut entries = ConfigurationMap::new();
    entries.insert("Swords".to_string(), SkillConfigEntry::with_cap(420));
    assert!(server.store().save(&entries).is_saved());
    server.reload();
    let second = frames.recv().await.unwrap();
    assert!(frames.try_recv().is_err());

    let client_state = client.state().clone();
    for frame in [first, second] {
        let message = skillcap_sync::SyncMessage::decode(&frame).unwrap();
        client.on_receive(&message.content, message.protocol_version);
    }
    assert_eq!(client_state.entries()["Swords"].cap, 420);
}

#[tokio::test]
async fn test_mismatched_protocol_keeps_local_config() {
    let client_dir = TempDir::new().unwrap();
    write_skill_file(client_dir.path(), "Swords: 275\n");
    let client = Runtime::dependent(settings_in(client_dir.path()), Arc::new(NoNames));

    let link = ChannelLink::new();
    let (peer, frames) = link.connect();
    let stale = skillcap_sync::SyncMessage { content: "Swords: 999\n".to_string(), protocol_version: 1 };
    link.send(peer, &stale).unwrap();
    link.disconnect(peer);

    assert_eq!(client.run_receiver(frames).await, 0);
    assert_eq!(client.source_mode(), SourceMode::Local);
    assert_eq!(client.get_cap("Swords"), 275);
}

#[tokio::test]
async fn test_incompatible_peer_gets_nothing() {
    let server_dir = TempDir::new().unwrap();
    write_skill_file(server_dir.path(), "Swords: 300\n");

    let link = Arc::new(ChannelLink::new());
    let server = Runtime::authoritative(settings_in(server_dir.path()), Arc::new(NoNames), link.clone());
    let (stale, mut stale_frames) = link.connect();
    let (current, mut current_frames) = link.connect();

    assert!(!server.on_peer_active(stale, PROTOCOL_VERSION + 1));
    assert!(server.on_peer_active(current, PROTOCOL_VERSION));
    assert_eq!(link.peer_count(), 1);

    assert!(current_frames.recv().await.is_some());
    assert!(stale_frames.recv().await.is_none());
}
