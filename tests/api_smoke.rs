//! Public API smoke run: start, restart in another mode, read, stop
//!
//! Regions are created in a private namespace, so no simulator is needed and a
//! running one is never touched. With nothing writing, every buffer reads as zeros.

use anyhow::Result;
use futures::StreamExt;
use rf2_shmem::{AccessMode, Config, Rf2Memory};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

static NEXT_NAMESPACE: AtomicU32 = AtomicU32::new(0);

struct Namespace {
    config: Config,
}

impl Namespace {
    fn new() -> Self {
        let unique = format!(
            "rf2-shmem-smoke-{}-{}",
            std::process::id(),
            NEXT_NAMESPACE.fetch_add(1, Ordering::Relaxed)
        );
        let mut config = Config::default();
        if cfg!(windows) {
            config.instance_id = unique;
        } else {
            config.region.shm_dir = std::env::temp_dir().join(unique);
            std::fs::create_dir_all(&config.region.shm_dir).expect("create shm directory");
        }
        Self { config }
    }
}

impl Drop for Namespace {
    fn drop(&mut self) {
        if !cfg!(windows) {
            let _ = std::fs::remove_dir_all(&self.config.region.shm_dir);
        }
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn start_restart_read_stop() -> Result<()> {
    init_logging();
    let namespace = Namespace::new();
    let mut memory = Rf2Memory::with_config(namespace.config.clone());

    memory.set_access_mode(AccessMode::Direct);
    memory.set_player_override(true);
    memory.set_player_index(0);
    memory.start()?;
    std::thread::sleep(Duration::from_millis(200));
    assert!(memory.is_player(0));
    assert_eq!(memory.player_index(), Some(0));

    memory.stop();
    memory.set_access_mode(AccessMode::Copy);
    memory.set_player_override(false);
    memory.start()?;

    let extended = memory.extended().expect("extended buffer mapped");
    assert_eq!(extended.plugin_version(), "", "no plugin is writing");
    let driver = memory.vehicle_scoring(Some(0)).expect("slot 0 exists");
    assert_eq!(driver.driver_name(), "");
    let info = memory.scoring_info().expect("scoring buffer mapped");
    assert_eq!(info.track_name(), "");
    assert!(!memory.is_player(0), "slot 0 is not flagged once override is off");
    assert_eq!(memory.force_feedback().map(|ffb| ffb.force_value), Some(0.0));

    memory.stop();
    assert!(!memory.is_started());
    assert!(memory.scoring_info().is_some(), "final copies stay readable");
    Ok(())
}

#[test]
fn config_file_drives_the_reader() -> Result<()> {
    let namespace = Namespace::new();
    let path = std::env::temp_dir().join(format!("rf2-shmem-{}.yaml", std::process::id()));
    std::fs::write(
        &path,
        format!(
            "access_mode: direct\ninstance_id: \"{}\"\nplayer_override: true\nplayer_index: 300\n",
            namespace.config.instance_id
        ),
    )?;
    let mut config = Config::from_yaml_file(&path)?;
    std::fs::remove_file(&path)?;
    config.region = namespace.config.region.clone();

    let memory = Rf2Memory::with_config(config);
    assert_eq!(memory.access_mode(), AccessMode::Direct);
    assert_eq!(memory.player_index(), Some(127));
    assert!(memory.is_player(127));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_stream_reports_the_initial_frozen_state() -> Result<()> {
    init_logging();
    let namespace = Namespace::new();
    let mut memory = Rf2Memory::with_config(namespace.config.clone());
    let mut updates = memory.status_updates();

    memory.start()?;
    let status = tokio::time::timeout(Duration::from_secs(1), updates.next())
        .await?
        .expect("status stream open");
    assert!(status.frozen);
    assert!(!status.paused, "an unwritten region is frozen but not paused");
    assert_eq!(status.version, 0);
    assert_eq!(status.poll_interval, Duration::from_millis(500));

    memory.stop();
    drop(memory);
    let rest: Vec<_> = tokio::time::timeout(Duration::from_secs(1), updates.collect()).await?;
    assert!(rest.iter().all(|status| status.frozen));
    Ok(())
}
