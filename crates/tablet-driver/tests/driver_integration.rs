//! Integration tests for the driver pipeline.
//!
//! These tests run a recorded capture through every layer of tablet-driver:
//! TOML config → `build_registry` → reader thread → `run_event_loop` →
//! `RecordingSink`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tablet_core::{InputEvent, LinkStatus, ToolState, ToolType};
use tablet_driver::application::manage_devices::{build_registry, DeviceSpec, LinkSetup};
use tablet_driver::application::process_samples::{run_event_loop, DriverContext, InputSink};
use tablet_driver::infrastructure::host::mock::RecordingSink;
use tablet_driver::infrastructure::storage::config::{load_config_from, AppConfig};
use tablet_driver::infrastructure::transport::replay::CaptureWriter;
use tablet_driver::infrastructure::transport::{
    open_transport, reader::spawn_reader, CaptureHeader, Transport, CAPTURE_VERSION,
};
use tokio::sync::mpsc;
use uuid::Uuid;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tablet_it_{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn pen(x: i32, y: i32, proximity: bool) -> ToolState {
    ToolState {
        tool: Some(ToolType::Stylus),
        proximity,
        x,
        y,
        ..ToolState::default()
    }
}

fn write_capture(path: &Path, states: &[ToolState]) {
    let header = CaptureHeader {
        version: CAPTURE_VERSION,
        bus: "usb".to_string(),
        force_device: None,
        model: "Intuos".to_string(),
        tools: vec![ToolType::Stylus, ToolType::Eraser],
        max_x: 20000,
        max_y: 15000,
        max_z: 1023,
        max_tilt: 63,
    };
    let file = File::create(path).expect("create capture");
    let mut writer = CaptureWriter::new(file, &header).expect("write header");
    for state in states {
        writer.write_state(state).expect("write frame");
    }
    writer.finish().expect("flush capture");
}

fn write_config(dir: &Path, capture: &Path, extra: &str) -> AppConfig {
    let toml_str = format!(
        r#"
[driver]
suppress = 0

[[devices]]
name = "pen"
path = "{}"
type = "stylus"
{extra}
"#,
        capture.display()
    );
    let config_path = dir.join("config.toml");
    std::fs::write(&config_path, toml_str).expect("write config");
    load_config_from(&config_path).expect("load config")
}

/// Opens every configured path and builds the links the way the binary does.
fn open_links(specs: &[DeviceSpec]) -> (Vec<LinkSetup>, Vec<(String, Box<dyn Transport>)>) {
    let mut setups: Vec<LinkSetup> = Vec::new();
    let mut transports = Vec::new();
    for spec in specs {
        if setups.iter().any(|s| s.path == spec.path) {
            continue;
        }
        let capabilities = match open_transport(Path::new(&spec.path)) {
            Ok(transport) => {
                let caps = transport.descriptor().capabilities();
                transports.push((spec.path.clone(), transport));
                Some(caps)
            }
            Err(_) => None,
        };
        setups.push(LinkSetup {
            path: spec.path.clone(),
            capabilities,
        });
    }
    (setups, transports)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_capture_replays_through_to_host_events() {
    // Arrange
    let dir = temp_dir();
    let capture = dir.join("pen.capture");
    write_capture(
        &capture,
        &[
            pen(2000, 2000, true),
            pen(6000, 5000, true),
            pen(10000, 7500, true),
            pen(10000, 7500, false),
        ],
    );
    let cfg = write_config(&dir, &capture, "");
    let layout = cfg.display.to_layout().expect("layout");
    let specs: Vec<_> = cfg.devices.iter().map(|d| d.to_spec().unwrap()).collect();
    let (setups, transports) = open_links(&specs);
    let registry = build_registry(&specs, &setups, &cfg.driver.link_settings()).unwrap();
    let id = registry.find_by_name("pen").expect("pen configured").id();

    let sink = Arc::new(RecordingSink::new());
    let running = Arc::new(AtomicBool::new(true));
    let (tx, mut rx) = mpsc::channel(16);
    let mut readers = Vec::new();
    for (path, transport) in transports {
        readers.push(spawn_reader(path, transport, tx.clone(), Arc::clone(&running)).unwrap());
    }
    drop(tx);

    // Act
    let mut ctx = DriverContext::new(registry, layout, Arc::clone(&sink) as Arc<dyn InputSink>);
    run_event_loop(&mut ctx, &mut rx, &running).await;
    for reader in readers {
        reader.join().expect("reader thread");
    }

    // Assert: the first report only arms the device
    let events = sink.events();
    assert_eq!(events.first(), Some(&InputEvent::ProximityIn { device: id, screen: 0 }));
    assert_eq!(events.last(), Some(&InputEvent::ProximityOut { device: id }));
    let motions = events
        .iter()
        .filter(|e| matches!(e, InputEvent::Motion { .. }))
        .count();
    assert_eq!(motions, 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_hotplug_dependent_claims_eraser_reports() {
    // Arrange
    let dir = temp_dir();
    let capture = dir.join("eraser.capture");
    let eraser = |x| ToolState {
        tool: Some(ToolType::Eraser),
        ..pen(x, 3000, true)
    };
    write_capture(&capture, &[eraser(1000), eraser(4000)]);
    let cfg = write_config(&dir, &capture, "auto_hotplug = true");
    let layout = cfg.display.to_layout().expect("layout");
    let specs: Vec<_> = cfg.devices.iter().map(|d| d.to_spec().unwrap()).collect();
    let (setups, transports) = open_links(&specs);
    let registry = build_registry(&specs, &setups, &cfg.driver.link_settings()).unwrap();
    let eraser_id = registry.find_by_name("pen eraser").expect("dependent created").id();

    let sink = Arc::new(RecordingSink::new());
    let running = Arc::new(AtomicBool::new(true));
    let (tx, mut rx) = mpsc::channel(16);
    let mut readers = Vec::new();
    for (path, transport) in transports {
        readers.push(spawn_reader(path, transport, tx.clone(), Arc::clone(&running)).unwrap());
    }
    drop(tx);

    // Act
    let mut ctx = DriverContext::new(registry, layout, Arc::clone(&sink) as Arc<dyn InputSink>);
    run_event_loop(&mut ctx, &mut rx, &running).await;
    for reader in readers {
        reader.join().expect("reader thread");
    }

    // Assert
    let events = sink.events();
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.device() == eraser_id));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_capture_leaves_link_unusable_without_devices() {
    // Arrange
    let dir = temp_dir();
    let cfg = write_config(&dir, &dir.join("absent.capture"), "");
    let specs: Vec<_> = cfg.devices.iter().map(|d| d.to_spec().unwrap()).collect();

    // Act
    let (setups, transports) = open_links(&specs);
    let registry = build_registry(&specs, &setups, &cfg.driver.link_settings()).unwrap();

    // Assert
    assert!(transports.is_empty());
    assert_eq!(registry.device_count(), 0);
    let path = specs[0].path.as_str();
    assert_eq!(registry.link(path).map(|l| l.status()), Some(LinkStatus::Unusable));

    let _ = std::fs::remove_dir_all(&dir);
}
