//! ManageDevicesUseCase: builds the device registry from configuration and
//! handles hotplug groups and device removal.
//!
//! # Links and devices (for beginners)
//!
//! Every configured device names the device file (`path`) of the tablet it
//! reads from.  All devices that share a path share one *link*: one transport
//! handle and one reader thread.  The registry keeps links in the order their
//! path first appears in the configuration, and devices in configuration
//! order within each link.  That order matters: when two mapped areas
//! overlap, the device listed first wins.
//!
//! A device configured with `auto_hotplug = true` is a *group parent*.  Right
//! after it is added, one dependent device is created for every other tool
//! role the tablet reports:
//!
//! ```text
//! "pen" (stylus, auto_hotplug)
//!   ├── "pen eraser"
//!   ├── "pen cursor"
//!   └── "pen pad"
//! ```
//!
//! Removing the parent removes the whole group.

use tablet_core::{
    DeviceConfig, DeviceError, DeviceId, DeviceRegistry, LinkSettings, LinkStatus, LogicalDevice,
    MappedArea, Mode, PressureCurve, RegistryError, Removal, Rotation, TabletCapabilities,
    ToolType,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Error type for registry construction and device management.
#[derive(Debug, Error, PartialEq)]
pub enum ManageError {
    /// A configured device has a setting the core rejects.
    #[error("device '{name}': {source}")]
    InvalidDevice {
        name: String,
        #[source]
        source: DeviceError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// One configured logical device, independent of the file format it was
/// read from.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    pub name: String,
    /// Device file of the tablet this device reads from.
    pub path: String,
    pub tool: ToolType,
    pub serial: u32,
    /// `None` maps the whole tablet surface.
    pub area: Option<MappedArea>,
    /// `None` uses the tool role's default mode.
    pub mode: Option<Mode>,
    pub speed: f64,
    pub screen_no: i32,
    pub buttons_only: bool,
    pub core_pointer: bool,
    pub press_curve: [i32; 4],
    /// Host button for physical buttons 1, 2, 3 …  Buttons past the end of
    /// the list keep their identity mapping.
    pub buttons: Vec<u16>,
    pub auto_hotplug: bool,
    pub rotate: Rotation,
}

impl DeviceSpec {
    /// A device with every optional setting at its default.
    pub fn new(name: impl Into<String>, path: impl Into<String>, tool: ToolType) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            tool,
            serial: 0,
            area: None,
            mode: None,
            speed: tablet_core::domain::device::DEFAULT_SPEED,
            screen_no: -1,
            buttons_only: false,
            core_pointer: false,
            press_curve: [0, 0, 100, 100],
            buttons: Vec::new(),
            auto_hotplug: false,
            rotate: Rotation::None,
        }
    }

    /// Builds the logical device for a tablet with `caps`.
    ///
    /// # Errors
    ///
    /// Returns [`ManageError::InvalidDevice`] if any setting is out of range.
    pub fn to_device(&self, caps: &TabletCapabilities) -> Result<LogicalDevice, ManageError> {
        let invalid = |source| ManageError::InvalidDevice {
            name: self.name.clone(),
            source,
        };

        let mut config = DeviceConfig::new(self.name.clone(), self.tool, caps.max_x, caps.max_y);
        config.serial = self.serial;
        if let Some(area) = self.area {
            config.area = area;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        config.speed = self.speed;
        config.screen_no = self.screen_no;
        config.buttons_only = self.buttons_only;
        config.core_pointer = self.core_pointer;
        config.press_curve = PressureCurve::new(self.press_curve)
            .ok_or_else(|| invalid(DeviceError::InvalidPressureCurve(self.press_curve)))?;
        for (i, &target) in self.buttons.iter().enumerate() {
            config.button_map.set(i + 1, target).map_err(invalid)?;
        }

        LogicalDevice::new(config).map_err(invalid)
    }
}

/// Result of opening one link's transport.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSetup {
    pub path: String,
    /// What the tablet reports, or `None` if the transport could not be
    /// opened.
    pub capabilities: Option<TabletCapabilities>,
}

/// Builds the registry for `specs`.
///
/// Each distinct path becomes one link using the capabilities found in
/// `links`.  A link whose transport could not be opened is marked unusable and
/// gets no devices.  The link rotation is the first non-`None` rotation among
/// its devices.  A device that duplicates an earlier one on the same link is
/// skipped with a warning.
///
/// # Errors
///
/// Returns [`ManageError::InvalidDevice`] for the first device whose settings
/// are rejected.
pub fn build_registry(
    specs: &[DeviceSpec],
    links: &[LinkSetup],
    settings: &LinkSettings,
) -> Result<DeviceRegistry, ManageError> {
    let mut registry = DeviceRegistry::new();

    for spec in specs {
        if registry.link(&spec.path).is_some() {
            continue;
        }
        let caps = links
            .iter()
            .find(|l| l.path == spec.path)
            .and_then(|l| l.capabilities.clone());
        let Some(caps) = caps else {
            error!(path = %spec.path, "cannot open tablet; its devices are disabled");
            let none = TabletCapabilities::new(0, 0, 0, false, Vec::new());
            registry.add_link(spec.path.clone(), none, settings.clone());
            registry.mark_unusable(&spec.path)?;
            continue;
        };
        let rotation = specs
            .iter()
            .filter(|s| s.path == spec.path)
            .map(|s| s.rotate)
            .find(|r| *r != Rotation::None)
            .unwrap_or_default();
        registry.add_link(
            spec.path.clone(),
            caps,
            LinkSettings {
                rotation,
                ..settings.clone()
            },
        );
    }

    for spec in specs {
        let Some(link) = registry.link(&spec.path) else {
            continue;
        };
        if link.status() == LinkStatus::Unusable {
            continue;
        }
        let caps = link.capabilities.clone();
        let device = spec.to_device(&caps)?;
        match registry.add_device(&spec.path, device) {
            Ok(id) => {
                info!(device = %spec.name, tool = %spec.tool, path = %spec.path, "device configured");
                if spec.auto_hotplug {
                    add_dependents(&mut registry, id)?;
                }
            }
            Err(e @ RegistryError::DuplicateRole { .. }) => {
                warn!(device = %spec.name, "{e}; skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(registry)
}

/// Creates one dependent of `parent` for every other tool role its tablet
/// reports.  Returns the ids of the devices created.
///
/// A dependent that would duplicate an existing device is not created.
///
/// # Errors
///
/// Returns [`ManageError::Registry`] if `parent` is unknown.
pub fn add_dependents(
    registry: &mut DeviceRegistry,
    parent: DeviceId,
) -> Result<Vec<DeviceId>, ManageError> {
    let (name, tool) = registry
        .device(parent)
        .map(|d| (d.name.clone(), d.tool()))
        .ok_or(RegistryError::DeviceNotFound(parent))?;
    let caps = registry
        .link_of(parent)
        .map(|l| l.capabilities.clone())
        .ok_or(RegistryError::DeviceNotFound(parent))?;

    let mut created = Vec::new();
    for &other in caps.tools.iter().filter(|&&t| t != tool) {
        let config = DeviceConfig::new(format!("{name} {other}"), other, caps.max_x, caps.max_y);
        let device = LogicalDevice::new(config).map_err(|source| ManageError::InvalidDevice {
            name: format!("{name} {other}"),
            source,
        })?;
        match registry.add_dependent(parent, device) {
            Ok(id) => created.push(id),
            Err(RegistryError::DuplicateRole { .. }) => {
                debug!(parent = %name, tool = %other, "dependent already configured");
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!(parent = %name, dependents = created.len(), "hotplug group created");
    Ok(created)
}

/// Removes a device, taking its dependents with it if it is a group parent.
///
/// # Errors
///
/// Returns [`ManageError::Registry`] if `id` is unknown.
pub fn remove_device(registry: &mut DeviceRegistry, id: DeviceId) -> Result<Removal, ManageError> {
    let removal = registry.remove_device(id)?;
    if let Some(path) = &removal.closed_link {
        info!(path = %path, "last device removed; link closed");
    }
    Ok(removal)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
