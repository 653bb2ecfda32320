//! Physical links and the logical devices attached to them.
//!
//! The registry is an explicit value owned by whoever drives the pipeline;
//! there is no process-wide device list.  Links keep the order in which they
//! were added, and devices keep the order in which they were attached to
//! their link.  That order is the arbiter's tiebreak.
//!
//! # Removal (for beginners)
//!
//! A device configured with hotplug support becomes a *group parent*: the
//! driver spawns one dependent device per other tool the tablet supports.
//! Removing the parent must take its dependents with it, otherwise they would
//! keep pointing at a transport nobody reads any more.  [`DeviceRegistry::remove_device`]
//! does the whole cascade under one `&mut self` borrow, so no sample can be
//! dispatched against a half-removed group.

use thiserror::Error;
use tracing::{debug, info};

use super::device::LogicalDevice;
use super::display::DisplayLayout;
use super::filter::Rotation;
use super::tool::{DeviceId, MappedArea, ToolState, ToolType};
use crate::engine::arbiter::DeviceArbiter;
use crate::engine::events::InputEvent;
use crate::engine::producer::SampleProducer;

/// Errors raised by registry operations.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    /// No logical device with this id exists.
    #[error("device not found: {0}")]
    DeviceNotFound(DeviceId),

    /// No physical link with this path exists.
    #[error("link not found: {0}")]
    LinkNotFound(String),

    /// The link already has a device of this role, serial and area.
    #[error("duplicate {tool} device on {path}")]
    DuplicateRole { path: String, tool: ToolType },
}

/// Whether the transport behind a link is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Samples are read and dispatched.
    Open,
    /// Every device was removed; the transport handle was released.
    Closed,
    /// Opening the transport failed.  Needs reconfiguration.
    Unusable,
}

/// What the tablet behind a link reports, as detected from its protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct TabletCapabilities {
    pub max_x: i32,
    pub max_y: i32,
    pub max_z: i32,
    pub tilt_supported: bool,
    /// Tool roles the tablet can report.
    pub tools: Vec<ToolType>,
}

impl TabletCapabilities {
    pub fn new(max_x: i32, max_y: i32, max_z: i32, tilt_supported: bool, tools: Vec<ToolType>) -> Self {
        Self {
            max_x,
            max_y,
            max_z,
            tilt_supported,
            tools,
        }
    }

    /// The whole tablet surface.
    pub fn full_area(&self) -> MappedArea {
        MappedArea::full(self.max_x, self.max_y)
    }
}

/// Link-wide sample filtering settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSettings {
    /// Minimum change before a sample is reported.
    pub suppress: i32,
    /// Window size of the raw averaging filter.
    pub raw_sample: usize,
    /// Average the last `raw_sample` positions.
    pub raw_filter: bool,
    pub rotation: Rotation,
    /// Out-of-proximity button reports are macro keys.
    pub macro_keys: bool,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            suppress: 2,
            raw_sample: 4,
            raw_filter: false,
            rotation: Rotation::None,
            macro_keys: true,
        }
    }
}

/// One physical link and the logical devices sharing it.
#[derive(Debug)]
pub struct SharedLink {
    path: String,
    pub(crate) devices: Vec<LogicalDevice>,
    status: LinkStatus,
    pub capabilities: TabletCapabilities,
    pub settings: LinkSettings,
    producer: SampleProducer,
}

impl SharedLink {
    fn new(path: String, capabilities: TabletCapabilities, settings: LinkSettings) -> Self {
        Self {
            path,
            devices: Vec::new(),
            status: LinkStatus::Open,
            capabilities,
            settings,
            producer: SampleProducer::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    /// Devices in arbitration order.
    pub fn devices(&self) -> &[LogicalDevice] {
        &self.devices
    }

    fn position(&self, id: DeviceId) -> Option<usize> {
        self.devices.iter().position(|d| d.id() == id)
    }
}

/// Result of [`DeviceRegistry::remove_device`].
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    /// Every removed device, dependents first.
    pub removed: Vec<DeviceId>,
    /// Path of the link that was closed because it lost its last device.
    pub closed_link: Option<String>,
}

/// All links known to the driver.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    links: Vec<SharedLink>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a link, or returns the existing one with the same path.
    pub fn add_link(
        &mut self,
        path: impl Into<String>,
        capabilities: TabletCapabilities,
        settings: LinkSettings,
    ) -> &mut SharedLink {
        let path = path.into();
        let idx = match self.links.iter().position(|l| l.path == path) {
            Some(idx) => idx,
            None => {
                debug!(path = %path, "link added");
                self.links.push(SharedLink::new(path, capabilities, settings));
                self.links.len() - 1
            }
        };
        &mut self.links[idx]
    }

    pub fn links(&self) -> impl Iterator<Item = &SharedLink> {
        self.links.iter()
    }

    pub fn link(&self, path: &str) -> Option<&SharedLink> {
        self.links.iter().find(|l| l.path == path)
    }

    pub fn link_mut(&mut self, path: &str) -> Option<&mut SharedLink> {
        self.links.iter_mut().find(|l| l.path == path)
    }

    /// Attaches `device` to the link at `path`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::LinkNotFound`] if no link has that path.
    /// - [`RegistryError::DuplicateRole`] if the link already has a device of
    ///   the same tool role, serial filter and mapped area.
    pub fn add_device(&mut self, path: &str, device: LogicalDevice) -> Result<DeviceId, RegistryError> {
        let link = self
            .link_mut(path)
            .ok_or_else(|| RegistryError::LinkNotFound(path.to_string()))?;
        if link.devices.iter().any(|d| {
            d.tool() == device.tool() && d.serial == device.serial && d.area() == device.area()
        }) {
            return Err(RegistryError::DuplicateRole {
                path: path.to_string(),
                tool: device.tool(),
            });
        }
        let id = device.id();
        debug!(path, device = %device.name, tool = %device.tool(), "device attached");
        link.devices.push(device);
        link.status = LinkStatus::Open;
        Ok(id)
    }

    /// Attaches `device` as a dependent of `parent`, on the parent's link.
    ///
    /// The parent becomes a group parent.
    pub fn add_dependent(
        &mut self,
        parent: DeviceId,
        mut device: LogicalDevice,
    ) -> Result<DeviceId, RegistryError> {
        let path = self
            .link_of(parent)
            .map(|l| l.path.clone())
            .ok_or(RegistryError::DeviceNotFound(parent))?;
        device.set_parent(parent);
        let id = self.add_device(&path, device)?;
        if let Some(p) = self.device_mut(parent) {
            p.mark_group_parent();
        }
        Ok(id)
    }

    /// The link a device is attached to.
    pub fn link_of(&self, id: DeviceId) -> Option<&SharedLink> {
        self.links.iter().find(|l| l.position(id).is_some())
    }

    /// The link a device is attached to, mutably.
    pub fn link_of_mut(&mut self, id: DeviceId) -> Option<&mut SharedLink> {
        self.links.iter_mut().find(|l| l.position(id).is_some())
    }

    pub fn device(&self, id: DeviceId) -> Option<&LogicalDevice> {
        self.links.iter().flat_map(|l| l.devices.iter()).find(|d| d.id() == id)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut LogicalDevice> {
        self.links
            .iter_mut()
            .flat_map(|l| l.devices.iter_mut())
            .find(|d| d.id() == id)
    }

    /// Finds a device by its configured name.
    pub fn find_by_name(&self, name: &str) -> Option<&LogicalDevice> {
        self.links
            .iter()
            .flat_map(|l| l.devices.iter())
            .find(|d| d.name == name)
    }

    /// Total number of devices across all links.
    pub fn device_count(&self) -> usize {
        self.links.iter().map(|l| l.devices.len()).sum()
    }

    /// Removes a device.  A group parent takes every dependent with it.  A link
    /// left without devices is closed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DeviceNotFound`] if `id` is unknown.
    pub fn remove_device(&mut self, id: DeviceId) -> Result<Removal, RegistryError> {
        let link = self
            .link_of_mut(id)
            .ok_or(RegistryError::DeviceNotFound(id))?;

        let mut removed: Vec<DeviceId> = link
            .devices
            .iter()
            .filter(|d| d.parent() == Some(id))
            .map(|d| d.id())
            .collect();
        removed.push(id);
        link.devices.retain(|d| !removed.contains(&d.id()));

        let closed_link = if link.devices.is_empty() {
            link.status = LinkStatus::Closed;
            link.producer.reset();
            Some(link.path.clone())
        } else {
            None
        };

        info!(
            path = %link.path,
            removed = removed.len(),
            closed = closed_link.is_some(),
            "device removed"
        );
        Ok(Removal { removed, closed_link })
    }

    /// Marks a link whose transport could not be opened.  Its samples are
    /// never dispatched.
    pub fn mark_unusable(&mut self, path: &str) -> Result<(), RegistryError> {
        let link = self
            .link_mut(path)
            .ok_or_else(|| RegistryError::LinkNotFound(path.to_string()))?;
        link.status = LinkStatus::Unusable;
        Ok(())
    }

    /// Runs one decoded state from the link at `path` through the pipeline,
    /// appending every synthesized event to `events`.
    ///
    /// Returns the device that received the sample, or `None` if the state
    /// was filtered, the link is not open, or no device matched.
    pub fn dispatch(
        &mut self,
        path: &str,
        state: &ToolState,
        layout: &DisplayLayout,
        events: &mut Vec<InputEvent>,
    ) -> Result<Option<DeviceId>, RegistryError> {
        let link = self
            .link_mut(path)
            .ok_or_else(|| RegistryError::LinkNotFound(path.to_string()))?;
        if link.status != LinkStatus::Open {
            return Ok(None);
        }
        let Some(sample) = link.producer.produce(state, &link.settings, &link.capabilities) else {
            return Ok(None);
        };
        Ok(DeviceArbiter::dispatch(link, sample, layout, events))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
