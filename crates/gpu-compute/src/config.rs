//! Configuration for a [`Compute`](crate::Compute) session.

use gpu_backend::DeviceSelection;

/// Default label prefix for command buffers created by
/// [`Compute::run`](crate::Compute::run).
pub const DEFAULT_TASK_LABEL: &str = "compute";

/// Device selection and labelling for a compute session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputeConfig {
    /// Which GPU to open.
    pub device: DeviceSelection,
    /// Label attached to the command queue, shown in GPU debuggers.
    pub queue_label: Option<String>,
    /// Prefix of the command buffer label used by `run`.
    pub default_task_label: String,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            device: DeviceSelection::SystemDefault,
            queue_label: None,
            default_task_label: DEFAULT_TASK_LABEL.to_owned(),
        }
    }
}

impl ComputeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: DeviceSelection) -> Self {
        self.device = device;
        self
    }

    pub fn with_device_index(self, index: usize) -> Self {
        self.with_device(DeviceSelection::Index(index))
    }

    pub fn with_device_name(self, name: impl Into<String>) -> Self {
        self.with_device(DeviceSelection::Name(name.into()))
    }

    pub fn with_queue_label(mut self, label: impl Into<String>) -> Self {
        self.queue_label = Some(label.into());
        self
    }

    pub fn with_default_task_label(mut self, label: impl Into<String>) -> Self {
        self.default_task_label = label.into();
        self
    }
}
