use std::fmt::Debug;

use derive_more::Display;
use thiserror::Error;

use super::{
    array::Array,
    ops::{Registry, RegistryError},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device error: array on {found} is incompatible with {expected}")]
    Incompatible { expected: Device, found: Device },
}

/// An execution backend. Implementors own the op implementations for their devices.
pub trait Backend: Debug + Send + Sync {
    /// The unique name of the backend, used as the registry key.
    fn name(&self) -> &'static str;
    /// Number of devices the backend exposes.
    fn device_count(&self) -> usize;
    /// Registers every op the backend implements.
    fn register(&self, registry: &mut Registry) -> Result<(), RegistryError>;
}

/// A device of some backend. Devices created by different contexts are never equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{backend}:{index}")]
pub struct Device {
    /// The unique identifier of the device.
    id: uid::Id<DeviceId>,
    /// Name of the backend owning the device.
    backend: &'static str,
    /// Index of the device within its backend.
    index: usize,
}

impl Device {
    #[inline]
    pub(crate) fn new(backend: &'static str, index: usize) -> Self {
        let id = uid::Id::new();
        Self { id, backend, index }
    }

    #[inline]
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Checks that every array lives on this device.
    pub fn check_compatible<'a>(
        &self,
        arrays: impl IntoIterator<Item = &'a Array>,
    ) -> Result<(), DeviceError> {
        match arrays.into_iter().find(|array| array.device() != self) {
            Some(array) => Err(DeviceError::Incompatible {
                expected: self.clone(),
                found: array.device().clone(),
            }),
            None => Ok(()),
        }
    }
}
