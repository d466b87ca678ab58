//! The native backend, running elementwise kernels on the host.

use std::sync::Arc;

use crate::{
    hal::ops::{AddOp, AsTypeOp, CopyOp, FillOp},
    loom::{
        device::Backend,
        ops::{Registry, RegistryError},
    },
};

mod add;
mod copy;
pub mod elementwise;
mod fill;

pub use add::NativeAddOp;
pub use copy::{NativeAsTypeOp, NativeCopyOp};
pub use fill::NativeFillOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Native {
    /// Number of devices to expose. Devices of the native backend all share host memory.
    devices: usize,
}

impl Default for Native {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Native {
    pub const NAME: &'static str = "native";

    pub fn new(devices: usize) -> Self {
        Self { devices }
    }
}

impl Backend for Native {
    #[inline]
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[inline]
    fn device_count(&self) -> usize {
        self.devices
    }

    fn register(&self, registry: &mut Registry) -> Result<(), RegistryError> {
        registry.register::<dyn CopyOp>(Self::NAME, Arc::new(NativeCopyOp))?;
        registry.register::<dyn AsTypeOp>(Self::NAME, Arc::new(NativeAsTypeOp))?;
        registry.register::<dyn FillOp>(Self::NAME, Arc::new(NativeFillOp))?;
        registry.register::<dyn AddOp>(Self::NAME, Arc::new(NativeAddOp))?;
        Ok(())
    }
}
