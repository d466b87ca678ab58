use std::sync::Arc;

use thiserror::Error;

use super::{
    device::{Backend, Device},
    ops::{OpContract, Registry, RegistryError},
};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("context error: device {0:?} not found")]
    Device(String),
    #[error("context error: backend {0} is added twice")]
    Backend(&'static str),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Owns the backends, their devices and the op registry.
///
/// Each context mints its own devices, so arrays created under different contexts are never
/// compatible with each other.
#[derive(Debug)]
pub struct Context {
    backends: Vec<Arc<dyn Backend>>,
    devices: Vec<Device>,
    registry: Registry,
}

impl Context {
    #[inline]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    #[inline]
    pub fn backends(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.backends.iter().map(|backend| backend.name())
    }

    /// Finds a device by name, either `"{backend}:{index}"` or `"{backend}"` for index 0.
    pub fn device(&self, name: &str) -> Result<Device, ContextError> {
        let err = || ContextError::Device(name.to_owned());
        let (backend, index) = match name.split_once(':') {
            Some((backend, index)) => (backend, index.parse::<usize>().map_err(|_| err())?),
            None => (name, 0),
        };
        self.devices
            .iter()
            .find(|device| device.backend() == backend && device.index() == index)
            .cloned()
            .ok_or_else(err)
    }

    /// Looks up the implementation of contract `C` for the backend of `device`.
    ///
    /// # Panics
    /// With feature `strict`, panics if the backend does not implement the op.
    pub fn op<C: OpContract + ?Sized>(&self, device: &Device) -> Result<Arc<C>, RegistryError> {
        match self.registry.find::<C>(device.backend()) {
            Ok(op) => Ok(op),
            Err(err) => {
                log::error!("unable to find op {} for device {device}", C::NAME);
                #[cfg(feature = "strict")]
                panic!("{err}");
                #[cfg(not(feature = "strict"))]
                Err(err)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ContextBuilder {
    backends: Vec<Arc<dyn Backend>>,
    ops: Registry,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_backend(mut self, backend: impl Backend + 'static) -> Self {
        self.backends.push(Arc::new(backend));
        self
    }

    /// Registers an extra op for `backend`, on top of the ops the backend registers itself.
    /// Registering a key that is already taken fails here or in [`ContextBuilder::build`].
    pub fn add_op<C: OpContract + ?Sized>(
        mut self,
        backend: &'static str,
        op: Arc<C>,
    ) -> Result<Self, RegistryError> {
        self.ops.register(backend, op)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Context, ContextError> {
        let mut registry = Registry::default();
        let mut devices = vec![];
        for (index, backend) in self.backends.iter().enumerate() {
            let name = backend.name();
            if self.backends[..index].iter().any(|x| x.name() == name) {
                return Err(ContextError::Backend(name));
            }
            backend.register(&mut registry)?;
            devices.extend((0..backend.device_count()).map(|index| Device::new(name, index)));
            log::debug!(
                "backend {name} added with {} devices",
                backend.device_count()
            );
        }
        registry.merge(self.ops)?;

        let backends = self.backends;
        Ok(Context {
            backends,
            devices,
            registry,
        })
    }
}
