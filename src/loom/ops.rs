use std::{any::Any, collections::hash_map::Entry, sync::Arc};

use derive_more::Display;
use itertools::Itertools;
use rustc_hash::FxHashMap as HashMap;
use thiserror::Error;

use super::{
    array::ArrayError, device::DeviceError, layout::LayoutError, num::DataTypeError,
};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry error: op {0} is already registered")]
    Duplicate(OpKey),
    #[error("registry error: op {0} is not registered")]
    NotFound(OpKey),
}

/// Errors raised by an op before any element is written.
#[derive(Debug, Error)]
pub enum OpError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Array(#[from] ArrayError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Type(#[from] DataTypeError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Implemented for the trait object of each op interface, e.g. `dyn CopyOp`.
/// Backends implement the interface and register it under their name.
pub trait OpContract: Send + Sync + 'static {
    /// Name of the op, unique among all contracts.
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("{backend}::{op}")]
pub struct OpKey {
    pub backend: &'static str,
    pub op: &'static str,
}

/// Maps `(backend, op)` keys to exactly one implementation each.
#[derive(Default)]
pub struct Registry {
    ops: HashMap<OpKey, Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

impl Registry {
    /// Registers `op` as the implementation of contract `C` for `backend`.
    pub fn register<C>(&mut self, backend: &'static str, op: Arc<C>) -> Result<(), RegistryError>
    where
        C: OpContract + ?Sized,
    {
        let key = OpKey {
            backend,
            op: C::NAME,
        };
        self.insert(key, Box::new(op))
    }

    fn insert(&mut self, key: OpKey, op: Box<dyn Any + Send + Sync>) -> Result<(), RegistryError> {
        match self.ops.entry(key) {
            Entry::Occupied(_) => Err(RegistryError::Duplicate(key)),
            Entry::Vacant(entry) => {
                log::trace!("register op {key}");
                entry.insert(op);
                Ok(())
            }
        }
    }

    /// Looks up the implementation of contract `C` for `backend`.
    pub fn find<C>(&self, backend: &'static str) -> Result<Arc<C>, RegistryError>
    where
        C: OpContract + ?Sized,
    {
        let key = OpKey {
            backend,
            op: C::NAME,
        };
        self.ops
            .get(&key)
            .and_then(|op| (**op).downcast_ref::<Arc<C>>())
            .cloned()
            .ok_or(RegistryError::NotFound(key))
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<OpKey> {
        self.ops
            .keys()
            .copied()
            .sorted_by_key(|key| (key.backend, key.op))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Moves every op of `other` into `self`. Fails on the first key registered in both.
    pub fn merge(&mut self, other: Registry) -> Result<(), RegistryError> {
        other
            .ops
            .into_iter()
            .try_for_each(|(key, op)| self.insert(key, op))
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, sync::Arc};

    use super::{OpContract, OpKey, Registry, RegistryError};

    trait PhonyOp: Send + Sync {
        fn value(&self) -> usize;
    }

    impl OpContract for dyn PhonyOp {
        const NAME: &'static str = "phony";
    }

    struct Phony<const N: usize>;

    impl<const N: usize> PhonyOp for Phony<N> {
        fn value(&self) -> usize {
            N
        }
    }

    #[test]
    fn test_register() -> Result<(), Box<dyn Error>> {
        let mut registry = Registry::default();
        registry.register::<dyn PhonyOp>("a", Arc::new(Phony::<0>))?;
        registry.register::<dyn PhonyOp>("b", Arc::new(Phony::<1>))?;

        assert_eq!(registry.find::<dyn PhonyOp>("a")?.value(), 0);
        assert_eq!(registry.find::<dyn PhonyOp>("b")?.value(), 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.keys(),
            vec![
                OpKey {
                    backend: "a",
                    op: "phony"
                },
                OpKey {
                    backend: "b",
                    op: "phony"
                },
            ]
        );

        let err = registry.register::<dyn PhonyOp>("a", Arc::new(Phony::<2>));
        assert!(matches!(err, Err(RegistryError::Duplicate(_))));
        assert_eq!(registry.find::<dyn PhonyOp>("a")?.value(), 0);

        let err = registry.find::<dyn PhonyOp>("c");
        assert!(matches!(err, Err(RegistryError::NotFound(key)) if key.backend == "c"));
        Ok(())
    }

    #[test]
    fn test_merge() -> Result<(), Box<dyn Error>> {
        let mut x = Registry::default();
        x.register::<dyn PhonyOp>("a", Arc::new(Phony::<0>))?;

        let mut y = Registry::default();
        y.register::<dyn PhonyOp>("b", Arc::new(Phony::<1>))?;
        x.merge(y)?;
        assert_eq!(x.len(), 2);

        let mut z = Registry::default();
        z.register::<dyn PhonyOp>("b", Arc::new(Phony::<2>))?;
        assert!(matches!(x.merge(z), Err(RegistryError::Duplicate(_))));
        Ok(())
    }
}
