use std::{
    marker::PhantomData,
    ops::Deref,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use thiserror::Error;

use super::{
    device::Device,
    layout::{Layout, LayoutError, Shape},
    num::{DataType, Scalar},
    storage::Storage,
};

#[derive(Debug, Error)]
pub enum ArrayError {
    #[error("array type error: data type {0} mismatches {1}")]
    Type(DataType, DataType),
    #[error("array creation error: layout {0}'s size not match data len {1}")]
    Create(Layout, usize),
    #[error("array bounds error: layout {0} exceeds storage of len {1}")]
    Bounds(Layout, usize),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// An array handle: a layout over storage shared with every other handle derived from it.
///
/// The data type is fixed for the lifetime of the storage. Cloning the handle, broadcasting it or
/// permuting it never copies data.
#[derive(Debug, Clone)]
pub struct Array {
    device: Device,
    layout: Layout,
    r#type: DataType,
    storage: Arc<RwLock<Storage>>,
}

impl Array {
    fn from_storage(device: &Device, layout: Layout, storage: Storage) -> Self {
        let device = device.clone();
        let r#type = storage.data_type();
        let storage = Arc::new(RwLock::new(storage));
        Self {
            device,
            layout,
            r#type,
            storage,
        }
    }

    /// Create a contiguous array from row-major `data`.
    pub fn from_vec<T: Scalar>(
        device: &Device,
        shape: impl Into<Shape>,
        data: Vec<T>,
    ) -> Result<Self, ArrayError> {
        let layout = Layout::from_shape(shape);
        if layout.size() != data.len() {
            return Err(ArrayError::Create(layout, data.len()));
        }
        let storage = T::into_storage(data);
        Ok(Self::from_storage(device, layout, storage))
    }

    /// Create a contiguous array of zeros.
    pub fn zeros(device: &Device, shape: impl Into<Shape>, r#type: DataType) -> Self {
        let layout = Layout::from_shape(shape);
        let storage = Storage::zeros(r#type, layout.size());
        Self::from_storage(device, layout, storage)
    }

    /// Create a contiguous array of zeros with the device, shape and data type of `self`.
    #[inline]
    pub fn zeros_like(&self) -> Self {
        Self::zeros(&self.device, self.shape().clone(), self.r#type)
    }

    #[inline]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        self.layout.shape()
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.r#type
    }

    /// Number of logical elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Returns `true` if both handles view the same storage.
    #[inline]
    pub fn shares_storage(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Borrows the array as elements of `T`. Returns error if type mismatches.
    #[inline]
    pub fn view<T: Scalar>(&self) -> Result<ArrayView<'_, T>, ArrayError> {
        if self.r#type != T::DATA_TYPE {
            return Err(ArrayError::Type(self.r#type, T::DATA_TYPE));
        }
        let array = self;
        let phantom = PhantomData;
        Ok(ArrayView { array, phantom })
    }

    /// Re-interpret the storage through another layout, leaving the underlying data untouched.
    pub fn as_strided(&self, layout: Layout) -> Result<Self, ArrayError> {
        let len = self.read().len();
        if let Some((lo, hi)) = layout.bounds() {
            if lo < 0 || hi as usize >= len {
                return Err(ArrayError::Bounds(layout, len));
            }
        }
        let mut output = self.clone();
        output.layout = layout;
        Ok(output)
    }

    /// Broadcast the array to `shape` without copying.
    #[inline]
    pub fn broadcast_to(&self, shape: impl Into<Shape>) -> Result<Self, ArrayError> {
        let layout = self.layout.broadcast_to(&shape.into())?;
        let mut output = self.clone();
        output.layout = layout;
        Ok(output)
    }

    #[inline]
    pub fn permute(&self, axes: &[usize]) -> Result<Self, ArrayError> {
        let layout = self.layout.permute(axes)?;
        let mut output = self.clone();
        output.layout = layout;
        Ok(output)
    }

    #[inline]
    pub fn transpose(&self) -> Self {
        let mut output = self.clone();
        output.layout = self.layout.transpose();
        output
    }

    /// Read the elements in row-major order of the array's shape.
    pub fn to_vec<T: Scalar>(&self) -> Result<Vec<T>, ArrayError> {
        let view = self.view::<T>()?;
        let storage = view.read();
        let data = T::slice(&storage).ok_or(ArrayError::Type(storage.data_type(), T::DATA_TYPE))?;
        Ok(self.layout.iter().map(|offset| data[offset]).collect())
    }

    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Storage> {
        self.storage.read().expect("failed to lock")
    }

    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Storage> {
        self.storage.write().expect("failed to lock")
    }
}

/// An [`Array`] whose data type has been resolved to `T`.
#[derive(Debug)]
pub struct ArrayView<'a, T> {
    array: &'a Array,
    phantom: PhantomData<T>,
}

impl<T> Clone for ArrayView<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArrayView<'_, T> {}

impl<T> Deref for ArrayView<'_, T> {
    type Target = Array;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.array
    }
}

impl<'a, T: Scalar> ArrayView<'a, T> {
    #[inline]
    pub fn array(&self) -> &'a Array {
        self.array
    }
}
