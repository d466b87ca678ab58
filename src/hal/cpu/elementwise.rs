//! Strided, broadcasting elementwise iteration.
//!
//! [`elementwise`] runs a kernel once per element of the broadcast shape of all operands. Inputs are
//! gathered in row-major order before the kernel runs and outputs are scattered after it, so an
//! output may alias an input, and a failed call never writes anything.

use casey::snake;
use itertools::Itertools;

use crate::loom::{
    array::{Array, ArrayError, ArrayView},
    layout::{Layout, LayoutError, Shape},
    num::Scalar,
};

/// Arrays read by an elementwise kernel.
pub trait Inputs {
    /// Values of one element across all inputs.
    type Item: Send;
    /// Values of all inputs gathered in iteration order.
    type Columns: Sync;

    fn arrays(&self) -> Vec<&Array>;
    fn gather(&self, shape: &Shape) -> Result<Self::Columns, ArrayError>;
    fn item(columns: &Self::Columns, index: usize) -> Self::Item;
}

/// Arrays written by an elementwise kernel.
pub trait Outputs {
    /// Values of one element across all outputs.
    type Item: Copy + Send;

    fn arrays(&self) -> Vec<&Array>;
    /// Writes `f(value)` for each of `values`, in iteration order.
    fn scatter<S, F>(&self, values: &[S], f: F) -> Result<(), ArrayError>
    where
        F: Fn(&S) -> Self::Item;
}

impl Inputs for () {
    type Item = ();
    type Columns = ();

    #[inline]
    fn arrays(&self) -> Vec<&Array> {
        vec![]
    }

    #[inline]
    fn gather(&self, _: &Shape) -> Result<Self::Columns, ArrayError> {
        Ok(())
    }

    #[inline]
    fn item(_: &Self::Columns, _: usize) -> Self::Item {}
}

impl<T: Scalar> Inputs for ArrayView<'_, T> {
    type Item = T;
    type Columns = Vec<T>;

    #[inline]
    fn arrays(&self) -> Vec<&Array> {
        vec![self.array()]
    }

    fn gather(&self, shape: &Shape) -> Result<Self::Columns, ArrayError> {
        let layout = self.layout().broadcast_to(shape)?;
        let storage = self.read();
        let data = T::slice(&storage).ok_or(ArrayError::Type(storage.data_type(), T::DATA_TYPE))?;
        Ok(layout.iter().map(|offset| data[offset]).collect())
    }

    #[inline]
    fn item(columns: &Self::Columns, index: usize) -> Self::Item {
        columns[index]
    }
}

impl<T: Scalar> Outputs for ArrayView<'_, T> {
    type Item = T;

    #[inline]
    fn arrays(&self) -> Vec<&Array> {
        vec![self.array()]
    }

    fn scatter<S, F>(&self, values: &[S], f: F) -> Result<(), ArrayError>
    where
        F: Fn(&S) -> Self::Item,
    {
        let mut storage = self.write();
        let r#type = storage.data_type();
        let data = T::slice_mut(&mut storage).ok_or(ArrayError::Type(r#type, T::DATA_TYPE))?;
        for (offset, value) in self.layout().iter().zip_eq(values) {
            data[offset] = f(value);
        }
        Ok(())
    }
}

macro_rules! impl_tuple {
    ($($t:ident: $n:tt),+) => {
        impl<$($t),+> Inputs for ($($t),+)
        where
            $($t: Inputs),+
        {
            type Item = ($($t::Item),+);
            type Columns = ($($t::Columns),+);

            #[inline]
            fn arrays(&self) -> Vec<&Array> {
                let ($(snake!($t)),+) = self;
                [$(snake!($t).arrays()),+].concat()
            }

            fn gather(&self, shape: &Shape) -> Result<Self::Columns, ArrayError> {
                let ($(snake!($t)),+) = self;
                Ok(($(snake!($t).gather(shape)?),+))
            }

            #[inline]
            fn item(columns: &Self::Columns, index: usize) -> Self::Item {
                let ($(snake!($t)),+) = columns;
                ($($t::item(snake!($t), index)),+)
            }
        }

        impl<$($t),+> Outputs for ($($t),+)
        where
            $($t: Outputs),+
        {
            type Item = ($($t::Item),+);

            #[inline]
            fn arrays(&self) -> Vec<&Array> {
                let ($(snake!($t)),+) = self;
                [$(snake!($t).arrays()),+].concat()
            }

            fn scatter<S, F>(&self, values: &[S], f: F) -> Result<(), ArrayError>
            where
                F: Fn(&S) -> Self::Item,
            {
                let ($(snake!($t)),+) = self;
                $(snake!($t).scatter(values, |value| f(value).$n)?;)+
                Ok(())
            }
        }
    };
}

impl_tuple!(T0: 0, T1: 1);
impl_tuple!(T0: 0, T1: 1, T2: 2);
impl_tuple!(T0: 0, T1: 1, T2: 2, T3: 3);

/// Outputs are never broadcast: they must span the iteration shape and address distinct elements.
fn check_output(layout: &Layout, shape: &Shape) -> Result<(), LayoutError> {
    if layout.shape() != shape {
        return Err(LayoutError::Output(layout.clone(), shape.clone()));
    }
    if layout.has_overlap() {
        return Err(LayoutError::Overlap(layout.clone()));
    }
    Ok(())
}

/// Runs `kernel` for every element of the broadcast shape of `inputs` and `outputs`.
///
/// The kernel receives the row-major linear index of the element and the input values at that
/// element, and returns the output values. Invocation order is unspecified: with feature `rayon`
/// elements are mapped in parallel.
///
/// Shapes are validated before anything is read. On error, no output is written.
///
/// Every input is gathered into a buffer of the iteration size and every result is buffered before
/// being scattered, so a call holds O(size) extra memory per operand. Outputs may thus alias inputs.
#[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
pub fn elementwise<I, O, F>(kernel: F, inputs: I, outputs: O) -> Result<(), ArrayError>
where
    I: Inputs,
    O: Outputs,
    F: Fn(usize, I::Item) -> O::Item + Send + Sync,
{
    let shapes = inputs
        .arrays()
        .into_iter()
        .chain(outputs.arrays())
        .map(|array| array.shape().clone())
        .collect_vec();
    let shape = Shape::broadcast(&shapes)?;
    for output in outputs.arrays() {
        check_output(output.layout(), &shape)?;
    }
    log::trace!("elementwise over {shape} with {} operands", shapes.len());

    let columns = inputs.gather(&shape)?;
    let size = shape.size();

    #[cfg(not(feature = "rayon"))]
    let values: Vec<O::Item> = (0..size)
        .map(|index| kernel(index, I::item(&columns, index)))
        .collect();
    #[cfg(feature = "rayon")]
    let values: Vec<O::Item> = {
        use rayon::prelude::*;

        (0..size)
            .into_par_iter()
            .map(|index| kernel(index, I::item(&columns, index)))
            .collect()
    };

    outputs.scatter(&values, |&value| value)
}

#[cfg(test)]
mod tests {
    use std::{
        error::Error,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use itertools::Itertools;

    use super::elementwise;
    use crate::{
        hal::cpu::Native,
        loom::{
            array::{Array, ArrayError},
            context::{Context, ContextBuilder},
            device::Device,
            layout::{Layout, LayoutError},
            num::DataType,
        },
    };

    fn device() -> Result<(Context, Device), Box<dyn Error>> {
        let context = ContextBuilder::new().add_backend(Native::new(1)).build()?;
        let device = context.device("native")?;
        Ok((context, device))
    }

    #[test]
    fn test_broadcast() -> Result<(), Box<dyn Error>> {
        let (_context, device) = device()?;
        let a = Array::from_vec(&device, [1, 3], vec![1i32, 2, 3])?;
        let out = Array::zeros(&device, [4, 3], DataType::I32);

        let count = AtomicUsize::new(0);
        elementwise(
            |_, x: i32| {
                count.fetch_add(1, Ordering::Relaxed);
                x
            },
            a.view::<i32>()?,
            out.view::<i32>()?,
        )?;
        assert_eq!(count.load(Ordering::Relaxed), 12);
        assert_eq!(out.to_vec::<i32>()?, [1, 2, 3].repeat(4));
        Ok(())
    }

    #[test]
    fn test_mismatch() -> Result<(), Box<dyn Error>> {
        let (_context, device) = device()?;
        let a = Array::from_vec(&device, [2, 3], vec![1.0f32; 6])?;
        let out = Array::zeros(&device, [3, 2], DataType::F32);

        let count = AtomicUsize::new(0);
        let err = elementwise(
            |_, x: f32| {
                count.fetch_add(1, Ordering::Relaxed);
                x
            },
            a.view::<f32>()?,
            out.view::<f32>()?,
        );
        assert!(matches!(
            err,
            Err(ArrayError::Layout(LayoutError::Broadcast(_, _)))
        ));
        assert_eq!(count.load(Ordering::Relaxed), 0);
        assert_eq!(out.to_vec::<f32>()?, vec![0.0; 6]);
        Ok(())
    }

    #[test]
    fn test_broadcast_output() -> Result<(), Box<dyn Error>> {
        let (_context, device) = device()?;
        let a = Array::from_vec(&device, [4, 3], (0..12).collect_vec())?;

        let out = Array::zeros(&device, [1, 3], DataType::I32);
        let err = elementwise(|_, x: i32| x, a.view::<i32>()?, out.view::<i32>()?);
        assert!(matches!(
            err,
            Err(ArrayError::Layout(LayoutError::Output(_, _)))
        ));

        let out = out.broadcast_to([4, 3])?;
        let err = elementwise(|_, x: i32| x, a.view::<i32>()?, out.view::<i32>()?);
        assert!(matches!(
            err,
            Err(ArrayError::Layout(LayoutError::Overlap(_)))
        ));
        assert_eq!(out.to_vec::<i32>()?, vec![0; 12]);
        Ok(())
    }

    #[test]
    fn test_overlapping_output() -> Result<(), Box<dyn Error>> {
        let (_context, device) = device()?;
        let base = Array::zeros(&device, [3], DataType::I64);
        let out = base.as_strided(Layout::new([2, 2], [1, 1], 0)?)?;

        let err = elementwise(|index, ()| index as i64 + 10, (), out.view::<i64>()?);
        assert!(matches!(
            err,
            Err(ArrayError::Layout(LayoutError::Overlap(_)))
        ));
        assert_eq!(base.to_vec::<i64>()?, vec![0; 3]);

        // disjoint strided output is accepted
        let base = Array::zeros(&device, [8], DataType::I64);
        let out = base.as_strided(Layout::new([2, 2], [1, 4], 0)?)?;
        elementwise(|index, ()| index as i64 + 10, (), out.view::<i64>()?)?;
        assert_eq!(base.to_vec::<i64>()?, vec![10, 12, 0, 0, 11, 13, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_index() -> Result<(), Box<dyn Error>> {
        let (_context, device) = device()?;

        let out = Array::zeros(&device, [2, 3], DataType::I64);
        elementwise(|index, ()| index as i64, (), out.view::<i64>()?)?;
        assert_eq!(out.to_vec::<i64>()?, (0..6).collect_vec());

        // the index follows the logical shape, not the memory order
        let base = Array::zeros(&device, [3, 2], DataType::I64);
        let out = base.transpose();
        elementwise(|index, ()| index as i64, (), out.view::<i64>()?)?;
        assert_eq!(out.to_vec::<i64>()?, (0..6).collect_vec());
        assert_eq!(base.to_vec::<i64>()?, vec![0, 3, 1, 4, 2, 5]);
        Ok(())
    }

    #[test]
    fn test_mixed() -> Result<(), Box<dyn Error>> {
        let (_context, device) = device()?;
        let a = Array::from_vec(&device, [3], vec![1i32, 2, 3])?;
        let b = Array::from_vec(&device, [2, 1], vec![0.5f64, 2.0])?;
        let c = Array::from_vec(&device, [1], vec![true])?;
        let out = Array::zeros(&device, [2, 3], DataType::F32);

        elementwise(
            |_, (x, y, z): (i32, f64, bool)| match z {
                true => (x as f64 * y) as f32,
                false => 0.0,
            },
            (a.view::<i32>()?, b.view::<f64>()?, c.view::<bool>()?),
            out.view::<f32>()?,
        )?;
        assert_eq!(out.to_vec::<f32>()?, vec![0.5, 1.0, 1.5, 2.0, 4.0, 6.0]);
        Ok(())
    }

    #[test]
    fn test_outputs() -> Result<(), Box<dyn Error>> {
        let (_context, device) = device()?;
        let a = Array::from_vec(&device, [4], vec![-1.5f32, 0.0, 2.5, 7.0])?;
        let x = Array::zeros(&device, [4], DataType::I32);
        let y = Array::zeros(&device, [4], DataType::Bool);

        elementwise(
            |_, a: f32| (a as i32, a > 0.0),
            a.view::<f32>()?,
            (x.view::<i32>()?, y.view::<bool>()?),
        )?;
        assert_eq!(x.to_vec::<i32>()?, vec![-1, 0, 2, 7]);
        assert_eq!(y.to_vec::<bool>()?, vec![false, false, true, true]);

        // one invalid output rejects the call for all outputs
        let z = Array::zeros(&device, [3], DataType::Bool);
        let err = elementwise(
            |_, a: f32| (a as i32 + 1, true),
            a.view::<f32>()?,
            (x.view::<i32>()?, z.view::<bool>()?),
        );
        assert!(err.is_err());
        assert_eq!(x.to_vec::<i32>()?, vec![-1, 0, 2, 7]);
        Ok(())
    }

    #[test]
    fn test_in_place() -> Result<(), Box<dyn Error>> {
        let (_context, device) = device()?;
        let a = Array::from_vec(&device, [2, 2], vec![1i32, 2, 3, 4])?;

        elementwise(|_, x: i32| x * 2, a.view::<i32>()?, a.view::<i32>()?)?;
        assert_eq!(a.to_vec::<i32>()?, vec![2, 4, 6, 8]);

        // reading the transpose while writing the same storage sees the old values
        let t = a.transpose();
        elementwise(|_, x: i32| x, t.view::<i32>()?, a.view::<i32>()?)?;
        assert_eq!(a.to_vec::<i32>()?, vec![2, 6, 4, 8]);
        Ok(())
    }

    #[test]
    fn test_empty() -> Result<(), Box<dyn Error>> {
        let (_context, device) = device()?;
        let a = Array::zeros(&device, [0, 3], DataType::U8);
        let out = Array::zeros(&device, [0, 3], DataType::U8);
        elementwise(|_, x: u8| x, a.view::<u8>()?, out.view::<u8>()?)?;
        assert_eq!(out.to_vec::<u8>()?, Vec::<u8>::new());
        Ok(())
    }
}
