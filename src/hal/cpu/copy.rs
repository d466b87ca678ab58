use super::elementwise::elementwise;
use crate::{
    hal::ops::{AsTypeOp, CopyOp},
    loom::{
        array::{Array, ArrayError},
        num::{DataType, Scalar},
        ops::OpError,
        visit::{PairVisitor, Visitor},
    },
};

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCopyOp;

impl CopyOp for NativeCopyOp {
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    fn call(&self, a: &Array, out: &Array) -> Result<(), OpError> {
        a.device().check_compatible([a, out])?;

        struct Impl<'a> {
            a: &'a Array,
            out: &'a Array,
        }

        impl Visitor for Impl<'_> {
            type Output = Result<(), ArrayError>;

            fn visit<T: Scalar>(self) -> Self::Output {
                elementwise(|_, x: T| x, self.a.view::<T>()?, self.out.view::<T>()?)
            }
        }

        a.data_type().visit(Impl { a, out })?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeAsTypeOp;

impl AsTypeOp for NativeAsTypeOp {
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    fn call(&self, a: &Array, out: &Array) -> Result<(), OpError> {
        a.device().check_compatible([a, out])?;

        struct Impl<'a> {
            a: &'a Array,
            out: &'a Array,
        }

        impl PairVisitor for Impl<'_> {
            type Output = Result<(), ArrayError>;

            fn visit<T: Scalar, U: Scalar>(self) -> Self::Output {
                elementwise(
                    |_, x: T| x.cast::<U>(),
                    self.a.view::<T>()?,
                    self.out.view::<U>()?,
                )
            }
        }

        log::trace!("astype {} -> {}", a.data_type(), out.data_type());
        DataType::visit_pair(a.data_type(), out.data_type(), Impl { a, out })?;
        Ok(())
    }
}
