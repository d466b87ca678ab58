use super::elementwise::elementwise;
use crate::{
    hal::ops::FillOp,
    loom::{
        array::{Array, ArrayError},
        num::{Scalar, Value},
        ops::OpError,
        visit::Visitor,
    },
};

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFillOp;

impl FillOp for NativeFillOp {
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    fn call(&self, out: &Array, value: Value) -> Result<(), OpError> {
        struct Impl<'a> {
            out: &'a Array,
            value: Value,
        }

        impl Visitor for Impl<'_> {
            type Output = Result<(), ArrayError>;

            fn visit<T: Scalar>(self) -> Self::Output {
                let value = self.value.to::<T>();
                elementwise(move |_, ()| value, (), self.out.view::<T>()?)
            }
        }

        let value = Impl { out, value };
        out.data_type().visit(value)?;
        Ok(())
    }
}
