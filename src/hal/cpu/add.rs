use super::elementwise::elementwise;
use crate::{
    hal::ops::AddOp,
    loom::{
        array::{Array, ArrayError},
        num::Numeric,
        ops::OpError,
        visit::NumericVisitor,
    },
};

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeAddOp;

impl AddOp for NativeAddOp {
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    fn call(&self, a: &Array, b: &Array, out: &Array) -> Result<(), OpError> {
        a.device().check_compatible([a, b, out])?;

        struct Impl<'a> {
            a: &'a Array,
            b: &'a Array,
            out: &'a Array,
        }

        impl NumericVisitor for Impl<'_> {
            type Output = Result<(), ArrayError>;

            fn visit<T: Numeric>(self) -> Self::Output {
                let inputs = (self.a.view::<T>()?, self.b.view::<T>()?);
                elementwise(|_, (x, y): (T, T)| x.add(y), inputs, self.out.view::<T>()?)
            }
        }

        out.data_type().visit_numeric(Impl { a, b, out })??;
        Ok(())
    }
}
