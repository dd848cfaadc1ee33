//! Element-wise binary operations trait.

use super::{Dispatch, finish};
use crate::dispatch::OpKind;
use crate::error::Result;
use crate::ops::Operand;
use crate::value::Value;

macro_rules! binary_ops {
    ($($name:ident => $kind:ident, $doc:literal;)*) => {
        paste::paste! {
            /// Element-wise binary operations with broadcasting.
            ///
            /// Operands are promoted to a common dtype first. The second
            /// operand may be a number. Each operation has an `_into` variant
            /// that writes into an existing buffer and returns it.
            ///
            /// # Example
            ///
            /// ```rust,ignore
            /// let c = reg.add(&a, &b)?;
            /// let halved = reg.divide(&a, 2.0)?;
            /// reg.multiply_into(&a, &b, &buf)?;
            /// ```
            pub trait BinaryOps: Dispatch {
                $(
                    #[doc = $doc]
                    fn $name<T: Operand>(&self, x1: &T, x2: impl Into<Value>) -> Result<T> {
                        finish(
                            OpKind::$kind,
                            self.call(OpKind::$kind).arg(x1.to_value()).arg(x2),
                        )
                    }

                    #[doc = "[`BinaryOps::" $name "`] written into `out`"]
                    fn [<$name _into>]<T: Operand>(&self, x1: &T, x2: impl Into<Value>, out: &T) -> Result<T> {
                        finish(
                            OpKind::$kind,
                            self.call(OpKind::$kind)
                                .arg(x1.to_value())
                                .arg(x2)
                                .out(out.to_value()),
                        )
                    }
                )*
            }
        }
    };
}

binary_ops! {
    add => Add, "Element-wise addition: x1 + x2";
    subtract => Subtract, "Element-wise subtraction: x1 - x2";
    multiply => Multiply, "Element-wise multiplication: x1 * x2";
    divide => Divide, "Element-wise true division: x1 / x2, always floating";
}
