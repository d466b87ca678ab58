//! The `loom` module provides the foundational abstractions of the engine: data types, array
//! layouts, storage, devices and the op registry.
//!
//! ## Key Components
//! 1. **Numerical System**:
//!    - Scalar types (`bool`, `i8` ... `f64`, `f16`) and their metadata (`DataType`).
//!    - Native conversions between every pair of scalar types (`Cast`).
//!    - Dispatch from a runtime `DataType` to a statically typed `Visitor`.
//!
//! 2. **Arrays**:
//!    - Layouts of shape, stride and offset (`Layout`), with zero-copy broadcasting and permuting.
//!    - Arrays sharing reference-counted typed storage.
//!
//! 3. **Execution Model**:
//!    - Hardware-agnostic `Backend`s exposing `Device`s.
//!    - A `Registry` keyed by backend and op name, owned by a `Context`.

pub mod array;
pub mod context;
pub mod device;
pub mod layout;
pub mod num;
pub mod ops;
pub mod storage;
pub mod visit;
