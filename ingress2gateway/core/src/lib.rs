#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod extra;
pub mod field;

pub use self::{
    extra::{Canary, Extra},
    field::{ErrorType, FieldError, FieldErrors, FieldPath},
};

/// The `weightTotal` assumed when no `canary-weight-total` override is given.
pub const DEFAULT_WEIGHT_TOTAL: i32 = 100;
