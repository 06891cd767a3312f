pub mod contracts;
pub mod form;
pub mod id;
pub mod prelude;

pub use rust_decimal::Decimal;
