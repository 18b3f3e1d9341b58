//! Stage implementations

pub mod checkout;
pub mod compile;
pub mod detect;
pub mod publish;
