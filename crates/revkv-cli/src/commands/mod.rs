pub mod check;
pub mod log;
pub mod ops;
pub mod serve;
