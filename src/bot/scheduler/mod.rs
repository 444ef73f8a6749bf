pub mod deadlock;
pub mod idle;
