pub mod console;
pub mod mock;
