pub mod guild;
pub mod registry;
