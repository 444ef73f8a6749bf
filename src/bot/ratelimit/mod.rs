pub mod cooldown;
pub mod saturation;
