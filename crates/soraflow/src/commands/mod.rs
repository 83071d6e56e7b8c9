pub mod down;
pub mod plan;
pub mod state;
pub mod up;
pub mod validate;
