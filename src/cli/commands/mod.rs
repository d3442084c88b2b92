pub mod annotate;
pub mod extract;
pub mod verify;
