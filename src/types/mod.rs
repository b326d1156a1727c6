pub mod enums;
pub mod id;
