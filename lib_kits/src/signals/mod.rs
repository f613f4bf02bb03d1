pub mod assets;
pub mod dark;
pub mod status;
