pub mod board;
pub mod cover;
pub mod dlx;
pub mod error;
pub mod package;
pub mod palette;
pub mod progress;
pub mod selector;
pub mod shape;

// Necessary to export the modules to be integration tested in 'tests'
