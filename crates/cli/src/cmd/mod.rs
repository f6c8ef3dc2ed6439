mod patch;

pub use patch::cmd_patch;
