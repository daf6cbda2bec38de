#![allow(dead_code)]

mod registry;
mod store;

pub use registry::{StaticRegistry, npm_server};
pub use store::{RecordingLauncher, TestStore, terminal};
