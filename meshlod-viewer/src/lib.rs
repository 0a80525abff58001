//! Viewer shell for interactive mesh simplification
//!
//! This crate provides everything around the 3D canvas except the window
//! and GPU, which stay with the host:
//! - Scene with a single root object, lights and background
//! - Perspective camera with orbit controls and a cinematic policy
//! - Transform controls for the displayed object
//! - Parameter panel (egui) driving the simplification pipeline
//! - Background model loading and export to STL / OBJ / glTF

pub mod background;
pub mod camera;
pub mod cinematic;
pub mod config;
pub mod controls;
pub mod download;
pub mod error;
pub mod loader;
pub mod panel;
pub mod render;
pub mod scene;
pub mod viewer;

pub use background::*;
pub use camera::*;
pub use cinematic::*;
pub use config::*;
pub use controls::*;
pub use download::*;
pub use error::*;
pub use loader::{LoadMode, LoadOutcome, ModelLoader};
pub use panel::*;
pub use render::*;
pub use scene::*;
pub use viewer::*;
