//! Helmet Render - Kubernetes manifests from chart values
//!
//! This crate turns layered chart values into typed Kubernetes objects:
//! - `AppValues`: the documented values layout with built-in defaults
//! - Naming, labels, images, probes, resource presets and pod assembly helpers
//! - One manifest builder per kind (Deployment, Service, Ingress, ...)
//! - `Renderer`: required-key checks, install ordering and NOTES
//!
//! Manifests are built with `k8s-openapi` types, so every emitted object
//! matches the Kubernetes schema of the targeted API version.

pub mod checksum;
pub mod error;
pub mod image;
pub mod labels;
pub mod manifest;
pub mod manifests;
pub mod notes;
pub mod pod;
pub mod probes;
pub mod renderer;
pub mod resources;
pub mod scope;
pub mod suggestions;
pub mod values;
pub mod wait_for;

pub use error::{RenderError, Result};
pub use manifest::{RenderedManifest, ResourceCategory};
pub use renderer::{RenderResult, Renderer, RendererBuilder};
pub use scope::Scope;
pub use values::AppValues;
