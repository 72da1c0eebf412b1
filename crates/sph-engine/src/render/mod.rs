//! GPU rendering plumbing.
//!
//! Renderers live with the data they draw; this module only provides the
//! per-frame context they receive. Each renderer owns its own GPU resources
//! (pipelines, bind groups).

mod ctx;

pub use ctx::{RenderCtx, RenderTarget};
