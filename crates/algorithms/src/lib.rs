//! # Umbra Algorithms
//!
//! Terrain shading algorithms for Umbra.
//!
//! - **shadow**: shadow depth by shear transform and running maximum,
//!   streamed chunk by chunk

mod maybe_rayon;
pub mod shadow;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::shadow::{
        shadow_depth, shadow_depth_streaming, CancelFlag, Completion, Feedback, NoFeedback,
        ShadowDepth, ShadowDepthParams,
    };
    pub use umbra_core::prelude::*;
}
