mod clipped_momentum;

pub use clipped_momentum::{ClippedMomentum, ParamUpdate};
