use log::{info, warn};

use crate::{
    error::Result,
    nnet::{add_nnet, dot_product, scale_nnet, set_zero, Nnet},
};

/// How a parameter update went.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamUpdate {
    /// The delta was added to the model multiplied by `scale`.
    Applied { scale: f32 },
    /// The step's norm, `param_delta`, was over the limit, so the delta was added multiplied by
    /// the reduced `scale`.
    Clipped { param_delta: f32, scale: f32 },
    /// The step's norm was not finite: the model was left untouched and the delta was zeroed.
    Discarded,
}

/// Momentum with a cap on the norm of every step.
///
/// The delta model accumulates the parameter derivatives of a minibatch on top of what's left of
/// the previous ones. Each update adds `(1 - momentum) * delta` to the model, scaled down if its
/// norm exceeds `max_param_change`, and then decays the delta by `momentum`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippedMomentum {
    momentum: f32,
    max_param_change: f32,
}

impl ClippedMomentum {
    /// Creates a new `ClippedMomentum` update rule.
    ///
    /// # Arguments
    /// * `momentum` - The fraction of the delta kept for the next step.
    /// * `max_param_change` - The maximum norm of a step, `0.0` disables the limit.
    pub fn new(momentum: f32, max_param_change: f32) -> Self {
        Self {
            momentum,
            max_param_change,
        }
    }

    /// Applies `delta` to `nnet`.
    ///
    /// # Arguments
    /// * `delta` - The accumulated parameter derivatives, decayed in place.
    /// * `nnet` - The model being trained.
    ///
    /// # Returns
    /// What was done to the model, or a `SizeMismatch` error if the models differ in size, in
    /// which case neither of them is touched.
    pub fn update<N: Nnet>(&self, delta: &mut N, nnet: &mut N) -> Result<ParamUpdate> {
        let mut scale = 1.0 - self.momentum;
        let mut clipped = None;

        if self.max_param_change != 0.0 {
            let param_delta = (dot_product(delta, delta)?.sqrt() * f64::from(scale)) as f32;

            if !param_delta.is_finite() {
                warn!(param_delta = param_delta; "infinite parameter change, will not apply");
                set_zero(delta);
                return Ok(ParamUpdate::Discarded);
            }

            if param_delta > self.max_param_change {
                let factor = self.max_param_change / param_delta;
                info!(
                    "parameter change too big: {param_delta} > max-param-change={}, scaling by {factor}",
                    self.max_param_change
                );

                scale *= factor;
                clipped = Some(param_delta);
            }
        }

        add_nnet(delta, scale, nnet)?;
        scale_nnet(self.momentum, delta);

        Ok(match clipped {
            Some(param_delta) => ParamUpdate::Clipped { param_delta, scale },
            None => ParamUpdate::Applied { scale },
        })
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    pub fn max_param_change(&self) -> f32 {
        self.max_param_change
    }
}
