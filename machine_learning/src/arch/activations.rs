/// The elementwise activations a `Dense` layer may apply after its affine map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActFn {
    /// The logistic function scaled by `amp`.
    Sigmoid { amp: f32 },
}

impl ActFn {
    pub fn sigmoid(amp: f32) -> Self {
        ActFn::Sigmoid { amp }
    }

    pub fn f(&self, z: f32) -> f32 {
        match *self {
            ActFn::Sigmoid { amp } => amp * logistic(z),
        }
    }

    /// The derivative of `f` at `z`.
    pub fn df(&self, z: f32) -> f32 {
        match *self {
            ActFn::Sigmoid { amp } => {
                let s = logistic(z);
                amp * s * (1. - s)
            }
        }
    }
}

fn logistic(z: f32) -> f32 {
    1. / (1. + (-z).exp())
}
