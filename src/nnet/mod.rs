mod example;
mod request;
mod utils;

use std::rc::Rc;

use ndarray::{Array2, ArrayView2};

use crate::{error::Result, objective::ObjectiveType};

pub use example::{NnetExample, NnetIo};
pub use request::{computation_request, ComputationRequest, IoSpecification};
pub use utils::{add_nnet, dot_product, scale_nnet, set_zero};

/// A trainable model: a topology of named nodes over a flat parameter vector.
pub trait Nnet: Clone {
    /// Returns the index of the node called `name`, if any.
    fn node_index(&self, name: &str) -> Option<usize>;

    fn is_input_node(&self, node: usize) -> bool;

    fn is_output_node(&self, node: usize) -> bool;

    /// The objective an output node is trained with, `None` for any other node.
    fn objective_type(&self, node: usize) -> Option<ObjectiveType>;

    fn params(&self) -> &[f32];

    fn params_mut(&mut self) -> &mut [f32];

    /// Clears the statistics the model accumulates during forward passes.
    fn zero_component_stats(&mut self);
}

/// Turns computation requests into executable computations for a model.
pub trait Compiler<N: Nnet> {
    type Computation;
    type Computer: Computer<N>;

    /// Compiles `request`. Implementations are expected to memoize their results.
    fn compile(&mut self, nnet: &N, request: &ComputationRequest) -> Result<Rc<Self::Computation>>;

    /// Creates the execution context of a compiled computation.
    fn computer(&self, computation: Rc<Self::Computation>) -> Self::Computer;
}

/// The execution context of a single forward/backward pass.
pub trait Computer<N: Nnet> {
    /// Takes the features of every input the computation needs out of the example.
    fn accept_inputs(&mut self, nnet: &N, io: &[NnetIo]) -> Result<()>;

    fn forward(&mut self, nnet: &N) -> Result<()>;

    /// Adds the statistics of the last forward pass to `nnet`, if the computation asked for them.
    fn store_component_stats(&self, nnet: &mut N);

    /// The value an output node took in the forward pass.
    fn output(&self, name: &str) -> Result<ArrayView2<'_, f32>>;

    /// Supplies the derivative of the objective with respect to an output.
    fn accept_output_deriv(&mut self, name: &str, deriv: Array2<f32>) -> Result<()>;

    /// Runs the backward pass, **adding** the parameter derivatives into `grad`, which has the
    /// same layout as `nnet.params()`.
    fn backward(&mut self, nnet: &N, grad: &mut [f32]) -> Result<()>;
}
