use std::collections::BTreeMap;

use log::debug;
use machine_learning::MlErr;
use ndarray::{Array2, Axis};
use rayon::prelude::*;

use super::ObjectiveFunctionInfo;
use crate::{
    config::{ObjectiveScales, TrainerConfig},
    error::{Result, TrainErr},
    nnet::{computation_request, set_zero, Compiler, Computer, Nnet, NnetExample, NnetIo},
    objective::{compute_objective_function, compute_regularizer, Objective},
    optimization::{ClippedMomentum, ParamUpdate},
};

/// Trains a model one minibatch at a time.
///
/// Every call to `train` runs a forward and a backward pass over an example, feeds the derivative
/// of each output's objective back into the model and keeps per output objective statistics.
/// With momentum or a parameter change limit the derivatives are gathered in a delta model
/// first and applied through `ClippedMomentum`, otherwise they are added straight to the model.
pub struct NnetTrainer<'a, N, C>
where
    N: Nnet,
    C: Compiler<N>,
{
    config: TrainerConfig,
    nnet: &'a mut N,
    compiler: C,
    delta_nnet: Option<N>,
    update_rule: ClippedMomentum,
    objective_scales: ObjectiveScales,
    objf_info: BTreeMap<String, ObjectiveFunctionInfo>,
    num_minibatches_processed: usize,
    last_update: Option<ParamUpdate>,
}

impl<'a, N, C> NnetTrainer<'a, N, C>
where
    N: Nnet,
    C: Compiler<N>,
{
    /// Creates a new `NnetTrainer`.
    ///
    /// # Arguments
    /// * `config` - The trainer's options.
    /// * `nnet` - The model to train, borrowed for the trainer's whole life.
    /// * `compiler` - Compiles the computations the examples need.
    ///
    /// # Returns
    /// The trainer, or an error if the options are out of range or the objective scales are
    /// malformed.
    pub fn new(config: TrainerConfig, nnet: &'a mut N, compiler: C) -> Result<Self> {
        config.validate()?;
        let objective_scales: ObjectiveScales = config.objective_scales.parse()?;

        if config.zero_component_stats {
            nnet.zero_component_stats();
        }

        let delta_nnet = (config.momentum != 0.0 || config.max_param_change != 0.0).then(|| {
            let mut delta_nnet = nnet.clone();
            set_zero(&mut delta_nnet);
            delta_nnet
        });

        debug!(
            momentum = config.momentum,
            max_param_change = config.max_param_change,
            delta = delta_nnet.is_some(),
            scales = objective_scales.len();
            "created trainer"
        );

        Ok(Self {
            update_rule: ClippedMomentum::new(config.momentum, config.max_param_change),
            config,
            nnet,
            compiler,
            delta_nnet,
            objective_scales,
            objf_info: BTreeMap::new(),
            num_minibatches_processed: 0,
            last_update: None,
        })
    }

    /// Trains the model on a single minibatch.
    ///
    /// # Arguments
    /// * `eg` - The minibatch, its entries must name input or output nodes of the model.
    ///
    /// # Returns
    /// An error if the example doesn't fit the model, in which case the model, the delta model,
    /// the statistics and the minibatch counter are all left as they were. A non finite update
    /// is not an error, it is logged and skipped.
    pub fn train(&mut self, eg: &NnetExample) -> Result<()> {
        let request = computation_request(
            &*self.nnet,
            eg,
            true,
            self.config.store_component_stats,
            self.config.add_regularizer,
        )?;

        let computation = self.compiler.compile(&*self.nnet, &request)?;
        let mut computer = self.compiler.computer(computation);

        computer.accept_inputs(&*self.nnet, &eg.io)?;
        computer.forward(&*self.nnet)?;

        let objectives = self.process_outputs(eg, &mut computer)?;

        let mut grad = vec![0.; self.nnet.params().len()];
        computer.backward(&*self.nnet, &mut grad)?;

        let fallback = ObjectiveFunctionInfo::default();
        for (name, _, _) in &objectives {
            self.objf_info.get(name).unwrap_or(&fallback).phase_of(
                name,
                self.config.print_interval,
                self.num_minibatches_processed,
            )?;
        }

        let update = match &mut self.delta_nnet {
            Some(delta_nnet) => {
                if delta_nnet.params().len() != grad.len() {
                    return Err(MlErr::SizeMismatch {
                        what: "delta model",
                        got: delta_nnet.params().len(),
                        expected: grad.len(),
                    }
                    .into());
                }

                add_grad(delta_nnet.params_mut(), &grad);
                self.update_rule.update(delta_nnet, &mut *self.nnet)?
            }
            None => {
                add_grad(self.nnet.params_mut(), &grad);
                ParamUpdate::Applied { scale: 1.0 }
            }
        };

        computer.store_component_stats(&mut *self.nnet);
        for (name, weight, objf) in objectives {
            self.update_stats(&name, weight, objf)?;
        }

        self.last_update = Some(update);
        self.num_minibatches_processed += 1;
        Ok(())
    }

    /// Computes the objective of every output in `eg` and hands its derivative to `computer`.
    /// Regularizer outputs follow their primary output.
    ///
    /// # Returns
    /// The name, weight and scaled objective of every output processed, in order.
    fn process_outputs(
        &self,
        eg: &NnetExample,
        computer: &mut C::Computer,
    ) -> Result<Vec<(String, f32, f32)>> {
        let mut objectives = Vec::new();

        for io in &eg.io {
            let node = self
                .nnet
                .node_index(&io.name)
                .ok_or_else(|| TrainErr::UnknownNode(io.name.clone()))?;

            if !self.nnet.is_output_node(node) {
                continue;
            }

            let objective_type = self
                .nnet
                .objective_type(node)
                .ok_or_else(|| TrainErr::NotAnOutput(io.name.clone()))?;
            let scale = self.objective_scales.scale(&io.name);

            let Objective {
                tot_weight,
                tot_objf,
                deriv,
            } = compute_objective_function(
                &io.features,
                objective_type,
                &io.name,
                computer.output(&io.name)?,
                true,
            )?;

            if let Some(deriv) = deriv {
                let deriv = self.weigh_deriv(io, &io.name, deriv, scale)?;
                computer.accept_output_deriv(&io.name, deriv)?;
            }

            objectives.push((io.name.clone(), tot_weight, tot_objf * scale));

            if !self.config.add_regularizer {
                continue;
            }

            let reg_name = format!("{}-reg", io.name);
            let Some(reg_node) = self.nnet.node_index(&reg_name) else {
                continue;
            };

            if !self.nnet.is_output_node(reg_node) {
                return Err(TrainErr::NotAnOutput(reg_name));
            }

            let reg_scale = self.objective_scales.scale(&reg_name);
            let Objective {
                tot_weight,
                tot_objf,
                deriv,
            } = compute_regularizer(objective_type, &reg_name, computer.output(&reg_name)?, true)?;

            if let Some(deriv) = deriv {
                let deriv = self.weigh_deriv(io, &reg_name, deriv, reg_scale)?;
                computer.accept_output_deriv(&reg_name, deriv)?;
            }

            // the reported objective takes the primary output's scale, the derivative its own
            objectives.push((reg_name, tot_weight, tot_objf * scale));
        }

        Ok(objectives)
    }

    /// Multiplies every row of `deriv` by the example's derivative weights, if enabled, and the
    /// whole of it by `scale`.
    fn weigh_deriv(
        &self,
        io: &NnetIo,
        name: &str,
        mut deriv: Array2<f32>,
        scale: f32,
    ) -> Result<Array2<f32>> {
        let deriv_weights = io.deriv_weights.as_ref().filter(|w| !w.is_empty());

        if let Some(weights) = deriv_weights.filter(|_| self.config.apply_deriv_weights) {
            if weights.len() != deriv.nrows() {
                return Err(TrainErr::DimensionMismatch {
                    output: name.to_string(),
                    what: "derivative weights",
                    nnet: deriv.nrows(),
                    egs: weights.len(),
                });
            }

            deriv *= &weights.view().insert_axis(Axis(1));
        }

        if scale != 1.0 {
            deriv *= scale;
        }

        Ok(deriv)
    }

    fn update_stats(&mut self, name: &str, weight: f32, objf: f32) -> Result<()> {
        self.objf_info.entry(name.to_string()).or_default().update_stats(
            name,
            self.config.print_interval,
            self.num_minibatches_processed,
            weight,
            objf,
            0.0,
        )?;

        Ok(())
    }

    /// Logs the statistics of every output, in name order.
    ///
    /// # Returns
    /// Whether any output accumulated some weight. If not, training didn't really happen.
    pub fn print_total_stats(&self) -> bool {
        let mut ans = false;
        for (name, info) in &self.objf_info {
            ans |= info.print_total_stats(name);
        }

        ans
    }

    pub fn nnet(&self) -> &N {
        &*self.nnet
    }

    /// The delta model, `None` without momentum nor a parameter change limit.
    pub fn delta_nnet(&self) -> Option<&N> {
        self.delta_nnet.as_ref()
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn objective_scales(&self) -> &ObjectiveScales {
        &self.objective_scales
    }

    /// The statistics of an output or a regularizer, `None` if it was never trained.
    pub fn objf_info(&self, name: &str) -> Option<&ObjectiveFunctionInfo> {
        self.objf_info.get(name)
    }

    /// The amount of examples trained on. Every output of an example shares its count, so this
    /// is not the amount of statistics updates.
    pub fn num_minibatches_processed(&self) -> usize {
        self.num_minibatches_processed
    }

    /// What the last call to `train` did to the model's parameters.
    pub fn last_update(&self) -> Option<ParamUpdate> {
        self.last_update
    }
}

fn add_grad(params: &mut [f32], grad: &[f32]) {
    params
        .par_iter_mut()
        .zip(grad)
        .for_each(|(p, &g)| *p += g);
}
