use std::{fmt, num::NonZeroUsize};

use log::info;

use crate::error::{Result, TrainErr};

/// Running objective statistics of a single output, segmented in phases of a fixed amount of
/// minibatches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectiveFunctionInfo {
    current_phase: usize,

    tot_weight_this_phase: f64,
    tot_objf_this_phase: f64,
    tot_aux_objf_this_phase: f64,

    tot_weight: f64,
    tot_objf: f64,
    tot_aux_objf: f64,
}

/// An objective average over some amount of frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageObjf {
    pub objf: f64,
    /// `None` when no auxiliary objective was accumulated.
    pub aux_objf: Option<f64>,
    pub weight: f64,
}

impl AverageObjf {
    fn new(tot_objf: f64, tot_aux_objf: f64, tot_weight: f64) -> Self {
        Self {
            objf: tot_objf / tot_weight,
            aux_objf: (tot_aux_objf != 0.0).then(|| tot_aux_objf / tot_weight),
            weight: tot_weight,
        }
    }
}

impl fmt::Display for AverageObjf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.aux_objf {
            None => write!(f, "{} over {} frames", self.objf, self.weight),
            Some(aux_objf) => write!(
                f,
                "{} + {} = {} over {} frames",
                self.objf,
                aux_objf,
                self.objf + aux_objf,
                self.weight
            ),
        }
    }
}

/// The statistics of a completed phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseReport {
    pub output: String,
    pub first_minibatch: usize,
    pub last_minibatch: usize,
    pub average: AverageObjf,
}

impl fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Average objective function for '{}' for minibatches {}-{} is {}.",
            self.output, self.first_minibatch, self.last_minibatch, self.average
        )
    }
}

impl ObjectiveFunctionInfo {
    /// Accumulates one minibatch, reporting the current phase first if this minibatch starts
    /// the next one.
    ///
    /// # Arguments
    /// * `output_name` - The output these statistics belong to.
    /// * `minibatches_per_phase` - The length of a phase.
    /// * `minibatch_counter` - The index of this minibatch in the whole run.
    /// * `weight`, `objf`, `aux_objf` - The minibatch totals.
    ///
    /// # Returns
    /// The report of the phase that just ended, if any, or a `PhaseJump` error if the counter
    /// skipped a whole phase.
    pub fn update_stats(
        &mut self,
        output_name: &str,
        minibatches_per_phase: NonZeroUsize,
        minibatch_counter: usize,
        weight: f32,
        objf: f32,
        aux_objf: f32,
    ) -> Result<Option<PhaseReport>> {
        let phase = self.phase_of(output_name, minibatches_per_phase, minibatch_counter)?;
        let mut report = None;

        if phase != self.current_phase {
            let phase_report = self.report_this_phase(output_name, minibatches_per_phase);
            info!(output = output_name, phase = self.current_phase; "{phase_report}");
            report = Some(phase_report);

            self.current_phase = phase;
            self.tot_weight_this_phase = 0.0;
            self.tot_objf_this_phase = 0.0;
            self.tot_aux_objf_this_phase = 0.0;
        }

        self.tot_weight_this_phase += f64::from(weight);
        self.tot_objf_this_phase += f64::from(objf);
        self.tot_aux_objf_this_phase += f64::from(aux_objf);
        self.tot_weight += f64::from(weight);
        self.tot_objf += f64::from(objf);
        self.tot_aux_objf += f64::from(aux_objf);

        Ok(report)
    }

    /// The phase `minibatch_counter` belongs to.
    ///
    /// # Errors
    /// `PhaseJump` if that phase is neither the current one nor the next.
    pub fn phase_of(
        &self,
        output_name: &str,
        minibatches_per_phase: NonZeroUsize,
        minibatch_counter: usize,
    ) -> Result<usize> {
        let phase = minibatch_counter / minibatches_per_phase.get();
        if phase != self.current_phase && phase != self.current_phase + 1 {
            return Err(TrainErr::PhaseJump {
                output: output_name.to_string(),
                current: self.current_phase,
                got: phase,
            });
        }

        Ok(phase)
    }

    /// Logs the statistics of the whole run.
    ///
    /// # Returns
    /// Whether any weight was accumulated, if not the logged averages are meaningless.
    pub fn print_total_stats(&self, name: &str) -> bool {
        let average = self.total_average();

        info!(output = name; "Overall average objective function for '{name}' is {average}.");
        info!(
            output = name;
            "[this line is to be parsed by a script:] log-prob-per-frame={}",
            average.objf
        );

        self.tot_weight != 0.0
    }

    /// The averages over every accumulated minibatch.
    pub fn total_average(&self) -> AverageObjf {
        AverageObjf::new(self.tot_objf, self.tot_aux_objf, self.tot_weight)
    }

    pub fn current_phase(&self) -> usize {
        self.current_phase
    }

    pub fn tot_weight(&self) -> f64 {
        self.tot_weight
    }

    pub fn tot_objf(&self) -> f64 {
        self.tot_objf
    }

    pub fn tot_aux_objf(&self) -> f64 {
        self.tot_aux_objf
    }

    pub fn tot_weight_this_phase(&self) -> f64 {
        self.tot_weight_this_phase
    }

    pub fn tot_objf_this_phase(&self) -> f64 {
        self.tot_objf_this_phase
    }

    fn report_this_phase(
        &self,
        output_name: &str,
        minibatches_per_phase: NonZeroUsize,
    ) -> PhaseReport {
        let first_minibatch = self.current_phase * minibatches_per_phase.get();

        PhaseReport {
            output: output_name.to_string(),
            first_minibatch,
            last_minibatch: first_minibatch + minibatches_per_phase.get() - 1,
            average: AverageObjf::new(
                self.tot_objf_this_phase,
                self.tot_aux_objf_this_phase,
                self.tot_weight_this_phase,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN: NonZeroUsize = match NonZeroUsize::new(10) {
        Some(n) => n,
        None => unreachable!(),
    };

    #[test]
    fn a_full_phase_triggers_exactly_one_report() {
        let mut info = ObjectiveFunctionInfo::default();
        let mut reports = vec![];

        for counter in 1..=10 {
            let report = info
                .update_stats("output", TEN, counter, 2.0, -(counter as f32), 0.0)
                .unwrap();
            reports.extend(report);
        }

        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!((report.first_minibatch, report.last_minibatch), (0, 9));
        assert_eq!(report.average.weight, 18.0);
        assert_eq!(report.average.objf, -45.0 / 18.0);
        assert_eq!(report.average.aux_objf, None);

        // only the minibatch that opened phase 1 is left in the phase totals
        assert_eq!(info.current_phase(), 1);
        assert_eq!(info.tot_weight_this_phase(), 2.0);
        assert_eq!(info.tot_objf_this_phase(), -10.0);

        assert_eq!(info.tot_weight(), 20.0);
        assert_eq!(info.tot_objf(), -55.0);
    }

    #[test]
    fn no_report_is_emitted_within_a_phase() {
        let mut info = ObjectiveFunctionInfo::default();

        for counter in 0..10 {
            let report = info
                .update_stats("output", TEN, counter, 1.0, -1.0, 0.0)
                .unwrap();
            assert!(report.is_none());
        }

        assert_eq!(info.current_phase(), 0);
        assert_eq!(info.tot_weight_this_phase(), info.tot_weight());
    }

    #[test]
    fn skipping_a_phase_is_an_error() {
        let mut info = ObjectiveFunctionInfo::default();
        info.update_stats("output", TEN, 3, 1.0, -1.0, 0.0).unwrap();

        let err = info
            .update_stats("output", TEN, 25, 1.0, -1.0, 0.0)
            .unwrap_err();

        assert!(matches!(
            err,
            TrainErr::PhaseJump {
                current: 0,
                got: 2,
                ..
            }
        ));
        assert_eq!(info.tot_weight(), 1.0);
        assert_eq!(info.current_phase(), 0);

        assert_eq!(info.phase_of("output", TEN, 19).unwrap(), 1);
        assert!(info.phase_of("output", TEN, 20).is_err());
    }

    #[test]
    fn auxiliary_objective_is_reported_separately() {
        let mut info = ObjectiveFunctionInfo::default();
        info.update_stats("output", TEN, 0, 4.0, -2.0, -1.0).unwrap();

        let report = info
            .update_stats("output", TEN, 10, 1.0, 0.0, 0.0)
            .unwrap()
            .unwrap();

        assert_eq!(report.average.objf, -0.5);
        assert_eq!(report.average.aux_objf, Some(-0.25));
        assert_eq!(
            report.to_string(),
            "Average objective function for 'output' for minibatches 0-9 is -0.5 + -0.25 = -0.75 over 4 frames."
        );
    }

    #[test]
    fn total_stats_tell_whether_anything_was_accumulated() {
        let mut info = ObjectiveFunctionInfo::default();
        assert!(!info.print_total_stats("output"));

        info.update_stats("output", TEN, 0, 3.0, -1.5, 0.0).unwrap();
        assert!(info.print_total_stats("output"));
        assert_eq!(info.total_average().objf, -0.5);
    }
}
