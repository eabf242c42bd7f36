// cut_logic.rs

use crate::config::{Condition, SystemConfig};
use crate::readings::VariableTable;
use crate::types::{CutReason, MAX_BUCKET_CONDITIONS, NUM_EXTERNAL_INPUTS};

/// Snapshot of everything the cut decision needs for one tick.
///
/// Immediate cut requests arrive already debounced/authorized by their
/// owners; the engine only honors the configuration enables.
#[derive(Debug, Clone, Copy)]
pub struct CutInputs {
    pub vars: VariableTable,
    pub launch_detected: bool,
    pub gps_fix_present: bool,
    pub external_active: [bool; NUM_EXTERNAL_INPUTS],
    pub remote_cut_request: bool,
    pub manual_cut_request: bool,
}

impl CutInputs {
    pub const fn new() -> Self {
        Self {
            vars: VariableTable::new(),
            launch_detected: false,
            gps_fix_present: false,
            external_active: [false; NUM_EXTERNAL_INPUTS],
            remote_cut_request: false,
            manual_cut_request: false,
        }
    }
}

impl Default for CutInputs {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one cut evaluation. `reason` is meaningful only when
/// `should_cut` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutDecision {
    pub should_cut: bool,
    pub reason: CutReason,
}

impl CutDecision {
    pub const HOLD: Self = Self {
        should_cut: false,
        reason: CutReason::None,
    };

    const fn fire(reason: CutReason) -> Self {
        Self {
            should_cut: true,
            reason,
        }
    }
}

/// Bucket-based cut rule engine.
///
/// Owns the per-condition dwell accumulators (integer tick counts,
/// bounded to `for_seconds + 1`). The accumulators are runtime state:
/// they reset at boot, when a referenced variable goes invalid, when
/// the comparison stops holding, and for the whole engine whenever the
/// global gates block rule evaluation.
pub struct RuleEngine {
    dwell_a: [u32; MAX_BUCKET_CONDITIONS],
    dwell_b: [u32; MAX_BUCKET_CONDITIONS],
}

impl RuleEngine {
    pub const fn new() -> Self {
        Self {
            dwell_a: [0; MAX_BUCKET_CONDITIONS],
            dwell_b: [0; MAX_BUCKET_CONDITIONS],
        }
    }

    pub fn reset_accumulators(&mut self) {
        self.dwell_a = [0; MAX_BUCKET_CONDITIONS];
        self.dwell_b = [0; MAX_BUCKET_CONDITIONS];
    }

    /// Dwell of a Bucket A slot, in ticks. For UI prefill and tests.
    pub fn dwell_a(&self, slot: usize) -> u32 {
        self.dwell_a[slot]
    }

    /// Dwell of a Bucket B slot, in ticks.
    pub fn dwell_b(&self, slot: usize) -> u32 {
        self.dwell_b[slot]
    }

    /// Evaluates the cut decision for one tick. First match wins:
    ///
    /// 1. External input (enabled and debounced-active)
    /// 2. Remote command (uplink enabled, remote cut allowed, edge set)
    /// 3. Rule buckets (gates pass, Bucket A AND Bucket B)
    /// 4. Manual command from the config UI
    ///
    /// Once a cut has fired nothing further ever fires.
    pub fn evaluate(
        &mut self,
        config: &SystemConfig,
        inputs: &CutInputs,
        already_cut: bool,
    ) -> CutDecision {
        if already_cut {
            return CutDecision::HOLD;
        }

        for i in 0..NUM_EXTERNAL_INPUTS {
            if config.external_inputs[i].enabled && inputs.external_active[i] {
                return CutDecision::fire(CutReason::ExternalInput);
            }
        }

        if config.uplink.enabled && config.uplink.remote_cut_enabled && inputs.remote_cut_request {
            return CutDecision::fire(CutReason::IridiumRemote);
        }

        if self.gates_pass(config, inputs) {
            // Every enabled condition's dwell updates every tick, so
            // bucket aggregation cannot starve a later slot's timer.
            let a_ok = self.eval_bucket_a(config, inputs);
            let b_ok = self.eval_bucket_b(config, inputs);
            if a_ok && b_ok {
                return CutDecision::fire(CutReason::BucketLogic);
            }
        } else {
            // Dwell may not accrue while gated.
            self.reset_accumulators();
        }

        if inputs.manual_cut_request {
            return CutDecision::fire(CutReason::Manual);
        }

        CutDecision::HOLD
    }

    fn gates_pass(&self, config: &SystemConfig, inputs: &CutInputs) -> bool {
        if config.global_cut.require_launch_before_cut && !inputs.launch_detected {
            return false;
        }
        if config.global_cut.require_gps_fix_before_cut && !inputs.gps_fix_present {
            return false;
        }
        true
    }

    /// Bucket A: AND over enabled conditions; empty bucket is true.
    fn eval_bucket_a(&mut self, config: &SystemConfig, inputs: &CutInputs) -> bool {
        let mut all_ok = true;
        for (i, cond) in config.bucket_a.iter().enumerate() {
            if !cond.enabled {
                self.dwell_a[i] = 0;
                continue;
            }
            if !eval_condition(cond, inputs, &mut self.dwell_a[i]) {
                all_ok = false;
            }
        }
        all_ok
    }

    /// Bucket B: OR over enabled conditions; empty bucket is false.
    fn eval_bucket_b(&mut self, config: &SystemConfig, inputs: &CutInputs) -> bool {
        let mut any_ok = false;
        for (i, cond) in config.bucket_b.iter().enumerate() {
            if !cond.enabled {
                self.dwell_b[i] = 0;
                continue;
            }
            if eval_condition(cond, inputs, &mut self.dwell_b[i]) {
                any_ok = true;
            }
        }
        any_ok
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// One condition against the variable table, updating its dwell.
///
/// An invalid or non-finite variable makes the condition false and
/// clears the dwell. `for_seconds == 0` is immediate; otherwise the
/// condition is satisfied once the comparison has held for at least
/// `for_seconds` consecutive ticks.
fn eval_condition(cond: &Condition, inputs: &CutInputs, dwell: &mut u32) -> bool {
    let var = inputs.vars.get(cond.var_id);
    if !var.valid || !var.value.is_finite() || !cond.threshold.is_finite() {
        *dwell = 0;
        return false;
    }

    if !cond.op.compare(var.value, cond.threshold) {
        *dwell = 0;
        return false;
    }

    if cond.for_seconds == 0 {
        *dwell = 0;
        return true;
    }

    let cap = cond.for_seconds as u32 + 1;
    *dwell = (*dwell + 1).min(cap);
    *dwell >= cond.for_seconds as u32
}
