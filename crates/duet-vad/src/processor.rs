use duet_audio::AudioFrame;
use duet_foundation::{FailureBudget, PipelineError, Stage};

use crate::config::VadConfig;
use crate::energy_engine::EnergyVad;
use crate::engine::VadEngine;
use crate::state::VadStateMachine;
use crate::types::{VadMetrics, VadState, VadUpdate};

/// Consecutive engine failures before the session drops to the energy
/// heuristic for good.
const FAILURE_LIMIT: u32 = 3;

/// Per-session VAD front end: energy gate, engine inference with heuristic
/// fallback, debounced state machine.
///
/// Owns all mutable detection state. Callers hold the single reference for
/// the duration of `process_frame`; inference runs with that ownership
/// intact, never released mid-call.
pub struct VadProcessor {
    config: VadConfig,
    engine: Box<dyn VadEngine>,
    fallback: EnergyVad,
    machine: VadStateMachine,
    budget: FailureBudget,
    metrics: VadMetrics,
}

impl VadProcessor {
    pub fn new(config: VadConfig, engine: Box<dyn VadEngine>) -> Self {
        Self {
            fallback: EnergyVad::with_floor(config.energy_floor_dbfs),
            machine: VadStateMachine::new(&config),
            budget: FailureBudget::new(Stage::Vad, FAILURE_LIMIT),
            metrics: VadMetrics::default(),
            engine,
            config,
        }
    }

    /// Energy-heuristic-only processor, used when no neural engine is
    /// available at session construction.
    pub fn heuristic(config: VadConfig) -> Self {
        let floor = config.energy_floor_dbfs;
        Self::new(config, Box::new(EnergyVad::with_floor(floor)))
    }

    pub fn process_frame(&mut self, frame: &AudioFrame) -> Result<VadUpdate, PipelineError> {
        if frame.samples.len() != self.config.frame_size_samples {
            return Err(PipelineError::Config(format!(
                "VAD requires {} samples per frame, got {}",
                self.config.frame_size_samples,
                frame.samples.len()
            )));
        }

        self.metrics.frames_processed += 1;
        self.metrics.last_energy_db = frame.energy_db;

        let mut degraded_now = false;
        let probability = if frame.energy_db < self.config.energy_floor_dbfs {
            // Obviously silent; skip the classifier.
            self.metrics.energy_short_circuits += 1;
            0.0
        } else if self.budget.is_degraded() {
            self.fallback.predict(&frame.samples).unwrap_or(0.0)
        } else {
            match self.engine.predict(&frame.samples) {
                Ok(p) => {
                    self.budget.record_success();
                    p
                }
                Err(e) => {
                    self.metrics.inference_failures += 1;
                    tracing::warn!(
                        target: "vad",
                        error = %e,
                        consecutive = self.budget.consecutive() + 1,
                        "engine inference failed, using energy heuristic for this frame"
                    );
                    degraded_now = self.budget.record_failure();
                    self.fallback.predict(&frame.samples).unwrap_or(0.0)
                }
            }
        };

        let in_speech = matches!(
            self.machine.current_state(),
            VadState::Speech | VadState::SpeechEnd
        );
        let is_speech_candidate = if in_speech {
            probability >= self.config.deactivation_threshold
        } else {
            probability >= self.config.activation_threshold
        };

        let event = self.machine.process(is_speech_candidate, frame.energy_db);

        let frame_ms = self.config.frame_duration_ms() as u64;
        match self.machine.current_state() {
            VadState::Speech | VadState::SpeechStart => self.metrics.total_speech_ms += frame_ms,
            _ => self.metrics.total_silence_ms += frame_ms,
        }
        if matches!(event, Some(crate::types::VadEvent::SpeechStart { .. })) {
            self.metrics.speech_segments += 1;
        }

        Ok(VadUpdate {
            state: self.machine.current_state(),
            probability,
            event,
            degraded_now,
        })
    }

    /// Zeroes recurrent engine state and all debounce counters, e.g. after
    /// barge-in.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.fallback.reset();
        self.machine.reset();
    }

    pub fn force_end(&mut self) -> Option<crate::types::VadEvent> {
        self.machine.force_end(self.metrics.last_energy_db)
    }

    pub fn current_state(&self) -> VadState {
        self.machine.current_state()
    }

    pub fn is_degraded(&self) -> bool {
        self.budget.is_degraded()
    }

    pub fn metrics(&self) -> &VadMetrics {
        &self.metrics
    }
}
