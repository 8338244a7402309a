use std::sync::Arc;
use std::time::Duration;

use crate::config::TurnConfig;
use crate::language::LanguageProfile;
use crate::semantic::{ClassSmoother, Completeness, SemanticEvaluator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnVerdict {
    Finished,
    Wait,
    Unfinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessReason {
    /// Silence reached the unconditional ceiling.
    SilenceCeiling,
    /// Semantic evaluator judged the utterance complete.
    Semantic,
    /// Transcript asked us to wait.
    WaitPhrase,
    /// Wait phrase held the turn open past the hard cap.
    WaitCapExceeded,
    /// Evaluator unavailable; punctuation heuristic decided.
    PunctuationFallback,
    /// Not enough silence to evaluate at all.
    BelowMinSilence,
    /// Evaluated but the utterance does not look finished yet.
    NotComplete,
}

#[derive(Debug, Clone)]
pub struct TurnAssessment {
    pub verdict: TurnVerdict,
    pub confidence: f32,
    pub reason: AssessReason,
}

impl TurnAssessment {
    pub fn is_turn_end(&self) -> bool {
        self.verdict == TurnVerdict::Finished
    }
}

/// Decides whether the user's turn has genuinely ended, is merely paused,
/// or explicitly asked to wait.
///
/// Pure with respect to its inputs apart from the smoothing window: the
/// verdict is a function of (transcript, history, silence duration).
pub struct TurnDetector {
    config: TurnConfig,
    profile: LanguageProfile,
    evaluator: Arc<dyn SemanticEvaluator>,
    smoother: ClassSmoother,
}

impl TurnDetector {
    pub fn new(
        config: TurnConfig,
        profile: LanguageProfile,
        evaluator: Arc<dyn SemanticEvaluator>,
    ) -> Self {
        let smoother = ClassSmoother::new(config.smoothing_window);
        Self {
            config,
            profile,
            evaluator,
            smoother,
        }
    }

    pub fn assess(
        &mut self,
        transcript: &str,
        history: &[String],
        silence: Duration,
    ) -> TurnAssessment {
        let silence_ms = silence.as_millis() as u64;

        // An explicit wait request overrides both ceilings, up to its own
        // hard cap.
        if self.profile.matches_wait_phrase(transcript) {
            return if silence_ms >= self.config.wait_cap_ms {
                TurnAssessment {
                    verdict: TurnVerdict::Finished,
                    confidence: 1.0,
                    reason: AssessReason::WaitCapExceeded,
                }
            } else {
                TurnAssessment {
                    verdict: TurnVerdict::Wait,
                    confidence: 0.9,
                    reason: AssessReason::WaitPhrase,
                }
            };
        }

        if silence_ms >= self.config.max_silence_ms {
            return TurnAssessment {
                verdict: TurnVerdict::Finished,
                confidence: 1.0,
                reason: AssessReason::SilenceCeiling,
            };
        }

        if silence_ms < self.config.min_silence_ms {
            // Still-growing transcript; semantics have nothing reliable to
            // say yet.
            return TurnAssessment {
                verdict: TurnVerdict::Unfinished,
                confidence: 1.0,
                reason: AssessReason::BelowMinSilence,
            };
        }

        let eval_started = std::time::Instant::now();
        match self.evaluator.classify(transcript, history) {
            Ok((class, confidence)) => {
                let elapsed = eval_started.elapsed();
                if elapsed > Duration::from_millis(self.config.evaluator_budget_ms) {
                    // A late verdict is as useless as no verdict; the caller
                    // polls every frame and needs an answer now.
                    tracing::warn!(
                        target: "turn",
                        elapsed_ms = elapsed.as_millis() as u64,
                        budget_ms = self.config.evaluator_budget_ms,
                        "semantic evaluator over budget, using punctuation fallback"
                    );
                    return self.punctuation_fallback(transcript);
                }
                let (class, confidence) = self.smoother.push(class, confidence);
                self.assess_semantic(class, confidence, silence_ms)
            }
            Err(e) => {
                tracing::warn!(
                    target: "turn",
                    error = %e,
                    "semantic evaluator failed, using punctuation fallback"
                );
                self.punctuation_fallback(transcript)
            }
        }
    }

    fn assess_semantic(
        &self,
        class: Completeness,
        confidence: f32,
        silence_ms: u64,
    ) -> TurnAssessment {
        let required_silence = class
            .suggested_silence_ms()
            .clamp(self.config.min_silence_ms, self.config.max_silence_ms);

        if silence_ms < required_silence {
            return TurnAssessment {
                verdict: TurnVerdict::Unfinished,
                confidence,
                reason: AssessReason::NotComplete,
            };
        }

        let silence_ratio = (silence_ms as f32 / required_silence as f32).min(1.0);
        let blended = self.config.silence_weight * silence_ratio
            + self.config.semantic_weight * confidence * class.weight();

        if blended >= self.config.semantic_threshold {
            TurnAssessment {
                verdict: TurnVerdict::Finished,
                confidence: blended.min(1.0),
                reason: AssessReason::Semantic,
            }
        } else {
            TurnAssessment {
                verdict: TurnVerdict::Unfinished,
                confidence: blended,
                reason: AssessReason::NotComplete,
            }
        }
    }

    fn punctuation_fallback(&self, transcript: &str) -> TurnAssessment {
        if self.profile.ends_with_terminator(transcript) {
            TurnAssessment {
                verdict: TurnVerdict::Finished,
                confidence: self.config.fallback_confidence,
                reason: AssessReason::PunctuationFallback,
            }
        } else {
            TurnAssessment {
                verdict: TurnVerdict::Unfinished,
                confidence: self.config.fallback_confidence,
                reason: AssessReason::PunctuationFallback,
            }
        }
    }

    /// Clears the smoothing window between turns.
    pub fn reset(&mut self) {
        self.smoother.clear();
    }

    pub fn config(&self) -> &TurnConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::HeuristicEvaluator;
    use duet_foundation::InferenceError;

    struct BrokenEvaluator;

    impl SemanticEvaluator for BrokenEvaluator {
        fn classify(
            &self,
            _transcript: &str,
            _history: &[String],
        ) -> Result<(Completeness, f32), InferenceError> {
            Err(InferenceError::Semantic("model offline".into()))
        }
    }

    fn detector() -> TurnDetector {
        let profile = LanguageProfile::english();
        TurnDetector::new(
            TurnConfig::default(),
            profile.clone(),
            Arc::new(HeuristicEvaluator::new(profile)),
        )
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn never_finished_below_min_silence() {
        let mut d = detector();
        for transcript in ["", "done.", "five lakh loan", "absolutely everything said?"] {
            let a = d.assess(transcript, &[], ms(100));
            assert_ne!(a.verdict, TurnVerdict::Finished, "transcript: {transcript}");
            assert_eq!(a.reason, AssessReason::BelowMinSilence);
        }
    }

    #[test]
    fn ceiling_forces_finished_regardless_of_content() {
        let mut d = detector();
        let a = d.assess("I want to tell you about", &[], ms(1_200));
        assert_eq!(a.verdict, TurnVerdict::Finished);
        assert_eq!(a.confidence, 1.0);
        assert_eq!(a.reason, AssessReason::SilenceCeiling);
    }

    #[test]
    fn ceiling_holds_even_when_evaluator_is_broken() {
        let profile = LanguageProfile::english();
        let mut d = TurnDetector::new(TurnConfig::default(), profile, Arc::new(BrokenEvaluator));
        let a = d.assess("trailing and", &[], ms(1_000));
        assert_eq!(a.verdict, TurnVerdict::Finished);
        assert_eq!(a.confidence, 1.0);
    }

    #[test]
    fn complete_short_answer_finishes_at_moderate_silence() {
        let mut d = detector();
        let a = d.assess("five lakh loan", &[], ms(400));
        assert_eq!(a.verdict, TurnVerdict::Finished);
        assert!(a.confidence >= 0.7, "confidence {}", a.confidence);
        assert_eq!(a.reason, AssessReason::Semantic);
    }

    #[test]
    fn incomplete_clause_stays_open() {
        let mut d = detector();
        let a = d.assess("I want a loan because", &[], ms(500));
        assert_eq!(a.verdict, TurnVerdict::Unfinished);
    }

    #[test]
    fn wait_phrase_holds_past_ceiling() {
        let mut d = detector();
        let a = d.assess("hold on", &[], ms(3_000));
        assert_eq!(a.verdict, TurnVerdict::Wait);
        assert_eq!(a.reason, AssessReason::WaitPhrase);
    }

    #[test]
    fn wait_phrase_expires_at_hard_cap() {
        let mut d = detector();
        let a = d.assess("hold on", &[], ms(11_000));
        assert_eq!(a.verdict, TurnVerdict::Finished);
        assert_eq!(a.reason, AssessReason::WaitCapExceeded);
    }

    struct SluggishEvaluator;

    impl SemanticEvaluator for SluggishEvaluator {
        fn classify(
            &self,
            _transcript: &str,
            _history: &[String],
        ) -> Result<(Completeness, f32), InferenceError> {
            std::thread::sleep(Duration::from_millis(25));
            Ok((Completeness::Complete, 0.95))
        }
    }

    #[test]
    fn over_budget_evaluator_falls_back_to_punctuation() {
        let profile = LanguageProfile::english();
        let config = TurnConfig {
            evaluator_budget_ms: 5,
            ..TurnConfig::default()
        };
        let mut d = TurnDetector::new(config, profile, Arc::new(SluggishEvaluator));

        let a = d.assess("That is all I need.", &[], ms(400));
        assert_eq!(a.reason, AssessReason::PunctuationFallback);
        assert_eq!(a.verdict, TurnVerdict::Finished);
    }

    #[test]
    fn broken_evaluator_falls_back_to_punctuation() {
        let profile = LanguageProfile::english();
        let mut d = TurnDetector::new(TurnConfig::default(), profile, Arc::new(BrokenEvaluator));

        let ended = d.assess("That is all I need.", &[], ms(400));
        assert_eq!(ended.verdict, TurnVerdict::Finished);
        assert_eq!(ended.confidence, 0.8);
        assert_eq!(ended.reason, AssessReason::PunctuationFallback);

        let open = d.assess("That is all I need", &[], ms(400));
        assert_eq!(open.verdict, TurnVerdict::Unfinished);
    }
}
