use std::collections::VecDeque;

use duet_foundation::InferenceError;

use crate::language::LanguageProfile;

/// How complete the transcript looks as an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Completeness {
    Complete,
    Question,
    PossiblyComplete,
    Incomplete,
    Backchannel,
}

impl Completeness {
    /// Silence to wait before ending the turn for this class. A clearly
    /// finished utterance needs little confirmation; an unfinished clause
    /// deserves patience.
    pub fn suggested_silence_ms(&self) -> u64 {
        match self {
            Completeness::Question => 250,
            Completeness::Complete => 300,
            Completeness::PossiblyComplete => 500,
            Completeness::Incomplete => 800,
            Completeness::Backchannel => 1_000,
        }
    }

    /// Weight applied to the classifier confidence when blending.
    pub fn weight(&self) -> f32 {
        match self {
            Completeness::Complete => 1.0,
            Completeness::Question => 0.95,
            Completeness::PossiblyComplete => 0.7,
            Completeness::Backchannel => 0.3,
            Completeness::Incomplete => 0.2,
        }
    }
}

/// Estimates utterance completeness. Implementations are stateless and may
/// be shared across sessions; smoothing state lives in the caller.
///
/// The call is synchronous and runs on the frame path, so implementations
/// must enforce their own deadline and return `Err` instead of blocking.
/// The detector also checks the call against `evaluator_budget_ms` and
/// discards verdicts that arrive late.
pub trait SemanticEvaluator: Send + Sync {
    fn classify(
        &self,
        transcript: &str,
        history: &[String],
    ) -> Result<(Completeness, f32), InferenceError>;
}

/// Marker-based evaluator, the always-available fallback implementation.
/// A learned sequence model plugs in through the same trait.
pub struct HeuristicEvaluator {
    profile: LanguageProfile,
}

impl HeuristicEvaluator {
    pub fn new(profile: LanguageProfile) -> Self {
        Self { profile }
    }
}

impl SemanticEvaluator for HeuristicEvaluator {
    fn classify(
        &self,
        transcript: &str,
        _history: &[String],
    ) -> Result<(Completeness, f32), InferenceError> {
        let text = transcript.trim();
        if text.is_empty() {
            return Ok((Completeness::Incomplete, 0.5));
        }
        let lowered = text.to_lowercase();

        if self
            .profile
            .backchannels
            .iter()
            .any(|b| lowered == b.as_str())
        {
            return Ok((Completeness::Backchannel, 0.85));
        }

        if text.ends_with('?') {
            return Ok((Completeness::Question, 0.9));
        }

        let words: Vec<&str> = lowered
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && !c.is_alphabetic()))
            .collect();

        if let Some(last) = words.last() {
            if self
                .profile
                .trailing_incomplete
                .iter()
                .any(|m| last == &m.as_str())
            {
                return Ok((Completeness::Incomplete, 0.8));
            }
        }

        if self.profile.ends_with_terminator(text) && !text.ends_with('?') {
            return Ok((Completeness::Complete, 0.85));
        }

        if let Some(first) = words.first() {
            if self
                .profile
                .question_markers
                .iter()
                .any(|m| first == &m.as_str())
            {
                return Ok((Completeness::Question, 0.75));
            }
        }

        // Short unterminated phrases are usually complete answers in
        // conversation ("five lakh loan"); long ones are more doubtful.
        if words.len() <= 6 {
            Ok((Completeness::Complete, 0.75))
        } else {
            Ok((Completeness::PossiblyComplete, 0.65))
        }
    }
}

/// Majority vote over the last few classifications, so one noisy partial
/// does not flip the verdict.
pub(crate) struct ClassSmoother {
    window: VecDeque<(Completeness, f32)>,
    capacity: usize,
}

impl ClassSmoother {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, class: Completeness, confidence: f32) -> (Completeness, f32) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back((class, confidence));

        let mut best = (class, 0_usize);
        for candidate in [
            Completeness::Complete,
            Completeness::Question,
            Completeness::PossiblyComplete,
            Completeness::Incomplete,
            Completeness::Backchannel,
        ] {
            let count = self.window.iter().filter(|(c, _)| *c == candidate).count();
            if count > best.1 {
                best = (candidate, count);
            }
        }
        // Latest entry wins ties because it saw the most transcript.
        let winner = if self.window.iter().filter(|(c, _)| *c == class).count() >= best.1 {
            class
        } else {
            best.0
        };
        let avg = {
            let matching: Vec<f32> = self
                .window
                .iter()
                .filter(|(c, _)| *c == winner)
                .map(|(_, conf)| *conf)
                .collect();
            matching.iter().sum::<f32>() / matching.len() as f32
        };
        (winner, avg)
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
