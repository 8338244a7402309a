use serde::{Deserialize, Serialize};

/// Per-language calibration for turn detection. Marker lists and wait
/// phrases are language-specific and must be supplied per language, never
/// assumed universal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub name: String,
    /// Phrases that mean "hold on, I'm not done" and suppress turn end.
    pub wait_phrases: Vec<String>,
    /// Leading words that mark a question when no '?' is present.
    pub question_markers: Vec<String>,
    /// Trailing words that signal an unfinished clause.
    pub trailing_incomplete: Vec<String>,
    /// Short acknowledgement words that are not a turn of their own.
    pub backchannels: Vec<String>,
    /// Sentence-terminal characters for this language.
    pub terminators: Vec<char>,
}

impl LanguageProfile {
    pub fn english() -> Self {
        Self {
            name: "en".into(),
            wait_phrases: vec![
                "wait".into(),
                "hold on".into(),
                "one moment".into(),
                "one second".into(),
                "just a minute".into(),
                "give me a second".into(),
                "let me think".into(),
                "let me check".into(),
            ],
            question_markers: vec![
                "what".into(),
                "when".into(),
                "where".into(),
                "who".into(),
                "why".into(),
                "how".into(),
                "can".into(),
                "could".into(),
                "would".into(),
                "should".into(),
                "is".into(),
                "are".into(),
                "do".into(),
                "does".into(),
            ],
            trailing_incomplete: vec![
                "and".into(),
                "but".into(),
                "or".into(),
                "so".into(),
                "because".into(),
                "the".into(),
                "a".into(),
                "of".into(),
                "with".into(),
                "for".into(),
            ],
            backchannels: vec![
                "hmm".into(),
                "uh huh".into(),
                "okay".into(),
                "ok".into(),
                "yeah".into(),
                "right".into(),
                "i see".into(),
            ],
            terminators: vec!['.', '!', '?'],
        }
    }

    pub fn hindi() -> Self {
        Self {
            name: "hi".into(),
            wait_phrases: vec![
                "रुको".into(),
                "रुकिए".into(),
                "एक मिनट".into(),
                "एक सेकंड".into(),
                "ठहरो".into(),
                "सोचने दो".into(),
            ],
            question_markers: vec![
                "क्या".into(),
                "कब".into(),
                "कहाँ".into(),
                "कौन".into(),
                "क्यों".into(),
                "कैसे".into(),
                "कितना".into(),
                "कितनी".into(),
            ],
            trailing_incomplete: vec![
                "और".into(),
                "लेकिन".into(),
                "या".into(),
                "तो".into(),
                "क्योंकि".into(),
                "का".into(),
                "की".into(),
                "के".into(),
                "में".into(),
                "से".into(),
            ],
            backchannels: vec![
                "हाँ".into(),
                "हम्म".into(),
                "अच्छा".into(),
                "ठीक है".into(),
                "ओके".into(),
            ],
            terminators: vec!['।', '॥', '?', '!', '.'],
        }
    }

    /// Does the transcript end with (or consist of) a wait phrase?
    pub fn matches_wait_phrase(&self, transcript: &str) -> bool {
        let lowered = transcript.trim().to_lowercase();
        let trimmed = lowered.trim_end_matches(|c: char| self.terminators.contains(&c) || c == ',');
        self.wait_phrases
            .iter()
            .any(|phrase| trimmed == phrase.as_str() || trimmed.ends_with(phrase.as_str()))
    }

    pub fn ends_with_terminator(&self, transcript: &str) -> bool {
        transcript
            .trim_end()
            .chars()
            .next_back()
            .map(|c| self.terminators.contains(&c))
            .unwrap_or(false)
    }
}
