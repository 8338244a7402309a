use regex::RegexSet;

use crate::backend::Hypothesis;

/// Rejects candidate text that repeats a word sequence of at least the
/// configured order in immediate succession, the classic degenerate-decoder
/// loop.
#[derive(Debug, Clone)]
pub struct NgramBlocker {
    order: usize,
}

impl NgramBlocker {
    pub fn new(order: usize) -> Self {
        Self {
            order: order.max(1),
        }
    }

    /// True if `words` contains a block of `order` or more words repeated
    /// back to back.
    pub fn has_immediate_repeat(&self, words: &[&str]) -> bool {
        let min = self.order;
        if words.len() < 2 * min {
            return false;
        }
        for period in min..=words.len() / 2 {
            for start in 0..=(words.len() - 2 * period) {
                if words[start..start + period] == words[start + period..start + 2 * period] {
                    return true;
                }
            }
        }
        false
    }

    pub fn violates(&self, text: &str) -> bool {
        let words: Vec<&str> = text.split_whitespace().collect();
        self.has_immediate_repeat(&words)
    }

    /// Removes immediately repeated blocks, keeping the first occurrence.
    /// Post-pass for when every candidate violates and something must still
    /// be emitted.
    pub fn strip_repeats(&self, text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        let min = self.order;
        let mut kept: Vec<&str> = Vec::with_capacity(words.len());
        for word in words {
            kept.push(word);
            let len = kept.len();
            for period in min..=len / 2 {
                if kept[len - period..] == kept[len - 2 * period..len - period] {
                    kept.truncate(len - period);
                    break;
                }
            }
        }
        kept.join(" ")
    }
}

/// Strips known stock phrases a decoder emits without audio support.
pub struct HallucinationFilter {
    set: RegexSet,
    patterns: Vec<regex::Regex>,
}

impl HallucinationFilter {
    pub fn new(patterns: &[String]) -> Result<Self, regex::Error> {
        let set = RegexSet::new(patterns)?;
        let compiled = patterns
            .iter()
            .map(|p| regex::Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            set,
            patterns: compiled,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.set.is_match(text)
    }

    /// Removes every matching span and tidies the remaining whitespace.
    pub fn strip(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for pattern in &self.patterns {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }
        cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Length-normalized hypothesis selection with patience-based early stop.
///
/// Candidates arrive best-first by raw score; scanning stops once
/// `patience` consecutive candidates fail to improve the normalized best,
/// bounding selection latency on wide beams.
///
/// Returns the winning index, or None when every candidate was filtered.
pub fn select_hypothesis<F>(
    hypotheses: &[Hypothesis],
    length_penalty: f32,
    patience: usize,
    mut acceptable: F,
) -> (Option<usize>, bool)
where
    F: FnMut(&Hypothesis) -> bool,
{
    let mut best: Option<(usize, f32)> = None;
    let mut stale = 0;
    let mut stopped_early = false;

    for (index, hypothesis) in hypotheses.iter().enumerate() {
        if !acceptable(hypothesis) {
            continue;
        }
        let length = hypothesis.word_count().max(1) as f32;
        let normalized = hypothesis.log_prob / length.powf(length_penalty);

        match best {
            Some((_, best_score)) if normalized <= best_score => {
                stale += 1;
                if stale >= patience {
                    stopped_early = true;
                    break;
                }
            }
            _ => {
                best = Some((index, normalized));
                stale = 0;
            }
        }
    }

    (best.map(|(i, _)| i), stopped_early)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DecodedToken;

    fn hyp(words: &[&str], log_prob: f32) -> Hypothesis {
        let per_token = log_prob / words.len().max(1) as f32;
        Hypothesis::new(
            words
                .iter()
                .map(|w| DecodedToken::word(*w, per_token))
                .collect(),
        )
    }

    #[test]
    fn trigram_repeat_detected() {
        let blocker = NgramBlocker::new(3);
        assert!(blocker.violates("i need a loan i need a loan"));
        assert!(blocker.violates("please give me please give me money"));
        assert!(!blocker.violates("i need a loan for my shop"));
    }

    #[test]
    fn repeated_phrase_in_source_is_allowed_when_separated() {
        let blocker = NgramBlocker::new(3);
        // Same trigram twice but not adjacent.
        assert!(!blocker.violates("five lakh loan yes exactly five lakh loan"));
    }

    #[test]
    fn strip_repeats_keeps_first_occurrence() {
        let blocker = NgramBlocker::new(3);
        let cleaned = blocker.strip_repeats("i need a loan i need a loan");
        assert_eq!(cleaned, "i need a loan");
    }

    #[test]
    fn hallucination_filter_strips_stock_phrases() {
        let filter =
            HallucinationFilter::new(&crate::config::SttConfig::english_hallucination_patterns())
                .unwrap();
        assert!(filter.matches("five lakh thank you for watching"));
        assert_eq!(
            filter.strip("five lakh thank you for watching loan"),
            "five lakh loan"
        );
        assert!(!filter.matches("five lakh loan"));
    }

    #[test]
    fn selection_is_length_normalized() {
        // A long low-average-score hypothesis must not beat a short
        // confident one purely on summed log prob.
        let short = hyp(&["five", "lakh", "loan"], -1.5);
        let long = hyp(
            &["five", "lakh", "loan", "thank", "you", "for", "watching"],
            -2.0,
        );
        let (winner, _) = select_hypothesis(&[long, short], 0.6, 10, |_| true);
        assert_eq!(winner, Some(1));
    }

    #[test]
    fn patience_stops_scanning() {
        let candidates: Vec<Hypothesis> = (0..10)
            .map(|i| hyp(&["word"], -1.0 - i as f32))
            .collect();
        let (winner, stopped) = select_hypothesis(&candidates, 0.6, 2, |_| true);
        assert_eq!(winner, Some(0));
        assert!(stopped);
    }

    #[test]
    fn filtered_candidates_are_skipped() {
        let blocker = NgramBlocker::new(2);
        let looped = hyp(&["no", "no", "no", "no"], -0.5);
        let clean = hyp(&["five", "lakh", "loan"], -2.0);
        let (winner, _) =
            select_hypothesis(&[looped, clean], 0.6, 5, |h| !blocker.violates(&h.text()));
        assert_eq!(winner, Some(1));
    }
}
