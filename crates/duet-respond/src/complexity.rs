/// Cheap lexical complexity score in [0, 1] for routing between the fast
/// and slow model. Runs on every partial, so no allocation-heavy analysis.
#[derive(Debug, Clone)]
pub struct ComplexityEstimator {
    reasoning_markers: Vec<&'static str>,
    clause_connectors: Vec<&'static str>,
}

impl Default for ComplexityEstimator {
    fn default() -> Self {
        Self {
            reasoning_markers: vec![
                "why", "how", "explain", "compare", "difference", "calculate", "versus",
            ],
            clause_connectors: vec![
                "and", "but", "because", "although", "however", "unless", "whereas", "if",
            ],
        }
    }
}

impl ComplexityEstimator {
    pub fn score(&self, text: &str) -> f32 {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();
        if words.is_empty() {
            return 0.0;
        }

        let length = (words.len() as f32 / 40.0).min(1.0);
        let clauses = words
            .iter()
            .filter(|w| self.clause_connectors.contains(&w.trim_matches(|c: char| !c.is_alphanumeric())))
            .count() as f32;
        let clause_density = (clauses / 3.0).min(1.0);
        let reasoning = if self
            .reasoning_markers
            .iter()
            .any(|m| words.iter().any(|w| w.starts_with(m)))
        {
            1.0
        } else {
            0.0
        };
        let question = if lower.contains('?') { 1.0 } else { 0.0 };

        0.4 * length + 0.3 * clause_density + 0.2 * reasoning + 0.1 * question
    }

    /// Draft acceptability heuristic: penalizes degenerate repetition and
    /// stock refusal phrasing in a fast-model draft.
    pub fn draft_quality(&self, tokens: &[String]) -> f32 {
        if tokens.is_empty() {
            return 0.0;
        }
        let mut seen = std::collections::HashSet::new();
        let unique = tokens
            .iter()
            .filter(|t| seen.insert(t.to_lowercase()))
            .count() as f32;
        let diversity = unique / tokens.len() as f32;

        let text = tokens.join(" ").to_lowercase();
        let refusal = text.contains("i cannot") || text.contains("i'm sorry");
        if refusal {
            diversity * 0.5
        } else {
            diversity
        }
    }
}
