/// Closing marks that attach to the sentence they follow.
const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']', '»'];

/// Opening marks that start a new span and take a leading space.
const OPENERS: &[char] = &['“', '‘', '(', '[', '«'];

/// Accumulates streamed tokens and cuts them into speakable sentences.
///
/// A sentence is released once a terminator is seen with at least one
/// character after it, so trailing quotes and brackets stay attached. The
/// first sentence may be released early at a word boundary to get audio
/// started, and an over-full buffer is force-flushed the same way.
#[derive(Debug)]
pub struct SentenceChunker {
    buffer: String,
    terminators: Vec<char>,
    min_chars_first_sentence: usize,
    max_buffer_chars: usize,
    emitted_any: bool,
}

impl SentenceChunker {
    pub fn new(
        terminators: Vec<char>,
        min_chars_first_sentence: usize,
        max_buffer_chars: usize,
    ) -> Self {
        Self {
            buffer: String::new(),
            terminators,
            min_chars_first_sentence,
            max_buffer_chars,
            emitted_any: false,
        }
    }

    /// Append one token and return any sentences that became complete.
    pub fn push(&mut self, token: &str) -> Vec<String> {
        if token.is_empty() {
            return Vec::new();
        }
        // Leading punctuation, closers included, glues onto the buffered
        // text; words and opening marks take a space.
        let attach = token
            .chars()
            .next()
            .map(|c| !c.is_alphanumeric() && !OPENERS.contains(&c))
            .unwrap_or(true);
        if !self.buffer.is_empty() && !attach {
            self.buffer.push(' ');
        }
        self.buffer.push_str(token);
        self.drain_ready()
    }

    /// Emit whatever text remains, ending the response.
    pub fn flush(&mut self) -> Option<String> {
        let rest = self.buffer.trim().to_string();
        self.clear();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.emitted_any = false;
    }

    fn drain_ready(&mut self) -> Vec<String> {
        let mut out = Vec::new();

        loop {
            let chars: Vec<char> = self.buffer.chars().collect();
            let mut cut = None;
            for (i, c) in chars.iter().enumerate() {
                if self.terminators.contains(c) {
                    let mut end = i + 1;
                    while end < chars.len() && CLOSERS.contains(&chars[end]) {
                        end += 1;
                    }
                    // Hold a trailing terminator until the next token shows
                    // no closer follows it.
                    if end < chars.len() {
                        cut = Some(end);
                        break;
                    }
                }
            }
            let Some(end) = cut else { break };
            let sentence: String = chars[..end].iter().collect();
            self.buffer = chars[end..].iter().collect::<String>().trim_start().to_string();
            let sentence = sentence.trim().to_string();
            if !sentence.is_empty() {
                self.emitted_any = true;
                out.push(sentence);
            }
        }

        // First sentence goes out early at a word boundary; a short head
        // start matters more than a clean sentence join.
        if !self.emitted_any && self.buffer.chars().count() >= self.min_chars_first_sentence {
            if let Some(cut) = self.word_boundary_cut() {
                out.push(cut);
                self.emitted_any = true;
            }
        }

        while self.buffer.chars().count() > self.max_buffer_chars {
            match self.word_boundary_cut() {
                Some(cut) => out.push(cut),
                None => break,
            }
        }

        out
    }

    fn word_boundary_cut(&mut self) -> Option<String> {
        let pos = self.buffer.rfind(char::is_whitespace)?;
        let head = self.buffer[..pos].trim().to_string();
        self.buffer = self.buffer[pos..].trim_start().to_string();
        if head.is_empty() {
            None
        } else {
            Some(head)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TtsConfig;

    fn chunker() -> SentenceChunker {
        let config = TtsConfig::default();
        SentenceChunker::new(config.terminators, 1_000, 10_000)
    }

    #[test]
    fn splits_on_terminator_with_lookahead() {
        let mut c = chunker();
        assert!(c.push("your loan is approved.").is_empty());
        // The terminator is released once the next token proves no closing
        // quote follows it.
        let sentences = c.push("anything else?");
        assert_eq!(sentences, vec!["your loan is approved.".to_string()]);
        assert_eq!(c.flush(), Some("anything else?".to_string()));
    }

    #[test]
    fn danda_terminates_a_sentence() {
        let mut c = chunker();
        c.push("आपका ऋण स्वीकृत है।");
        let sentences = c.push("और कुछ?");
        assert_eq!(sentences, vec!["आपका ऋण स्वीकृत है।".to_string()]);
    }

    #[test]
    fn closing_quote_stays_with_its_sentence() {
        let mut c = chunker();
        c.push("he said \"done.\"");
        let sentences = c.push("then left.");
        assert_eq!(sentences, vec!["he said \"done.\"".to_string()]);
    }

    #[test]
    fn closing_quote_arriving_as_its_own_token_attaches() {
        let mut c = chunker();
        c.push("he said \"done.");
        c.push("\"");
        let sentences = c.push("then left.");
        assert_eq!(sentences, vec!["he said \"done.\"".to_string()]);
    }

    #[test]
    fn first_sentence_is_released_early_at_word_boundary() {
        let config = TtsConfig::default();
        let mut c = SentenceChunker::new(config.terminators, 15, 10_000);
        let mut emitted = Vec::new();
        for token in ["let", "me", "check", "that", "for", "you", "right", "now"] {
            emitted.extend(c.push(token));
        }
        assert!(!emitted.is_empty());
        // The early cut never splits a word.
        assert!(!emitted[0].ends_with(char::is_whitespace));
        assert!("let me check that for you right now".starts_with(emitted[0].as_str()));
    }

    #[test]
    fn oversized_buffer_is_force_flushed() {
        let config = TtsConfig::default();
        let mut c = SentenceChunker::new(config.terminators, 1_000, 40);
        let mut emitted = Vec::new();
        for _ in 0..20 {
            emitted.extend(c.push("unpunctuated"));
        }
        assert!(!emitted.is_empty());
    }

    #[test]
    fn flush_returns_partial_sentence() {
        let mut c = chunker();
        c.push("one moment");
        assert_eq!(c.flush(), Some("one moment".to_string()));
        assert_eq!(c.flush(), None);
    }
}
