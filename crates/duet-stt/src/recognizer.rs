use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use duet_audio::{AudioFrame, RollingBuffer};
use duet_foundation::{InferenceError, PipelineError};

use crate::backend::DecoderBackend;
use crate::config::SttConfig;
use crate::guards::{select_hypothesis, HallucinationFilter, NgramBlocker};
use crate::types::{SttMetrics, TranscriptResult, WordSpan};

/// Incremental recognizer: accumulates audio in a rolling buffer, decodes a
/// chunk at a time, and emits the stable prefix as partial progress.
///
/// A prefix is stable once it survives unchanged across the last
/// `stability_window` decodes; it is promoted to a final at a sentence
/// boundary or on [`finalize`](Self::finalize). Finals are idempotent and
/// never overlap: once a span is finalized it is never re-emitted or
/// revised.
pub struct StreamingRecognizer {
    config: SttConfig,
    backend: Arc<dyn DecoderBackend>,
    buffer: RollingBuffer,
    pending_ms: u64,
    /// Most recent full-utterance decodes, newest last.
    decode_history: VecDeque<String>,
    /// Chars of stable prefix already emitted as a partial.
    emitted_chars: usize,
    utterance_id: u64,
    utterance_start_ms: u64,
    /// Absolute end of the last final; the floor for any new span.
    finalized_end_ms: u64,
    blocker: NgramBlocker,
    filter: HallucinationFilter,
    metrics: SttMetrics,
}

impl StreamingRecognizer {
    pub fn new(config: SttConfig, backend: Arc<dyn DecoderBackend>) -> Result<Self, PipelineError> {
        let filter = HallucinationFilter::new(&config.hallucination_patterns)
            .map_err(|e| PipelineError::Config(format!("bad hallucination pattern: {}", e)))?;
        let buffer = RollingBuffer::new(
            config.sample_rate_hz,
            Duration::from_secs(config.max_buffer_secs),
        );
        Ok(Self {
            blocker: NgramBlocker::new(config.ngram_order),
            filter,
            buffer,
            pending_ms: 0,
            decode_history: VecDeque::with_capacity(config.stability_window),
            emitted_chars: 0,
            utterance_id: 0,
            utterance_start_ms: 0,
            finalized_end_ms: 0,
            metrics: SttMetrics::default(),
            backend,
            config,
        })
    }

    /// Feed speech audio. Returns any partial or final results the new
    /// audio produced.
    pub fn push_audio(&mut self, frame: &AudioFrame) -> Result<Vec<TranscriptResult>, PipelineError> {
        if self.buffer.is_empty() && self.decode_history.is_empty() {
            self.utterance_start_ms = self.finalized_end_ms;
        }
        self.buffer.push(frame);
        self.pending_ms += frame.duration_ms();

        if self.pending_ms < self.config.chunk_ms {
            return Ok(Vec::new());
        }
        self.pending_ms = 0;

        match self.decode_with_retry(None) {
            Ok(Some(text)) => Ok(self.advance_history(text)),
            Ok(None) => Ok(Vec::new()),
            Err(e) => {
                // Repeated failure: close out whatever is stable instead of
                // blocking the turn.
                self.metrics.decode_failures += 1;
                tracing::warn!(
                    target: "stt",
                    error = %e,
                    "decode failed after retry, finalizing stable text"
                );
                Ok(self.finalize()?.into_iter().collect())
            }
        }
    }

    /// Flush the utterance: decode remaining audio (padded to a chunk
    /// boundary) and emit one final result. Returns None when nothing
    /// remains to finalize.
    pub fn finalize(&mut self) -> Result<Option<TranscriptResult>, PipelineError> {
        if self.buffer.is_empty() && self.decode_history.is_empty() {
            return Ok(None);
        }

        let pad = {
            let chunk = self.config.chunk_samples();
            let rem = self.buffer.len() % chunk;
            if rem == 0 {
                0
            } else {
                chunk - rem
            }
        };

        let text = match self.decode_with_retry(Some(pad)) {
            Ok(Some(text)) => text,
            Ok(None) | Err(_) => self.stable_prefix(),
        };

        let cleaned = self.post_pass(&text);
        let end_ms = self.stream_position_ms();
        let result = if cleaned.is_empty() {
            None
        } else {
            let start_ms = self.utterance_start_ms.max(self.finalized_end_ms);
            self.metrics.finals_emitted += 1;
            Some(TranscriptResult {
                utterance_id: self.utterance_id,
                confidence: 0.9,
                words: distribute_words(&cleaned, start_ms, end_ms),
                text: cleaned,
                is_final: true,
                start_ms,
                end_ms,
                language: self.config.language.clone(),
            })
        };

        self.close_utterance(end_ms);
        Ok(result)
    }

    /// Drop all per-utterance state, e.g. after barge-in redirects the
    /// session. Nothing is emitted.
    pub fn reset(&mut self) {
        let end = self.stream_position_ms();
        self.close_utterance(end);
    }

    pub fn metrics(&self) -> &SttMetrics {
        &self.metrics
    }

    fn close_utterance(&mut self, end_ms: u64) {
        self.buffer.clear();
        self.decode_history.clear();
        self.emitted_chars = 0;
        self.pending_ms = 0;
        self.utterance_id += 1;
        self.finalized_end_ms = self.finalized_end_ms.max(end_ms);
        self.utterance_start_ms = self.finalized_end_ms;
    }

    fn stream_position_ms(&self) -> u64 {
        self.buffer.start_offset_ms() + self.buffer.duration().as_millis() as u64
    }

    /// One decode pass over the utterance audio so far, with one retry on
    /// inference error. Returns the selected, guard-filtered text.
    fn decode_with_retry(&mut self, pad_samples: Option<usize>) -> Result<Option<String>, InferenceError> {
        let mut audio = self.buffer.samples().to_vec();
        if let Some(pad) = pad_samples {
            audio.extend(std::iter::repeat(0.0).take(pad));
        }
        if audio.is_empty() {
            return Ok(None);
        }

        let hypotheses = match self.backend.decode(&audio, self.config.sample_rate_hz) {
            Ok(h) => h,
            Err(first) => {
                self.metrics.decode_retries += 1;
                tracing::debug!(target: "stt", error = %first, "decode error, retrying once");
                self.backend.decode(&audio, self.config.sample_rate_hz)?
            }
        };
        self.metrics.chunks_decoded += 1;

        for hypothesis in &hypotheses {
            self.metrics.suppressed_tokens +=
                hypothesis.tokens.iter().filter(|t| t.is_blank).count() as u64;
        }

        let blocker = self.blocker.clone();
        let filter = &self.filter;
        let mut blocked = 0_u64;
        let (winner, stopped) = select_hypothesis(
            &hypotheses,
            self.config.length_penalty,
            self.config.patience,
            |h| {
                let text = h.text();
                let ok = !text.is_empty() && !blocker.violates(&text) && !filter.matches(&text);
                if !ok && !text.is_empty() {
                    blocked += 1;
                }
                ok
            },
        );
        self.metrics.blocked_hypotheses += blocked;
        if stopped {
            self.metrics.patience_stops += 1;
        }

        match winner {
            Some(index) => Ok(Some(hypotheses[index].text())),
            None => {
                // Every candidate tripped a guard; salvage the best one.
                let salvaged = hypotheses
                    .first()
                    .map(|h| self.post_pass(&h.text()))
                    .filter(|t| !t.is_empty());
                Ok(salvaged)
            }
        }
    }

    fn post_pass(&mut self, text: &str) -> String {
        let stripped = self.filter.strip(text);
        if stripped.len() != text.len() {
            self.metrics.hallucinations_stripped += 1;
        }
        self.blocker.strip_repeats(&stripped)
    }

    /// Record a decode and emit whatever newly became stable.
    fn advance_history(&mut self, text: String) -> Vec<TranscriptResult> {
        if self.decode_history.len() == self.config.stability_window {
            self.decode_history.pop_front();
        }
        self.decode_history.push_back(text);

        let stable = self.stable_prefix();
        let mut results = Vec::new();

        if stable.chars().count() > self.emitted_chars {
            self.emitted_chars = stable.chars().count();
            let end_ms = self.stream_position_ms();
            let start_ms = self.utterance_start_ms;

            let at_boundary = stable
                .trim_end()
                .chars()
                .next_back()
                .map(|c| self.config.terminators.contains(&c))
                .unwrap_or(false);

            if at_boundary {
                let cleaned = self.post_pass(&stable);
                if !cleaned.is_empty() {
                    self.metrics.finals_emitted += 1;
                    results.push(TranscriptResult {
                        utterance_id: self.utterance_id,
                        confidence: 0.9,
                        words: distribute_words(&cleaned, start_ms, end_ms),
                        text: cleaned,
                        is_final: true,
                        start_ms,
                        end_ms,
                        language: self.config.language.clone(),
                    });
                }
                self.close_utterance(end_ms);
            } else {
                self.metrics.partials_emitted += 1;
                results.push(TranscriptResult {
                    utterance_id: self.utterance_id,
                    confidence: 0.8,
                    words: Vec::new(),
                    text: stable,
                    is_final: false,
                    start_ms,
                    end_ms,
                    language: self.config.language.clone(),
                });
            }
        }

        results
    }

    /// Longest prefix shared by every recent decode, cut back to a word
    /// boundary so a partial never ends mid-word.
    fn stable_prefix(&self) -> String {
        let mut iter = self.decode_history.iter();
        let Some(first) = iter.next() else {
            return String::new();
        };
        let mut prefix: Vec<char> = first.chars().collect();
        for entry in iter {
            let mut len = 0;
            for (a, b) in prefix.iter().zip(entry.chars()) {
                if *a != b {
                    break;
                }
                len += 1;
            }
            prefix.truncate(len);
        }

        let latest: Vec<char> = match self.decode_history.back() {
            Some(l) => l.chars().collect(),
            None => return String::new(),
        };
        // The prefix is word-complete if it covers the latest decode
        // entirely or stops at whitespace; otherwise drop the half-formed
        // trailing word.
        let at_word_boundary = prefix.len() == latest.len()
            || prefix.last().map(|c| c.is_whitespace()).unwrap_or(true)
            || latest
                .get(prefix.len())
                .map(|c| c.is_whitespace())
                .unwrap_or(true);

        let text: String = prefix.into_iter().collect();
        if at_word_boundary {
            text.trim_end().to_string()
        } else {
            match text.rfind(char::is_whitespace) {
                Some(pos) => text[..pos].trim_end().to_string(),
                None => String::new(),
            }
        }
    }
}

/// Approximate word timings by spreading the span proportionally to word
/// length. Backends with real alignments can replace this downstream.
fn distribute_words(text: &str, start_ms: u64, end_ms: u64) -> Vec<WordSpan> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    let span = end_ms.saturating_sub(start_ms);
    let mut cursor = start_ms;
    let mut out = Vec::with_capacity(words.len());
    for word in &words {
        let share = span * word.chars().count() as u64 / total_chars.max(1) as u64;
        out.push(WordSpan {
            text: (*word).to_string(),
            start_ms: cursor,
            end_ms: cursor + share,
            confidence: 0.8,
        });
        cursor += share;
    }
    if let Some(last) = out.last_mut() {
        last.end_ms = end_ms;
    }
    out
}
