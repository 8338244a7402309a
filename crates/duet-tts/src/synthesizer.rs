use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use duet_audio::{resampler, AudioFrame};
use duet_foundation::{InferenceError, PipelineError};

use crate::backend::{SynthesisBackend, SynthesisOptions};
use crate::chunker::SentenceChunker;
use crate::config::TtsConfig;
use crate::crossfade::linear_crossfade;

#[derive(Debug, Clone, Default)]
pub struct TtsMetrics {
    pub sentences_synthesized: u64,
    pub frames_emitted: u64,
    pub dropped_sentences: u64,
    pub priority_sentences: u64,
    pub synthesis_failures: u64,
}

#[derive(Debug)]
struct QueuedSentence {
    text: String,
    options: SynthesisOptions,
}

struct SynthJob {
    text: String,
    options: SynthesisOptions,
    epoch: u64,
}

struct SynthOutcome {
    result: Result<Vec<f32>, InferenceError>,
    epoch: u64,
}

/// Sentence-queued streaming synthesizer.
///
/// `push_text` feeds response tokens in, `next_frame` pulls fixed-duration
/// audio out. Sentences cross the queue boundary independently, so sentence
/// N plays while N+1 is still being generated upstream. Consecutive
/// sentences are joined with a linear crossfade; its tail is withheld from
/// output until the next sentence (or `finalize`) resolves the join.
///
/// Backend calls run on a dedicated worker task; `next_frame` only drains
/// audio the worker already finished and never waits on synthesis, so the
/// caller's input loop keeps its frame cadence. Construction spawns the
/// worker and must happen inside a Tokio runtime.
pub struct StreamingSynthesizer {
    config: TtsConfig,
    chunker: SentenceChunker,
    priority: VecDeque<QueuedSentence>,
    queue: VecDeque<QueuedSentence>,
    pcm: VecDeque<f32>,
    tail: Vec<f32>,
    sequence: u64,
    finished_input: bool,
    metrics: TtsMetrics,

    jobs: mpsc::Sender<SynthJob>,
    outcomes: mpsc::Receiver<SynthOutcome>,
    worker: JoinHandle<()>,
    /// Epoch of the one job the worker currently holds, if any. A `clear`
    /// bumps the epoch, so a stale outcome is discarded on arrival.
    inflight: Option<u64>,
    epoch: u64,
}

impl StreamingSynthesizer {
    pub fn new(config: TtsConfig, backend: Arc<dyn SynthesisBackend>) -> Self {
        let chunker = SentenceChunker::new(
            config.terminators.clone(),
            config.min_chars_first_sentence,
            config.max_buffer_chars,
        );
        let (jobs_tx, jobs_rx) = mpsc::channel(1);
        let (outcomes_tx, outcomes_rx) = mpsc::channel(4);
        let worker = spawn_worker(backend, config.sample_rate_hz, jobs_rx, outcomes_tx);
        Self {
            chunker,
            priority: VecDeque::new(),
            queue: VecDeque::new(),
            pcm: VecDeque::new(),
            tail: Vec::new(),
            sequence: 0,
            finished_input: false,
            metrics: TtsMetrics::default(),
            jobs: jobs_tx,
            outcomes: outcomes_rx,
            worker,
            inflight: None,
            epoch: 0,
            config,
        }
    }

    /// Feed one response token. Completed sentences move to the synthesis
    /// queue.
    pub fn push_text(&mut self, token: &str) {
        for sentence in self.chunker.push(token) {
            self.enqueue(sentence, SynthesisOptions::default());
        }
    }

    /// Queue a complete utterance directly, e.g. an acknowledgement filler.
    /// Priority sentences jump the queue and are never dropped.
    pub fn say(&mut self, text: impl Into<String>, options: SynthesisOptions) {
        self.enqueue(text.into(), options);
    }

    /// No more tokens are coming; flush the partial sentence and release
    /// the held crossfade tail.
    pub fn finalize(&mut self) {
        if let Some(rest) = self.chunker.flush() {
            self.enqueue(rest, SynthesisOptions::default());
        }
        self.finished_input = true;
    }

    /// Barge-in: drop queued and in-flight sentences, buffered audio, and
    /// crossfade state. The next response starts from silence. The worker
    /// may still be mid-sentence; its result dies on the epoch check.
    pub fn clear(&mut self) {
        self.epoch += 1;
        self.chunker.clear();
        self.priority.clear();
        self.queue.clear();
        self.pcm.clear();
        self.tail.clear();
        self.finished_input = false;
    }

    pub fn is_idle(&self) -> bool {
        self.priority.is_empty()
            && self.queue.is_empty()
            && self.pcm.is_empty()
            && self.tail.is_empty()
            && self.inflight != Some(self.epoch)
    }

    pub fn metrics(&self) -> &TtsMetrics {
        &self.metrics
    }

    /// Pull the next fixed-duration frame without waiting on the backend.
    /// None means no audio is ready yet (worker still synthesizing, queue
    /// empty, or input still open with nothing buffered).
    pub async fn next_frame(&mut self) -> Result<Option<AudioFrame>, PipelineError> {
        let frame_samples = self.config.frame_samples();

        self.collect_outcomes();
        self.dispatch_next();

        let pending = self.inflight == Some(self.epoch);
        let exhausted = self.priority.is_empty() && self.queue.is_empty() && !pending;
        if exhausted && self.finished_input && !self.tail.is_empty() {
            let tail = std::mem::take(&mut self.tail);
            self.pcm.extend(tail);
        }

        if self.pcm.len() >= frame_samples {
            return Ok(Some(self.pop_frame(frame_samples)));
        }
        if exhausted && self.finished_input && !self.pcm.is_empty() {
            // Pad the last partial frame to the fixed duration.
            let mut samples: Vec<f32> = self.pcm.drain(..).collect();
            samples.resize(frame_samples, 0.0);
            return Ok(Some(self.emit(samples)));
        }
        Ok(None)
    }

    fn collect_outcomes(&mut self) {
        while let Ok(outcome) = self.outcomes.try_recv() {
            self.inflight = None;
            if outcome.epoch != self.epoch {
                // Cancelled by clear() while the worker was synthesizing.
                continue;
            }
            match outcome.result {
                Ok(samples) => {
                    self.metrics.sentences_synthesized += 1;
                    self.append_sentence(samples);
                }
                Err(e) => {
                    self.metrics.synthesis_failures += 1;
                    tracing::warn!(target: "tts", error = %e, "sentence skipped after retry");
                }
            }
        }
    }

    fn dispatch_next(&mut self) {
        if self.inflight.is_some() {
            return;
        }
        let Some(item) = self.priority.pop_front().or_else(|| self.queue.pop_front()) else {
            return;
        };
        let job = SynthJob {
            text: item.text,
            options: item.options,
            epoch: self.epoch,
        };
        match self.jobs.try_send(job) {
            Ok(()) => self.inflight = Some(self.epoch),
            Err(e) => {
                let job = e.into_inner();
                tracing::warn!(target: "tts", "synthesis worker unavailable");
                let item = QueuedSentence {
                    text: job.text,
                    options: job.options,
                };
                if item.options.high_priority {
                    self.priority.push_front(item);
                } else {
                    self.queue.push_front(item);
                }
            }
        }
    }

    fn append_sentence(&mut self, samples: Vec<f32>) {
        let mut joined = linear_crossfade(&self.tail, &samples);
        let hold = self.config.crossfade_samples().min(joined.len());
        self.tail = joined.split_off(joined.len() - hold);
        self.pcm.extend(joined);
    }

    fn enqueue(&mut self, text: String, options: SynthesisOptions) {
        // New text reopens input; finalize() re-closes it per response.
        self.finished_input = false;
        if options.high_priority {
            self.metrics.priority_sentences += 1;
            self.priority.push_back(QueuedSentence { text, options });
            return;
        }
        if self.queue.len() >= self.config.max_queue {
            self.metrics.dropped_sentences += 1;
            tracing::warn!(
                target: "tts",
                queued = self.queue.len(),
                text = %text,
                "synthesis queue full, dropping sentence"
            );
            return;
        }
        self.queue.push_back(QueuedSentence { text, options });
    }

    fn pop_frame(&mut self, frame_samples: usize) -> AudioFrame {
        let samples: Vec<f32> = self.pcm.drain(..frame_samples).collect();
        self.emit(samples)
    }

    fn emit(&mut self, samples: Vec<f32>) -> AudioFrame {
        self.metrics.frames_emitted += 1;
        let frame = AudioFrame::new(samples, self.config.sample_rate_hz, 1, self.sequence);
        self.sequence += 1;
        frame
    }
}

impl Drop for StreamingSynthesizer {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// One sentence at a time: synthesize with a single retry, resample to the
/// output rate, report back tagged with the job's epoch.
fn spawn_worker(
    backend: Arc<dyn SynthesisBackend>,
    target_rate: u32,
    mut jobs: mpsc::Receiver<SynthJob>,
    outcomes: mpsc::Sender<SynthOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            let result = match backend.synthesize(&job.text, &job.options).await {
                Ok(samples) => Ok(samples),
                Err(first) => {
                    tracing::debug!(target: "tts", error = %first, "synthesis error, retrying once");
                    backend.synthesize(&job.text, &job.options).await
                }
            };
            let result = result.map(|samples| {
                let backend_rate = backend.sample_rate();
                if backend_rate != target_rate {
                    resampler::resample(&samples, backend_rate, target_rate)
                } else {
                    samples
                }
            });
            let outcome = SynthOutcome {
                result,
                epoch: job.epoch,
            };
            if outcomes.send(outcome).await.is_err() {
                return;
            }
        }
    })
}
