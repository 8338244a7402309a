//! End-to-end session scenarios with scripted backends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use duet_audio::AudioFrame;
use duet_foundation::{InferenceError, PipelineError, Stage};
use duet_pipeline::{
    ConversationTurn, DialogueHandle, PipelineConfig, PipelineEvent, Session, SessionHandles,
};
use duet_respond::{GenerationRequest, ResponseModel, StrategyKind};
use duet_stt::{DecodedToken, DecoderBackend, Hypothesis};
use duet_tts::{SynthesisBackend, SynthesisOptions};
use duet_vad::VadEngine;

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Loud frames score as speech, quiet ones as silence.
struct LevelVad;

impl VadEngine for LevelVad {
    fn predict(&mut self, samples: &[f32]) -> Result<f32, InferenceError> {
        Ok(if rms(samples) > 0.01 { 0.95 } else { 0.05 })
    }

    fn reset(&mut self) {}

    fn required_sample_rate(&self) -> u32 {
        16_000
    }

    fn required_frame_size(&self) -> usize {
        512
    }
}

/// Decodes any utterance containing speech energy to a fixed phrase.
struct PhraseDecoder {
    phrase: &'static str,
}

impl DecoderBackend for PhraseDecoder {
    fn decode(&self, audio: &[f32], _sample_rate: u32) -> Result<Vec<Hypothesis>, InferenceError> {
        if rms(audio) < 0.01 {
            return Ok(vec![]);
        }
        let tokens = self
            .phrase
            .split_whitespace()
            .map(|w| DecodedToken::word(w, -0.5))
            .collect();
        Ok(vec![Hypothesis::new(tokens)])
    }
}

/// Streams a fixed response with a small per-token delay.
struct FixedResponse {
    text: &'static str,
    first_delay_ms: u64,
}

#[async_trait]
impl ResponseModel for FixedResponse {
    async fn generate(
        &self,
        request: &GenerationRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<(), InferenceError> {
        tokio::time::sleep(Duration::from_millis(self.first_delay_ms)).await;
        for token in self.text.split_whitespace().skip(request.prefix.len()) {
            if tx.send(token.to_string()).await.is_err() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok(())
    }

    async fn draft(
        &self,
        request: &GenerationRequest,
        span: usize,
    ) -> Result<Vec<String>, InferenceError> {
        Ok(self
            .text
            .split_whitespace()
            .skip(request.prefix.len())
            .take(span)
            .map(|s| s.to_string())
            .collect())
    }

    async fn verify(
        &self,
        request: &GenerationRequest,
        draft: &[String],
    ) -> Result<usize, InferenceError> {
        Ok(self
            .text
            .split_whitespace()
            .skip(request.prefix.len())
            .zip(draft)
            .take_while(|(own, proposed)| *own == proposed.as_str())
            .count())
    }
}

/// Constant-tone synthesis, `duration_ms` of audio per sentence.
struct ToneSynth {
    duration_ms: usize,
}

#[async_trait]
impl SynthesisBackend for ToneSynth {
    fn sample_rate(&self) -> u32 {
        16_000
    }

    async fn synthesize(
        &self,
        _text: &str,
        _options: &SynthesisOptions,
    ) -> Result<Vec<f32>, InferenceError> {
        Ok(vec![0.5; 16 * self.duration_ms])
    }
}

/// Tone synthesis that takes 500ms of wall time per sentence.
struct SlowSynth;

#[async_trait]
impl SynthesisBackend for SlowSynth {
    fn sample_rate(&self) -> u32 {
        16_000
    }

    async fn synthesize(
        &self,
        _text: &str,
        _options: &SynthesisOptions,
    ) -> Result<Vec<f32>, InferenceError> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(vec![0.5; 4_800])
    }
}

/// Always fails, standing in for an unreachable model service.
struct OfflineModel;

#[async_trait]
impl ResponseModel for OfflineModel {
    async fn generate(
        &self,
        _request: &GenerationRequest,
        _tx: mpsc::Sender<String>,
    ) -> Result<(), InferenceError> {
        Err(InferenceError::Generation("model offline".into()))
    }

    async fn draft(
        &self,
        _request: &GenerationRequest,
        _span: usize,
    ) -> Result<Vec<String>, InferenceError> {
        Err(InferenceError::Generation("model offline".into()))
    }

    async fn verify(
        &self,
        _request: &GenerationRequest,
        _draft: &[String],
    ) -> Result<usize, InferenceError> {
        Err(InferenceError::Generation("model offline".into()))
    }
}

struct EchoDialogue;

#[async_trait]
impl DialogueHandle for EchoDialogue {
    async fn respond(&self, turn: &ConversationTurn) -> Result<GenerationRequest, PipelineError> {
        Ok(GenerationRequest::new(turn.text.clone(), turn.history.clone()))
    }
}

fn handles(response_text: &'static str, sentence_ms: usize) -> SessionHandles {
    SessionHandles {
        vad_engine: Box::new(LevelVad),
        decoder: Arc::new(PhraseDecoder {
            phrase: "five lakh loan",
        }),
        fast_model: Arc::new(FixedResponse {
            text: response_text,
            first_delay_ms: 20,
        }),
        slow_model: Arc::new(FixedResponse {
            text: response_text,
            first_delay_ms: 50,
        }),
        synthesis: Arc::new(ToneSynth {
            duration_ms: sentence_ms,
        }),
        dialogue: Arc::new(EchoDialogue),
    }
}

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.respond.strategy = StrategyKind::Sequential;
    config.stt.stability_window = 3;
    config
}

// 32ms frames at 16kHz.
fn speech_frame(sequence: u64) -> AudioFrame {
    AudioFrame::new(vec![0.1; 512], 16_000, 1, sequence)
}

fn silence_frame(sequence: u64) -> AudioFrame {
    AudioFrame::new(vec![0.0005; 512], 16_000, 1, sequence)
}

fn drain(rx: &mut mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn step(session: &mut Session, frame: AudioFrame) {
    session.handle_frame(frame).await.unwrap();
    // Let generation driver tasks make progress under paused time.
    tokio::time::sleep(Duration::from_millis(32)).await;
}

#[tokio::test(start_paused = true)]
async fn full_turn_produces_agent_audio_within_budget() {
    let (etx, mut erx) = mpsc::channel(512);
    let mut session = Session::new(
        config(),
        handles("you can apply at any branch today.", 300),
        etx,
    )
    .unwrap();

    let mut seq = 0;
    for _ in 0..12 {
        step(&mut session, speech_frame(seq)).await;
        seq += 1;
    }
    for _ in 0..45 {
        step(&mut session, silence_frame(seq)).await;
        seq += 1;
    }

    let events = drain(&mut erx);

    let speech_start = events
        .iter()
        .position(|e| matches!(e, PipelineEvent::SpeechStart { .. }))
        .expect("speech start");
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::Transcript(t) if !t.is_final)));

    let speech_end = events
        .iter()
        .position(|e| matches!(e, PipelineEvent::SpeechEnd { .. }))
        .expect("speech end");
    assert!(speech_start < speech_end);

    let (final_index, final_text) = events
        .iter()
        .enumerate()
        .find_map(|(i, e)| match e {
            PipelineEvent::Transcript(t) if t.is_final => Some((i, t.text.clone())),
            _ => None,
        })
        .expect("final transcript");
    assert_eq!(final_text, "five lakh loan");
    assert!(speech_end < final_index);

    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::AgentAudio(_))));
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::AgentSpeechEnd)));

    // Nobody interrupted: no barge-in may fire.
    assert!(!events
        .iter()
        .any(|e| matches!(e, PipelineEvent::BargeIn(_))));

    let metrics = session.metrics();
    let e2e = metrics
        .end_to_end_ms
        .load(std::sync::atomic::Ordering::Relaxed);
    assert!(e2e > 0 && e2e <= 800, "end to end {}ms", e2e);
}

#[tokio::test(start_paused = true)]
async fn barge_in_stops_agent_audio_immediately() {
    let (etx, mut erx) = mpsc::channel(1024);
    let long_response = "let me walk you through every clause of the agreement. \
        the first section covers eligibility in detail. the second section \
        covers repayment schedules and penalties.";
    let mut session = Session::new(config(), handles(long_response, 1_000), etx).unwrap();

    let mut seq = 0;
    for _ in 0..12 {
        step(&mut session, speech_frame(seq)).await;
        seq += 1;
    }
    // Silence until the agent starts speaking.
    let mut guard = 0;
    while !session.is_agent_speaking() {
        step(&mut session, silence_frame(seq)).await;
        seq += 1;
        guard += 1;
        assert!(guard < 100, "agent never started speaking");
    }

    // Talk over the agent: grace period plus sustained minimum duration.
    let mut fired = false;
    for _ in 0..30 {
        step(&mut session, speech_frame(seq)).await;
        seq += 1;
        if !session.is_agent_speaking() {
            fired = true;
            break;
        }
    }
    assert!(fired, "barge-in never fired");

    let events = drain(&mut erx);
    let barge_index = events
        .iter()
        .position(|e| matches!(e, PipelineEvent::BargeIn(_)))
        .expect("barge-in event");
    assert!(
        !events[barge_index + 1..]
            .iter()
            .any(|e| matches!(e, PipelineEvent::AgentAudio(_))),
        "agent audio leaked after barge-in"
    );
    assert!(!session.is_agent_speaking());
    assert_eq!(
        session
            .metrics()
            .barge_ins
            .load(std::sync::atomic::Ordering::Relaxed),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn slow_synthesis_never_stalls_input_handling() {
    let (etx, mut erx) = mpsc::channel(1024);
    let response = "you can apply at any branch today.";
    let handles = SessionHandles {
        vad_engine: Box::new(LevelVad),
        decoder: Arc::new(PhraseDecoder {
            phrase: "five lakh loan",
        }),
        fast_model: Arc::new(FixedResponse {
            text: response,
            first_delay_ms: 20,
        }),
        slow_model: Arc::new(FixedResponse {
            text: response,
            first_delay_ms: 50,
        }),
        synthesis: Arc::new(SlowSynth),
        dialogue: Arc::new(EchoDialogue),
    };
    let mut session = Session::new(config(), handles, etx).unwrap();

    // Every frame must be handled without waiting, even while the backend
    // spends 500ms per sentence.
    let mut seq = 0;
    for _ in 0..12 {
        let before = tokio::time::Instant::now();
        session.handle_frame(speech_frame(seq)).await.unwrap();
        assert_eq!(before.elapsed(), Duration::ZERO, "input frame stalled");
        tokio::time::sleep(Duration::from_millis(32)).await;
        seq += 1;
    }
    for _ in 0..80 {
        let before = tokio::time::Instant::now();
        session.handle_frame(silence_frame(seq)).await.unwrap();
        assert_eq!(before.elapsed(), Duration::ZERO, "input frame stalled");
        tokio::time::sleep(Duration::from_millis(32)).await;
        seq += 1;
    }

    let events = drain(&mut erx);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PipelineEvent::AgentAudio(_))),
        "no agent audio despite slow synthesis"
    );
}

#[tokio::test(start_paused = true)]
async fn generation_failure_raises_an_error_event() {
    let (etx, mut erx) = mpsc::channel(256);
    let handles = SessionHandles {
        vad_engine: Box::new(LevelVad),
        decoder: Arc::new(PhraseDecoder {
            phrase: "five lakh loan",
        }),
        fast_model: Arc::new(OfflineModel),
        slow_model: Arc::new(OfflineModel),
        synthesis: Arc::new(ToneSynth { duration_ms: 100 }),
        dialogue: Arc::new(EchoDialogue),
    };
    let mut session = Session::new(config(), handles, etx).unwrap();

    let mut seq = 0;
    for _ in 0..12 {
        step(&mut session, speech_frame(seq)).await;
        seq += 1;
    }
    for _ in 0..40 {
        step(&mut session, silence_frame(seq)).await;
        seq += 1;
    }

    let events = drain(&mut erx);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Error { stage: Stage::Respond, .. })),
        "generation failure never surfaced"
    );
    assert!(!events
        .iter()
        .any(|e| matches!(e, PipelineEvent::AgentAudio(_))));
    assert!(!session.is_agent_speaking());
}

#[tokio::test(start_paused = true)]
async fn silence_only_input_stays_quiet() {
    let (etx, mut erx) = mpsc::channel(64);
    let mut session = Session::new(config(), handles("unused.", 100), etx).unwrap();

    for seq in 0..30 {
        step(&mut session, silence_frame(seq)).await;
    }

    let events = drain(&mut erx);
    assert!(events.is_empty(), "unexpected events: {:?}", events.len());
    assert!(!session.is_agent_speaking());
}
