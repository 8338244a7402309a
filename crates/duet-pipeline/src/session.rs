use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use duet_audio::AudioFrame;
use duet_foundation::{PipelineError, Stage};
use duet_interrupt::{BargeInAction, BargeInDetector};
use duet_respond::{ResponseGenerator, ResponseModel, ResponseStream, TokenPoll};
use duet_stt::{DecoderBackend, StreamingRecognizer, TranscriptResult};
use duet_telemetry::{FpsTracker, PipelineMetrics, StageLatency};
use duet_tts::{StreamingSynthesizer, SynthesisBackend, SynthesisOptions};
use duet_turn::{HeuristicEvaluator, LanguageProfile, TurnDetector};
use duet_vad::{VadEngine, VadEvent, VadProcessor, VadState};

use crate::config::PipelineConfig;
use crate::dialogue::{ConversationTurn, DialogueHandle};
use crate::event::PipelineEvent;

/// Pluggable backends for one session. Model handles are stateless and
/// shared; everything stateful is built inside the session.
pub struct SessionHandles {
    pub vad_engine: Box<dyn VadEngine>,
    pub decoder: Arc<dyn DecoderBackend>,
    pub fast_model: Arc<dyn ResponseModel>,
    pub slow_model: Arc<dyn ResponseModel>,
    pub synthesis: Arc<dyn SynthesisBackend>,
    pub dialogue: Arc<dyn DialogueHandle>,
}

/// One duplex conversation session.
///
/// All per-session mutable state lives here and is owned by the single
/// task driving [`handle_frame`](Self::handle_frame); the interrupt watcher
/// and the forward flow are steps of the same owner, so barge-in
/// cancellation (abort generation, clear synthesis, unset the speaking
/// flag) is one atomic transition with no racing window.
pub struct Session {
    config: PipelineConfig,
    vad: VadProcessor,
    turn: TurnDetector,
    stt: StreamingRecognizer,
    generator: ResponseGenerator,
    synth: StreamingSynthesizer,
    barge: BargeInDetector,
    dialogue: Arc<dyn DialogueHandle>,
    events: mpsc::Sender<PipelineEvent>,
    metrics: PipelineMetrics,
    fps: FpsTracker,

    clock_ms: u64,
    expected_sequence: Option<u64>,
    in_speech: bool,
    awaiting_turn_end: bool,
    silence_ms: u64,
    speech_end_clock_ms: u64,
    finals_this_turn: Vec<String>,
    last_partial: String,
    history: Vec<String>,
    active_response: Option<ResponseStream>,
    agent_speaking: bool,
    first_agent_frame_pending: bool,
}

impl Session {
    /// Fatal construction errors (bad config, pattern compile failure)
    /// surface here once; they are never handled per-frame.
    pub fn new(
        config: PipelineConfig,
        handles: SessionHandles,
        events: mpsc::Sender<PipelineEvent>,
    ) -> Result<Self, PipelineError> {
        let vad = VadProcessor::new(config.vad.clone(), handles.vad_engine);
        let turn = TurnDetector::new(
            config.turn.clone(),
            LanguageProfile::english(),
            Arc::new(HeuristicEvaluator::new(LanguageProfile::english())),
        );
        let stt = StreamingRecognizer::new(config.stt.clone(), handles.decoder)?;
        let generator = ResponseGenerator::new(
            config.respond.clone(),
            handles.fast_model,
            handles.slow_model,
        );
        let synth = StreamingSynthesizer::new(config.tts.clone(), handles.synthesis);
        let barge = BargeInDetector::new(config.barge_in.clone());

        Ok(Self {
            vad,
            turn,
            stt,
            generator,
            synth,
            barge,
            dialogue: handles.dialogue,
            events,
            metrics: PipelineMetrics::default(),
            fps: FpsTracker::default(),
            clock_ms: 0,
            expected_sequence: None,
            in_speech: false,
            awaiting_turn_end: false,
            silence_ms: 0,
            speech_end_clock_ms: 0,
            finals_this_turn: Vec::new(),
            last_partial: String::new(),
            history: Vec::new(),
            active_response: None,
            agent_speaking: false,
            first_agent_frame_pending: false,
            config,
        })
    }

    pub fn metrics(&self) -> PipelineMetrics {
        self.metrics.clone()
    }

    pub fn is_agent_speaking(&self) -> bool {
        self.agent_speaking
    }

    /// Drive the session from a frame channel. Output pacing continues on
    /// a timer even when input frames pause, so playback never stalls on
    /// the transport.
    pub async fn run(mut self, mut frames: mpsc::Receiver<AudioFrame>) {
        let mut pacer = tokio::time::interval(Duration::from_millis(20));
        loop {
            tokio::select! {
                maybe = frames.recv() => match maybe {
                    Some(frame) => {
                        if let Err(e) = self.handle_frame(frame).await {
                            tracing::error!(target: "pipeline", error = %e, "frame handling failed");
                            break;
                        }
                    }
                    None => break,
                },
                _ = pacer.tick() => {
                    if self.active_response.is_some() || self.agent_speaking {
                        if let Err(e) = self.drive_output().await {
                            tracing::error!(target: "pipeline", error = %e, "output drive failed");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Process one input frame end to end: VAD, interrupt watch,
    /// recognition, turn detection, and one pacing step of response and
    /// synthesis output.
    pub async fn handle_frame(&mut self, frame: AudioFrame) -> Result<(), PipelineError> {
        self.metrics.record_frame_in();
        let fps = self.fps.tick();
        self.metrics.update_input_fps(fps);
        self.clock_ms += frame.duration_ms();

        if let Some(expected) = self.expected_sequence {
            if frame.sequence != expected {
                tracing::warn!(
                    target: "pipeline",
                    expected,
                    got = frame.sequence,
                    "input sequence gap"
                );
            }
        }
        self.expected_sequence = Some(frame.sequence + 1);

        let update = match self.vad.process_frame(&frame) {
            Ok(update) => update,
            Err(e) => {
                self.metrics.vad_errors.fetch_add(1, Ordering::Relaxed);
                self.emit(PipelineEvent::Error {
                    stage: Stage::Vad,
                    message: e.to_string(),
                })
                .await;
                return Ok(());
            }
        };
        if update.degraded_now {
            self.metrics.record_degradation();
            self.emit(PipelineEvent::Error {
                stage: Stage::Vad,
                message: "vad degraded to energy heuristic".into(),
            })
            .await;
        }

        let annotated = frame.annotated(
            update.probability,
            matches!(update.state, VadState::Speech | VadState::SpeechStart),
        );

        if let Some(event) = self.barge.observe_frame(&annotated) {
            self.metrics.record_barge_in();
            let action = event.action.clone();
            self.emit(PipelineEvent::BargeIn(event)).await;
            match action {
                BargeInAction::StopAndListen => self.interrupt_agent(None),
                BargeInAction::StopAndAcknowledge { phrase } => self.interrupt_agent(Some(phrase)),
                BargeInAction::DuckAndContinue { .. } | BargeInAction::Ignore => {}
            }
        }

        match update.event.clone() {
            Some(VadEvent::SpeechStart { timestamp_ms, .. }) => {
                self.in_speech = true;
                self.silence_ms = 0;
                self.metrics.set_speaking(true);
                self.emit(PipelineEvent::SpeechStart { timestamp_ms }).await;
            }
            Some(VadEvent::SpeechEnd {
                timestamp_ms,
                duration_ms,
                ..
            }) => {
                self.in_speech = false;
                self.awaiting_turn_end = true;
                self.speech_end_clock_ms = self.clock_ms;
                self.metrics.set_speaking(false);
                self.emit(PipelineEvent::SpeechEnd {
                    timestamp_ms,
                    duration_ms,
                })
                .await;
            }
            None => {}
        }

        // Feed the recognizer through onset and tail frames as well; the
        // state machine's provisional edges still carry speech audio.
        if update.state != VadState::Silence {
            match self.stt.push_audio(&annotated) {
                Ok(results) => {
                    for result in results {
                        self.record_transcript(&result);
                        self.emit(PipelineEvent::Transcript(result)).await;
                    }
                }
                Err(e) => {
                    self.metrics.stt_errors.fetch_add(1, Ordering::Relaxed);
                    self.emit(PipelineEvent::Error {
                        stage: Stage::Stt,
                        message: e.to_string(),
                    })
                    .await;
                }
            }
        }

        if !self.in_speech {
            self.silence_ms += frame.duration_ms();
        }

        if self.awaiting_turn_end
            && !self.in_speech
            && self.active_response.is_none()
            && !self.agent_speaking
        {
            let text = self.turn_text();
            if !text.is_empty() {
                let assessment = self.turn.assess(
                    &text,
                    &self.history,
                    Duration::from_millis(self.silence_ms),
                );
                if assessment.is_turn_end() {
                    self.metrics
                        .record_latency(StageLatency::Turn, self.silence_ms);
                    self.start_response(assessment.confidence).await?;
                }
            }
        }

        self.drive_output().await
    }

    /// All three cancellation targets flip together while this owner holds
    /// the state: generation aborted, synthesis queue cleared, speaking
    /// flag unset.
    fn interrupt_agent(&mut self, acknowledgement: Option<String>) {
        if let Some(mut stream) = self.active_response.take() {
            stream.cancel();
        }
        self.synth.clear();
        self.agent_speaking = false;
        self.metrics.agent_speaking.store(false, Ordering::Relaxed);
        self.barge.agent_stopped_speaking();
        tracing::info!(target: "pipeline", "agent interrupted, listening");

        if let Some(phrase) = acknowledgement {
            self.synth.say(phrase, SynthesisOptions::priority());
        }
    }

    fn record_transcript(&mut self, result: &TranscriptResult) {
        if result.is_final {
            self.finals_this_turn.push(result.text.clone());
            self.last_partial.clear();
        } else {
            self.last_partial = result.text.clone();
        }
    }

    fn turn_text(&self) -> String {
        let mut parts = self.finals_this_turn.clone();
        if !self.last_partial.is_empty() {
            parts.push(self.last_partial.clone());
        }
        parts.join(" ")
    }

    async fn start_response(&mut self, confidence: f32) -> Result<(), PipelineError> {
        let final_result = match self.stt.finalize() {
            Ok(result) => result,
            Err(e) => {
                self.emit(PipelineEvent::Error {
                    stage: Stage::Stt,
                    message: e.to_string(),
                })
                .await;
                None
            }
        };
        let transcript = if let Some(result) = final_result {
            self.record_transcript(&result);
            self.emit(PipelineEvent::Transcript(result.clone())).await;
            Some(result)
        } else {
            None
        };
        self.dispatch_turn(confidence, transcript).await
    }

    async fn dispatch_turn(
        &mut self,
        confidence: f32,
        transcript: Option<TranscriptResult>,
    ) -> Result<(), PipelineError> {
        let text = self.turn_text();
        self.finals_this_turn.clear();
        self.last_partial.clear();
        self.awaiting_turn_end = false;
        self.turn.reset();
        self.metrics.record_turn_completed();

        let turn = ConversationTurn {
            text: text.clone(),
            confidence,
            transcript,
            history: self.history.clone(),
        };
        self.history.push(text);

        match self.dialogue.respond(&turn).await {
            Ok(request) => {
                self.active_response = Some(self.generator.generate(request));
                self.first_agent_frame_pending = true;
            }
            Err(e) => {
                self.emit(PipelineEvent::Error {
                    stage: Stage::Respond,
                    message: e.to_string(),
                })
                .await;
            }
        }
        Ok(())
    }

    /// One pacing step: move available tokens into the synthesizer and
    /// release a bounded number of agent audio frames.
    async fn drive_output(&mut self) -> Result<(), PipelineError> {
        let mut response_finished = false;
        let mut generation_error = None;
        let mut tokens = Vec::new();
        if let Some(stream) = self.active_response.as_mut() {
            loop {
                match stream.try_next() {
                    TokenPoll::Ready(chunk) => tokens.push(chunk.text),
                    TokenPoll::Pending => break,
                    TokenPoll::Finished => {
                        response_finished = true;
                        generation_error = stream.take_error();
                        break;
                    }
                }
            }
        }
        for token in &tokens {
            self.synth.push_text(token);
        }
        if response_finished {
            self.active_response = None;
            self.synth.finalize();
        }
        if let Some(e) = generation_error {
            // The driver already retried once; this turn's response is lost
            // and the caller decides what to say instead.
            self.emit(PipelineEvent::Error {
                stage: Stage::Respond,
                message: e.to_string(),
            })
            .await;
        }

        for _ in 0..self.config.output_frames_per_step {
            match self.synth.next_frame().await {
                Ok(Some(frame)) => {
                    if !self.agent_speaking {
                        self.agent_speaking = true;
                        self.metrics.agent_speaking.store(true, Ordering::Relaxed);
                        self.barge.agent_started_speaking();
                    }
                    if self.first_agent_frame_pending {
                        self.first_agent_frame_pending = false;
                        self.metrics.record_latency(
                            StageLatency::EndToEnd,
                            self.clock_ms.saturating_sub(self.speech_end_clock_ms),
                        );
                    }
                    self.metrics.record_frame_out();
                    self.emit(PipelineEvent::AgentAudio(frame)).await;
                }
                Ok(None) => {
                    if self.agent_speaking
                        && self.active_response.is_none()
                        && self.synth.is_idle()
                    {
                        self.agent_speaking = false;
                        self.metrics.agent_speaking.store(false, Ordering::Relaxed);
                        self.barge.agent_stopped_speaking();
                        self.emit(PipelineEvent::AgentSpeechEnd).await;
                    }
                    break;
                }
                Err(e) => {
                    self.metrics.synth_errors.fetch_add(1, Ordering::Relaxed);
                    self.emit(PipelineEvent::Error {
                        stage: Stage::Synth,
                        message: e.to_string(),
                    })
                    .await;
                    break;
                }
            }
        }
        Ok(())
    }

    async fn emit(&self, event: PipelineEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!(target: "pipeline", "event receiver dropped");
        }
    }
}
