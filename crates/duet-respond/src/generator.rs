use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

use duet_foundation::InferenceError;

use crate::complexity::ComplexityEstimator;
use crate::config::{ResponseConfig, StrategyKind};
use crate::model::{GenerationRequest, ModelTier, ResponseModel, TokenChunk};
use crate::stats::StrategyStats;
use crate::stream::{AbortOnDrop, FailureSlot, ResponseStream};

/// Runs one of the four response strategies over a fast and a slow model
/// handle. The generator itself is cheap to clone per session; model
/// handles are shared.
pub struct ResponseGenerator {
    config: ResponseConfig,
    fast: Arc<dyn ResponseModel>,
    slow: Arc<dyn ResponseModel>,
    estimator: ComplexityEstimator,
    stats: Arc<StrategyStats>,
}

impl ResponseGenerator {
    pub fn new(
        config: ResponseConfig,
        fast: Arc<dyn ResponseModel>,
        slow: Arc<dyn ResponseModel>,
    ) -> Self {
        Self {
            config,
            fast,
            slow,
            estimator: ComplexityEstimator::default(),
            stats: Arc::new(StrategyStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<StrategyStats> {
        Arc::clone(&self.stats)
    }

    /// Start generating. The returned stream yields tokens until the
    /// response completes; dropping or cancelling it aborts all model work.
    /// A generation failure is retried once before the first token; if the
    /// model still fails, the stream ends and carries the error for
    /// [`ResponseStream::take_error`].
    pub fn generate(&self, request: GenerationRequest) -> ResponseStream {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let config = self.config.clone();
        let fast = Arc::clone(&self.fast);
        let slow = Arc::clone(&self.slow);
        let estimator = self.estimator.clone();
        let stats = Arc::clone(&self.stats);
        let failure: FailureSlot = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&failure);

        let driver = tokio::spawn(async move {
            match config.strategy {
                StrategyKind::Sequential => {
                    drive_sequential(slow, request, tx, stats, config, slot).await;
                }
                StrategyKind::RaceParallel => {
                    drive_race(fast, slow, request, tx, stats, config, slot).await;
                }
                StrategyKind::SmallFirstEscalate => {
                    drive_escalate(fast, slow, request, tx, stats, estimator, config, slot).await;
                }
                StrategyKind::DraftVerify => {
                    drive_draft_verify(fast, slow, request, tx, stats, estimator, config, slot)
                        .await;
                }
            }
        });

        ResponseStream::new(rx, driver, failure)
    }
}

/// Spawn `model.generate` into its own channel. Tokens arrive as `Ok`
/// items; a model error arrives in-band as the final item, after any
/// tokens it produced first. The guard aborts the task when dropped, so
/// losers and cancelled paths never run on.
fn pump(
    model: &Arc<dyn ResponseModel>,
    request: &GenerationRequest,
    capacity: usize,
) -> (
    mpsc::Receiver<Result<String, InferenceError>>,
    AbortOnDrop<()>,
) {
    let (out_tx, out_rx) = mpsc::channel(capacity);
    let model = Arc::clone(model);
    let request = request.clone();
    let handle = tokio::spawn(async move {
        let (tx, mut rx) = mpsc::channel(capacity);
        let mut gen = {
            let model = Arc::clone(&model);
            let request = request.clone();
            AbortOnDrop(tokio::spawn(
                async move { model.generate(&request, tx).await },
            ))
        };
        while let Some(text) = rx.recv().await {
            if out_tx.send(Ok(text)).await.is_err() {
                return;
            }
        }
        // The channel only closes once generate returned, so the join is
        // immediate and orders the error after every token.
        if let Ok(Err(e)) = (&mut gen.0).await {
            tracing::warn!(target: "respond", model = model.name(), error = %e, "generation failed");
            let _ = out_tx.send(Err(e)).await;
        }
    });
    (out_rx, AbortOnDrop(handle))
}

async fn send(
    tx: &mpsc::Sender<TokenChunk>,
    text: String,
    tier: ModelTier,
    index: &mut u32,
) -> bool {
    let chunk = TokenChunk {
        text,
        tier,
        index: *index,
    };
    *index += 1;
    tx.send(chunk).await.is_ok()
}

/// Forward everything left in `rx`, tagged with `tier`. Returns the
/// model's terminal error when it ended with one.
async fn relay(
    rx: &mut mpsc::Receiver<Result<String, InferenceError>>,
    tier: ModelTier,
    index: &mut u32,
    tx: &mpsc::Sender<TokenChunk>,
) -> Option<InferenceError> {
    while let Some(item) = rx.recv().await {
        match item {
            Ok(text) => {
                if !send(tx, text, tier, index).await {
                    return None;
                }
            }
            Err(e) => return Some(e),
        }
    }
    None
}

async fn drive_sequential(
    slow: Arc<dyn ResponseModel>,
    request: GenerationRequest,
    tx: mpsc::Sender<TokenChunk>,
    stats: Arc<StrategyStats>,
    config: ResponseConfig,
    failure: FailureSlot,
) {
    let started = Instant::now();
    let mut index = 0u32;
    for attempt in 0..2 {
        let (mut rx, _guard) = pump(&slow, &request, config.channel_capacity);
        match rx.recv().await {
            Some(Ok(text)) => {
                stats.record_ttft(started.elapsed().as_secs_f64() * 1_000.0);
                if !send(&tx, text, ModelTier::Slow, &mut index).await {
                    return;
                }
                // A failure after partial output is surfaced rather than
                // retried; replaying emitted tokens would duplicate speech.
                if let Some(e) = relay(&mut rx, ModelTier::Slow, &mut index, &tx).await {
                    *failure.lock() = Some(e);
                }
                return;
            }
            Some(Err(e)) if attempt == 0 => {
                tracing::warn!(target: "respond", error = %e, "no tokens produced, retrying once");
            }
            Some(Err(e)) => {
                *failure.lock() = Some(e);
                return;
            }
            None => return,
        }
    }
}

async fn drive_race(
    fast: Arc<dyn ResponseModel>,
    slow: Arc<dyn ResponseModel>,
    request: GenerationRequest,
    tx: mpsc::Sender<TokenChunk>,
    stats: Arc<StrategyStats>,
    config: ResponseConfig,
    failure: FailureSlot,
) {
    let started = Instant::now();
    let (mut fast_rx, fast_guard) = pump(&fast, &request, config.channel_capacity);
    let (mut slow_rx, slow_guard) = pump(&slow, &request, config.channel_capacity);
    let mut index = 0u32;

    tokio::select! {
        first = fast_rx.recv() => match first {
            Some(Ok(text)) => {
                drop(slow_guard);
                stats.record_win(true);
                stats.record_ttft(started.elapsed().as_secs_f64() * 1_000.0);
                if send(&tx, text, ModelTier::Fast, &mut index).await {
                    if let Some(e) = relay(&mut fast_rx, ModelTier::Fast, &mut index, &tx).await {
                        *failure.lock() = Some(e);
                    }
                }
            }
            other => {
                // Fast path died without output, fall through to slow.
                let fast_error = match other {
                    Some(Err(e)) => Some(e),
                    _ => None,
                };
                drop(fast_guard);
                match slow_rx.recv().await {
                    Some(Ok(text)) => {
                        stats.record_win(false);
                        stats.record_ttft(started.elapsed().as_secs_f64() * 1_000.0);
                        if send(&tx, text, ModelTier::Slow, &mut index).await {
                            if let Some(e) =
                                relay(&mut slow_rx, ModelTier::Slow, &mut index, &tx).await
                            {
                                *failure.lock() = Some(e);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        *failure.lock() = Some(e);
                    }
                    None => {
                        if let Some(e) = fast_error {
                            *failure.lock() = Some(e);
                        }
                    }
                }
            }
        },
        first = slow_rx.recv() => match first {
            Some(Ok(text)) => {
                drop(fast_guard);
                stats.record_win(false);
                stats.record_ttft(started.elapsed().as_secs_f64() * 1_000.0);
                if send(&tx, text, ModelTier::Slow, &mut index).await {
                    if let Some(e) = relay(&mut slow_rx, ModelTier::Slow, &mut index, &tx).await {
                        *failure.lock() = Some(e);
                    }
                }
            }
            other => {
                let slow_error = match other {
                    Some(Err(e)) => Some(e),
                    _ => None,
                };
                drop(slow_guard);
                match fast_rx.recv().await {
                    Some(Ok(text)) => {
                        stats.record_win(true);
                        stats.record_ttft(started.elapsed().as_secs_f64() * 1_000.0);
                        if send(&tx, text, ModelTier::Fast, &mut index).await {
                            if let Some(e) =
                                relay(&mut fast_rx, ModelTier::Fast, &mut index, &tx).await
                            {
                                *failure.lock() = Some(e);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        *failure.lock() = Some(e);
                    }
                    None => {
                        if let Some(e) = slow_error {
                            *failure.lock() = Some(e);
                        }
                    }
                }
            }
        },
    }
}

#[allow(clippy::too_many_arguments)]
async fn drive_escalate(
    fast: Arc<dyn ResponseModel>,
    slow: Arc<dyn ResponseModel>,
    request: GenerationRequest,
    tx: mpsc::Sender<TokenChunk>,
    stats: Arc<StrategyStats>,
    estimator: ComplexityEstimator,
    config: ResponseConfig,
    failure: FailureSlot,
) {
    let started = Instant::now();
    let mut index = 0u32;
    let mut emitted: Vec<String> = Vec::new();

    // Queries already scoring complex skip the fast path entirely.
    if estimator.score(&request.transcript) >= config.complexity_threshold {
        stats.record_escalation();
        takeover(
            &slow,
            &request,
            Vec::new(),
            &tx,
            &stats,
            &config,
            started,
            &mut index,
            &failure,
        )
        .await;
        return;
    }

    let adaptive = config.adaptive_timeout(request.transcript.chars().count());
    let (mut fast_rx, fast_guard) = pump(&fast, &request, config.channel_capacity);

    loop {
        // The same deadline applies to the first token and to mid-stream
        // stalls: a fast model that stops producing gets replaced.
        match timeout(adaptive, fast_rx.recv()).await {
            Ok(Some(Ok(text))) => {
                if emitted.is_empty() {
                    stats.record_ttft(started.elapsed().as_secs_f64() * 1_000.0);
                }
                emitted.push(text.clone());
                if !send(&tx, text, ModelTier::Fast, &mut index).await {
                    return;
                }
                let running = format!("{} {}", request.transcript, emitted.join(" "));
                if estimator.score(&running) >= config.complexity_threshold {
                    break;
                }
            }
            Ok(Some(Err(e))) => {
                tracing::warn!(target: "respond", error = %e, "fast path failed, escalating");
                break;
            }
            Ok(None) => {
                if emitted.is_empty() {
                    // No output at all, treat like a timeout.
                    break;
                }
                stats.record_win(true);
                return;
            }
            Err(_) => break,
        }
    }

    drop(fast_guard);
    stats.record_escalation();
    takeover(
        &slow,
        &request,
        emitted,
        &tx,
        &stats,
        &config,
        started,
        &mut index,
        &failure,
    )
    .await;
}

/// Slow model continues after the already-emitted prefix. Like the
/// sequential path, an empty-handed failure is retried once and a repeat
/// lands in the failure slot.
#[allow(clippy::too_many_arguments)]
async fn takeover(
    slow: &Arc<dyn ResponseModel>,
    request: &GenerationRequest,
    prefix: Vec<String>,
    tx: &mpsc::Sender<TokenChunk>,
    stats: &StrategyStats,
    config: &ResponseConfig,
    started: Instant,
    index: &mut u32,
    failure: &FailureSlot,
) {
    let record_ttft = prefix.is_empty();
    let continuation = request.with_prefix(prefix);
    for attempt in 0..2 {
        let (mut rx, _guard) = pump(slow, &continuation, config.channel_capacity);
        match rx.recv().await {
            Some(Ok(text)) => {
                if record_ttft {
                    stats.record_ttft(started.elapsed().as_secs_f64() * 1_000.0);
                }
                stats.record_win(false);
                if send(tx, text, ModelTier::Slow, index).await {
                    if let Some(e) = relay(&mut rx, ModelTier::Slow, index, tx).await {
                        *failure.lock() = Some(e);
                    }
                }
                return;
            }
            Some(Err(e)) if attempt == 0 => {
                tracing::warn!(target: "respond", error = %e, "no tokens produced, retrying once");
            }
            Some(Err(e)) => {
                *failure.lock() = Some(e);
                return;
            }
            None => return,
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn drive_draft_verify(
    fast: Arc<dyn ResponseModel>,
    slow: Arc<dyn ResponseModel>,
    request: GenerationRequest,
    tx: mpsc::Sender<TokenChunk>,
    stats: Arc<StrategyStats>,
    estimator: ComplexityEstimator,
    config: ResponseConfig,
    failure: FailureSlot,
) {
    let started = Instant::now();
    let mut index = 0u32;
    let mut prefix: Vec<String> = Vec::new();
    let mut ttft_recorded = false;
    let record = |stats: &StrategyStats, recorded: &mut bool| {
        if !*recorded {
            stats.record_ttft(started.elapsed().as_secs_f64() * 1_000.0);
            *recorded = true;
        }
    };

    while prefix.len() < config.max_response_tokens {
        let at = request.with_prefix(prefix.clone());
        let draft = match fast.draft(&at, config.draft_span).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(target: "respond", error = %e, "draft failed, slow model takes over");
                takeover(
                    &slow, &request, prefix, &tx, &stats, &config, started, &mut index, &failure,
                )
                .await;
                return;
            }
        };

        if draft.is_empty() {
            // Drafter believes the response is complete; confirm with one
            // slow token before stopping.
            match slow.draft(&at, 1).await {
                Ok(fix) if !fix.is_empty() => {
                    record(&stats, &mut ttft_recorded);
                    let token = fix[0].clone();
                    prefix.push(token.clone());
                    if !send(&tx, token, ModelTier::Slow, &mut index).await {
                        return;
                    }
                    continue;
                }
                Ok(_) => return,
                Err(e) => {
                    tracing::warn!(target: "respond", error = %e, "confirmation failed, ending stream");
                    *failure.lock() = Some(e);
                    return;
                }
            }
        }

        // Degenerate drafts are rejected without paying for verification.
        let accepted = if estimator.draft_quality(&draft) < 0.3 {
            stats.record_draft(0, draft.len(), 0.0);
            0
        } else {
            let verify_started = Instant::now();
            match slow.verify(&at, &draft).await {
                Ok(n) => {
                    let n = n.min(draft.len());
                    stats.record_draft(
                        n,
                        draft.len(),
                        verify_started.elapsed().as_secs_f64() * 1_000.0,
                    );
                    n
                }
                Err(e) => {
                    tracing::warn!(target: "respond", error = %e, "verify failed, slow model takes over");
                    takeover(
                        &slow, &request, prefix, &tx, &stats, &config, started, &mut index,
                        &failure,
                    )
                    .await;
                    return;
                }
            }
        };

        for token in &draft[..accepted] {
            record(&stats, &mut ttft_recorded);
            prefix.push(token.clone());
            if !send(&tx, token.clone(), ModelTier::Fast, &mut index).await {
                return;
            }
        }

        if accepted < draft.len() {
            // The slow model disagreed; take its token instead.
            match slow.draft(&request.with_prefix(prefix.clone()), 1).await {
                Ok(fix) if !fix.is_empty() => {
                    record(&stats, &mut ttft_recorded);
                    let token = fix[0].clone();
                    prefix.push(token.clone());
                    if !send(&tx, token, ModelTier::Slow, &mut index).await {
                        return;
                    }
                }
                Ok(_) => return,
                Err(e) => {
                    tracing::warn!(target: "respond", error = %e, "correction failed, ending stream");
                    *failure.lock() = Some(e);
                    return;
                }
            }
        }
    }
}
