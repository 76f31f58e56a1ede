//! Run Deliberation use case
//!
//! Drives one [`DeliberationSession`] through the three council stages and
//! reports progress as [`DeliberationEvent`]s.

use crate::config::DeliberationParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::event_sink::{ChannelEventSink, EventSink, EventStream};
use crate::ports::model_invoker::{
    InvocationFailure, InvocationOutput, InvocationRequest, ModelInvoker,
};
use crate::use_cases::fan_out::{FanOutCancelled, FanOutExecutor, Settled};
use council_domain::{
    DeliberationEvent, DeliberationResult, DeliberationSession, DomainError, FALLBACK_TITLE,
    ImageAttachment, Label, Message, ModelFailure, ModelId, ModelResponse, PeerEvaluation,
    PromptTemplate, Question, Stage, SynthesisResult, clean_title, parse_confidence,
    parse_ranking,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that end a deliberation
#[derive(Error, Debug)]
pub enum DeliberationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stage {stage} failed: {reason}")]
    StageFatal { stage: u8, reason: String },

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DeliberationError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DeliberationError::Cancelled)
    }
}

impl From<FanOutCancelled> for DeliberationError {
    fn from(_: FanOutCancelled) -> Self {
        DeliberationError::Cancelled
    }
}

/// Input for the RunDeliberation use case
#[derive(Debug, Clone)]
pub struct DeliberationInput {
    /// The user's question
    pub prompt: String,
    /// Prior conversation turns, oldest first
    pub history: Vec<Message>,
    pub images: Vec<ImageAttachment>,
    /// Replaces the configured council for this run
    pub council_override: Option<Vec<ModelId>>,
    /// Replaces the configured chairman for this run
    pub chairman_override: Option<ModelId>,
    /// Overrides the configured title generation switch
    pub generate_title: Option<bool>,
}

impl DeliberationInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
            images: Vec::new(),
            council_override: None,
            chairman_override: None,
            generate_title: None,
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }

    pub fn with_council(mut self, council: Vec<ModelId>) -> Self {
        self.council_override = Some(council);
        self
    }

    pub fn with_chairman(mut self, chairman: ModelId) -> Self {
        self.chairman_override = Some(chairman);
        self
    }

    pub fn with_title(mut self, enabled: bool) -> Self {
        self.generate_title = Some(enabled);
        self
    }
}

/// A deliberation running on its own task
pub struct DeliberationHandle {
    /// Events in emission order; ends when the run ends
    pub events: EventStream,
    /// Cancel to abort the run; no further events are emitted afterwards
    pub cancellation: CancellationToken,
    pub join: JoinHandle<Result<DeliberationResult, DeliberationError>>,
}

/// Use case for running a council deliberation
#[derive(Clone)]
pub struct RunDeliberationUseCase {
    invoker: Arc<dyn ModelInvoker>,
    params: Arc<DeliberationParams>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl RunDeliberationUseCase {
    pub fn new(invoker: Arc<dyn ModelInvoker>, params: DeliberationParams) -> Self {
        Self {
            invoker,
            params: Arc::new(params),
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn params(&self) -> &DeliberationParams {
        &self.params
    }

    /// Run on a new task, streaming events through the returned handle
    pub fn spawn(&self, input: DeliberationInput) -> DeliberationHandle {
        let (sink, events) = ChannelEventSink::new();
        let cancellation = CancellationToken::new();
        let use_case = self.clone();
        let token = cancellation.clone();
        let join = tokio::spawn(async move { use_case.execute(input, &sink, &token).await });

        DeliberationHandle {
            events,
            cancellation,
            join,
        }
    }

    /// Run to completion, emitting events to `sink`
    ///
    /// The emitted stream ends with exactly one `complete` or `error` event,
    /// unless `cancellation` fires first: then the run stops, in-flight calls
    /// are aborted and nothing more is emitted.
    pub async fn execute(
        &self,
        input: DeliberationInput,
        sink: &dyn EventSink,
        cancellation: &CancellationToken,
    ) -> Result<DeliberationResult, DeliberationError> {
        let emitter = Emitter {
            sink,
            logger: self.conversation_logger.as_ref(),
            cancellation,
        };

        let mut session = match self.open_session(&input) {
            Ok(session) => session,
            Err(e) => {
                warn!("Rejected deliberation: {}", e);
                emitter.emit(DeliberationEvent::invalid_input(e.to_string()))?;
                return Err(DeliberationError::InvalidInput(e.to_string()));
            }
        };

        let mut title = if input.generate_title.unwrap_or(self.params.generate_title) {
            TitleTask::spawn(
                Arc::clone(&self.invoker),
                self.params.title_model.clone(),
                session.question().content(),
                self.params.title_timeout,
            )
        } else {
            TitleTask::disabled()
        };

        let result = self.run(&mut session, &mut title, &emitter).await;
        if let Err(e) = &result {
            if e.is_cancelled() {
                info!("Deliberation cancelled during {}", session.stage());
            }
            session.abort();
        }
        result
    }

    fn open_session(
        &self,
        input: &DeliberationInput,
    ) -> Result<DeliberationSession, DomainError> {
        let question = Question::parse(input.prompt.clone())?;
        let council = input
            .council_override
            .clone()
            .unwrap_or_else(|| self.params.council.clone());
        let chairman = input
            .chairman_override
            .clone()
            .unwrap_or_else(|| self.params.chairman.clone());

        Ok(DeliberationSession::new(question, council, chairman)?
            .with_history(input.history.clone())
            .with_images(input.images.clone()))
    }

    async fn run(
        &self,
        session: &mut DeliberationSession,
        title: &mut TitleTask,
        emitter: &Emitter<'_>,
    ) -> Result<DeliberationResult, DeliberationError> {
        info!(
            "Starting deliberation with {} council models",
            session.council().len()
        );

        self.stage1(session, emitter).await?;
        title.emit_if_ready(session, emitter).await?;

        self.stage2(session, emitter).await?;
        title.emit_if_ready(session, emitter).await?;

        self.stage3(session, emitter).await?;
        title.finish(session, emitter).await?;

        session.advance(Stage::Done)?;
        emitter.emit(DeliberationEvent::Complete)?;
        info!("Deliberation complete");

        session
            .clone()
            .into_result()
            .ok_or_else(|| DeliberationError::StageFatal {
                stage: 3,
                reason: "no synthesis recorded".to_string(),
            })
    }

    /// Stage 1: every council model answers independently
    async fn stage1(
        &self,
        session: &mut DeliberationSession,
        emitter: &Emitter<'_>,
    ) -> Result<(), DeliberationError> {
        session.advance(Stage::Stage1)?;
        info!("Stage 1: collecting answers");
        emitter.emit(DeliberationEvent::Stage1Start {
            models: session.council().to_vec(),
        })?;

        let include_confidence = self.params.include_confidence;
        let prompt =
            PromptTemplate::answer_prompt(session.question().content(), include_confidence);
        let history = session.history().to_vec();
        let images = session.images().to_vec();
        let invoker = Arc::clone(&self.invoker);

        let fan_out = FanOutExecutor::run_parallel(
            session.council(),
            |model| {
                let invoker = Arc::clone(&invoker);
                let request = InvocationRequest::new(model, prompt.clone())
                    .with_history(history.clone())
                    .with_images(images.clone());
                async move {
                    let output = invoker.invoke(request).await?;
                    parse_answer(output, include_confidence)
                }
            },
            self.params.stage1_timeout,
            emitter.cancellation,
            |settled| emitter.settled(Stage::Stage1, settled),
        )
        .await?;

        let (successes, failures) = fan_out.into_parts();
        log_failures(Stage::Stage1, &failures);

        let responses: Vec<ModelResponse> = successes
            .into_iter()
            .map(|(model, answer, elapsed)| {
                ModelResponse::new(model, answer.text, elapsed)
                    .with_token_count(answer.token_count)
                    .with_confidence(answer.confidence)
            })
            .collect();

        if responses.is_empty() {
            let reason = format!("All {} council models failed to answer", failures.len());
            warn!("{}", reason);
            emitter.emit(DeliberationEvent::stage_fatal(Stage::Stage1, reason.clone()))?;
            return Err(DeliberationError::StageFatal { stage: 1, reason });
        }

        info!(
            "Stage 1 finished: {} answered, {} failed",
            responses.len(),
            failures.len()
        );
        session.record_stage1(responses.clone(), failures.clone())?;
        let confidence_leader = session.confidence_leader().cloned();
        if let Some(leader) = &confidence_leader {
            info!(
                "Confidence leader: {} at {}/10 (others average {:.1})",
                leader.model, leader.confidence, leader.others_average
            );
        }
        emitter.emit(DeliberationEvent::Stage1Complete {
            responses,
            failures,
            confidence_leader,
        })
    }

    /// Stage 2: every model that answered ranks the anonymized answers
    async fn stage2(
        &self,
        session: &mut DeliberationSession,
        emitter: &Emitter<'_>,
    ) -> Result<(), DeliberationError> {
        session.advance(Stage::Stage2)?;
        let reviewers = session.reviewers();
        info!("Stage 2: {} reviewers ranking", reviewers.len());
        emitter.emit(DeliberationEvent::Stage2Start {
            reviewers: reviewers.clone(),
        })?;

        let prompt = PromptTemplate::ranking_prompt(
            session.question().content(),
            &session.anonymized_responses(),
        );
        let invoker = Arc::clone(&self.invoker);

        let fan_out = FanOutExecutor::run_parallel(
            &reviewers,
            |model| {
                let invoker = Arc::clone(&invoker);
                let request = InvocationRequest::new(model, prompt.clone())
                    .with_system_prompt(PromptTemplate::ranking_system());
                async move { invoker.invoke(request).await.and_then(non_empty) }
            },
            self.params.stage2_timeout,
            emitter.cancellation,
            |settled| emitter.settled(Stage::Stage2, settled),
        )
        .await?;

        let (successes, failures) = fan_out.into_parts();
        log_failures(Stage::Stage2, &failures);

        let labels: Vec<Label> = session.label_map().labels().cloned().collect();
        let evaluations: Vec<PeerEvaluation> = successes
            .into_iter()
            .map(|(reviewer, output, _)| {
                let parsed = parse_ranking(&output.text, &labels);
                if parsed.is_empty() {
                    warn!(
                        "Malformed ranking from {}; excluded from aggregation",
                        reviewer
                    );
                }
                PeerEvaluation::new(reviewer, output.text, parsed)
            })
            .collect();

        session.record_stage2(
            evaluations.clone(),
            failures.clone(),
            self.params.voting_method,
        )?;
        info!(
            "Stage 2 finished: {} evaluations ({} usable), {} failed",
            evaluations.len(),
            evaluations.iter().filter(|e| !e.is_malformed()).count(),
            failures.len()
        );

        let hallucination = session.hallucination().cloned();
        if let Some(report) = hallucination.as_ref().filter(|r| r.has_concerns) {
            warn!(
                "Hallucination check raised {} signal(s)",
                report.signals.len()
            );
        }

        emitter.emit(DeliberationEvent::Stage2Complete {
            evaluations,
            aggregate: session.aggregate().to_vec(),
            label_map: session.label_map().clone(),
            consensus: session.consensus().cloned(),
            hallucination,
            failures,
        })
    }

    /// Stage 3: a single chairman call, no fallback
    async fn stage3(
        &self,
        session: &mut DeliberationSession,
        emitter: &Emitter<'_>,
    ) -> Result<(), DeliberationError> {
        session.advance(Stage::Stage3)?;
        let chairman = session.select_chairman(self.params.chairman_selection);
        info!("Stage 3: synthesis by {}", chairman);
        emitter.emit(DeliberationEvent::Stage3Start {
            chairman: chairman.clone(),
        })?;

        let prompt = PromptTemplate::chairman_prompt(
            session.question().content(),
            &session.labelled_responses(),
            session.evaluations(),
            session.aggregate(),
        );
        let request = InvocationRequest::new(chairman.clone(), prompt)
            .with_system_prompt(PromptTemplate::chairman_system())
            .with_history(session.history().to_vec());

        let timeout = self.params.stage3_timeout;
        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = emitter.cancellation.cancelled() => return Err(DeliberationError::Cancelled),
            result = tokio::time::timeout(timeout, self.invoker.invoke(request)) => result,
        };

        let outcome = match outcome {
            Ok(result) => result
                .and_then(non_empty)
                .map_err(|f| f.into_model_failure(chairman.clone())),
            Err(_) => Err(ModelFailure::timeout(chairman.clone(), timeout)),
        };
        emitter.settled(
            Stage::Stage3,
            &Settled {
                model: chairman.clone(),
                outcome: outcome.as_ref().map(|_| ()).map_err(|f| f.clone()),
                elapsed: started.elapsed(),
            },
        );

        match outcome {
            Ok(output) => {
                let result = SynthesisResult::new(chairman, output.text);
                session.record_synthesis(result.clone())?;
                emitter.emit(DeliberationEvent::Stage3Complete(result))
            }
            Err(failure) => {
                let reason = format!("Chairman {} failed: {}", failure.model, failure.message);
                warn!("{}", reason);
                emitter.emit(DeliberationEvent::stage_fatal(Stage::Stage3, reason.clone()))?;
                Err(DeliberationError::StageFatal { stage: 3, reason })
            }
        }
    }
}

/// Wraps the sink so that nothing is emitted once cancellation fires
struct Emitter<'a> {
    sink: &'a dyn EventSink,
    logger: &'a dyn ConversationLogger,
    cancellation: &'a CancellationToken,
}

impl Emitter<'_> {
    fn emit(&self, event: DeliberationEvent) -> Result<(), DeliberationError> {
        if self.cancellation.is_cancelled() {
            return Err(DeliberationError::Cancelled);
        }
        debug!("Emitting {}", event.name());
        self.logger.log(ConversationEvent::from(&event));
        self.sink.emit(event);
        Ok(())
    }

    fn settled<T>(&self, stage: Stage, settled: &Settled<T>) {
        // A cancelled run is caught by the caller's next check
        let _ = self.emit(DeliberationEvent::ModelSettled {
            stage: stage.number().unwrap_or(0),
            model: settled.model.clone(),
            success: settled.is_success(),
            elapsed_ms: settled.elapsed.as_millis() as u64,
        });
    }
}

/// Optional title generation running beside the stages
///
/// Dropping the task aborts the title call.
struct TitleTask {
    handle: Option<JoinHandle<String>>,
}

impl TitleTask {
    fn disabled() -> Self {
        Self { handle: None }
    }

    fn spawn(
        invoker: Arc<dyn ModelInvoker>,
        model: ModelId,
        question: &str,
        timeout: Duration,
    ) -> Self {
        let request =
            InvocationRequest::new(model.clone(), PromptTemplate::title_prompt(question));
        let handle = tokio::spawn(async move {
            match tokio::time::timeout(timeout, invoker.invoke(request)).await {
                Ok(Ok(output)) => clean_title(&output.text),
                Ok(Err(e)) => {
                    debug!("Title generation with {} failed: {}", model, e);
                    FALLBACK_TITLE.to_string()
                }
                Err(_) => {
                    debug!("Title generation with {} timed out", model);
                    FALLBACK_TITLE.to_string()
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Emit the title if it is already available
    async fn emit_if_ready(
        &mut self,
        session: &mut DeliberationSession,
        emitter: &Emitter<'_>,
    ) -> Result<(), DeliberationError> {
        if self.handle.as_ref().is_some_and(JoinHandle::is_finished) {
            self.finish(session, emitter).await?;
        }
        Ok(())
    }

    /// Wait for the title (bounded by its own timeout) and emit it
    async fn finish(
        &mut self,
        session: &mut DeliberationSession,
        emitter: &Emitter<'_>,
    ) -> Result<(), DeliberationError> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };
        let title = tokio::select! {
            biased;
            _ = emitter.cancellation.cancelled() => {
                handle.abort();
                return Err(DeliberationError::Cancelled);
            }
            joined = &mut handle => joined.unwrap_or_else(|_| FALLBACK_TITLE.to_string()),
        };
        session.set_title(title.clone());
        emitter.emit(DeliberationEvent::TitleComplete { title })
    }
}

impl Drop for TitleTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn non_empty(output: InvocationOutput) -> Result<InvocationOutput, InvocationFailure> {
    if output.text.trim().is_empty() {
        Err(InvocationFailure::invalid_response("empty response"))
    } else {
        Ok(output)
    }
}

/// A Stage-1 answer with its confidence line removed
struct Answer {
    text: String,
    token_count: Option<u32>,
    confidence: Option<u8>,
}

/// Strip the confidence line, then reject answers with nothing left
fn parse_answer(
    output: InvocationOutput,
    include_confidence: bool,
) -> Result<Answer, InvocationFailure> {
    let (text, confidence) = if include_confidence {
        parse_confidence(&output.text)
    } else {
        (output.text, None)
    };
    if text.trim().is_empty() {
        return Err(InvocationFailure::invalid_response("empty response"));
    }
    Ok(Answer {
        text,
        token_count: output.token_count,
        confidence,
    })
}

fn log_failures(stage: Stage, failures: &[ModelFailure]) {
    for failure in failures {
        warn!(
            "{}: model {} failed ({}): {}",
            stage, failure.model, failure.kind, failure.message
        );
    }
}
