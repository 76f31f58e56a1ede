//! Concurrent fan-out of one call per model, with a shared stage budget.

use crate::ports::model_invoker::InvocationFailure;
use council_domain::{FailureKind, ModelFailure, ModelId};
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The fan-out was cancelled; outstanding calls were aborted
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Fan-out cancelled")]
pub struct FanOutCancelled;

/// Final outcome of one model's call
#[derive(Debug, Clone)]
pub struct Settled<T> {
    pub model: ModelId,
    pub outcome: Result<T, ModelFailure>,
    pub elapsed: Duration,
}

impl<T> Settled<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Every call's outcome, in submission order
#[derive(Debug, Clone)]
pub struct FanOutResult<T> {
    pub settled: Vec<Settled<T>>,
    /// No call succeeded
    pub all_failed: bool,
}

impl<T> FanOutResult<T> {
    /// Split into successes (with model and elapsed time) and failures
    pub fn into_parts(self) -> (Vec<(ModelId, T, Duration)>, Vec<ModelFailure>) {
        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for settled in self.settled {
            match settled.outcome {
                Ok(value) => successes.push((settled.model, value, settled.elapsed)),
                Err(failure) => failures.push(failure),
            }
        }
        (successes, failures)
    }
}

/// Runs one task per model on a [`JoinSet`]
pub struct FanOutExecutor;

impl FanOutExecutor {
    /// Call `call` once per model, concurrently
    ///
    /// Waits until every call settled or `timeout` elapsed; calls still
    /// running at the deadline are aborted and recorded as
    /// [`FailureKind::Timeout`]. `on_settled` sees each outcome in completion
    /// order (timeouts last). Cancelling `cancellation` aborts all calls and
    /// returns [`FanOutCancelled`] without invoking `on_settled` again.
    pub async fn run_parallel<T, F, Fut>(
        models: &[ModelId],
        call: F,
        timeout: Duration,
        cancellation: &CancellationToken,
        mut on_settled: impl FnMut(&Settled<T>),
    ) -> Result<FanOutResult<T>, FanOutCancelled>
    where
        T: Send + 'static,
        F: Fn(ModelId) -> Fut,
        Fut: Future<Output = Result<T, InvocationFailure>> + Send + 'static,
    {
        if cancellation.is_cancelled() {
            return Err(FanOutCancelled);
        }

        let started = Instant::now();
        let mut join_set = JoinSet::new();
        for (index, model) in models.iter().enumerate() {
            let call_future = call(model.clone());
            join_set.spawn(async move {
                let begin = Instant::now();
                let result = call_future.await;
                (index, result, begin.elapsed())
            });
        }

        let mut slots: Vec<Option<Settled<T>>> = models.iter().map(|_| None).collect();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut timed_out = false;

        loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    join_set.abort_all();
                    return Err(FanOutCancelled);
                }
                joined = join_set.join_next() => {
                    let Some(joined) = joined else {
                        break;
                    };
                    match joined {
                        Ok((index, result, elapsed)) => {
                            let model = models[index].clone();
                            let outcome = result.map_err(|f| f.into_model_failure(model.clone()));
                            let settled = Settled { model, outcome, elapsed };
                            on_settled(&settled);
                            slots[index] = Some(settled);
                        }
                        Err(e) => {
                            warn!("Task join error: {}", e);
                        }
                    }
                }
                _ = &mut deadline => {
                    join_set.abort_all();
                    timed_out = true;
                    break;
                }
            }
        }

        let mut settled = Vec::with_capacity(models.len());
        for (model, slot) in models.iter().zip(slots) {
            let entry = match slot {
                Some(entry) => entry,
                None => {
                    let failure = if timed_out {
                        debug!("Model {} did not settle within {:?}", model, timeout);
                        ModelFailure::timeout(model.clone(), timeout)
                    } else {
                        ModelFailure::new(
                            model.clone(),
                            FailureKind::TransportError,
                            "call task failed",
                        )
                    };
                    let entry = Settled {
                        model: model.clone(),
                        outcome: Err(failure),
                        elapsed: started.elapsed(),
                    };
                    on_settled(&entry);
                    entry
                }
            };
            settled.push(entry);
        }

        let all_failed = !settled.iter().any(Settled::is_success);
        Ok(FanOutResult { settled, all_failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn models(names: &[&str]) -> Vec<ModelId> {
        names.iter().map(|n| ModelId::new(*n)).collect()
    }

    fn delay_for(model: &ModelId) -> u64 {
        match model.as_str() {
            "slow" => 80,
            "mid" => 40,
            _ => 5,
        }
    }

    #[tokio::test]
    async fn test_results_in_submission_order_callbacks_in_completion_order() {
        let models = models(&["slow", "mid", "fast"]);
        let token = CancellationToken::new();
        let order = Mutex::new(Vec::new());

        let result = FanOutExecutor::run_parallel(
            &models,
            |model| async move {
                tokio::time::sleep(Duration::from_millis(delay_for(&model))).await;
                Ok::<_, InvocationFailure>(model.to_string())
            },
            Duration::from_secs(5),
            &token,
            |s| order.lock().unwrap().push(s.model.to_string()),
        )
        .await
        .unwrap();

        assert!(!result.all_failed);
        let submitted: Vec<&str> = result.settled.iter().map(|s| s.model.as_str()).collect();
        assert_eq!(submitted, vec!["slow", "mid", "fast"]);
        assert_eq!(*order.lock().unwrap(), vec!["fast", "mid", "slow"]);
    }

    #[tokio::test]
    async fn test_failures_are_attributed() {
        let models = models(&["ok", "bad"]);
        let token = CancellationToken::new();

        let result = FanOutExecutor::run_parallel(
            &models,
            |model| async move {
                if model.as_str() == "bad" {
                    Err(InvocationFailure::auth("401"))
                } else {
                    Ok(1u32)
                }
            },
            Duration::from_secs(5),
            &token,
            |_| {},
        )
        .await
        .unwrap();

        let (successes, failures) = result.into_parts();
        assert_eq!(successes.len(), 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].model, ModelId::new("bad"));
        assert_eq!(failures[0].kind, FailureKind::AuthError);
    }

    #[tokio::test]
    async fn test_timeout_marks_outstanding_calls() {
        let models = models(&["fast", "hang"]);
        let token = CancellationToken::new();
        let settled_count = Mutex::new(0usize);

        let result = FanOutExecutor::run_parallel(
            &models,
            |model| async move {
                if model.as_str() == "hang" {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                Ok::<_, InvocationFailure>(())
            },
            Duration::from_millis(100),
            &token,
            |_| *settled_count.lock().unwrap() += 1,
        )
        .await
        .unwrap();

        assert!(!result.all_failed);
        assert!(result.settled[0].is_success());
        let failure = result.settled[1].outcome.as_ref().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(*settled_count.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_all_failed_flag() {
        let models = models(&["a", "b"]);
        let token = CancellationToken::new();

        let result = FanOutExecutor::run_parallel(
            &models,
            |_| async { Err::<(), _>(InvocationFailure::transport("connection refused")) },
            Duration::from_secs(5),
            &token,
            |_| {},
        )
        .await
        .unwrap();

        assert!(result.all_failed);
    }

    #[tokio::test]
    async fn test_cancellation_aborts() {
        let models = models(&["a", "b"]);
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let result = FanOutExecutor::run_parallel(
            &models,
            |_| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, InvocationFailure>(())
            },
            Duration::from_secs(60),
            &token,
            |_| panic!("nothing settles before cancellation"),
        )
        .await;

        assert_eq!(result.unwrap_err(), FanOutCancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_already_cancelled_spawns_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = Mutex::new(0usize);

        let result = FanOutExecutor::run_parallel(
            &models(&["a"]),
            |_| {
                *calls.lock().unwrap() += 1;
                async { Ok::<_, InvocationFailure>(()) }
            },
            Duration::from_secs(1),
            &token,
            |_| {},
        )
        .await;

        assert!(result.is_err());
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
