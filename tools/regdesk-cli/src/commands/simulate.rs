//! Drive a loader against the simulated backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use regdesk_loader::{CancelSignal, GuardedLoader, LoadErrorKind, LoaderState, LoaderStatus};
use regdesk_observability::{LoaderMetrics, MetricsSnapshot, TracingObserver};
use regdesk_query::dispatch;
use serde::Serialize;

use super::SimulateArgs;
use crate::backend::{Participant, SimulatedBackend};
use crate::config::CliConfig;
use crate::context::Context;
use crate::output::{status_badge, Output};

/// State of the loader after one settled round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub round: usize,
    pub status: LoaderStatus,
    pub rows: Option<usize>,
    pub unpaid: Option<usize>,
    pub is_stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<LoadErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RoundReport {
    fn new(round: usize, state: &LoaderState<Vec<Participant>>) -> Self {
        Self {
            round,
            status: state.status(),
            rows: state.data.as_ref().map(Vec::len),
            unpaid: state
                .data
                .as_ref()
                .map(|rows| rows.iter().filter(|p| !p.paid).count()),
            is_stale: state.is_stale,
            error_kind: state.error.as_ref().map(|e| e.kind()),
            error: state.error_message(),
        }
    }
}

/// Outcome of a whole simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub rounds: Vec<RoundReport>,
    pub queries: usize,
    pub metrics: MetricsSnapshot,
}

/// Run the simulate command.
pub async fn run(args: SimulateArgs, ctx: &Context) -> Result<()> {
    let report = simulate(&args, &ctx.config, &ctx.output).await?;

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    for round in &report.rounds {
        print_round(&ctx.output, round);
    }

    ctx.output.header("Summary");
    ctx.output.kv("queries sent", &report.queries.to_string());
    ctx.output.kv("successes", &report.metrics.successes.to_string());
    ctx.output.kv("failures", &report.metrics.failures.to_string());
    if let Some(rate) = report.metrics.success_rate() {
        ctx.output.kv("success rate", &format!("{:.0}%", rate * 100.0));
    }

    Ok(())
}

/// Build a loader over the simulated backend and run the requested rounds.
pub async fn simulate(
    args: &SimulateArgs,
    config: &CliConfig,
    output: &Output,
) -> Result<SimulationReport> {
    let sim = &config.simulation;
    let mut loader_config = config.loader.clone();
    if let Some(timeout_ms) = args.timeout_ms {
        loader_config = loader_config.with_timeout_ms(timeout_ms);
    }
    loader_config.validate()?;

    let backend = SimulatedBackend::new(
        Duration::from_millis(args.latency_ms.unwrap_or(sim.latency_ms)),
        sim.rows,
        args.fail.unwrap_or(sim.failure),
        args.fail_after.or(sim.fail_after),
    );

    let label = loader_config.label.clone();
    let metrics = Arc::new(LoaderMetrics::new(label.clone()));
    let query_backend = backend.clone();

    let loader = GuardedLoader::builder(move |signal: CancelSignal| {
        let backend = query_backend.clone();
        async move { dispatch(&signal, || backend.select_participants()).await }
    })
    .config(loader_config)
    .observer(TracingObserver::new(label.clone()))
    .observer(Arc::clone(&metrics))
    .build();

    // Collapses into the auto-load attempt when one is already running.
    loader.load(false);
    output.debug(&format!("loader '{}' started (deadline {:?})", label, loader.timeout()));

    let mut rounds = Vec::with_capacity(args.reloads + 1);
    let state = wait(&loader, output, &format!("Loading {}", label)).await;
    rounds.push(RoundReport::new(0, &state));

    for round in 1..=args.reloads {
        loader.reload();
        if args.supersede {
            output.debug("superseding in-flight reload");
            loader.reload();
        }
        let state = wait(&loader, output, &format!("Reloading {} ({})", label, round)).await;
        rounds.push(RoundReport::new(round, &state));
    }

    Ok(SimulationReport {
        rounds,
        queries: backend.queries(),
        metrics: metrics.snapshot(),
    })
}

async fn wait(
    loader: &GuardedLoader<Vec<Participant>>,
    output: &Output,
    msg: &str,
) -> LoaderState<Vec<Participant>> {
    let spinner = output.spinner(msg);
    let state = loader.settled().await;
    spinner.finish_and_clear();
    state
}

fn print_round(output: &Output, round: &RoundReport) {
    output.header(&format!("Round {}", round.round));
    output.kv("status", &status_badge(round.status));

    if let Some(rows) = round.rows {
        output.kv("participants", &rows.to_string());
    }
    if let Some(unpaid) = round.unpaid {
        output.kv("awaiting payment", &unpaid.to_string());
    }
    if round.is_stale && round.rows.is_some() {
        output.warn("Showing data that may be out of date");
    }
    if let Some(error) = &round.error {
        output.error(error);
        output.info("Run again to retry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FailureMode;

    fn args(reloads: usize) -> SimulateArgs {
        SimulateArgs {
            latency_ms: Some(20),
            timeout_ms: None,
            fail: None,
            fail_after: None,
            reloads,
            supersede: false,
        }
    }

    fn quiet() -> Output {
        Output::new(false, true)
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_success_rounds() {
        let report = simulate(&args(2), &CliConfig::default(), &quiet()).await.unwrap();

        assert_eq!(report.rounds.len(), 3);
        assert!(report.rounds.iter().all(|r| r.status == LoaderStatus::Ready));
        assert_eq!(report.rounds[0].rows, Some(5));
        assert_eq!(report.queries, 3);
        assert_eq!(report.metrics.successes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_failure_marks_stale() {
        let mut args = args(1);
        args.fail = Some(FailureMode::Transport);
        args.fail_after = Some(1);

        let report = simulate(&args, &CliConfig::default(), &quiet()).await.unwrap();
        assert_eq!(report.rounds[0].status, LoaderStatus::Ready);
        assert_eq!(report.rounds[1].status, LoaderStatus::Stale);
        assert_eq!(report.rounds[1].error_kind, Some(LoadErrorKind::Transport));
        assert_eq!(report.metrics.transport_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_deadline() {
        let mut args = args(0);
        args.timeout_ms = Some(5);

        let report = simulate(&args, &CliConfig::default(), &quiet()).await.unwrap();
        assert_eq!(report.rounds[0].status, LoaderStatus::Failed);
        assert_eq!(
            report.rounds[0].error_kind,
            Some(LoadErrorKind::DeadlineExceeded)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_supersede_sends_extra_query() {
        let mut args = args(1);
        args.supersede = true;

        let report = simulate(&args, &CliConfig::default(), &quiet()).await.unwrap();
        assert_eq!(report.rounds[1].status, LoaderStatus::Ready);
        assert_eq!(report.metrics.successes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_rejects_zero_timeout() {
        let mut args = args(0);
        args.timeout_ms = Some(0);
        assert!(simulate(&args, &CliConfig::default(), &quiet()).await.is_err());
    }
}
