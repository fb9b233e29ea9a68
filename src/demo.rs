//! Simulated execution engine behind `jobwatch demo`.
//!
//! Each scripted job runs as a tokio task that walks its status steps against
//! a [`MemoryRegistry`], while the status renderer watches the same registry
//! through tickets from a blocking thread.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use console::Term;
use tokio::task::{JoinError, JoinSet};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::JobwatchConfig;
use crate::error::JobwatchError;
use crate::job::{JobId, JobRegistry, MemoryRegistry, RegistryError, Ticket};
use crate::ui::{Outcome, RenderError, StatusRenderer, terminal_width};

pub const STEP_DELAY: Duration = Duration::from_millis(700);

/// How a scripted job ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEnd {
    Complete(&'static str),
    Fail(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct JobScript {
    pub job_type: &'static str,
    pub steps: &'static [&'static str],
    pub end: ScriptEnd,
}

/// The demo job set; `fail` turns the deploy job into a failure.
pub fn scripts(fail: bool) -> Vec<JobScript> {
    let deploy_end = if fail {
        ScriptEnd::Fail("checksum mismatch")
    } else {
        ScriptEnd::Complete("v1.4.2 live")
    };
    vec![
        JobScript {
            job_type: "provision",
            steps: &["allocating", "booting", "ready"],
            end: ScriptEnd::Complete("ok"),
        },
        JobScript {
            job_type: "deploy",
            steps: &["uploading", "verifying"],
            end: deploy_end,
        },
        JobScript {
            job_type: "migrate",
            steps: &["copying", "indexing"],
            end: ScriptEnd::Complete("42 tables"),
        },
    ]
}

pub struct DemoEngine {
    registry: Arc<MemoryRegistry>,
    step_delay: Duration,
    tasks: JoinSet<Result<(), JobwatchError>>,
}

impl DemoEngine {
    pub fn new(registry: Arc<MemoryRegistry>, step_delay: Duration) -> Self {
        Self {
            registry,
            step_delay,
            tasks: JoinSet::new(),
        }
    }

    /// Submits every script and spawns a task driving it. Must run inside a tokio runtime.
    pub fn launch(&mut self, scripts: &[JobScript]) -> Vec<Ticket<MemoryRegistry>> {
        scripts
            .iter()
            .map(|script| {
                let id = self.registry.submit(script.job_type);
                let registry = Arc::clone(&self.registry);
                let task_id = id.clone();
                let script = *script;
                let delay = self.step_delay;
                self.tasks
                    .spawn(async move { run_script(&registry, &task_id, script, delay).await });
                Ticket::new(id, Arc::clone(&self.registry))
            })
            .collect()
    }

    /// Waits for every job task to return.
    pub async fn join(mut self) -> Result<(), JobwatchError> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(result) => result?,
                Err(e) => warn!("demo job task aborted: {e}"),
            }
        }
        Ok(())
    }
}

async fn run_script(
    registry: &MemoryRegistry,
    id: &JobId,
    script: JobScript,
    delay: Duration,
) -> Result<(), JobwatchError> {
    registry.start(id)?;
    for status in script.steps {
        if registry.is_stopped() {
            info!(job_id = %id, "stop requested, abandoning job");
            return Ok(());
        }
        registry.set_status(id, *status)?;
        sleep(delay).await;
    }
    match script.end {
        ScriptEnd::Complete(result) => registry.complete(id, Some(result.to_string()))?,
        ScriptEnd::Fail(reason) => registry.fail(id, Some(reason.to_string()))?,
    }
    Ok(())
}

/// Pretty JSON array of every ticket's current payload.
pub fn tickets_json<R>(tickets: &[Ticket<R>]) -> Result<String, JobwatchError>
where
    R: JobRegistry,
    JobwatchError: From<R::Error>,
{
    let payloads = tickets
        .iter()
        .map(Ticket::serialize)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::to_string_pretty(&payloads)?)
}

/// Joins the engine, then reports the display result.
///
/// A failed display stops the registry first so the job tasks wind down
/// instead of running their scripts out.
async fn settle(
    registry: &MemoryRegistry,
    engine: DemoEngine,
    rendered: Result<Result<Outcome, RenderError<RegistryError>>, JoinError>,
) -> Result<Outcome> {
    let rendered = match rendered {
        Ok(result) => result.map_err(anyhow::Error::from),
        Err(e) => Err(anyhow::Error::new(e).context("status renderer thread panicked")),
    };
    if rendered.is_err() {
        registry.stop();
    }
    let joined = engine.join().await;

    match (rendered, joined) {
        (Ok(outcome), joined) => {
            joined?;
            Ok(outcome)
        }
        (Err(e), Err(engine_err)) => {
            warn!("demo engine failed after display error: {engine_err}");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
    }
}

/// Runs the demo jobs and renders them until they finish or Ctrl-C.
pub async fn run(config: &JobwatchConfig, debug: bool, fail: bool, json: bool) -> Result<Outcome> {
    let registry = Arc::new(MemoryRegistry::new());
    let mut engine = DemoEngine::new(Arc::clone(&registry), STEP_DELAY);
    let tickets = engine.launch(&scripts(fail));
    info!(jobs = tickets.len(), "demo jobs launched");

    let stopper = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                registry.stop();
            }
        })
    };

    let mut renderer = StatusRenderer::new(
        Arc::clone(&registry),
        Term::stdout(),
        terminal_width(config.fallback_width),
    )
    .with_tick(config.tick())
    .with_spinner(config.spinner)
    .with_log_path(config.log_file.clone());

    let rendered = tokio::task::spawn_blocking(move || renderer.display(&tickets, debug)).await;

    stopper.abort();
    let outcome = settle(&registry, engine, rendered).await?;

    if json {
        let all: Vec<_> = registry
            .ids()
            .into_iter()
            .map(|id| Ticket::new(id, Arc::clone(&registry)))
            .collect();
        println!("{}", tickets_json(&all)?);
    }
    Ok(outcome)
}
