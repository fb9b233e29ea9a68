//! Polling status display for a fixed set of jobs.
//!
//! [`StatusRenderer::display`] blocks until every job is terminal or the
//! registry reports a stop, redrawing one spinner line per job in place and
//! leaving exactly one permanent line for every status a job moved past.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use console::{Term, measure_text_width};
use thiserror::Error;
use tracing::{debug, info};

use super::spinner::{Spinner, SpinnerKind};
use crate::job::{JobId, JobRecord, JobRegistry, JobView};

pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

pub const TERMINATED_NOTICE: &str = "Terminated.";
pub const SUCCESS_NOTICE: &str = "All jobs finished successfully.";
pub const FAILURE_NOTICE: &str = "One or more jobs failed.";

/// Overall result of a display call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

#[derive(Debug, Error)]
pub enum RenderError<E> {
    #[error("job lookup failed: {0}")]
    Lookup(E),

    #[error("terminal write failed: {0}")]
    Io(#[from] io::Error),
}

/// Column count of the attached terminal, or `fallback` when there is none.
pub fn terminal_width(fallback: usize) -> usize {
    Term::stdout()
        .size_checked()
        .map(|(_rows, cols)| usize::from(cols))
        .unwrap_or(fallback)
}

pub struct StatusRenderer<R, W> {
    registry: Arc<R>,
    out: W,
    width: usize,
    tick: Duration,
    spinner: Spinner,
    log_path: Option<PathBuf>,
}

impl<R: JobRegistry, W: Write> StatusRenderer<R, W> {
    /// `width` sizes the blank fill used to wipe the current line.
    pub fn new(registry: Arc<R>, out: W, width: usize) -> Self {
        Self {
            registry,
            out,
            width,
            tick: DEFAULT_TICK,
            spinner: Spinner::new(SpinnerKind::default()),
            log_path: None,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_spinner(mut self, kind: SpinnerKind) -> Self {
        self.spinner = Spinner::new(kind);
        self
    }

    /// Log file named in the hint printed after a failure.
    pub fn with_log_path(mut self, path: Option<PathBuf>) -> Self {
        self.log_path = path;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Polls `jobs` until they all finish or a stop is requested.
    ///
    /// With `debug` set nothing is drawn while polling, since a redrawing
    /// spinner would interleave with logs streamed to the same terminal.
    pub fn display<J: JobView>(
        &mut self,
        jobs: &[J],
        debug: bool,
    ) -> Result<Outcome, RenderError<J::Error>> {
        self.spinner.reset();
        let mut shown: HashMap<JobId, String> = HashMap::new();

        let finished = loop {
            if self.registry.is_stopped() {
                break false;
            }
            if all_completed(jobs)? {
                break true;
            }
            if debug {
                thread::sleep(self.tick);
                continue;
            }
            for job in jobs {
                let record = job.snapshot().map_err(RenderError::Lookup)?;
                self.animate(&record, &mut shown)?;
                thread::sleep(self.tick);
            }
        };

        let records = jobs
            .iter()
            .map(JobView::snapshot)
            .collect::<Result<Vec<_>, _>>()
            .map_err(RenderError::Lookup)?;

        if finished {
            for record in &records {
                self.finalize(&record.job_type, &final_text(record))?;
            }
            info!(jobs = records.len(), "all jobs finished");
        } else {
            self.clear_line()?;
            writeln!(self.out, "{TERMINATED_NOTICE}")?;
            info!("stop requested, display terminated");
        }

        let outcome = if records.iter().any(JobRecord::is_failed) {
            Outcome::Failure
        } else {
            Outcome::Success
        };
        self.report(outcome)?;
        self.out.flush()?;
        Ok(outcome)
    }

    fn animate(&mut self, record: &JobRecord, shown: &mut HashMap<JobId, String>) -> io::Result<()> {
        if let Some(previous) = shown.get(&record.id)
            && *previous != record.status
        {
            debug!(job_id = %record.id, from = %previous, to = %record.status, "status changed");
            self.finalize(&record.job_type, previous)?;
        }
        shown.insert(record.id.clone(), record.status.clone());

        let frame = self.spinner.next_frame();
        self.clear_line()?;
        write!(self.out, "{frame} [{}] {}", record.job_type, record.status)?;
        self.out.flush()
    }

    // Prints a permanent line aligned under the spinner column.
    fn finalize(&mut self, job_type: &str, text: &str) -> io::Result<()> {
        self.clear_line()?;
        let padding = " ".repeat(measure_text_width(self.spinner.last_frame()));
        writeln!(self.out, "{padding} [{job_type}] {text}")
    }

    fn clear_line(&mut self) -> io::Result<()> {
        write!(self.out, "\r{}\r", " ".repeat(self.width))
    }

    fn report(&mut self, outcome: Outcome) -> io::Result<()> {
        match outcome {
            Outcome::Success => writeln!(self.out, "{SUCCESS_NOTICE}"),
            Outcome::Failure => {
                writeln!(self.out, "{FAILURE_NOTICE}")?;
                if let Some(path) = &self.log_path {
                    writeln!(self.out, "See {} for details.", path.display())?;
                }
                Ok(())
            }
        }
    }
}

// Snapshots every job, even after one is found unfinished.
fn all_completed<J: JobView>(jobs: &[J]) -> Result<bool, RenderError<J::Error>> {
    let mut done = true;
    for job in jobs {
        let record = job.snapshot().map_err(RenderError::Lookup)?;
        done &= record.is_completed();
    }
    Ok(done)
}

fn final_text(record: &JobRecord) -> String {
    match &record.result {
        Some(result) => format!("{}: {result}", record.state),
        None => record.state.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::job::{JobState, MemoryRegistry, RegistryError, Ticket};

    /// Job whose every snapshot advances one step through a script, then sticks on the last step.
    struct ScriptedJob {
        id: JobId,
        job_type: String,
        steps: Vec<(JobState, &'static str, Option<&'static str>)>,
        calls: Cell<usize>,
    }

    impl ScriptedJob {
        fn new(
            id: &str,
            job_type: &str,
            steps: Vec<(JobState, &'static str, Option<&'static str>)>,
        ) -> Self {
            Self {
                id: JobId::from(id),
                job_type: job_type.to_string(),
                steps,
                calls: Cell::new(0),
            }
        }
    }

    impl JobView for ScriptedJob {
        type Error = RegistryError;

        fn id(&self) -> &JobId {
            &self.id
        }

        fn snapshot(&self) -> Result<JobRecord, RegistryError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            let (state, status, result) = self.steps[call.min(self.steps.len() - 1)];
            let mut record = JobRecord::new(self.id.clone(), self.job_type.clone());
            record.state = state;
            record.status = status.to_string();
            record.result = result.map(str::to_string);
            Ok(record)
        }
    }

    /// Registry that reports a stop after `limit` polls of the flag.
    struct StopAfter {
        polls: AtomicUsize,
        limit: usize,
    }

    impl JobRegistry for StopAfter {
        type Error = RegistryError;

        fn find(&self, id: &JobId) -> Result<JobRecord, RegistryError> {
            Err(RegistryError::NotFound(id.clone()))
        }

        fn is_stopped(&self) -> bool {
            self.polls.fetch_add(1, Ordering::SeqCst) >= self.limit
        }
    }

    fn renderer<R: JobRegistry>(registry: Arc<R>) -> StatusRenderer<R, Vec<u8>> {
        StatusRenderer::new(registry, Vec::new(), 0)
            .with_tick(Duration::ZERO)
            .with_spinner(SpinnerKind::Line)
    }

    fn idle() -> Arc<MemoryRegistry> {
        Arc::new(MemoryRegistry::new())
    }

    fn transcript<R: JobRegistry>(renderer: StatusRenderer<R, Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    // Lines that ended in a newline, as they remain visible after carriage-return redraws.
    fn finalized_lines(transcript: &str) -> Vec<String> {
        let mut segments: Vec<&str> = transcript.split('\n').collect();
        segments.pop();
        segments
            .into_iter()
            .map(|s| s.rsplit('\r').next().unwrap_or(s).to_string())
            .collect()
    }

    fn count_ending_with(lines: &[String], suffix: &str) -> usize {
        lines.iter().filter(|l| l.ends_with(suffix)).count()
    }

    #[test]
    fn all_completed_jobs_succeed_with_one_line_each() {
        let jobs = vec![
            ScriptedJob::new(
                "1",
                "build",
                vec![
                    (JobState::Running, "working", None),
                    (JobState::Completed, "working", Some("done")),
                ],
            ),
            ScriptedJob::new(
                "2",
                "test",
                vec![
                    (JobState::Queued, "", None),
                    (JobState::Completed, "", None),
                ],
            ),
        ];
        let mut r = renderer(idle());

        let outcome = r.display(&jobs, false).unwrap();
        assert_eq!(outcome, Outcome::Success);

        let lines = finalized_lines(&transcript(r));
        assert_eq!(
            lines,
            vec![
                "  [build] Completed: done".to_string(),
                "  [test] Completed".to_string(),
                SUCCESS_NOTICE.to_string(),
            ]
        );
    }

    #[test]
    fn any_failed_job_fails_the_display() {
        let jobs = vec![
            ScriptedJob::new(
                "1",
                "provision",
                vec![
                    (JobState::Running, "booting", None),
                    (JobState::Running, "booting", None),
                    (JobState::Running, "ready", None),
                    (JobState::Completed, "ready", Some("ok")),
                ],
            ),
            ScriptedJob::new(
                "2",
                "deploy",
                vec![
                    (JobState::Running, "uploading", None),
                    (JobState::Running, "uploading", None),
                    (JobState::Failed, "uploading", None),
                ],
            ),
        ];
        let mut r = renderer(idle());

        let outcome = r.display(&jobs, false).unwrap();
        assert_eq!(outcome, Outcome::Failure);

        let lines = finalized_lines(&transcript(r));
        assert_eq!(count_ending_with(&lines, "[provision] booting"), 1);
        assert_eq!(count_ending_with(&lines, "[provision] ready"), 0);
        assert_eq!(count_ending_with(&lines, "[provision] Completed: ok"), 1);
        assert_eq!(count_ending_with(&lines, "[deploy] Failed"), 1);
        assert_eq!(count_ending_with(&lines, "[deploy] uploading"), 0);
        assert_eq!(lines.last().unwrap(), FAILURE_NOTICE);
    }

    #[test]
    fn failure_prints_log_hint_when_configured() {
        let jobs = vec![ScriptedJob::new(
            "1",
            "deploy",
            vec![(JobState::Failed, "uploading", Some("disk full"))],
        )];
        let mut r = renderer(idle()).with_log_path(Some(PathBuf::from("/var/log/jobwatch.log")));

        assert_eq!(r.display(&jobs, false).unwrap(), Outcome::Failure);
        let lines = finalized_lines(&transcript(r));
        assert_eq!(
            lines,
            vec![
                "  [deploy] Failed: disk full".to_string(),
                FAILURE_NOTICE.to_string(),
                "See /var/log/jobwatch.log for details.".to_string(),
            ]
        );
    }

    #[test]
    fn failure_without_log_path_has_no_hint() {
        let jobs = vec![ScriptedJob::new(
            "1",
            "deploy",
            vec![(JobState::Failed, "", None)],
        )];
        let mut r = renderer(idle());

        r.display(&jobs, false).unwrap();
        let out = transcript(r);
        assert!(!out.contains("See "));
    }

    #[test]
    fn stop_skips_final_lines() {
        let jobs = vec![ScriptedJob::new(
            "1",
            "provision",
            vec![(JobState::Running, "booting", None)],
        )];
        let registry = Arc::new(StopAfter {
            polls: AtomicUsize::new(0),
            limit: 2,
        });
        let mut r = renderer(registry);

        let outcome = r.display(&jobs, false).unwrap();
        assert_eq!(outcome, Outcome::Success);

        let out = transcript(r);
        assert!(out.contains("| [provision] booting"));
        let lines = finalized_lines(&out);
        assert_eq!(
            lines,
            vec![TERMINATED_NOTICE.to_string(), SUCCESS_NOTICE.to_string()]
        );
    }

    #[test]
    fn stop_still_reports_failed_jobs() {
        let jobs = vec![
            ScriptedJob::new("1", "deploy", vec![(JobState::Failed, "", None)]),
            ScriptedJob::new("2", "migrate", vec![(JobState::Running, "copying", None)]),
        ];
        let registry = Arc::new(StopAfter {
            polls: AtomicUsize::new(0),
            limit: 1,
        });
        let mut r = renderer(registry);

        assert_eq!(r.display(&jobs, false).unwrap(), Outcome::Failure);
        let lines = finalized_lines(&transcript(r));
        assert_eq!(count_ending_with(&lines, "Failed"), 0);
        assert_eq!(lines[0], TERMINATED_NOTICE);
        assert_eq!(lines[1], FAILURE_NOTICE);
    }

    #[test]
    fn stop_before_first_poll_draws_nothing() {
        let registry = idle();
        registry.stop();
        let jobs = vec![ScriptedJob::new(
            "1",
            "provision",
            vec![(JobState::Running, "booting", None)],
        )];
        let mut r = renderer(registry);

        r.display(&jobs, false).unwrap();
        let out = transcript(r);
        assert!(!out.contains("booting"));
        assert!(out.contains(TERMINATED_NOTICE));
    }

    #[test]
    fn each_status_change_leaves_one_line() {
        let jobs = vec![ScriptedJob::new(
            "1",
            "sync",
            vec![
                (JobState::Running, "a", None),
                (JobState::Running, "a", None),
                (JobState::Running, "b", None),
                (JobState::Running, "b", None),
                (JobState::Running, "a", None),
                (JobState::Running, "a", None),
                (JobState::Completed, "a", None),
            ],
        )];
        let mut r = renderer(idle());

        r.display(&jobs, false).unwrap();
        let lines = finalized_lines(&transcript(r));
        assert_eq!(
            lines,
            vec![
                "  [sync] a".to_string(),
                "  [sync] b".to_string(),
                "  [sync] Completed".to_string(),
                SUCCESS_NOTICE.to_string(),
            ]
        );
    }

    #[test]
    fn animated_line_format() {
        let jobs = vec![ScriptedJob::new(
            "1",
            "provision",
            vec![
                (JobState::Running, "booting", None),
                (JobState::Running, "booting", None),
                (JobState::Running, "booting", None),
                (JobState::Completed, "booting", None),
            ],
        )];
        let mut r = renderer(idle());

        r.display(&jobs, false).unwrap();
        let out = transcript(r);
        assert!(out.contains("\r\r| [provision] booting"));
        assert!(out.contains("\r\r/ [provision] booting"));
    }

    #[test]
    fn spinner_advances_per_job_render() {
        let jobs = vec![
            ScriptedJob::new(
                "1",
                "a",
                vec![
                    (JobState::Running, "x", None),
                    (JobState::Running, "x", None),
                    (JobState::Completed, "x", None),
                ],
            ),
            ScriptedJob::new(
                "2",
                "b",
                vec![
                    (JobState::Running, "y", None),
                    (JobState::Running, "y", None),
                    (JobState::Completed, "y", None),
                ],
            ),
        ];
        let mut r = renderer(idle());

        r.display(&jobs, false).unwrap();
        let out = transcript(r);
        assert!(out.contains("| [a] x"));
        assert!(out.contains("/ [b] y"));
    }

    #[test]
    fn clear_spans_terminal_width() {
        let jobs = vec![ScriptedJob::new(
            "1",
            "build",
            vec![
                (JobState::Running, "compiling", None),
                (JobState::Running, "compiling", None),
                (JobState::Completed, "", None),
            ],
        )];
        let mut r = StatusRenderer::new(idle(), Vec::new(), 6)
            .with_tick(Duration::ZERO)
            .with_spinner(SpinnerKind::Line);

        r.display(&jobs, false).unwrap();
        let out = transcript(r);
        assert!(out.starts_with("\r      \r| [build] compiling"));
    }

    #[test]
    fn debug_mode_draws_no_spinner() {
        let jobs = vec![ScriptedJob::new(
            "1",
            "migrate",
            vec![
                (JobState::Running, "copying", None),
                (JobState::Running, "indexing", None),
                (JobState::Completed, "indexing", Some("42 rows")),
            ],
        )];
        let mut r = renderer(idle());

        assert_eq!(r.display(&jobs, true).unwrap(), Outcome::Success);
        let out = transcript(r);
        assert!(!out.contains("copying"));
        assert!(!out.contains("indexing"));
        assert_eq!(
            finalized_lines(&out),
            vec![
                "  [migrate] Completed: 42 rows".to_string(),
                SUCCESS_NOTICE.to_string(),
            ]
        );
    }

    #[test]
    fn debug_mode_stop_prints_only_notice_and_outcome() {
        let jobs = vec![ScriptedJob::new(
            "1",
            "migrate",
            vec![(JobState::Running, "copying", None)],
        )];
        let registry = Arc::new(StopAfter {
            polls: AtomicUsize::new(0),
            limit: 2,
        });
        let mut r = renderer(registry);

        assert_eq!(r.display(&jobs, true).unwrap(), Outcome::Success);
        assert_eq!(
            transcript(r),
            format!("\r\r{TERMINATED_NOTICE}\n{SUCCESS_NOTICE}\n")
        );
    }

    #[test]
    fn padding_matches_frame_width() {
        let jobs = vec![ScriptedJob::new(
            "1",
            "build",
            vec![(JobState::Completed, "", None)],
        )];
        let mut r = StatusRenderer::new(idle(), Vec::new(), 0)
            .with_tick(Duration::ZERO)
            .with_spinner(SpinnerKind::Dots);

        r.display(&jobs, false).unwrap();
        let lines = finalized_lines(&transcript(r));
        assert_eq!(lines[0], "  [build] Completed");
    }

    #[test]
    fn tickets_render_against_live_registry() {
        let registry = idle();
        let ok = registry.submit("provision");
        registry.set_status(&ok, "ready").unwrap();
        registry.complete(&ok, Some("ok".into())).unwrap();
        let bad = registry.submit("deploy");
        registry.fail(&bad, None).unwrap();

        let tickets = vec![
            Ticket::new(ok, Arc::clone(&registry)),
            Ticket::new(bad, Arc::clone(&registry)),
        ];
        let mut r = renderer(Arc::clone(&registry));

        assert_eq!(r.display(&tickets, false).unwrap(), Outcome::Failure);
        let lines = finalized_lines(&transcript(r));
        assert_eq!(lines[0], "  [provision] Completed: ok");
        assert_eq!(lines[1], "  [deploy] Failed");
    }

    #[test]
    fn missing_job_surfaces_lookup_error() {
        let registry = idle();
        let tickets = vec![Ticket::new(JobId::from("gone"), Arc::clone(&registry))];
        let mut r = renderer(registry);

        let err = r.display(&tickets, false).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Lookup(RegistryError::NotFound(ref id)) if id.as_str() == "gone"
        ));
    }

    #[test]
    fn outcome_helpers() {
        assert!(Outcome::Success.is_success());
        assert!(!Outcome::Failure.is_success());
    }
}
