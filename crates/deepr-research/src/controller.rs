//! The research loop: plan, search, process links, decide, report.

use std::any::Any;
use std::collections::HashSet;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use deepr_core::{Error, ModelEntry};

use crate::event::{EventSink, ResearchEvent, ResearchStream};
use crate::llm::Llm;
use crate::pipeline::{process_links, CandidateLink};
use crate::planner::{initial_queries, next_queries, PlannerVerdict};
use crate::report::{synthesize_report, Report};
use crate::Capabilities;

const EVENT_BUFFER: usize = 128;

const EMPTY_QUERY_STATUS: &str = "Please enter a research query.";
const NO_QUERIES_STATUS: &str = "No search queries were generated by the LLM. Exiting.";
const PLANNER_DONE_STATUS: &str = "LLM indicated that no further research is needed.";
const PLANNER_EMPTY_STATUS: &str = "LLM did not provide any new search queries. Ending the loop.";
const REPORTING_STATUS: &str = "Generating final report...";
const REPORT_OK_STATUS: &str = "Research completed successfully.";
const REPORT_FAILED_STATUS: &str = "Could not generate a final report.";

/// Parameters for one research run.
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    query: String,
    max_iterations: u32,
    model: Option<ModelEntry>,
}

impl ResearchRequest {
    /// `max_iterations` must be at least 1.
    pub fn new(query: impl Into<String>, max_iterations: u32) -> Result<Self, Error> {
        if max_iterations == 0 {
            return Err(Error::invalid_request("max_iterations must be at least 1"));
        }
        Ok(Self {
            query: query.into(),
            max_iterations,
            model: None,
        })
    }

    pub fn with_model(mut self, model: ModelEntry) -> Self {
        self.model = Some(model);
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn model(&self) -> Option<ModelEntry> {
        self.model
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EmptyQuery,
    NoInitialQueries,
    /// The planner returned the termination sentinel.
    PlannerDone,
    /// The planner returned no usable queries.
    PlannerGaveUp,
    IterationLimit,
}

/// Contexts gathered across iterations, in arrival order. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedContexts(Vec<String>);

impl AggregatedContexts {
    pub fn extend(&mut self, contexts: impl IntoIterator<Item = String>) {
        self.0.extend(contexts);
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What one search/process/plan cycle produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationOutcome {
    pub new_contexts: Vec<String>,
    pub unique_links: usize,
    pub verdict: PlannerVerdict,
}

/// Summary of a finished run, alongside the events it emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchOutcome {
    pub stop: StopReason,
    /// Completed search/process/plan cycles.
    pub iterations: u32,
    pub contexts: AggregatedContexts,
    /// Every query the planner produced, including any never searched.
    pub history: Vec<String>,
    /// `None` when the run ended before synthesis.
    pub report: Option<Report>,
}

impl ResearchOutcome {
    fn early(stop: StopReason) -> Self {
        Self {
            stop,
            iterations: 0,
            contexts: AggregatedContexts::default(),
            history: Vec::new(),
            report: None,
        }
    }
}

struct LoopState {
    iteration: u32,
    batch: Vec<String>,
    contexts: AggregatedContexts,
    history: Vec<String>,
}

impl LoopState {
    fn new(batch: Vec<String>) -> Self {
        Self {
            iteration: 0,
            history: batch.clone(),
            batch,
            contexts: AggregatedContexts::default(),
        }
    }
}

/// Drives research runs against a fixed set of capabilities.
#[derive(Clone)]
pub struct Researcher {
    caps: Capabilities,
}

impl Researcher {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    /// Start a run in a fresh task and stream its events.
    ///
    /// The stream ends after the final event. A panic inside the run is
    /// reported as a single "An error occurred" event.
    pub fn run(&self, request: ResearchRequest) -> ResearchStream {
        let (sink, stream) = EventSink::channel(EVENT_BUFFER);
        let researcher = self.clone();
        let guard = sink.clone();

        tokio::spawn(async move {
            let run = tokio::spawn(async move {
                researcher.research(&request, &sink).await;
            });
            if let Err(e) = run.await {
                let message = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    e.to_string()
                };
                error!(error = %message, "Research run aborted");
                guard
                    .emit(ResearchEvent::terminal(format!("An error occurred: {}", message)))
                    .await;
            }
        });

        stream
    }

    /// Execute one run to completion, emitting events into `sink`.
    pub async fn research(&self, request: &ResearchRequest, sink: &EventSink) -> ResearchOutcome {
        let query = request.query();
        if query.trim().is_empty() {
            sink.emit(ResearchEvent::terminal(EMPTY_QUERY_STATUS)).await;
            return ResearchOutcome::early(StopReason::EmptyQuery);
        }

        let llm = Llm::new(self.caps.provider.as_ref(), request.model());
        info!(
            query,
            max_iterations = request.max_iterations(),
            model = request.model().map(|m| m.id),
            "Generating initial search queries"
        );

        let batch = initial_queries(llm, query).await;
        if batch.is_empty() {
            sink.emit(ResearchEvent::terminal(NO_QUERIES_STATUS)).await;
            return ResearchOutcome::early(StopReason::NoInitialQueries);
        }
        sink.status(format!("Initial search queries: {:?}", batch)).await;

        let mut state = LoopState::new(batch);
        let stop = loop {
            if state.iteration >= request.max_iterations() {
                info!(iterations = state.iteration, "Iteration limit reached");
                sink.status(format!(
                    "Reached the iteration limit ({}).",
                    request.max_iterations()
                ))
                .await;
                break StopReason::IterationLimit;
            }

            let n = state.iteration + 1;
            sink.status(format!("Iteration {}: Starting...", n)).await;
            let outcome = self.iterate(llm, query, &mut state, sink).await;
            state.iteration = n;
            info!(
                iteration = n,
                links = outcome.unique_links,
                contexts = outcome.new_contexts.len(),
                total_contexts = state.contexts.len(),
                "Iteration complete"
            );

            match outcome.verdict {
                PlannerVerdict::Done => {
                    sink.status(PLANNER_DONE_STATUS).await;
                    break StopReason::PlannerDone;
                }
                PlannerVerdict::Queries(queries) if queries.is_empty() => {
                    sink.status(PLANNER_EMPTY_STATUS).await;
                    break StopReason::PlannerGaveUp;
                }
                PlannerVerdict::Queries(queries) => {
                    sink.status(format!("LLM provided new search queries: {:?}", queries))
                        .await;
                    state.history.extend(queries.iter().cloned());
                    state.batch = queries;
                }
            }
        };

        sink.status(REPORTING_STATUS).await;
        let report = synthesize_report(llm, query, state.contexts.as_slice()).await;
        let last = match &report {
            Report::Generated(text) => ResearchEvent::finished(REPORT_OK_STATUS, text.clone()),
            Report::Fallback => ResearchEvent::finished(REPORT_FAILED_STATUS, report.text()),
        };
        sink.emit(last).await;

        info!(
            ?stop,
            iterations = state.iteration,
            contexts = state.contexts.len(),
            "Research finished"
        );
        ResearchOutcome {
            stop,
            iterations: state.iteration,
            contexts: state.contexts,
            history: state.history,
            report: Some(report),
        }
    }

    /// One search/process/plan cycle over the current batch.
    ///
    /// New contexts are folded into `state` before the planner is consulted.
    async fn iterate(
        &self,
        llm: Llm<'_>,
        query: &str,
        state: &mut LoopState,
        sink: &EventSink,
    ) -> IterationOutcome {
        let n = state.iteration + 1;

        let results = self.search_all(&state.batch).await;
        let links = dedupe_links(&state.batch, results);
        sink.status(format!("Iteration {}: Found {} unique links.", n, links.len()))
            .await;
        debug!(iteration = n, links = links.len(), "Processing links");

        let new_contexts: Vec<String> = process_links(&self.caps, llm, query, &links)
            .await
            .into_iter()
            .flatten()
            .collect();

        if new_contexts.is_empty() {
            sink.status(format!("Iteration {}: No useful contexts found.", n))
                .await;
        } else {
            sink.status(format!(
                "Iteration {}: Found {} useful contexts.",
                n,
                new_contexts.len()
            ))
            .await;
        }
        state.contexts.extend(new_contexts.iter().cloned());

        let verdict = next_queries(llm, query, &state.history, state.contexts.as_slice()).await;

        IterationOutcome {
            new_contexts,
            unique_links: links.len(),
            verdict,
        }
    }

    /// Search every query concurrently; a failed search counts as no links.
    async fn search_all(&self, batch: &[String]) -> Vec<Vec<String>> {
        join_all(batch.iter().map(|query| async move {
            match self.caps.search.search(query).await {
                Ok(links) => {
                    debug!(query = %query, links = links.len(), "Search returned");
                    links
                }
                Err(e) => {
                    warn!(
                        query = %query,
                        search = self.caps.search.name(),
                        error = %e,
                        "Search failed"
                    );
                    Vec::new()
                }
            }
        }))
        .await
    }
}

/// Unique links of one iteration, in first-seen order, each tagged with the
/// query that produced it first.
fn dedupe_links(batch: &[String], results: Vec<Vec<String>>) -> Vec<CandidateLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for (query, urls) in batch.iter().zip(results) {
        for url in urls {
            if seen.insert(url.clone()) {
                links.push(CandidateLink::new(url, query.clone()));
            }
        }
    }
    links
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "research task panicked".to_string()
    }
}
