use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{CatalogClient, ImageClient};
use crate::config::Settings;
use crate::domain::{Quality, Set, SetCode, SetSelection};
use crate::error::ScryError;
use crate::planner::{DownloadTask, plan_all};
use crate::progress::ProgressTracker;
use crate::scheduler::{BatchOutcome, Scheduler};
use crate::store::{Store, StoreAction};

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub planned: usize,
    pub completed: usize,
    pub succeeded: usize,
    /// Tasks that succeeded because the image was already on disk.
    pub already_present: usize,
    pub success: bool,
    pub message: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetBatchResult {
    pub report: BatchReport,
    /// Requested codes found in the catalog. This says nothing about whether
    /// any of their images were downloaded; see `report` for that.
    pub recognized: Vec<String>,
    pub not_found: Vec<String>,
    /// Recognized sets whose card listing could not be fetched.
    pub listing_failed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardBatchResult {
    pub card_name: String,
    pub printings: usize,
    pub report: BatchReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetListResult {
    pub total: usize,
    pub sets: Vec<Set>,
}

#[derive(Debug, Clone, Copy)]
pub enum ProgressSinkKind {
    Sets,
    Card,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            elapsed: None,
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<C: CatalogClient, I: ImageClient> {
    catalog: C,
    images: I,
    store: Store,
    scheduler: Scheduler,
    quality: Quality,
    sets: Mutex<Option<Arc<Vec<Set>>>>,
}

impl<C: CatalogClient, I: ImageClient> App<C, I> {
    pub fn new(settings: &Settings, catalog: C, images: I) -> Self {
        Self {
            catalog,
            images,
            store: Store::new(settings.download_dir.clone()),
            scheduler: Scheduler::new(settings.workers, Arc::new(ProgressTracker::new())),
            quality: settings.quality,
            sets: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Shared counters of the batch currently running, for polling.
    pub fn tracker(&self) -> Arc<ProgressTracker> {
        self.scheduler.tracker()
    }

    /// Set catalog, fetched on first use and kept for the life of the app.
    pub fn sets(&self, sink: &dyn ProgressSink) -> Result<Arc<Vec<Set>>, ScryError> {
        let mut guard = self
            .sets
            .lock()
            .map_err(|_| ScryError::Filesystem("set catalog lock poisoned".to_string()))?;
        if let Some(sets) = guard.as_ref() {
            return Ok(sets.clone());
        }

        sink.event(ProgressEvent::new("phase=Resolve; loading set catalog"));
        let sets = Arc::new(self.catalog.fetch_sets()?);
        info!(count = sets.len(), "set catalog loaded");
        *guard = Some(sets.clone());
        Ok(sets)
    }

    pub fn list_sets(
        &self,
        filter: Option<&str>,
        limit: Option<usize>,
        sink: &dyn ProgressSink,
    ) -> Result<SetListResult, ScryError> {
        let catalog = self.sets(sink)?;
        let matching = catalog
            .iter()
            .filter(|set| filter.is_none_or(|filter| set.matches_filter(filter)))
            .cloned()
            .collect::<Vec<_>>();
        let total = matching.len();
        let sets = match limit {
            Some(limit) => matching.into_iter().take(limit).collect(),
            None => matching,
        };
        Ok(SetListResult { total, sets })
    }

    pub fn download_sets(
        &self,
        selection: &SetSelection,
        sink: &dyn ProgressSink,
    ) -> Result<SetBatchResult, ScryError> {
        let started = Instant::now();
        let catalog = self.sets(sink)?;
        let codes = resolve_selection(selection, &catalog);
        sink.event(ProgressEvent::new(format!(
            "phase=Resolve; {} set(s) requested",
            codes.len()
        )));

        let mut tasks = Vec::new();
        let mut recognized = Vec::new();
        let mut not_found = Vec::new();
        let mut listing_failed = Vec::new();

        for code in &codes {
            let Some(set) = catalog.iter().find(|set| set.matches_code(code)) else {
                warn!(code = %code, "set not in catalog");
                sink.event(ProgressEvent::new(format!(
                    "phase=Resolve; {} not found",
                    code.as_str().to_uppercase()
                )));
                not_found.push(code.to_string());
                continue;
            };
            recognized.push(code.to_string());

            sink.event(ProgressEvent::new(format!(
                "phase=Prepare; listing {} ({} cards)",
                set.code.to_uppercase(),
                set.card_count
            )));
            match self.catalog.fetch_paged_cards(&set.search_uri) {
                Ok(cards) => {
                    let planned = plan_all(&cards, self.quality);
                    info!(set = %set.code, cards = cards.len(), tasks = planned.len(), "set planned");
                    tasks.extend(planned);
                }
                Err(err) => {
                    warn!(set = %set.code, "card listing failed: {err}");
                    sink.event(ProgressEvent::new(format!(
                        "listing for {} failed: {err}",
                        set.code.to_uppercase()
                    )));
                    listing_failed.push(code.to_string());
                }
            }
        }

        let (outcome, already_present) = self.execute(&tasks, sink);
        let message = if tasks.is_empty() {
            "no tasks to execute".to_string()
        } else if codes.len() > 1 {
            format!(
                "download of {} sets finished: {} images processed",
                codes.len(),
                outcome.succeeded
            )
        } else {
            format!("download finished: {} images processed", outcome.succeeded)
        };
        sink.event(ProgressEvent {
            message: format!("phase=Store; {message}"),
            elapsed: Some(started.elapsed()),
        });

        Ok(SetBatchResult {
            report: build_report(tasks.len(), outcome, already_present, message),
            recognized,
            not_found,
            listing_failed,
        })
    }

    /// Looks a card up by (fuzzy) name and downloads every printing of it.
    pub fn download_card(
        &self,
        name: &str,
        sink: &dyn ProgressSink,
    ) -> Result<CardBatchResult, ScryError> {
        let started = Instant::now();
        sink.event(ProgressEvent::new(format!(
            "phase=Resolve; looking up {}",
            name.trim()
        )));
        let card = self.catalog.fetch_card_by_name(name.trim())?;

        let printings = if card.prints_search_uri.trim().is_empty() {
            vec![card.clone()]
        } else {
            sink.event(ProgressEvent::new(format!(
                "phase=Prepare; listing printings of {}",
                card.name
            )));
            self.catalog.fetch_paged_cards(&card.prints_search_uri)?
        };

        let tasks = plan_all(&printings, self.quality);
        info!(card = %card.name, printings = printings.len(), tasks = tasks.len(), "card planned");

        let (outcome, already_present) = self.execute(&tasks, sink);
        let message = format!(
            "{}/{} images downloaded for '{}'",
            outcome.succeeded,
            tasks.len(),
            card.name
        );
        sink.event(ProgressEvent {
            message: format!("phase=Store; {message}"),
            elapsed: Some(started.elapsed()),
        });

        Ok(CardBatchResult {
            card_name: card.name,
            printings: printings.len(),
            report: build_report(tasks.len(), outcome, already_present, message),
        })
    }

    fn execute(&self, tasks: &[DownloadTask], sink: &dyn ProgressSink) -> (BatchOutcome, usize) {
        sink.event(ProgressEvent::new(format!(
            "phase=Fetch; {} image(s), {} worker(s)",
            tasks.len(),
            self.scheduler.limit()
        )));
        let already_present = AtomicUsize::new(0);
        let outcome = self.scheduler.run(tasks, |task| {
            let action = self.store.fetch(task, &self.images)?;
            if action == StoreAction::Existing {
                already_present.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        });
        (outcome, already_present.into_inner())
    }
}

/// Expands a selection into concrete codes, keeping request order and
/// dropping repeats.
pub fn resolve_selection(selection: &SetSelection, catalog: &[Set]) -> Vec<SetCode> {
    let requested = match selection {
        SetSelection::All => catalog
            .iter()
            .filter(|set| !set.digital)
            .filter_map(|set| set.code.parse::<SetCode>().ok())
            .collect::<Vec<_>>(),
        SetSelection::Codes(codes) => codes.clone(),
    };
    let mut codes: Vec<SetCode> = Vec::with_capacity(requested.len());
    for code in requested {
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}

fn build_report(
    planned: usize,
    outcome: BatchOutcome,
    already_present: usize,
    message: String,
) -> BatchReport {
    BatchReport {
        planned,
        completed: outcome.completed,
        succeeded: outcome.succeeded,
        already_present,
        success: outcome.succeeded > 0,
        message,
        finished_at: iso_timestamp(),
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
