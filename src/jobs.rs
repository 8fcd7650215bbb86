//! Background execution of store and gateway calls.
//!
//! Screens never call the gateway or the store directly. They queue a [`Job`]
//! tagged with a [`Ticket`]; the main loop hands it to [`spawn`], and the
//! worker posts exactly one [`JobOutcome`] back through the event channel.
//! Nothing is cancelled: a screen that no longer expects a ticket simply
//! drops the late outcome.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use thiserror::Error;

use crate::error::{RemoteServiceError, StorageError};
use crate::event::AppEvent;
use crate::gateway::{
    ContentService, Evaluation, Flashcard, PyqAnalysis, Question, document_mime_type,
};
use crate::session::mock_test::EvaluationRequest;
use crate::store::history_store::StoreHandle;
use crate::store::schema::{MockTestOptions, TestRecord};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn next(self) -> Self {
        Ticket(self.0 + 1)
    }
}

#[derive(Debug)]
pub enum Job {
    ModuleMaterials { text: String },
    AnalyzePaper { path: PathBuf },
    GenerateTest { options: MockTestOptions },
    Evaluate(EvaluationRequest),
    SaveTest(Box<TestRecord>),
    LoadHistory,
    ClearHistory,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::ModuleMaterials { .. } => "module-materials",
            Job::AnalyzePaper { .. } => "analyze-paper",
            Job::GenerateTest { .. } => "generate-test",
            Job::Evaluate(_) => "evaluate",
            Job::SaveTest(_) => "save-test",
            Job::LoadHistory => "load-history",
            Job::ClearHistory => "clear-history",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Materials {
    pub notes: String,
    pub flashcards: Vec<Flashcard>,
}

#[derive(Debug, Error)]
pub enum PaperError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Remote(#[from] RemoteServiceError),
}

#[derive(Debug)]
pub enum JobOutcome {
    Materials(Result<Materials, RemoteServiceError>),
    Analysis(Result<PyqAnalysis, PaperError>),
    Questions(Result<Vec<Question>, RemoteServiceError>),
    Evaluated {
        index: usize,
        result: Result<Evaluation, RemoteServiceError>,
    },
    Saved(Result<TestRecord, StorageError>),
    History(Result<Vec<TestRecord>, StorageError>),
    Cleared(Result<(), StorageError>),
}

/// Shared handles every worker gets a clone of.
#[derive(Clone)]
pub struct Services {
    pub content: Arc<dyn ContentService>,
    pub store: Arc<StoreHandle>,
}

/// Run `job` on the current thread.
pub fn run(job: Job, services: &Services) -> JobOutcome {
    let content = services.content.as_ref();
    match job {
        Job::ModuleMaterials { text } => JobOutcome::Materials(module_materials(content, &text)),
        Job::AnalyzePaper { path } => JobOutcome::Analysis(analyze_paper(content, path)),
        Job::GenerateTest { options } => JobOutcome::Questions(content.generate_test(&options)),
        Job::Evaluate(req) => JobOutcome::Evaluated {
            index: req.index,
            result: content.evaluate_answer(
                &req.question,
                &req.user_answer,
                &req.model_answer,
                req.marks,
            ),
        },
        Job::SaveTest(record) => {
            JobOutcome::Saved(services.store.put_record(&record).map(|()| *record))
        }
        Job::LoadHistory => JobOutcome::History(services.store.get_all_records()),
        Job::ClearHistory => JobOutcome::Cleared(services.store.clear_all()),
    }
}

/// Run `job` on a worker thread and post its outcome to `tx`.
pub fn spawn(ticket: Ticket, job: Job, services: Services, tx: Sender<AppEvent>) {
    let name = job.name();
    tracing::debug!(?ticket, job = name, "job started");
    thread::spawn(move || {
        let outcome = run(job, &services);
        tracing::debug!(?ticket, job = name, "job finished");
        // The receiver is gone only when the UI is shutting down.
        let _ = tx.send(AppEvent::Job(ticket, outcome));
    });
}

/// Notes and flashcards are requested together; either failing fails both.
fn module_materials(
    content: &dyn ContentService,
    text: &str,
) -> Result<Materials, RemoteServiceError> {
    let (notes, flashcards) = thread::scope(|s| {
        let notes = s.spawn(|| content.generate_notes(text));
        let flashcards = content.generate_flashcards(text);
        let notes = match notes.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        (notes, flashcards)
    });
    Ok(Materials {
        notes: notes?,
        flashcards: flashcards?,
    })
}

fn analyze_paper(content: &dyn ContentService, path: PathBuf) -> Result<PyqAnalysis, PaperError> {
    let bytes = std::fs::read(&path).map_err(|source| PaperError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mime_type = document_mime_type(&path);
    Ok(content.analyze_document(&bytes, mime_type)?)
}
