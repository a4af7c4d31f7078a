//! Drives the session: selection, the two generation actions, and the
//! snapshot the page renders.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::client::GenerationClient;
use crate::encoder::{self, FileHandle};
use crate::error::GenerationError;
use crate::state::{Completion, RequestKind, RequestState, Session, Ticket};

#[derive(Clone)]
pub struct Orchestrator {
    client: Arc<dyn GenerationClient>,
    session: Arc<Mutex<Session>>,
}

/// Read-only view of the session, as served to the page.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub generation: u64,
    pub image: Option<ImageInfo>,
    pub is_busy: bool,
    pub caption: RequestState,
    pub social_post: RequestState,
}

#[derive(Clone, Debug, Serialize)]
pub struct ImageInfo {
    pub name: String,
    pub mime_type: String,
    pub url: String,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            session: Arc::new(Mutex::new(Session::new())),
        }
    }

    // Transitions never leave the session half-updated, so a poisoned lock
    // still guards a consistent value.
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `file` the current image. Both request kinds return to idle and
    /// anything still in flight for the previous image will be discarded.
    pub fn select_image(&self, file: FileHandle) -> u64 {
        let name = file.name.clone();
        let generation = self.session().select_image(file);
        info!(generation, %name, "image selected");
        generation
    }

    pub async fn generate_caption(&self) {
        self.generate(RequestKind::Caption).await
    }

    pub async fn generate_social_post(&self) {
        self.generate(RequestKind::SocialPost).await
    }

    /// Run one generation for `kind` to completion. The outcome is only
    /// observable through [`Orchestrator::snapshot`].
    pub async fn generate(&self, kind: RequestKind) {
        if let Ok((ticket, file)) = self.begin(kind) {
            self.run(ticket, file).await;
        }
    }

    /// Enter `Pending` now and finish the request on a background task.
    ///
    /// Errors are the precondition failures; they are already reflected in
    /// the session when returned.
    pub fn start(&self, kind: RequestKind) -> Result<JoinHandle<()>, GenerationError> {
        let (ticket, file) = self.begin(kind)?;
        let this = self.clone();
        Ok(tokio::spawn(async move { this.run(ticket, file).await }))
    }

    fn begin(&self, kind: RequestKind) -> Result<(Ticket, FileHandle), GenerationError> {
        let result = self.session().begin(kind);
        match &result {
            Ok((ticket, _)) => info!(%kind, generation = ticket.generation, "generation started"),
            Err(err) => warn!(%kind, error = %err, "generation not started"),
        }
        result
    }

    async fn run(&self, ticket: Ticket, file: FileHandle) {
        let outcome = self.fetch(ticket.kind, &file).await;
        if let Err(err) = &outcome {
            warn!(kind = %ticket.kind, error = %err, "generation failed");
        }

        let completion = self.session().complete(ticket, outcome);
        match completion {
            Completion::Applied => {
                info!(kind = %ticket.kind, generation = ticket.generation, "generation finished")
            }
            Completion::Stale => warn!(
                kind = %ticket.kind,
                generation = ticket.generation,
                "discarding result for superseded image"
            ),
        }
    }

    async fn fetch(&self, kind: RequestKind, file: &FileHandle) -> Result<String, GenerationError> {
        let image = encoder::encode(file).await?;
        let text = match kind {
            RequestKind::Caption => self.client.request_caption(&image).await?,
            RequestKind::SocialPost => self.client.request_social_post(&image).await?,
        };
        Ok(text)
    }

    pub fn snapshot(&self) -> Snapshot {
        let session = self.session();
        Snapshot {
            generation: session.generation(),
            image: session.image().map(|image| ImageInfo {
                name: image.file.name.clone(),
                mime_type: image.file.mime_hint().to_string(),
                url: image.display_url(),
            }),
            is_busy: session.is_busy(),
            caption: session.request(RequestKind::Caption).clone(),
            social_post: session.request(RequestKind::SocialPost).clone(),
        }
    }

    /// The file behind the display URL of `generation`, if it is still current.
    pub fn preview(&self, generation: u64) -> Option<FileHandle> {
        self.session()
            .image()
            .filter(|image| image.generation == generation)
            .map(|image| image.file.clone())
    }
}
