//! Session state and its transitions.
//!
//! Everything here is synchronous and free of I/O. The orchestrator wraps a
//! [`Session`] in a lock and drives it; tests exercise it directly.

use std::fmt;

use serde::Serialize;

use crate::encoder::FileHandle;
use crate::error::GenerationError;

/// The two artifacts the page can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Caption,
    SocialPost,
}

impl RequestKind {
    pub const ALL: [RequestKind; 2] = [RequestKind::Caption, RequestKind::SocialPost];

    /// Task directive sent to the generation service with the image.
    pub fn directive(self) -> &'static str {
        match self {
            RequestKind::Caption => {
                "Describe this image in detail. Provide a clear, descriptive caption."
            }
            RequestKind::SocialPost => {
                "Write an engaging social media post about this image. \
                 Keep it short and upbeat, and end with three to five relevant hashtags."
            }
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Caption => f.write_str("caption"),
            RequestKind::SocialPost => f.write_str("social post"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Lifecycle of one request kind. A result and an error can never coexist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Pending,
    Succeeded(String),
    Failed(String),
}

impl RequestState {
    pub fn phase(&self) -> Phase {
        match self {
            RequestState::Idle => Phase::Idle,
            RequestState::Pending => Phase::Pending,
            RequestState::Succeeded(_) => Phase::Succeeded,
            RequestState::Failed(_) => Phase::Failed,
        }
    }

    pub fn result(&self) -> Option<&str> {
        match self {
            RequestState::Succeeded(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending)
    }
}

impl Serialize for RequestState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("RequestState", 3)?;
        s.serialize_field("phase", &self.phase())?;
        s.serialize_field("result", &self.result())?;
        s.serialize_field("error", &self.error())?;
        s.end()
    }
}

/// The currently selected image, tagged with the generation it was selected in.
#[derive(Clone, Debug)]
pub struct SelectedImage {
    pub file: FileHandle,
    pub generation: u64,
}

impl SelectedImage {
    /// URL the page uses to preview the image. Valid until the next selection.
    pub fn display_url(&self) -> String {
        format!("/api/image/{}", self.generation)
    }
}

/// Proof that a slot entered `Pending`; handed back on completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub kind: RequestKind,
    pub generation: u64,
}

/// What happened to a completion handed to [`Session::complete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The image changed (or the slot was reset) while the request was in flight.
    Stale,
}

#[derive(Debug, Default)]
pub struct Session {
    generation: u64,
    image: Option<SelectedImage>,
    caption: RequestState,
    social_post: RequestState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn image(&self) -> Option<&SelectedImage> {
        self.image.as_ref()
    }

    pub fn request(&self, kind: RequestKind) -> &RequestState {
        match kind {
            RequestKind::Caption => &self.caption,
            RequestKind::SocialPost => &self.social_post,
        }
    }

    fn slot_mut(&mut self, kind: RequestKind) -> &mut RequestState {
        match kind {
            RequestKind::Caption => &mut self.caption,
            RequestKind::SocialPost => &mut self.social_post,
        }
    }

    pub fn is_busy(&self) -> bool {
        RequestKind::ALL
            .iter()
            .any(|kind| self.request(*kind).is_pending())
    }

    /// Replace the selected image and reset both slots, pending or not.
    ///
    /// The previous image is dropped here, which releases its display URL.
    pub fn select_image(&mut self, file: FileHandle) -> u64 {
        self.generation += 1;
        self.image = Some(SelectedImage {
            file,
            generation: self.generation,
        });
        self.caption = RequestState::Idle;
        self.social_post = RequestState::Idle;
        self.generation
    }

    /// Move `kind` into `Pending`.
    ///
    /// Without a selected image the slot fails immediately with the
    /// precondition message. A slot that is already pending is left alone.
    pub fn begin(&mut self, kind: RequestKind) -> Result<(Ticket, FileHandle), GenerationError> {
        let Some(image) = &self.image else {
            let err = GenerationError::NoImageSelected;
            *self.slot_mut(kind) = RequestState::Failed(err.display_message());
            return Err(err);
        };
        if self.request(kind).is_pending() {
            return Err(GenerationError::AlreadyPending(kind));
        }

        let ticket = Ticket {
            kind,
            generation: image.generation,
        };
        let file = image.file.clone();
        *self.slot_mut(kind) = RequestState::Pending;
        Ok((ticket, file))
    }

    /// Apply the outcome of the request identified by `ticket`, unless a newer
    /// selection has made it irrelevant.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        outcome: Result<String, GenerationError>,
    ) -> Completion {
        if ticket.generation != self.generation || !self.request(ticket.kind).is_pending() {
            return Completion::Stale;
        }

        *self.slot_mut(ticket.kind) = match outcome {
            Ok(text) => RequestState::Succeeded(text),
            Err(err) => RequestState::Failed(err.display_message()),
        };
        Completion::Applied
    }
}
