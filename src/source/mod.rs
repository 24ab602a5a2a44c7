//! Boundary to the camera and face-detector collaborator.
//!
//! A source yields one [`RawObservation`] per captured frame. Detection and
//! pose solving happen on the other side of this trait.

pub mod replay;

use thiserror::Error;

use crate::store::schema::Settings;
use crate::tracking::types::RawObservation;

pub use replay::ReplaySource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),
    #[error("malformed observation on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub trait ObservationSource: Send {
    /// Open (or reopen) the device described by the capture settings.
    fn open(&mut self, settings: &Settings) -> Result<(), SourceError>;

    fn is_open(&self) -> bool;

    /// Next frame's observation. `Ok(None)` means no frame this cycle.
    fn read(&mut self) -> Result<Option<RawObservation>, SourceError>;

    fn close(&mut self);
}

impl<S: ObservationSource + ?Sized> ObservationSource for Box<S> {
    fn open(&mut self, settings: &Settings) -> Result<(), SourceError> {
        (**self).open(settings)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn read(&mut self) -> Result<Option<RawObservation>, SourceError> {
        (**self).read()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
