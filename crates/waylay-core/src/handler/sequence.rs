//! Resolver kinds and the resumable-sequence record.

use super::ResolverFn;
use crate::response::MockResponse;
use parking_lot::Mutex;

/// How a handler produces its response.
pub enum Responder {
    /// A single resolver invoked on every matching request.
    Direct(ResolverFn),
    /// An ordered sequence of resolvers advanced one step per matching
    /// request. Restartable only by re-declaring the handler.
    Sequence {
        steps: Vec<ResolverFn>,
        cursor: Mutex<SequenceCursor>,
    },
}

impl Responder {
    pub fn direct(resolver: ResolverFn) -> Self {
        Responder::Direct(resolver)
    }

    pub fn sequence(steps: Vec<ResolverFn>) -> Self {
        Responder::Sequence {
            steps,
            cursor: Mutex::new(SequenceCursor::default()),
        }
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Responder::Direct(_) => f.write_str("Responder::Direct"),
            Responder::Sequence { steps, cursor } => f
                .debug_struct("Responder::Sequence")
                .field("steps", &steps.len())
                .field("cursor", &*cursor.lock())
                .finish(),
        }
    }
}

/// Explicit cursor-and-cache record replacing a resumable-function construct:
/// step index, last produced value, exhausted flag. Advanced by exactly one
/// step per dispatch, which keeps the state inspectable in tests.
#[derive(Debug, Default)]
pub struct SequenceCursor {
    pub(crate) next: usize,
    pub(crate) exhausted: bool,
    pub(crate) last: Option<MockResponse>,
}
