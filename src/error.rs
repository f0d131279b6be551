use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BakeryError {
    #[error("a bakery needs at least one participant")]
    NoParticipants,

    #[error("each participant must run at least one iteration")]
    NoIterations,

    #[error("{participants} participants x {iterations} iterations overflows the counter")]
    TooManyIterations {
        participants: usize,
        iterations: usize,
    },

    #[error("bakery mutex poisoned: a participant panicked while holding it")]
    Poisoned,

    /// The bounded variant parks entrants once tickets pass `ceiling - participants`,
    /// so the ceiling has to leave room for at least one ticket.
    #[error("ticket ceiling {ceiling} must exceed the participant count {participants}")]
    CeilingTooLow { ceiling: usize, participants: usize },

    #[error("failed to query cpu affinity: {0}")]
    AffinityQuery(#[from] io::Error),

    #[error("failed to pin thread to cpu {cpu}: {source}")]
    Affinity {
        cpu: usize,
        #[source]
        source: io::Error,
    },

    #[error("participant {id} panicked")]
    WorkerPanicked { id: usize },
}
