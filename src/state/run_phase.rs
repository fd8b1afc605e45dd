/// Phase definitions for a single crawl run
///
/// A run moves `Init → LoadResume? → FetchIndex → Crawling → FinalFlush → Done`.
/// The only way out other than `Done` is `Aborted`, reached when the category
/// index cannot be fetched or the final snapshot cannot be written.
use std::fmt;

/// Represents the current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Coordinator built, nothing fetched yet
    Init,

    /// Reading a previous snapshot back into the session
    LoadResume,

    /// Fetching and parsing the category index
    FetchIndex,

    /// Walking categories, listing pages and product pages
    Crawling,

    /// Writing the complete record set one last time
    FinalFlush,

    /// Run finished, normally or because the item limit was reached
    Done,

    /// Category index unreachable, or the final snapshot write failed
    Aborted,
}

impl RunPhase {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::LoadResume)
                | (Self::Init, Self::FetchIndex)
                | (Self::LoadResume, Self::FetchIndex)
                | (Self::FetchIndex, Self::Crawling)
                | (Self::FetchIndex, Self::Aborted)
                | (Self::Crawling, Self::FinalFlush)
                | (Self::FinalFlush, Self::Done)
                | (Self::FinalFlush, Self::Aborted)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::LoadResume => "load_resume",
            Self::FetchIndex => "fetch_index",
            Self::Crawling => "crawling",
            Self::FinalFlush => "final_flush",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
