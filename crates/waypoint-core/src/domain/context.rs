use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// The data record threaded through a running flow
///
/// A context is never mutated in place. The engine keeps it behind an
/// `Arc` and every accepted transition stores the value a reducer built
/// from `&previous`, so handles given out earlier keep observing the old
/// fields.
///
/// `View` is the tagged union of screens the flow can show. The transition
/// that enters a state decides which variant goes into the context, and
/// renderers match on it exhaustively.
pub trait FlowContext: Clone + Debug + Send + Sync + 'static {
    /// Screens this flow can render
    type View: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Caller-supplied parameters the initial-context factory is seeded with
    type Seed: Send + 'static;

    /// The view the runner should render right now
    fn current_view(&self) -> Option<&Self::View>;
}

/// Step bookkeeping shown by wizard chrome ("step 2 of 6")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// One-based index of the current step, zero before the first step
    pub current_step: u32,

    /// Total number of steps on the current path
    pub total_steps: u32,
}

impl Progress {
    /// Progress at the very start of a path of `total_steps`
    pub const fn new(total_steps: u32) -> Self {
        Self {
            current_step: 0,
            total_steps,
        }
    }

    /// Progress positioned at `step`
    pub const fn at(step: u32, total_steps: u32) -> Self {
        Self {
            current_step: step,
            total_steps,
        }
    }

    /// The next step, never past the total
    pub fn advance(self) -> Self {
        Self {
            current_step: (self.current_step + 1).min(self.total_steps),
            ..self
        }
    }

    /// Same position on a path with a different length
    pub fn with_total(self, total_steps: u32) -> Self {
        Self {
            current_step: self.current_step.min(total_steps),
            total_steps,
        }
    }

    /// Whether the final step has been reached
    pub fn is_last(&self) -> bool {
        self.total_steps > 0 && self.current_step == self.total_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_advance_saturates() {
        let progress = Progress::at(2, 3).advance();
        assert_eq!(progress, Progress::at(3, 3));
        assert!(progress.is_last());
        assert_eq!(progress.advance(), Progress::at(3, 3));
    }

    #[test]
    fn test_progress_with_shorter_path() {
        let progress = Progress::at(5, 8).with_total(4);
        assert_eq!(progress, Progress::at(4, 4));
        assert!(!Progress::new(0).is_last());
    }
}
