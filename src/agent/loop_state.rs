//! Agent loop state management
//!
//! Tracks one run of the reasoning loop: iteration count, the phase the
//! ceiling puts each iteration in, and accumulated token estimates.

use std::fmt;

/// Where the loop is in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    Idle,
    Iterating,
    ToolExecuting,
    Done,
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopStatus::Idle => "idle",
            LoopStatus::Iterating => "iterating",
            LoopStatus::ToolExecuting => "tool_executing",
            LoopStatus::Done => "done",
        };
        f.write_str(s)
    }
}

/// How close an iteration is to the ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationPhase {
    /// Tools offered as usual
    Normal,
    /// One iteration left after this one: warn the model
    Closing,
    /// Last iteration: tools withheld, text answer required
    Forced,
}

/// State of one `run` of the reasoning loop
#[derive(Debug, Clone)]
pub struct LoopState {
    /// Current iteration (1-based, 0 before the first)
    pub iteration: usize,
    /// Iteration ceiling
    pub max_iterations: usize,
    /// Sum of per-turn context token estimates
    pub total_tokens: usize,
    pub status: LoopStatus,
}

impl LoopState {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            total_tokens: 0,
            status: LoopStatus::Idle,
        }
    }

    /// Check if another iteration may start
    pub fn should_continue(&self) -> bool {
        self.status != LoopStatus::Done && self.iteration < self.max_iterations
    }

    /// Start the next iteration and return its number
    pub fn begin_iteration(&mut self) -> usize {
        self.iteration += 1;
        self.status = LoopStatus::Iterating;
        self.iteration
    }

    /// Iterations left after the current one
    pub fn remaining(&self) -> usize {
        self.max_iterations.saturating_sub(self.iteration)
    }

    pub fn phase(&self) -> IterationPhase {
        match self.remaining() {
            0 => IterationPhase::Forced,
            1 => IterationPhase::Closing,
            _ => IterationPhase::Normal,
        }
    }

    pub fn begin_tools(&mut self) {
        self.status = LoopStatus::ToolExecuting;
    }

    pub fn finish(&mut self) {
        self.status = LoopStatus::Done;
    }

    pub fn add_tokens(&mut self, tokens: usize) {
        self.total_tokens += tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_state_new() {
        let state = LoopState::new(10);
        assert_eq!(state.iteration, 0);
        assert_eq!(state.status, LoopStatus::Idle);
        assert_eq!(state.total_tokens, 0);
    }

    #[test]
    fn test_phases_approach_ceiling() {
        let mut state = LoopState::new(3);
        state.begin_iteration();
        assert_eq!(state.phase(), IterationPhase::Normal);
        state.begin_iteration();
        assert_eq!(state.phase(), IterationPhase::Closing);
        state.begin_iteration();
        assert_eq!(state.phase(), IterationPhase::Forced);
        assert!(!state.should_continue());
    }

    #[test]
    fn test_single_iteration_is_forced() {
        let mut state = LoopState::new(1);
        assert!(state.should_continue());
        state.begin_iteration();
        assert_eq!(state.phase(), IterationPhase::Forced);
    }

    #[test]
    fn test_finish_stops_loop() {
        let mut state = LoopState::new(5);
        state.begin_iteration();
        state.finish();
        assert!(!state.should_continue());
    }
}
