//! Typing indicator state machine.
//!
//! Every `start` bumps a generation; a scheduled revert only takes effect if
//! its generation is still current, so a stale timer can never clear a newer
//! typing burst.

/// Local typing state of one conversation presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypingState {
    #[default]
    Idle,
    Typing { generation: u64 },
}

#[derive(Debug, Default)]
pub struct TypingMachine {
    state: TypingState,
    next_generation: u64,
}

impl TypingMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TypingState {
        self.state
    }

    pub fn is_typing(&self) -> bool {
        matches!(self.state, TypingState::Typing { .. })
    }

    /// Enter (or re-arm) typing. Returns the generation the revert must carry.
    pub fn start(&mut self) -> u64 {
        self.next_generation += 1;
        self.state = TypingState::Typing {
            generation: self.next_generation,
        };
        self.next_generation
    }

    /// Explicit stop. Returns whether the state changed.
    pub fn stop(&mut self) -> bool {
        let was_typing = self.is_typing();
        self.state = TypingState::Idle;
        was_typing
    }

    /// Timed revert. Only the current generation may expire.
    pub fn expire(&mut self, generation: u64) -> bool {
        match self.state {
            TypingState::Typing { generation: current } if current == generation => {
                self.state = TypingState::Idle;
                true
            }
            _ => false,
        }
    }
}
