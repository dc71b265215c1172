pub(crate) const SECONDS_PER_QUESTION: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClockTick {
    /// Clock is not running; nothing happened.
    Idle,
    Running(u32),
    /// The countdown just reached zero. Reported once per start.
    Expired,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SessionClock {
    remaining: u32,
    running: bool,
}

impl SessionClock {
    pub(crate) fn budget_for(question_count: usize) -> u32 {
        (question_count as u32).saturating_mul(SECONDS_PER_QUESTION)
    }

    pub(crate) fn start(&mut self, seconds: u32) {
        self.remaining = seconds;
        self.running = true;
    }

    pub(crate) fn stop(&mut self) {
        self.running = false;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn remaining(&self) -> u32 {
        self.remaining
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn tick(&mut self) -> ClockTick {
        if !self.running {
            return ClockTick::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            return ClockTick::Expired;
        }

        ClockTick::Running(self.remaining)
    }
}

pub(crate) fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
