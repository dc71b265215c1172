use serde::Serialize;

pub(crate) const VIOLATION_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum IntegrityVerdict {
    Ignored,
    #[serde(rename_all = "camelCase")]
    Warning { violation: u32, remaining_before_termination: u32, message: String },
    #[serde(rename_all = "camelCase")]
    Disqualified { violations: u32 },
}

/// Counts visibility losses while a session is active. Once the threshold is
/// reached it reports a single disqualification and disarms itself.
#[derive(Debug, Clone, Default)]
pub(crate) struct IntegrityMonitor {
    armed: bool,
    violations: u32,
}

impl IntegrityMonitor {
    pub(crate) fn arm(&mut self) {
        self.armed = true;
        self.violations = 0;
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed
    }

    pub(crate) fn violations(&self) -> u32 {
        self.violations
    }

    pub(crate) fn remaining_attempts(&self) -> u32 {
        VIOLATION_THRESHOLD.saturating_sub(self.violations)
    }

    pub(crate) fn record_visibility_loss(&mut self) -> IntegrityVerdict {
        if !self.armed {
            return IntegrityVerdict::Ignored;
        }

        self.violations += 1;
        if self.violations >= VIOLATION_THRESHOLD {
            self.armed = false;
            return IntegrityVerdict::Disqualified { violations: self.violations };
        }

        IntegrityVerdict::Warning {
            violation: self.violations,
            remaining_before_termination: VIOLATION_THRESHOLD - self.violations,
            message: warning_message(self.violations),
        }
    }
}

fn warning_message(violation: u32) -> String {
    format!(
        "WARNING {violation}/{}: Tab switching detected! Exam integrity protocols are active. \
         Switching tabs or minimizing the window is prohibited. {} more switch(es) will \
         automatically terminate your exam.",
        VIOLATION_THRESHOLD - 1,
        VIOLATION_THRESHOLD - violation
    )
}
