//! Bounded polling until a remote process reaches a terminal state.
//!
//! The probe reports `Ok(None)` while the remote side is still settling,
//! `Ok(Some(value))` on a terminal outcome, and `Err` on a fatal condition.
//! Sleeping is injected so callers can drive the loop without real time.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollBudget {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Settled(T),
    TimedOut { attempts: u32 },
}

/// Probes immediately, then sleeps `interval` between attempts (never after
/// the last one). N pending probes followed by a settled one cost exactly
/// N+1 probes and N sleeps.
pub fn poll_until_settled<T, E>(
    budget: PollBudget,
    mut probe: impl FnMut() -> Result<Option<T>, E>,
    mut sleep: impl FnMut(Duration),
) -> Result<PollOutcome<T>, E> {
    for attempt in 1..=budget.max_attempts {
        if let Some(value) = probe()? {
            return Ok(PollOutcome::Settled(value));
        }
        if attempt < budget.max_attempts {
            sleep(budget.interval);
        }
    }
    Ok(PollOutcome::TimedOut {
        attempts: budget.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(max_attempts: u32) -> PollBudget {
        PollBudget::new(Duration::from_secs(15), max_attempts)
    }

    #[test]
    fn settles_after_pending_probes_with_one_sleep_per_wait() {
        let mut probes = 0u32;
        let mut sleeps = Vec::new();

        let outcome = poll_until_settled(
            budget(40),
            || {
                probes += 1;
                Ok::<_, String>((probes > 3).then_some("ready"))
            },
            |interval| sleeps.push(interval),
        )
        .expect("probe never fails");

        assert_eq!(outcome, PollOutcome::Settled("ready"));
        assert_eq!(probes, 4);
        assert_eq!(sleeps, vec![Duration::from_secs(15); 3]);
    }

    #[test]
    fn immediate_success_never_sleeps() {
        let mut sleeps = 0u32;
        let outcome = poll_until_settled(
            budget(40),
            || Ok::<_, String>(Some(())),
            |_| sleeps += 1,
        )
        .expect("probe never fails");

        assert_eq!(outcome, PollOutcome::Settled(()));
        assert_eq!(sleeps, 0);
    }

    #[test]
    fn exhausted_budget_reports_timeout_with_attempt_count() {
        let mut probes = 0u32;
        let mut sleeps = 0u32;

        let outcome = poll_until_settled(
            budget(40),
            || {
                probes += 1;
                Ok::<Option<()>, String>(None)
            },
            |_| sleeps += 1,
        )
        .expect("probe never fails");

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 40 });
        assert_eq!(probes, 40);
        assert_eq!(sleeps, 39);
    }

    #[test]
    fn probe_errors_abort_immediately() {
        let mut probes = 0u32;
        let result: Result<PollOutcome<()>, String> = poll_until_settled(
            budget(40),
            || {
                probes += 1;
                Err("remote reported failure".to_string())
            },
            |_| panic!("must not sleep after a fatal probe"),
        );

        assert_eq!(result, Err("remote reported failure".to_string()));
        assert_eq!(probes, 1);
    }

    #[test]
    fn ceiling_is_interval_times_attempts() {
        assert_eq!(budget(40).ceiling(), Duration::from_secs(600));
    }
}
