//! CI build workflow: push the generated files, watch for the artifact.

use oneclick_client_core::BuildArtifact;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    /// Files are being pushed to the destination repository.
    Pushing,
    /// Push landed; the host's pipeline is running.
    Building,
    Success(BuildArtifact),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("build destination is not configured")]
pub struct NotConfigured;

/// Ties a poll to the build epoch it was started in. A ticket from before a
/// reset (or a newer build) can never mutate the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket {
    epoch: u64,
}

#[derive(Debug)]
pub struct BuildWorkflow {
    state: BuildState,
    epoch: u64,
    pushed_at_ms: i64,
}

impl Default for BuildWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildWorkflow {
    pub fn new() -> Self {
        Self {
            state: BuildState::Idle,
            epoch: 0,
            pushed_at_ms: 0,
        }
    }

    pub fn state(&self) -> &BuildState {
        &self.state
    }

    /// When the current build's push landed. Polls only consider artifacts
    /// produced after this instant.
    pub fn pushed_at_ms(&self) -> i64 {
        self.pushed_at_ms
    }

    /// Starts a build. Refused while the destination is unconfigured, so the
    /// caller can redirect to settings instead. Starting over a previous
    /// outcome implicitly resets it.
    pub fn start(&mut self, destination_configured: bool) -> Result<(), NotConfigured> {
        if !destination_configured {
            return Err(NotConfigured);
        }
        self.epoch += 1;
        self.state = BuildState::Pushing;
        Ok(())
    }

    pub fn push_completed(&mut self, now_ms: i64) {
        if self.state == BuildState::Pushing {
            self.pushed_at_ms = now_ms;
            self.state = BuildState::Building;
        }
    }

    pub fn push_failed(&mut self, message: impl Into<String>) {
        if self.state == BuildState::Pushing {
            self.state = BuildState::Error(message.into());
        }
    }

    /// Issues a ticket for one artifact poll, or `None` when there is
    /// nothing to watch.
    pub fn poll_ticket(&self) -> Option<PollTicket> {
        match self.state {
            BuildState::Building => Some(PollTicket { epoch: self.epoch }),
            _ => None,
        }
    }

    /// Lands a poll result. Stale tickets are dropped without effect; an
    /// empty result keeps the build in `Building` for the next poll.
    pub fn observe_poll(&mut self, ticket: PollTicket, artifact: Option<BuildArtifact>) {
        if ticket.epoch != self.epoch || self.state != BuildState::Building {
            return;
        }
        if let Some(artifact) = artifact {
            self.state = BuildState::Success(artifact);
        }
    }

    pub fn observe_poll_failure(&mut self, ticket: PollTicket, message: impl Into<String>) {
        if ticket.epoch != self.epoch || self.state != BuildState::Building {
            return;
        }
        self.state = BuildState::Error(message.into());
    }

    /// Back to `Idle` from any state. Outstanding polls become stale.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.state = BuildState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> BuildArtifact {
        BuildArtifact {
            download_url: "https://host/artifact/1.zip".to_string(),
            web_url: "https://host/runs/1".to_string(),
        }
    }

    #[test]
    fn unconfigured_destination_refuses_to_start() {
        let mut build = BuildWorkflow::new();
        assert_eq!(build.start(false), Err(NotConfigured));
        assert_eq!(build.state(), &BuildState::Idle);
    }

    #[test]
    fn happy_path_runs_idle_to_success() {
        let mut build = BuildWorkflow::new();
        build.start(true).expect("start");
        assert_eq!(build.state(), &BuildState::Pushing);

        build.push_completed(1_000);
        assert_eq!(build.state(), &BuildState::Building);
        assert_eq!(build.pushed_at_ms(), 1_000);

        let ticket = build.poll_ticket().expect("ticket");
        build.observe_poll(ticket, None);
        assert_eq!(build.state(), &BuildState::Building);

        let ticket = build.poll_ticket().expect("ticket");
        build.observe_poll(ticket, Some(artifact()));
        assert_eq!(build.state(), &BuildState::Success(artifact()));
    }

    #[test]
    fn failed_push_never_reaches_building() {
        let mut build = BuildWorkflow::new();
        build.start(true).expect("start");
        build.push_failed("contents api returned 422");
        assert_eq!(
            build.state(),
            &BuildState::Error("contents api returned 422".to_string())
        );
        assert!(build.poll_ticket().is_none());
    }

    #[test]
    fn stale_poll_after_reset_changes_nothing() {
        let mut build = BuildWorkflow::new();
        build.start(true).expect("start");
        build.push_completed(1);
        let ticket = build.poll_ticket().expect("ticket");

        build.reset();
        assert_eq!(build.state(), &BuildState::Idle);

        // The in-flight poll lands after the reset.
        build.observe_poll(ticket, Some(artifact()));
        assert_eq!(build.state(), &BuildState::Idle);
        build.observe_poll_failure(ticket, "late failure");
        assert_eq!(build.state(), &BuildState::Idle);
    }

    #[test]
    fn stale_poll_from_a_previous_build_is_dropped() {
        let mut build = BuildWorkflow::new();
        build.start(true).expect("start");
        build.push_completed(1);
        let old_ticket = build.poll_ticket().expect("ticket");

        build.start(true).expect("restart");
        build.push_completed(2);
        build.observe_poll(old_ticket, Some(artifact()));
        assert_eq!(build.state(), &BuildState::Building);
    }

    #[test]
    fn reset_recovers_from_error() {
        let mut build = BuildWorkflow::new();
        build.start(true).expect("start");
        build.push_failed("boom");
        build.reset();
        assert_eq!(build.state(), &BuildState::Idle);
        assert!(build.start(true).is_ok());
    }
}
