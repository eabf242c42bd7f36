// release.rs

/// High-level release mechanism state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReleaseState {
    /// Not initialized; no command issued yet.
    #[default]
    Unknown = 0,
    /// Commanded to the lock position.
    Locked = 1,
    /// Commanded to release; latched for the power cycle.
    Released = 2,
}

/// Commands pushed to the physical actuator driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReleaseCommand {
    Lock,
    Release,
    /// Full-stroke life check: release, hold, return. Diagnostic only.
    Wiggle,
}

/// Actuator collaborator driven by the release latch.
pub trait ReleaseActuator {
    fn drive(&mut self, command: ReleaseCommand);
}

/// Actuator that performs no hardware interaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReleaseActuator;

impl ReleaseActuator for NoopReleaseActuator {
    fn drive(&mut self, _: ReleaseCommand) {}
}

/// One-shot release latch.
///
/// `Unknown -> Locked`, then either stays `Locked` or transitions once
/// to `Released`, which is terminal for the power cycle: subsequent
/// `Lock` commands are rejected and further `Release` commands are
/// accepted no-ops. The ground-test wiggle moves the mechanism but must
/// never set the latch.
pub struct ReleaseLatch {
    state: ReleaseState,
    released: bool,
}

impl ReleaseLatch {
    pub const fn new() -> Self {
        Self {
            state: ReleaseState::Unknown,
            released: false,
        }
    }

    /// Initializes the mechanism: command lock. Call once at boot.
    pub fn init<A: ReleaseActuator>(&mut self, actuator: &mut A) {
        let _ = self.lock(actuator);
    }

    /// Commands lock. Rejected once released; returns whether the
    /// command was accepted.
    pub fn lock<A: ReleaseActuator>(&mut self, actuator: &mut A) -> bool {
        if self.released {
            self.state = ReleaseState::Released;
            return false;
        }
        actuator.drive(ReleaseCommand::Lock);
        self.state = ReleaseState::Locked;
        true
    }

    /// Commands release and latches. Idempotent: repeated calls are
    /// no-ops that still report success.
    pub fn release<A: ReleaseActuator>(&mut self, actuator: &mut A) -> bool {
        if !self.released {
            actuator.drive(ReleaseCommand::Release);
            self.released = true;
            self.state = ReleaseState::Released;
        }
        true
    }

    /// Ground-test life check. Refused after release; never latches.
    pub fn wiggle<A: ReleaseActuator>(&mut self, actuator: &mut A) {
        if self.released {
            return;
        }
        actuator.drive(ReleaseCommand::Wiggle);
        let _ = self.lock(actuator);
    }

    pub const fn is_released(&self) -> bool {
        self.released
    }

    pub const fn state(&self) -> ReleaseState {
        self.state
    }
}

impl Default for ReleaseLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every command pushed to the driver.
    #[derive(Default)]
    struct RecordingActuator {
        commands: heapless::Vec<ReleaseCommand, 16>,
    }

    impl ReleaseActuator for RecordingActuator {
        fn drive(&mut self, command: ReleaseCommand) {
            let _ = self.commands.push(command);
        }
    }

    #[test]
    fn init_commands_lock() {
        let mut latch = ReleaseLatch::new();
        let mut actuator = RecordingActuator::default();
        assert_eq!(latch.state(), ReleaseState::Unknown);
        latch.init(&mut actuator);
        assert_eq!(latch.state(), ReleaseState::Locked);
        assert_eq!(actuator.commands.as_slice(), &[ReleaseCommand::Lock]);
    }

    #[test]
    fn release_is_one_shot_and_idempotent() {
        let mut latch = ReleaseLatch::new();
        let mut actuator = RecordingActuator::default();
        latch.init(&mut actuator);

        assert!(latch.release(&mut actuator));
        assert!(latch.is_released());
        assert_eq!(latch.state(), ReleaseState::Released);

        // N further releases are accepted no-ops: one physical command
        // total.
        for _ in 0..5 {
            assert!(latch.release(&mut actuator));
        }
        let releases = actuator
            .commands
            .iter()
            .filter(|c| **c == ReleaseCommand::Release)
            .count();
        assert_eq!(releases, 1);
    }

    #[test]
    fn lock_after_release_is_rejected() {
        let mut latch = ReleaseLatch::new();
        let mut actuator = RecordingActuator::default();
        latch.init(&mut actuator);
        latch.release(&mut actuator);

        assert!(!latch.lock(&mut actuator));
        assert_eq!(latch.state(), ReleaseState::Released);
        assert!(latch.is_released());
        // No Lock command reached the hardware after the latch.
        assert_eq!(
            actuator.commands.as_slice(),
            &[ReleaseCommand::Lock, ReleaseCommand::Release]
        );
    }

    #[test]
    fn wiggle_never_latches_release() {
        let mut latch = ReleaseLatch::new();
        let mut actuator = RecordingActuator::default();
        latch.init(&mut actuator);

        latch.wiggle(&mut actuator);
        assert!(!latch.is_released());
        assert_eq!(latch.state(), ReleaseState::Locked);
        assert_eq!(
            actuator.commands.as_slice(),
            &[
                ReleaseCommand::Lock,
                ReleaseCommand::Wiggle,
                ReleaseCommand::Lock
            ]
        );
    }

    #[test]
    fn wiggle_refused_after_release() {
        let mut latch = ReleaseLatch::new();
        let mut actuator = RecordingActuator::default();
        latch.init(&mut actuator);
        latch.release(&mut actuator);

        let before = actuator.commands.len();
        latch.wiggle(&mut actuator);
        assert_eq!(actuator.commands.len(), before);
    }
}
