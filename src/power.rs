//! Idle timer and the sleep/wake state machine.
//!
//! ```text
//! AWAKE --(sample done)--> AWAKE
//! AWAKE --(idle timeout)--> SLEEP_PENDING --(shutdown sequence)--> HALTED
//! ```
//!
//! HALTED is terminal. Waking up is a cold boot that starts in AWAKE again.

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};

use crate::hal::PowerControl;
use crate::state::{PowerState, WakeEdge};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdleCommand {
    Stop,
    Restart,
}

pub struct PowerManager {
    pub(crate) command: Signal<CriticalSectionRawMutex, IdleCommand>,
    state: AtomicU8,
}

impl PowerManager {
    pub const fn new() -> Self {
        Self {
            command: Signal::new(),
            state: AtomicU8::new(PowerState::Awake as u8),
        }
    }

    pub fn state(&self) -> PowerState {
        PowerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PowerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Holds the node awake while a sample is in progress.
    pub fn stop_idle_timer(&self) {
        trace!("Sleep timer stopped");
        self.command.signal(IdleCommand::Stop);
    }

    /// Re-arms the full idle timeout. Replaces any pending expiry.
    pub fn restart_idle_timer(&self) {
        trace!("Sleep timer restarted");
        self.command.signal(IdleCommand::Restart);
    }

    /// Runs the idle timer, armed from the moment this is called, and performs
    /// the shutdown sequence when it expires. Returns the armed wake edge only
    /// where `power_off` returns (tests).
    pub async fn run<P: PowerControl>(&self, timeout: Duration, control: &mut P) -> WakeEdge {
        info!("Sleep timer started, system off in {} ms", timeout.as_millis());
        let mut deadline = Some(Instant::now() + timeout);

        loop {
            let command = match deadline {
                Some(at) => match select(Timer::at(at), self.command.wait()).await {
                    // a command that landed with the expiry still wins
                    Either::First(()) => match self.command.try_take() {
                        Some(command) => command,
                        None => break,
                    },
                    Either::Second(command) => command,
                },
                None => self.command.wait().await,
            };
            deadline = match command {
                IdleCommand::Stop => None,
                IdleCommand::Restart => Some(Instant::now() + timeout),
            };
        }

        self.halt(control).await
    }

    async fn halt<P: PowerControl>(&self, control: &mut P) -> WakeEdge {
        self.set_state(PowerState::SleepPending);
        info!("Sleep timer expired");

        let level = control.occupancy_level();
        let edge = WakeEdge::toward(level);
        info!("Switch state: {}, setting wakeup state to: {}", level, edge.target_level());
        control.arm_wake_edge(edge);

        control.release_charge_pull();

        info!("Entering system off");
        control.flush_logs().await;
        control.suspend_console();

        self.set_state(PowerState::Halted);
        control.power_off();
        edge
    }
}

impl Default for PowerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;
    use embassy_futures::select::{select, Either};
    use embassy_time::{Duration, Instant, Timer};
    use heapless::Vec;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        ReadLevel,
        Arm(WakeEdge),
        ReleasePull,
        Flush,
        SuspendConsole,
        PowerOff,
    }

    struct Recorder {
        level: bool,
        steps: Vec<Step, 8>,
    }

    impl Recorder {
        fn new(level: bool) -> Self {
            Self { level, steps: Vec::new() }
        }

        fn log(&mut self, step: Step) {
            self.steps.push(step).unwrap();
        }
    }

    impl PowerControl for Recorder {
        fn occupancy_level(&mut self) -> bool {
            self.log(Step::ReadLevel);
            self.level
        }

        fn arm_wake_edge(&mut self, edge: WakeEdge) {
            self.log(Step::Arm(edge));
        }

        fn release_charge_pull(&mut self) {
            self.log(Step::ReleasePull);
        }

        async fn flush_logs(&mut self) {
            self.log(Step::Flush);
        }

        fn suspend_console(&mut self) {
            self.log(Step::SuspendConsole);
        }

        fn power_off(&mut self) {
            self.log(Step::PowerOff);
        }
    }

    const TIMEOUT: Duration = Duration::from_millis(80);

    #[test]
    fn idle_timeout_runs_the_shutdown_sequence() {
        let power = PowerManager::new();
        let mut control = Recorder::new(true);

        assert_eq!(power.state(), PowerState::Awake);
        let edge = block_on(power.run(TIMEOUT, &mut control));

        assert_eq!(edge, WakeEdge::Falling);
        assert_eq!(power.state(), PowerState::Halted);
        assert_eq!(
            control.steps.as_slice(),
            &[
                Step::ReadLevel,
                Step::Arm(WakeEdge::Falling),
                Step::ReleasePull,
                Step::Flush,
                Step::SuspendConsole,
                Step::PowerOff,
            ]
        );
    }

    #[test]
    fn low_switch_arms_a_rising_edge() {
        let power = PowerManager::new();
        let mut control = Recorder::new(false);
        assert_eq!(block_on(power.run(TIMEOUT, &mut control)), WakeEdge::Rising);
    }

    #[test]
    fn restarts_keep_the_node_awake() {
        let power = PowerManager::new();
        let mut control = Recorder::new(false);

        let halted_after = block_on(async {
            let start = Instant::now();
            let activity = async {
                for _ in 0..4 {
                    Timer::after(Duration::from_millis(40)).await;
                    power.restart_idle_timer();
                }
                assert_eq!(power.state(), PowerState::Awake);
                // let the last restart run out
                Timer::after(TIMEOUT * 4).await;
            };
            match select(power.run(TIMEOUT, &mut control), activity).await {
                Either::First(_) => start.elapsed(),
                Either::Second(()) => panic!("node never went to sleep"),
            }
        });

        // last restart at ~160 ms plus a full timeout
        assert!(halted_after >= Duration::from_millis(240), "halted after {:?}", halted_after);
        assert_eq!(power.state(), PowerState::Halted);
    }

    #[test]
    fn stopped_timer_never_expires() {
        let power = PowerManager::new();
        let mut control = Recorder::new(false);

        let outcome = block_on(async {
            power.stop_idle_timer();
            select(power.run(TIMEOUT, &mut control), Timer::after(TIMEOUT * 3)).await
        });

        assert!(matches!(outcome, Either::Second(())));
        assert_eq!(power.state(), PowerState::Awake);
        assert!(control.steps.is_empty());
    }

    #[test]
    fn stop_arriving_with_the_expiry_keeps_the_node_awake() {
        let power = PowerManager::new();
        let mut control = Recorder::new(false);

        let outcome = block_on(async {
            let sample = async {
                Timer::after(Duration::from_millis(1)).await;
                // the worker holds the executor past the deadline, then stops the timer
                std::thread::sleep(core::time::Duration::from_millis(TIMEOUT.as_millis() + 20));
                power.stop_idle_timer();
                Timer::after(TIMEOUT * 2).await;
            };
            select(power.run(TIMEOUT, &mut control), sample).await
        });

        assert!(matches!(outcome, Either::Second(())));
        assert_eq!(power.state(), PowerState::Awake);
        assert!(control.steps.is_empty());
    }

    #[test]
    fn stop_then_restart_before_the_timer_looks_is_a_restart() {
        let power = PowerManager::new();
        power.stop_idle_timer();
        power.restart_idle_timer();
        assert_eq!(power.command.try_take(), Some(IdleCommand::Restart));
    }
}
