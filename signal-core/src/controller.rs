//! Signal-phase state machine.
//!
//! One outer cycle is: decide a lane from the latest counts, count its green
//! time down, and at exactly `look_ahead_secs` remaining precompute the other
//! lane's phase from the counts seen at that tick. The rest of the current
//! phase is waited out in one go, the precomputed phase runs to completion
//! without being re-evaluated, and after a short pause the cycle repeats.
//!
//! [`SignalController::step`] is pure; [`run_signal_controller`] owns the
//! clock and the collaborators.

use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};

use crate::config::TimingConfig;
use crate::counts::{Lane, LaneCounts, SharedCounts};
use crate::display::SignalDisplay;

const LINE_CAPACITY: usize = 96;

/// Which lane goes green and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseDecision {
    pub lane: Lane,
    pub duration_secs: u32,
}

impl PhaseDecision {
    /// Busier lane wins; a tie goes to lane B.
    pub fn decide(counts: &LaneCounts, timing: &TimingConfig) -> Self {
        let lane = if counts.lane_a > counts.lane_b {
            Lane::A
        } else {
            Lane::B
        };
        Self::for_lane(lane, counts, timing)
    }

    /// The phase that follows `current`: always the other lane.
    pub fn next_after(current: Lane, counts: &LaneCounts, timing: &TimingConfig) -> Self {
        Self::for_lane(current.other(), counts, timing)
    }

    fn for_lane(lane: Lane, counts: &LaneCounts, timing: &TimingConfig) -> Self {
        Self {
            lane,
            duration_secs: timing.green_secs(counts.get(lane)),
        }
    }
}

/// The phase currently being counted down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Phase {
    pub active_lane: Lane,
    pub duration_secs: u32,
    pub remaining_secs: u32,
    /// Set on the look-ahead phase, which never looks ahead itself.
    precomputed: bool,
}

impl Phase {
    fn start(decision: PhaseDecision, precomputed: bool) -> Self {
        Self {
            active_lane: decision.lane,
            duration_secs: decision.duration_secs,
            remaining_secs: decision.duration_secs,
            precomputed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Deciding,
    RunningPhase(Phase),
    /// Look-ahead fired; the next step switches to this phase.
    Switching(PhaseDecision),
}

/// What the driving task has to do for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// A freshly decided phase begins.
    StartPhase(PhaseDecision),
    /// One second of countdown. `look_ahead` is set on the tick where the
    /// next phase was precomputed, and `wait` then covers the rest of the
    /// current phase.
    Tick {
        lane: Lane,
        remaining_secs: u32,
        counts: LaneCounts,
        look_ahead: Option<PhaseDecision>,
        wait: Duration,
    },
    /// The precomputed phase begins.
    Switch(PhaseDecision),
    /// Outer cycle finished; pause before the next decision.
    Rest(Duration),
}

impl Action {
    /// Time to sleep after the action's side effects.
    pub fn wait(&self) -> Option<Duration> {
        match self {
            Action::StartPhase(_) | Action::Switch(_) => None,
            Action::Tick { wait, .. } => Some(*wait),
            Action::Rest(pause) => Some(*pause),
        }
    }
}

pub struct SignalController {
    timing: TimingConfig,
    state: State,
}

impl SignalController {
    pub const fn new(timing: TimingConfig) -> Self {
        Self {
            timing,
            state: State::Deciding,
        }
    }

    pub fn phase(&self) -> Option<&Phase> {
        match &self.state {
            State::RunningPhase(phase) => Some(phase),
            State::Deciding | State::Switching(_) => None,
        }
    }

    pub fn is_deciding(&self) -> bool {
        self.state == State::Deciding
    }

    /// Advance by one step given the counts read just now.
    ///
    /// `counts` only matters when deciding and at the look-ahead tick; on
    /// every other tick it is passed through for display.
    pub fn step(&mut self, counts: LaneCounts) -> Action {
        match self.state {
            State::Deciding => {
                let decision = PhaseDecision::decide(&counts, &self.timing);
                self.state = State::RunningPhase(Phase::start(decision, false));
                Action::StartPhase(decision)
            }
            State::RunningPhase(mut phase) => {
                // Also reached by a phase shorter than the look-ahead point.
                if phase.remaining_secs == 0 {
                    self.state = State::Deciding;
                    return Action::Rest(self.timing.cycle_pause);
                }

                let remaining_secs = phase.remaining_secs;
                if !phase.precomputed && remaining_secs == self.timing.look_ahead_secs {
                    let next = PhaseDecision::next_after(phase.active_lane, &counts, &self.timing);
                    self.state = State::Switching(next);
                    return Action::Tick {
                        lane: phase.active_lane,
                        remaining_secs,
                        counts,
                        look_ahead: Some(next),
                        wait: self.timing.tick * remaining_secs,
                    };
                }

                phase.remaining_secs -= 1;
                self.state = State::RunningPhase(phase);
                Action::Tick {
                    lane: phase.active_lane,
                    remaining_secs,
                    counts,
                    look_ahead: None,
                    wait: self.timing.tick,
                }
            }
            State::Switching(next) => {
                self.state = State::RunningPhase(Phase::start(next, true));
                Action::Switch(next)
            }
        }
    }
}

/// Carry out the side effects of `action` on the display.
pub async fn perform<D: SignalDisplay>(action: &Action, display: &mut D) {
    let mut line = heapless::String::<LINE_CAPACITY>::new();
    // Lines are bounded well under LINE_CAPACITY; a failed write only truncates.
    match action {
        Action::StartPhase(decision) => {
            display.show_signals(decision.lane).await;
            let _ = write!(
                line,
                "Lane {} GREEN for {} seconds",
                decision.lane.number(),
                decision.duration_secs
            );
            display.report(&line).await;
        }
        Action::Tick {
            lane,
            remaining_secs,
            counts,
            look_ahead,
            ..
        } => {
            let _ = write!(
                line,
                "Lane {}: {} sec left | Lane A: {} | Lane B: {}",
                lane.number(),
                remaining_secs,
                counts.lane_a,
                counts.lane_b
            );
            display.report(&line).await;

            if let Some(next) = look_ahead {
                line.clear();
                let _ = write!(
                    line,
                    "Next Lane {} will get GREEN for {} seconds after this",
                    next.lane.number(),
                    next.duration_secs
                );
                display.report(&line).await;
            }
        }
        Action::Switch(next) => {
            display.show_signals(next.lane).await;
            let _ = write!(
                line,
                "Switched to Lane {} GREEN for {} seconds",
                next.lane.number(),
                next.duration_secs
            );
            display.report(&line).await;
        }
        Action::Rest(_) => {}
    }
}

/// Drive the signal heads forever from the shared counts.
pub async fn run_signal_controller<M: RawMutex, D: SignalDisplay>(
    counts: &SharedCounts<M>,
    display: &mut D,
    timing: TimingConfig,
) -> ! {
    let mut controller = SignalController::new(timing);
    info!("signal controller started: {}", timing);

    loop {
        let action = controller.step(counts.snapshot());
        debug!("{}", action);
        perform(&action, display).await;
        if let Some(wait) = action.wait() {
            Timer::after(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DisplayEvent, RecordingDisplay};
    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use embassy_futures::select::select;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    /// Step until the controller is deciding again, returning every action.
    fn run_cycle(
        controller: &mut SignalController,
        mut counts_at: impl FnMut(usize) -> LaneCounts,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        loop {
            let action = controller.step(counts_at(actions.len()));
            actions.push(action);
            if controller.is_deciding() {
                return actions;
            }
            assert!(actions.len() < 1_000, "cycle never ended");
        }
    }

    #[test]
    fn decision_rule_prefers_busier_lane_and_breaks_ties_to_b() {
        let t = TimingConfig::DEFAULT;
        assert_eq!(PhaseDecision::decide(&LaneCounts::new(7, 2), &t).lane, Lane::A);
        assert_eq!(PhaseDecision::decide(&LaneCounts::new(3, 8), &t).lane, Lane::B);
        assert_eq!(PhaseDecision::decide(&LaneCounts::new(2, 2), &t).lane, Lane::B);
        assert_eq!(PhaseDecision::decide(&LaneCounts::new(0, 0), &t).lane, Lane::B);
    }

    #[test]
    fn duration_rule_uses_threshold_of_five() {
        let t = TimingConfig::DEFAULT;
        assert_eq!(t.green_secs(-4), 20);
        assert_eq!(t.green_secs(5), 20);
        assert_eq!(t.green_secs(6), 30);
    }

    #[test]
    fn end_to_end_decisions() {
        let t = TimingConfig::DEFAULT;
        let cases = [
            (LaneCounts::new(3, 8), Lane::B, 30),
            (LaneCounts::new(7, 2), Lane::A, 30),
            (LaneCounts::new(2, 2), Lane::B, 20),
        ];
        for (counts, lane, duration_secs) in cases {
            let mut controller = SignalController::new(t);
            assert_eq!(
                controller.step(counts),
                Action::StartPhase(PhaseDecision {
                    lane,
                    duration_secs
                })
            );
            let phase = controller.phase().unwrap();
            assert_eq!(phase.active_lane, lane);
            assert_eq!(phase.remaining_secs, duration_secs);
        }
    }

    #[test]
    fn full_cycle_counts_down_looks_ahead_once_and_switches() {
        let mut controller = SignalController::new(TimingConfig::DEFAULT);
        let counts = LaneCounts::new(3, 8);
        let actions = run_cycle(&mut controller, |_| counts);

        assert_eq!(
            actions[0],
            Action::StartPhase(PhaseDecision {
                lane: Lane::B,
                duration_secs: 30
            })
        );

        // 30..=6 one second apart, then the look-ahead tick at 5.
        for (i, remaining) in (6..=30).rev().enumerate() {
            assert_eq!(
                actions[1 + i],
                Action::Tick {
                    lane: Lane::B,
                    remaining_secs: remaining,
                    counts,
                    look_ahead: None,
                    wait: secs(1),
                }
            );
        }
        let next = PhaseDecision {
            lane: Lane::A,
            duration_secs: 20,
        };
        assert_eq!(
            actions[26],
            Action::Tick {
                lane: Lane::B,
                remaining_secs: 5,
                counts,
                look_ahead: Some(next),
                wait: secs(5),
            }
        );
        assert_eq!(actions[27], Action::Switch(next));

        // Precomputed phase: 20..=1, never looking ahead.
        for (i, remaining) in (1..=20).rev().enumerate() {
            assert_eq!(
                actions[28 + i],
                Action::Tick {
                    lane: Lane::A,
                    remaining_secs: remaining,
                    counts,
                    look_ahead: None,
                    wait: secs(1),
                }
            );
        }
        assert_eq!(actions[48], Action::Rest(secs(1)));
        assert_eq!(actions.len(), 49);

        let elapsed: u64 = actions
            .iter()
            .filter_map(Action::wait)
            .map(|d| d.as_secs())
            .sum();
        assert_eq!(elapsed, 30 + 20 + 1);

        let look_aheads = actions
            .iter()
            .filter(|a| matches!(a, Action::Tick { look_ahead: Some(_), .. }))
            .count();
        assert_eq!(look_aheads, 1);
    }

    #[test]
    fn look_ahead_uses_counts_seen_at_that_tick_only() {
        let mut controller = SignalController::new(TimingConfig::DEFAULT);
        // Phase decided on (7, 2): lane A for 30 s. Step 26 is the tick at
        // 5 s remaining; lane B turns busy exactly there and quiet again after.
        let actions = run_cycle(&mut controller, |step| match step {
            26 => LaneCounts::new(7, 9),
            n if n > 26 => LaneCounts::new(7, 0),
            _ => LaneCounts::new(7, 2),
        });

        let next = PhaseDecision {
            lane: Lane::B,
            duration_secs: 30,
        };
        assert!(matches!(
            actions[26],
            Action::Tick {
                remaining_secs: 5,
                look_ahead: Some(n),
                ..
            } if n == next
        ));
        assert_eq!(actions[27], Action::Switch(next));
        let precomputed_ticks = actions
            .iter()
            .filter(|a| matches!(a, Action::Tick { lane: Lane::B, .. }))
            .count();
        assert_eq!(precomputed_ticks, 30);
    }

    #[test]
    fn mid_phase_updates_do_not_change_running_phase() {
        let mut controller = SignalController::new(TimingConfig::DEFAULT);
        let actions = run_cycle(&mut controller, |step| {
            if step == 0 {
                LaneCounts::new(2, 2)
            } else {
                LaneCounts::new(50, 50)
            }
        });
        // Lane B for 20 s despite the jump; only look-ahead sees the new counts.
        let b_ticks = actions
            .iter()
            .filter(|a| matches!(a, Action::Tick { lane: Lane::B, .. }))
            .count();
        assert_eq!(b_ticks, 16);
        assert!(actions.contains(&Action::Switch(PhaseDecision {
            lane: Lane::A,
            duration_secs: 30
        })));
    }

    #[test]
    fn phase_shorter_than_look_ahead_goes_straight_back_to_deciding() {
        let timing = TimingConfig {
            short_green_secs: 3,
            ..TimingConfig::DEFAULT
        };
        let mut controller = SignalController::new(timing);
        let actions = run_cycle(&mut controller, |_| LaneCounts::new(1, 1));

        assert_eq!(actions.len(), 5);
        assert!(matches!(actions[1], Action::Tick { remaining_secs: 3, .. }));
        assert!(matches!(actions[3], Action::Tick { remaining_secs: 1, .. }));
        assert_eq!(actions[4], Action::Rest(secs(1)));
        assert!(!actions.iter().any(|a| matches!(a, Action::Switch(_))));
    }

    #[test]
    fn cycles_repeat_with_fresh_decisions() {
        let mut controller = SignalController::new(TimingConfig::DEFAULT);
        run_cycle(&mut controller, |_| LaneCounts::new(3, 8));
        assert_eq!(
            controller.step(LaneCounts::new(9, 1)),
            Action::StartPhase(PhaseDecision {
                lane: Lane::A,
                duration_secs: 30
            })
        );
    }

    #[test]
    fn start_phase_drives_signals_then_reports() {
        let mut display = RecordingDisplay::default();
        let action = Action::StartPhase(PhaseDecision {
            lane: Lane::B,
            duration_secs: 30,
        });
        block_on(perform(&action, &mut display));
        assert_eq!(
            display.events,
            vec![
                DisplayEvent::Signals(Lane::B),
                DisplayEvent::Report("Lane 2 GREEN for 30 seconds".into()),
            ]
        );
    }

    #[test]
    fn look_ahead_tick_reports_status_and_upcoming_phase() {
        let mut display = RecordingDisplay::default();
        let action = Action::Tick {
            lane: Lane::B,
            remaining_secs: 5,
            counts: LaneCounts::new(3, 8),
            look_ahead: Some(PhaseDecision {
                lane: Lane::A,
                duration_secs: 20,
            }),
            wait: secs(5),
        };
        block_on(perform(&action, &mut display));
        let reports: Vec<_> = display.reports().collect();
        assert_eq!(
            reports,
            [
                "Lane 2: 5 sec left | Lane A: 3 | Lane B: 8",
                "Next Lane 1 will get GREEN for 20 seconds after this",
            ]
        );
        assert!(!display
            .events
            .iter()
            .any(|e| matches!(e, DisplayEvent::Signals(_))));
    }

    #[test]
    fn switch_and_rest() {
        let mut display = RecordingDisplay::default();
        block_on(perform(
            &Action::Switch(PhaseDecision {
                lane: Lane::A,
                duration_secs: 20,
            }),
            &mut display,
        ));
        block_on(perform(&Action::Rest(secs(1)), &mut display));
        assert_eq!(
            display.events,
            vec![
                DisplayEvent::Signals(Lane::A),
                DisplayEvent::Report("Switched to Lane 1 GREEN for 20 seconds".into()),
            ]
        );
    }

    fn fast_timing() -> TimingConfig {
        TimingConfig {
            tick: Duration::from_millis(10),
            cycle_pause: Duration::from_millis(10),
            ..TimingConfig::DEFAULT
        }
    }

    fn signals(display: &RecordingDisplay) -> Vec<Lane> {
        display
            .events
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Signals(lane) => Some(*lane),
                DisplayEvent::Report(_) => None,
            })
            .collect()
    }

    #[test]
    fn controller_loop_runs_a_full_cycle_on_the_clock() {
        let counts = SharedCounts::<CriticalSectionRawMutex>::new();
        counts.update(LaneCounts::new(3, 8));
        let mut display = RecordingDisplay::default();

        // One cycle is 30 + 20 ticks plus the pause: about 510 ms.
        block_on(select(
            run_signal_controller(&counts, &mut display, fast_timing()),
            Timer::after(Duration::from_millis(1500)),
        ));

        assert_eq!(signals(&display)[..3], [Lane::B, Lane::A, Lane::B]);
        let reports: Vec<_> = display.reports().collect();
        assert_eq!(reports[0], "Lane 2 GREEN for 30 seconds");
        assert_eq!(reports[1], "Lane 2: 30 sec left | Lane A: 3 | Lane B: 8");
        let look_ahead = reports
            .iter()
            .position(|r| *r == "Next Lane 1 will get GREEN for 20 seconds after this")
            .unwrap();
        assert_eq!(reports[look_ahead - 1], "Lane 2: 5 sec left | Lane A: 3 | Lane B: 8");
        assert_eq!(reports[look_ahead + 1], "Switched to Lane 1 GREEN for 20 seconds");
    }

    #[test]
    fn controller_loop_reads_fresh_counts_each_step() {
        let counts = SharedCounts::<CriticalSectionRawMutex>::new();
        counts.update(LaneCounts::new(3, 8));
        let mut display = RecordingDisplay::default();

        // Counts change early in the first phase: the running phase keeps its
        // 30 s, the look-ahead and the next decision both see the new pair.
        let update = async {
            Timer::after(Duration::from_millis(100)).await;
            counts.update(LaneCounts::new(7, 2));
        };
        block_on(join(
            select(
                run_signal_controller(&counts, &mut display, fast_timing()),
                Timer::after(Duration::from_millis(2000)),
            ),
            update,
        ));

        assert_eq!(signals(&display)[..3], [Lane::B, Lane::A, Lane::A]);
        let reports: Vec<_> = display.reports().collect();
        assert!(reports.contains(&"Lane 2: 30 sec left | Lane A: 3 | Lane B: 8"));
        assert!(reports.contains(&"Lane 2: 5 sec left | Lane A: 7 | Lane B: 2"));
        assert!(reports.contains(&"Switched to Lane 1 GREEN for 30 seconds"));
        assert!(reports.contains(&"Lane 1 GREEN for 30 seconds"));
    }
}
