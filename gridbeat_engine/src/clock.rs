use gridbeat_shared::pattern::{MAX_BPM, MIN_BPM};

/// Invoked at each subdivision boundary with the scheduled time (seconds on
/// the clock's timeline, not wall clock) and the raw step counter.
pub type TickCallback = Box<dyn FnMut(f64, u64) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleHandle(u64);

/// Transport primitive the dispatcher schedules against. `StepClock` is the
/// production implementation; tests drive it directly.
pub trait ClockSource: Send {
    fn configure(&mut self, bpm: f32, swing: f32);
    fn schedule(&mut self, callback: TickCallback) -> ScheduleHandle;
    fn dispose(&mut self, handle: ScheduleHandle);
    /// Start ticking, with the step counter beginning at `offset`.
    fn start(&mut self, offset: u64);
    /// Halt and rewind the step counter to 0.
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Sample-counting 16th-note clock. The audio callback advances it by the
/// frame count of each buffer; step boundaries crossed inside the buffer
/// fire every registered callback with the boundary's exact sample time.
pub struct StepClock {
    bpm: f32,
    swing: f32,
    sample_rate: f32,
    running: bool,
    /// Absolute samples consumed since start().
    position: u64,
    /// Steps fired since start().
    ticks: u64,
    /// Raw step counter handed to callbacks (starts at the start() offset).
    raw_step: u64,
    registrations: Vec<(ScheduleHandle, TickCallback)>,
    next_handle: u64,
}

impl StepClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            bpm: 120.0,
            swing: 0.0,
            sample_rate,
            running: false,
            position: 0,
            ticks: 0,
            raw_step: 0,
            registrations: Vec::new(),
            next_handle: 1,
        }
    }

    /// Samples per 16th at the current tempo.
    fn samples_per_step(&self) -> f64 {
        let beats_per_second = self.bpm as f64 / 60.0;
        self.sample_rate as f64 / (beats_per_second * 4.0)
    }

    /// Sample position of the next boundary. Every second 16th is pushed
    /// late by up to a third of a step (triplet position at full swing).
    fn next_fire_sample(&self) -> f64 {
        let sps = self.samples_per_step();
        let mut fire = self.ticks as f64 * sps;
        if self.raw_step % 2 == 1 {
            fire += self.swing as f64 * sps / 3.0;
        }
        fire
    }

    /// Consume `frames` samples, firing callbacks for every boundary crossed.
    pub fn advance(&mut self, frames: usize) {
        if !self.running {
            return;
        }
        let end = (self.position + frames as u64) as f64;
        loop {
            let fire = self.next_fire_sample();
            if fire >= end {
                break;
            }
            let time = fire / self.sample_rate as f64;
            let raw = self.raw_step;
            for (_, callback) in self.registrations.iter_mut() {
                callback(time, raw);
            }
            self.ticks += 1;
            self.raw_step += 1;
        }
        self.position += frames as u64;
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl ClockSource for StepClock {
    fn configure(&mut self, bpm: f32, swing: f32) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.swing = swing.clamp(0.0, 1.0);
    }

    fn schedule(&mut self, callback: TickCallback) -> ScheduleHandle {
        let handle = ScheduleHandle(self.next_handle);
        self.next_handle += 1;
        self.registrations.push((handle, callback));
        handle
    }

    fn dispose(&mut self, handle: ScheduleHandle) {
        self.registrations.retain(|(h, _)| *h != handle);
    }

    fn start(&mut self, offset: u64) {
        self.running = true;
        self.position = 0;
        self.ticks = 0;
        self.raw_step = offset;
    }

    fn stop(&mut self) {
        self.running = false;
        self.position = 0;
        self.ticks = 0;
        self.raw_step = 0;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_clock(sample_rate: f32) -> (StepClock, Arc<Mutex<Vec<(f64, u64)>>>) {
        let mut clock = StepClock::new(sample_rate);
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        clock.schedule(Box::new(move |time, step| {
            sink.lock().unwrap().push((time, step));
        }));
        (clock, fired)
    }

    #[test]
    fn test_step_boundaries_fire_in_order() {
        // 60 BPM at 16 Hz -> 4 samples per 16th
        let (mut clock, fired) = recording_clock(16.0);
        clock.configure(60.0, 0.0);
        clock.start(0);
        clock.advance(16);

        let fired = fired.lock().unwrap();
        let steps: Vec<u64> = fired.iter().map(|&(_, s)| s).collect();
        assert_eq!(steps, vec![0, 1, 2, 3]);
        // Boundary times land exactly on the step grid
        assert_eq!(fired[0].0, 0.0);
        assert_eq!(fired[1].0, 0.25);
        assert_eq!(fired[2].0, 0.5);
    }

    #[test]
    fn test_boundaries_split_across_buffers() {
        let (mut clock, fired) = recording_clock(16.0);
        clock.configure(60.0, 0.0);
        clock.start(0);
        for _ in 0..8 {
            clock.advance(6); // buffer size not a multiple of the step length
        }
        let steps: Vec<u64> = fired.lock().unwrap().iter().map(|&(_, s)| s).collect();
        assert_eq!(steps, (0..12).collect::<Vec<u64>>());
    }

    #[test]
    fn test_swing_delays_odd_steps_only() {
        let (mut clock, fired) = recording_clock(1000.0);
        clock.configure(120.0, 1.0);
        clock.start(0);
        clock.advance(1000);

        let fired = fired.lock().unwrap();
        let sps = 1000.0 * 60.0 / (120.0 * 4.0); // 125 samples
        for &(time, step) in fired.iter() {
            let base = step as f64 * sps / 1000.0;
            if step % 2 == 1 {
                assert!((time - (base + sps / 3.0 / 1000.0)).abs() < 1e-9);
            } else {
                assert!((time - base).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_stop_resets_counter() {
        let (mut clock, fired) = recording_clock(16.0);
        clock.configure(60.0, 0.0);
        clock.start(0);
        clock.advance(10);
        clock.stop();
        assert!(!clock.is_running());
        clock.advance(100); // no-op while stopped
        clock.start(0);
        clock.advance(4);

        let steps: Vec<u64> = fired.lock().unwrap().iter().map(|&(_, s)| s).collect();
        assert_eq!(steps, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_dispose_removes_registration() {
        let mut clock = StepClock::new(16.0);
        let h1 = clock.schedule(Box::new(|_, _| {}));
        let h2 = clock.schedule(Box::new(|_, _| {}));
        assert_eq!(clock.registration_count(), 2);
        clock.dispose(h1);
        assert_eq!(clock.registration_count(), 1);
        clock.dispose(h2);
        assert_eq!(clock.registration_count(), 0);
    }

    #[test]
    fn test_bpm_clamped() {
        let mut clock = StepClock::new(48000.0);
        clock.configure(999.0, 0.0);
        assert!((clock.samples_per_step() - 48000.0 * 60.0 / (180.0 * 4.0)).abs() < 1e-6);
    }
}
