//! Fixed-timestep accumulator.
//!
//! The host reports how much wall-clock (or replayed) time passed since the
//! previous frame; the accumulator hands that time back out in fixed `dt`
//! slices so the simulation is advanced deterministically.

pub struct TimeState {
    pub fixed_dt: f64,
    pub max_accumulator: f64,
    accumulator: f64,
    pub total_time: f64,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub steps_this_frame: u32,
    pub real_dt: f64,
    pub interpolation_alpha: f64,
}

impl TimeState {
    pub fn new(hz: f64) -> Self {
        let fixed_dt = if hz > 0.0 { 1.0 / hz } else { 1.0 / 60.0 };
        Self {
            fixed_dt,
            max_accumulator: 0.25,
            accumulator: 0.0,
            total_time: 0.0,
            fixed_step_count: 0,
            frame_count: 0,
            steps_this_frame: 0,
            real_dt: 0.0,
            interpolation_alpha: 0.0,
        }
    }

    /// Feed the time elapsed since the previous frame.
    pub fn begin_frame(&mut self, real_dt: f64) {
        self.real_dt = real_dt.max(0.0);

        // Spiral-of-death cap
        if self.real_dt > self.max_accumulator {
            log::warn!(
                "Frame took {:.1}ms, capping accumulator to {}ms",
                self.real_dt * 1000.0,
                self.max_accumulator * 1000.0
            );
            self.real_dt = self.max_accumulator;
        }

        self.accumulator += self.real_dt;
        self.steps_this_frame = 0;
        self.frame_count += 1;
    }

    pub fn should_step(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            self.total_time += self.fixed_dt;
            self.fixed_step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }

    pub fn end_frame(&mut self) {
        self.interpolation_alpha = self.accumulator / self.fixed_dt;
    }
}

impl Default for TimeState {
    fn default() -> Self {
        Self::new(60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_frames_produce_matching_step_counts() {
        let mut time = TimeState::new(60.0);
        time.begin_frame(2.0 / 60.0 + 1e-9);
        let mut steps = 0;
        while time.should_step() {
            steps += 1;
        }
        time.end_frame();
        assert_eq!(steps, 2);
        assert_eq!(time.fixed_step_count, 2);
        assert!(time.interpolation_alpha < 0.01);
    }

    #[test]
    fn leftover_time_carries_into_next_frame() {
        let mut time = TimeState::new(60.0);
        time.begin_frame(0.5 / 60.0);
        assert!(!time.should_step());
        time.end_frame();
        assert!((time.interpolation_alpha - 0.5).abs() < 1e-6);

        time.begin_frame(0.6 / 60.0);
        assert!(time.should_step());
        assert!(!time.should_step());
    }

    #[test]
    fn long_frames_are_capped() {
        let mut time = TimeState::new(60.0);
        time.begin_frame(10.0);
        assert!((time.real_dt - time.max_accumulator).abs() < f64::EPSILON);
        let mut steps = 0;
        while time.should_step() {
            steps += 1;
        }
        // 0.25s of 1/60 slices; the last slice may round away.
        assert!((14..=15).contains(&steps), "got {steps} steps");
    }

    #[test]
    fn non_positive_hz_falls_back_to_sixty() {
        let time = TimeState::new(0.0);
        assert!((time.fixed_dt - 1.0 / 60.0).abs() < f64::EPSILON);
    }
}
