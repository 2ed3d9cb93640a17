use std::{
    fmt::Display,
    io::Write,
    sync::atomic::{AtomicU32, Ordering},
};

/// Console progress bar fed with a monotone fraction in `[0, 1]`.
///
/// Safe to call from the render collector; redraws are throttled to whole
/// percent steps.
pub struct Progress {
    last_percent: AtomicU32,
}

impl Progress {
    pub fn new() -> Self {
        Self {
            last_percent: AtomicU32::new(u32::MAX),
        }
    }

    pub fn report(&self, fraction: f32) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0) as u32;
        if self.last_percent.swap(percent, Ordering::Relaxed) == percent {
            return;
        }
        print!(
            "\r{}",
            PercentBar {
                percent: percent as f32 / 100.0,
                width: 50
            }
        );
        let _ = std::io::stdout().flush();
    }

    pub fn finish(&self) {
        self.report(1.0);
        println!();
    }
}

pub struct PercentBar {
    pub percent: f32,
    pub width: usize,
}

impl Display for PercentBar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let filled = ((self.width - 1) as f32 * self.percent).round() as usize;
        write!(
            f,
            "[{empty:=>width_left$}>{empty:.<width_right$}] {percent:.1}%",
            empty = "",
            width_left = filled,
            width_right = self.width - 1 - filled,
            percent = 100. * self.percent
        )
    }
}
