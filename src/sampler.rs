//! Fixed-rate sampling scheduler
//!
//! Samples every ring [`SAMPLES_PER_SEC`] times per second and closes a
//! window once per second. When sampling itself is slow enough that the
//! second runs out first, the window closes early and percentages are taken
//! against the samples that were actually collected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::chipset::Capabilities;
use crate::error::Result;
use crate::mmio::{RegisterAccess, RegisterSpace};
use crate::report::ReportSink;
use crate::regs::ring::RENDER_BASE;
use crate::ring::Ring;
use crate::stats::PipelineStatistics;
use crate::types::{SamplingWindow, WindowReport};

/// Target samples per window
pub const SAMPLES_PER_SEC: u32 = 100;

/// Window length in microseconds
pub const WINDOW_US: u64 = 1_000_000;

/// Time source and sleep, injectable for tests
pub trait Clock {
    /// Monotonic time in microseconds
    fn now_us(&mut self) -> u64;

    /// Suspend for `micros` microseconds
    fn sleep_us(&mut self, micros: u64);
}

/// Wall clock backed by [`Instant`] and [`thread::sleep`]
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose zero is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_us(&mut self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }

    fn sleep_us(&mut self, micros: u64) {
        thread::sleep(Duration::from_micros(micros));
    }
}

/// Owns the register window and all per-ring state for one device
pub struct Sampler<S: RegisterSpace, C: Clock> {
    regs: RegisterAccess<S>,
    rings: Vec<Ring>,
    stats: PipelineStatistics,
    clock: C,
    samples_per_sec: u32,
}

impl<S: RegisterSpace, C: Clock> Sampler<S, C> {
    /// Build a sampler for a device with `caps`
    ///
    /// Initializes every ring the device has and captures the starting
    /// counter values.
    pub fn new(regs: RegisterAccess<S>, caps: &Capabilities, clock: C) -> Result<Self> {
        let mut rings = Ring::for_capabilities(caps);
        for ring in &mut rings {
            ring.init(&regs)?;
        }

        let stats = if caps.stats_regs {
            PipelineStatistics::init(&regs)
        } else {
            PipelineStatistics::disabled()
        };

        info!(
            "monitoring {} ring(s){}",
            rings.iter().filter(|r| r.is_present()).count(),
            if stats.is_enabled() {
                " with pipeline statistics"
            } else {
                ""
            }
        );

        Ok(Self {
            regs,
            rings,
            stats,
            clock,
            samples_per_sec: SAMPLES_PER_SEC,
        })
    }

    /// Tracked rings, render ring first
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// The register window
    pub fn registers(&self) -> &RegisterAccess<S> {
        &self.regs
    }

    /// Run one window, stopping early if `running` is cleared
    ///
    /// Returns `None` when cancelled before the window closed, and an error
    /// if the device disappears mid-window.
    pub fn run_window(&mut self, running: &AtomicBool) -> Result<Option<SamplingWindow>> {
        let target = self.samples_per_sec;
        let budget_us = WINDOW_US / u64::from(target);

        for ring in &mut self.rings {
            ring.reset();
        }

        let started_at_us = self.clock.now_us();
        let mut actual_samples = target;
        let mut closed_early = false;

        for i in 0..target {
            if !running.load(Ordering::SeqCst) {
                return Ok(None);
            }

            let tick_start = self.clock.now_us();
            for ring in &mut self.rings {
                ring.sample(&self.regs)?;
            }
            let tick_end = self.clock.now_us();

            if tick_end.saturating_sub(started_at_us) >= WINDOW_US {
                actual_samples = i + 1;
                closed_early = i + 1 < target;
                break;
            }

            let spent = tick_end.saturating_sub(tick_start);
            if spent < budget_us {
                self.clock.sleep_us(budget_us - spent);
            }
        }

        if closed_early {
            debug!("window closed early after {} samples", actual_samples);
        }

        Ok(Some(SamplingWindow {
            target_samples: target,
            started_at_us,
            actual_samples,
            closed_early,
        }))
    }

    /// Collect the per-ring results of a closed window
    pub fn report(&mut self, window: SamplingWindow) -> WindowReport {
        let rings = self
            .rings
            .iter()
            .filter(|r| r.is_present())
            .map(|r| r.report(window.actual_samples, r.mmio() == RENDER_BASE))
            .collect();
        let counters = self.stats.refresh(&self.regs);

        WindowReport {
            window,
            rings,
            counters,
        }
    }

    /// Sample and report until `running` is cleared
    pub fn run(&mut self, sink: &mut dyn ReportSink, running: &AtomicBool) -> Result<()> {
        while let Some(window) = self.run_window(running)? {
            let report = self.report(window);
            for ring in &report.rings {
                debug!(
                    "{}: idle {}/{} samples, {} bytes queued on average",
                    ring.name,
                    ring.idle,
                    ring.actual_samples,
                    ring.average_full()
                );
                sink.emit(ring)?;
            }
            if !report.counters.is_empty() {
                sink.emit_counters(&report.counters)?;
            }
            sink.end_window()?;
        }

        info!("sampling stopped");
        Ok(())
    }
}
