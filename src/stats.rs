//! Pipeline statistics counters
//!
//! Gen4+ hardware exposes 64-bit event counters as two adjacent 32-bit
//! registers. They count asynchronously, so a read can straddle a carry from
//! the low word into the high word; [`read_counter`] retries until both high
//! reads agree.

use crate::mmio::{RegisterAccess, RegisterSpace};
use crate::regs::stats::*;
use crate::types::CounterSample;

/// Number of pipeline statistics counters
pub const COUNTER_COUNT: usize = 9;

/// Fixed set of pipeline statistics counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCounter {
    /// Vertices fetched
    IaVertices,
    /// Primitives fetched
    IaPrimitives,
    /// Vertex shader invocations
    VsInvocations,
    /// Geometry shader invocations
    GsInvocations,
    /// Geometry shader primitives
    GsPrimitives,
    /// Clipper invocations
    ClInvocations,
    /// Clipper primitives
    ClPrimitives,
    /// Pixel shader invocations
    PsInvocations,
    /// Pixels passing depth test
    PsDepth,
}

impl StatCounter {
    /// Every counter, in report order
    pub const ALL: [StatCounter; COUNTER_COUNT] = [
        StatCounter::IaVertices,
        StatCounter::IaPrimitives,
        StatCounter::VsInvocations,
        StatCounter::GsInvocations,
        StatCounter::GsPrimitives,
        StatCounter::ClInvocations,
        StatCounter::ClPrimitives,
        StatCounter::PsInvocations,
        StatCounter::PsDepth,
    ];

    /// Offset of the low word
    pub fn register(&self) -> u32 {
        match self {
            StatCounter::IaVertices => IA_VERTICES_COUNT_QW,
            StatCounter::IaPrimitives => IA_PRIMITIVES_COUNT_QW,
            StatCounter::VsInvocations => VS_INVOCATION_COUNT_QW,
            StatCounter::GsInvocations => GS_INVOCATION_COUNT_QW,
            StatCounter::GsPrimitives => GS_PRIMITIVES_COUNT_QW,
            StatCounter::ClInvocations => CL_INVOCATION_COUNT_QW,
            StatCounter::ClPrimitives => CL_PRIMITIVES_COUNT_QW,
            StatCounter::PsInvocations => PS_INVOCATION_COUNT_QW,
            StatCounter::PsDepth => PS_DEPTH_COUNT_QW,
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            StatCounter::IaVertices => "vert fetch",
            StatCounter::IaPrimitives => "prim fetch",
            StatCounter::VsInvocations => "VS invocations",
            StatCounter::GsInvocations => "GS invocations",
            StatCounter::GsPrimitives => "GS prims",
            StatCounter::ClInvocations => "CL invocations",
            StatCounter::ClPrimitives => "CL prims",
            StatCounter::PsInvocations => "PS invocations",
            StatCounter::PsDepth => "PS depth pass",
        }
    }
}

/// Read a 64-bit counter whose low word is at `reg` and high word at `reg + 4`
pub fn read_counter<S: RegisterSpace>(regs: &RegisterAccess<S>, reg: u32) -> u64 {
    loop {
        let high = regs.read(reg + 4);
        let low = regs.read(reg);
        let high_again = regs.read(reg + 4);
        if high == high_again {
            return (u64::from(high) << 32) | u64::from(low);
        }
    }
}

/// Current and previous values of every counter
#[derive(Debug, Clone)]
pub struct PipelineStatistics {
    enabled: bool,
    current: [u64; COUNTER_COUNT],
    previous: [u64; COUNTER_COUNT],
}

impl PipelineStatistics {
    /// Counters that are never read
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            current: [0; COUNTER_COUNT],
            previous: [0; COUNTER_COUNT],
        }
    }

    /// Capture the starting value of every counter
    pub fn init<S: RegisterSpace>(regs: &RegisterAccess<S>) -> Self {
        let mut stats = Self::disabled();
        stats.enabled = true;
        for (slot, counter) in stats.previous.iter_mut().zip(StatCounter::ALL) {
            *slot = read_counter(regs, counter.register());
        }
        stats.current = stats.previous;
        stats
    }

    /// Returns true if the device has these counters
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Read every counter and return its change since the last refresh
    ///
    /// Returns an empty list when disabled.
    pub fn refresh<S: RegisterSpace>(&mut self, regs: &RegisterAccess<S>) -> Vec<CounterSample> {
        if !self.enabled {
            return Vec::new();
        }

        StatCounter::ALL
            .iter()
            .enumerate()
            .map(|(i, counter)| {
                self.current[i] = read_counter(regs, counter.register());
                let delta = self.current[i].wrapping_sub(self.previous[i]);
                self.previous[i] = self.current[i];
                CounterSample {
                    counter: *counter,
                    value: self.current[i],
                    delta,
                }
            })
            .collect()
    }
}
