//! Report sinks for closed sampling windows

use std::io::Write;

use crate::error::Result;
use crate::types::{CounterSample, RingReport};

/// Consumer of per-window results
pub trait ReportSink {
    /// Publish one ring's result for the window that just closed
    fn emit(&mut self, ring: &RingReport) -> Result<()>;

    /// Publish the pipeline statistics read at the end of the window
    fn emit_counters(&mut self, _counters: &[CounterSample]) -> Result<()> {
        Ok(())
    }

    /// Called after every ring and counter of a window was emitted
    fn end_window(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Line-oriented text output: `Percent: <n> %` per ring
#[derive(Debug)]
pub struct TextSink<W: Write> {
    out: W,
    labels: bool,
    counters: bool,
}

impl<W: Write> TextSink<W> {
    /// Create a sink writing plain percent lines
    pub fn new(out: W) -> Self {
        Self {
            out,
            labels: false,
            counters: false,
        }
    }

    /// Prefix each line with the ring name
    pub fn with_labels(mut self, labels: bool) -> Self {
        self.labels = labels;
        self
    }

    /// Also print pipeline statistics deltas
    pub fn with_counters(mut self, counters: bool) -> Self {
        self.counters = counters;
        self
    }

    /// Consume the sink and return the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn emit(&mut self, ring: &RingReport) -> Result<()> {
        if self.labels {
            write!(self.out, "{}: ", ring.name)?;
        }
        writeln!(self.out, "Percent: {} %", ring.percent_busy())?;
        Ok(())
    }

    fn emit_counters(&mut self, counters: &[CounterSample]) -> Result<()> {
        if !self.counters {
            return Ok(());
        }
        for sample in counters {
            writeln!(self.out, "{:>16}: {}", sample.counter.name(), sample.delta)?;
        }
        Ok(())
    }

    fn end_window(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Fans every report out to several sinks, in order
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl SinkSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn push(&mut self, sink: impl ReportSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Number of sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if no sinks were added
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ReportSink for SinkSet {
    fn emit(&mut self, ring: &RingReport) -> Result<()> {
        for sink in &mut self.sinks {
            sink.emit(ring)?;
        }
        Ok(())
    }

    fn emit_counters(&mut self, counters: &[CounterSample]) -> Result<()> {
        for sink in &mut self.sinks {
            sink.emit_counters(counters)?;
        }
        Ok(())
    }

    fn end_window(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.end_window()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatCounter;

    fn ring(name: &'static str, idle: u32) -> RingReport {
        RingReport {
            name,
            idle,
            full: 0,
            size: 4096,
            actual_samples: 100,
            primary: name == "render",
        }
    }

    #[test]
    fn test_text_sink_plain_line() {
        let mut sink = TextSink::new(Vec::new());
        sink.emit(&ring("render", 40)).unwrap();
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "Percent: 60 %\n");
    }

    #[test]
    fn test_text_sink_labels_and_counters() {
        let mut sink = TextSink::new(Vec::new()).with_labels(true).with_counters(true);
        sink.emit(&ring("blitter", 100)).unwrap();
        sink.emit_counters(&[CounterSample {
            counter: StatCounter::PsDepth,
            value: 900,
            delta: 12,
        }])
        .unwrap();
        sink.end_window().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "blitter: Percent: 0 %\n   PS depth pass: 12\n");
    }

    #[test]
    fn test_text_sink_counters_off_by_default() {
        let mut sink = TextSink::new(Vec::new());
        sink.emit_counters(&[CounterSample {
            counter: StatCounter::IaVertices,
            value: 1,
            delta: 1,
        }])
        .unwrap();
        assert!(sink.into_inner().is_empty());
    }

    #[derive(Default)]
    struct Recorder(std::rc::Rc<std::cell::RefCell<Vec<u32>>>);

    impl ReportSink for Recorder {
        fn emit(&mut self, ring: &RingReport) -> Result<()> {
            self.0.borrow_mut().push(ring.percent_busy());
            Ok(())
        }
    }

    #[test]
    fn test_sink_set_fans_out() {
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut set = SinkSet::new();
        set.push(Recorder(seen.clone()));
        set.push(Recorder(seen.clone()));
        assert_eq!(set.len(), 2);

        set.emit(&ring("render", 50)).unwrap();
        assert_eq!(*seen.borrow(), vec![50, 50]);
    }
}
