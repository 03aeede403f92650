// Series registry - bounded per-field sample buffers
use super::telemetry::Sample;
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_SERIES_CAPACITY: usize = 600;

const HUE_STEP: usize = 60;

/// Presentation hint assigned once when a series is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHint {
    pub hue: u16,
}

impl VisualHint {
    /// Hint for the series registered at `index` (0-based discovery order).
    pub fn derive(index: usize) -> Self {
        // (index * 60) mod 360 without overflowing for huge indices
        let hue = (index % (360 / HUE_STEP)) * HUE_STEP;
        Self { hue: hue as u16 }
    }

    pub fn css_color(&self) -> String {
        format!("hsl({} 90% 60%)", self.hue)
    }
}

#[derive(Debug, Clone)]
pub struct Series {
    name: String,
    hint: VisualHint,
    buffer: VecDeque<Sample>,
}

impl Series {
    fn new(name: String, hint: VisualHint, capacity: usize) -> Self {
        Self {
            name,
            hint,
            buffer: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hint(&self) -> VisualHint {
        self.hint
    }

    pub fn samples(&self) -> impl ExactSizeIterator<Item = &Sample> + '_ {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.buffer.front()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.buffer.back()
    }

    fn push(&mut self, sample: Sample, capacity: usize) {
        self.buffer.push_back(sample);
        while self.buffer.len() > capacity {
            self.buffer.pop_front();
        }
    }
}

/// Name -> series mapping that keeps discovery order.
///
/// Series are created lazily on the first sample for a name and are never removed.
/// Every buffer holds at most `capacity` samples; older samples are evicted from the head.
#[derive(Debug, Clone)]
pub struct SeriesRegistry {
    capacity: usize,
    series: Vec<Series>,
    index: HashMap<String, usize>,
}

impl SeriesRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            series: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the series for `name`, registering it first if it has not been seen.
    pub fn ensure_series(&mut self, name: &str) -> &mut Series {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.series.len();
                let hint = VisualHint::derive(idx);
                tracing::debug!("Registering series {} with hue {}", name, hint.hue);
                self.series
                    .push(Series::new(name.to_string(), hint, self.capacity));
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &mut self.series[idx]
    }

    /// Appends to an already registered series. Returns false if `name` is unknown.
    pub fn append(&mut self, name: &str, sample: Sample) -> bool {
        let capacity = self.capacity;
        match self.index.get(name) {
            Some(&idx) => {
                self.series[idx].push(sample, capacity);
                true
            }
            None => false,
        }
    }

    /// `ensure_series` followed by `append`.
    pub fn record(&mut self, name: &str, sample: Sample) {
        let capacity = self.capacity;
        self.ensure_series(name).push(sample, capacity);
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.index.get(name).map(|&idx| &self.series[idx])
    }

    /// Series in discovery order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Series> + '_ {
        self.series.iter()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl Default for SeriesRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SERIES_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(series: &Series) -> Vec<f64> {
        series.samples().map(|s| s.value).collect()
    }

    #[test]
    fn test_capacity_keeps_most_recent_samples() {
        let mut registry = SeriesRegistry::new(5);

        for i in 0..12 {
            registry.record("x", Sample::new(i as f64, i as f64));
            let len = registry.get("x").map(Series::len).unwrap_or_default();
            assert!(len <= 5);
            assert_eq!(len, (i + 1).min(5));
        }

        let series = registry.get("x").unwrap();
        assert_eq!(values(series), vec![7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_601_appends_under_default_capacity() {
        let mut registry = SeriesRegistry::default();

        for i in 1..=601 {
            registry.record("x", Sample::new(i as f64 * 1000.0, i as f64));
        }

        let series = registry.get("x").unwrap();
        assert_eq!(series.len(), 600);
        assert_eq!(series.first(), Some(&Sample::new(2000.0, 2.0)));
        assert_eq!(series.last(), Some(&Sample::new(601_000.0, 601.0)));
    }

    #[test]
    fn test_ensure_series_is_idempotent() {
        let mut registry = SeriesRegistry::new(10);
        registry.record("x", Sample::new(1.0, 1.0));
        registry.record("x", Sample::new(2.0, 2.0));

        let hint = registry.ensure_series("x").hint();
        let again = registry.ensure_series("x");

        assert_eq!(again.hint(), hint);
        assert_eq!(again.len(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_hints_follow_discovery_order() {
        let mut registry = SeriesRegistry::new(10);
        registry.record("a", Sample::new(0.0, 99.0));
        registry.record("b", Sample::new(0.0, -3.0));
        registry.ensure_series("c");

        let hues: Vec<u16> = registry.iter().map(|s| s.hint().hue).collect();
        assert_eq!(hues, vec![0, 60, 120]);

        let names: Vec<&str> = registry.iter().map(Series::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_hint_wraps_after_six_series() {
        assert_eq!(VisualHint::derive(5).hue, 300);
        assert_eq!(VisualHint::derive(6).hue, 0);
        assert_eq!(VisualHint::derive(7).hue, 60);
        assert_eq!(VisualHint::derive(usize::MAX).hue, VisualHint::derive(usize::MAX % 6).hue);
        assert_eq!(VisualHint::derive(2).css_color(), "hsl(120 90% 60%)");
    }

    #[test]
    fn test_registries_with_same_order_match() {
        let mut first = SeriesRegistry::new(3);
        let mut second = SeriesRegistry::new(3);
        for name in ["temp", "humidity", "voltage"] {
            first.record(name, Sample::new(0.0, 1.0));
            second.record(name, Sample::new(50.0, -7.5));
        }

        let a: Vec<_> = first.iter().map(|s| (s.name().to_string(), s.hint())).collect();
        let b: Vec<_> = second.iter().map(|s| (s.name().to_string(), s.hint())).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_append_requires_registration() {
        let mut registry = SeriesRegistry::new(3);
        assert!(!registry.append("ghost", Sample::new(0.0, 0.0)));
        assert!(registry.get("ghost").is_none());

        registry.ensure_series("ghost");
        assert!(registry.append("ghost", Sample::new(0.0, 0.0)));
        assert_eq!(registry.get("ghost").map(Series::len), Some(1));
    }
}
