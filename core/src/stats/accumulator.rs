//! Statistics Accumulator

use crate::pbrt;
use num_traits::{Num, Zero};
use std::collections::BTreeMap;
use std::ops::AddAssign;
use std::sync::{Mutex, OnceLock};

/// Return the global statistics accumulator.
pub fn stats_accumulator() -> &'static Mutex<StatsAccumulator> {
    static DATA: OnceLock<Mutex<StatsAccumulator>> = OnceLock::new();
    DATA.get_or_init(|| Mutex::new(StatsAccumulator::default()))
}

/// Distribution statistic.
#[derive(Default, Clone)]
pub struct StatsDistribution<T>
where
    T: Num + Default + Copy + Clone,
{
    /// Sum of all values.
    sum: T,

    /// Count of all values.
    count: u64,

    /// Minimum value.
    min: Option<T>,

    /// Maximum value.
    max: Option<T>,
}

impl<T> StatsDistribution<T>
where
    T: Num + Zero + PartialOrd + AddAssign + Default + Copy + Clone,
{
    /// Accumulate another distribution into this one.
    ///
    /// * `distrib` - The other distribution.
    pub fn accumulate(&mut self, distrib: Self) {
        self.sum += distrib.sum;
        self.count += distrib.count;
        self.min = match (self.min, distrib.min) {
            (Some(a), Some(b)) => Some(pbrt::min(a, b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, distrib.max) {
            (Some(a), Some(b)) => Some(pbrt::max(a, b)),
            (a, b) => a.or(b),
        };
    }

    /// Report a sample value.
    ///
    /// * `val`  - Sample value.
    pub fn report(&mut self, val: T) {
        self.sum += val;
        self.count += 1;
        self.min = Some(self.min.map_or(val, |v| pbrt::min(v, val)));
        self.max = Some(self.max.map_or(val, |v| pbrt::max(v, val)));
    }

    /// Returns the number of reported values.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Clear stats.
    pub fn clear(&mut self) {
        self.sum = T::zero();
        self.count = 0;
        self.min = None;
        self.max = None;
    }
}

/// Aggregate different types of statistics. Names use `/` to separate the
/// category from the title, e.g. `"Film/Buffer memory"`.
#[derive(Default)]
pub struct StatsAccumulator {
    /// Counters.
    counters: BTreeMap<String, i64>,

    /// Memory counters.
    memory_counters: BTreeMap<String, u64>,

    /// Integer distribution.
    int_distribution: BTreeMap<String, StatsDistribution<i64>>,

    /// Ratios.
    ratios: BTreeMap<String, (i64, i64)>,
}

impl StatsAccumulator {
    /// Accumulates a counter value.
    ///
    /// * `name` - Statistic name.
    /// * `val`  - Counter value.
    pub fn report_counter(&mut self, name: &str, val: i64) {
        *self.counters.entry(name.to_string()).or_insert(0) += val;
    }

    /// Accumulates a memory counter value.
    ///
    /// * `name` - Statistic name.
    /// * `val`  - Memory counter value.
    pub fn report_memory_counter(&mut self, name: &str, val: u64) {
        *self.memory_counters.entry(name.to_string()).or_insert(0) += val;
    }

    /// Accumulates integer distribution samples.
    ///
    /// * `name`    - Statistic name.
    /// * `distrib` - Distribution.
    pub fn report_int_distribution(&mut self, name: &str, distrib: StatsDistribution<i64>) {
        self.int_distribution
            .entry(name.to_string())
            .or_default()
            .accumulate(distrib);
    }

    /// Accumulates a ratio value.
    ///
    /// * `name`  - Statistic name.
    /// * `num`   - Numerator.
    /// * `denom` - Denominator.
    pub fn report_ratio(&mut self, name: &str, num: i64, denom: i64) {
        let v = self.ratios.entry(name.to_string()).or_insert((0, 0));
        v.0 += num;
        v.1 += denom;
    }

    /// Returns the accumulated value of a counter.
    ///
    /// * `name` - Statistic name.
    pub fn counter(&self, name: &str) -> i64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Returns the accumulated value of a memory counter.
    ///
    /// * `name` - Statistic name.
    pub fn memory_counter(&self, name: &str) -> u64 {
        self.memory_counters.get(name).copied().unwrap_or(0)
    }

    /// Returns the formatted report grouped by category.
    pub fn report(&self) -> BTreeMap<String, Vec<String>> {
        let mut to_print: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut push = |k: &str, s: String| {
            let (category, _) = get_category_and_title(k);
            to_print.entry(category.to_string()).or_default().push(s);
        };

        for (k, v) in self.counters.iter().filter(|(_, v)| **v != 0) {
            let (_, title) = get_category_and_title(k);
            push(k, format!("{title:<42}               {v:12}"));
        }

        for (k, v) in self.memory_counters.iter().filter(|(_, v)| **v != 0) {
            let (_, title) = get_category_and_title(k);
            let kb = *v as f64 / 1024.0;
            let mib = kb / 1024.0;
            let s = if kb < 1024.0 {
                format!("{title:<42}                  {kb:9.2} kB")
            } else if mib < 1024.0 {
                format!("{title:<42}                  {mib:9.2} MiB")
            } else {
                format!("{title:<42}                  {:9.2} GiB", mib / 1024.0)
            };
            push(k, s);
        }

        for (k, v) in self.int_distribution.iter().filter(|(_, v)| v.count > 0) {
            let (_, title) = get_category_and_title(k);
            let mn = v.min.unwrap_or(i64::MAX);
            let mx = v.max.unwrap_or(i64::MIN);
            let avg = v.sum as f64 / v.count as f64;
            push(
                k,
                format!("{title:<42}                      {avg:.3} avg [range {mn} - {mx}]"),
            );
        }

        for (k, &(num, denom)) in self.ratios.iter().filter(|(_, v)| v.1 != 0) {
            let (_, title) = get_category_and_title(k);
            push(
                k,
                format!(
                    "{title:<42}{num:12} / {denom:12} ({:.2}x)",
                    num as f64 / denom as f64
                ),
            );
        }

        to_print
    }

    /// Prints the report.
    pub fn print(&self) {
        println!("Statistics:");
        for (category, items) in self.report() {
            println!("  {category}");
            for item in items {
                println!("    {item}");
            }
        }
    }

    /// Clear the accumulated statistics.
    pub fn clear(&mut self) {
        self.counters.clear();
        self.memory_counters.clear();
        self.int_distribution.clear();
        self.ratios.clear();
    }
}

/// Splits a statistic name at the first `/` and returns category and title.
/// If there is no `/`, then category is the empty string.
///
/// * `s` - The statistic name to split.
fn get_category_and_title(s: &str) -> (&str, &str) {
    match s.find('/') {
        Some(slash) => (&s[0..slash], &s[slash + 1..]),
        None => ("", s),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_by_name() {
        let mut accum = StatsAccumulator::default();
        accum.report_counter("Film/Samples", 3);
        accum.report_counter("Film/Samples", 4);
        accum.report_memory_counter("Memory/Film", 2048);
        assert_eq!(accum.counter("Film/Samples"), 7);
        assert_eq!(accum.counter("Film/Missing"), 0);
        assert_eq!(accum.memory_counter("Memory/Film"), 2048);

        let report = accum.report();
        assert_eq!(report["Film"].len(), 1);
        assert!(report["Memory"][0].contains("2.00 kB"));

        accum.clear();
        assert_eq!(accum.counter("Film/Samples"), 0);
    }

    #[test]
    fn distribution_tracks_range() {
        let mut d = StatsDistribution::<i64>::default();
        d.report(3);
        d.report(1);
        let mut e = StatsDistribution::<i64>::default();
        e.report(9);
        d.accumulate(e);
        assert_eq!(d.count(), 3);
        assert_eq!(d.min, Some(1));
        assert_eq!(d.max, Some(9));
        assert_eq!(d.sum, 13);
    }

    #[test]
    fn category_split() {
        assert_eq!(get_category_and_title("A/B/C"), ("A", "B/C"));
        assert_eq!(get_category_and_title("plain"), ("", "plain"));
    }
}
