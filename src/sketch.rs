// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::cmp::Ordering;
use std::f64::consts::PI;

use crate::error::Error;
use crate::scale::ScaleFunction;

/// The default compression if one is not specified.
const DEFAULT_COMPRESSION: f64 = 100.0;
/// Multiplier for the staging buffer size relative to the processed
/// capacity.
const BUFFER_MULTIPLIER: usize = 8;

/// A weighted cluster of samples: `weight` samples whose average is `mean`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    /// Average of the samples summarized by this centroid. Always finite.
    pub mean: f64,
    /// Number of samples summarized by this centroid. Always positive,
    /// fractional after decay.
    pub weight: f64,
}

impl Centroid {
    /// Creates a centroid with the given mean and weight.
    pub fn new(mean: f64, weight: f64) -> Self {
        Centroid { mean, weight }
    }

    /// Folds `other` into this centroid, keeping the weighted mean.
    fn add(&mut self, other: Centroid) {
        self.weight += other.weight;
        self.mean += other.weight * (other.mean - self.mean) / self.weight;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Decay {
    value: f64,
    every: u64,
}

/// T-Digest sketch for estimating quantiles and cumulative ranks over a
/// stream of weighted samples.
///
/// See the [crate level documentation](crate) for more.
#[derive(Debug, Clone)]
pub struct TDigest {
    compression: f64,
    scale: ScaleFunction,
    decay: Option<Decay>,
    add_count: u64,

    min: f64,
    max: f64,

    processed: Vec<Centroid>,
    unprocessed: Vec<Centroid>,
    cumulative: Vec<f64>,
    processed_weight: f64,
    unprocessed_weight: f64,

    max_processed: usize,
    max_unprocessed: usize,
}

impl Default for TDigest {
    fn default() -> Self {
        TDigest::with_compression(DEFAULT_COMPRESSION)
    }
}

impl TDigest {
    /// Creates a digest with the default compression of 100 and no decay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a digest with the given compression.
    ///
    /// Larger compression keeps more centroids and yields better accuracy;
    /// typical values are 50 to 1000.
    ///
    /// The fallible version of this method is [`TDigest::try_with_compression`].
    ///
    /// # Panics
    ///
    /// Panics if compression is not positive.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tdigest::TDigest;
    /// let digest = TDigest::with_compression(500.0);
    /// assert_eq!(digest.compression(), 500.0);
    /// ```
    pub fn with_compression(compression: f64) -> Self {
        assert!(
            compression > 0.0,
            "compression must be positive, got {compression}"
        );
        Self::make(compression, None, vec![], 0.0)
    }

    /// Creates a digest with the given compression.
    ///
    /// The panicking version of this method is [`TDigest::with_compression`].
    ///
    /// # Errors
    ///
    /// If compression is not positive, returns [`ErrorKind::InvalidArgument`].
    ///
    /// [`ErrorKind::InvalidArgument`]: crate::error::ErrorKind::InvalidArgument
    pub fn try_with_compression(compression: f64) -> Result<Self, Error> {
        if !(compression > 0.0) {
            return Err(Error::invalid_argument(format!(
                "compression must be positive, got {compression}"
            )));
        }
        Ok(Self::make(compression, None, vec![], 0.0))
    }

    /// Creates a digest that periodically down-weights history: after every
    /// `decay_every` samples, all centroid weights are multiplied by
    /// `decay_value`, so recent data dominates the estimates.
    ///
    /// # Panics
    ///
    /// Panics if compression is not positive, `decay_value` is outside
    /// (0, 1], or `decay_every` is zero.
    pub fn with_decay(compression: f64, decay_value: f64, decay_every: u64) -> Self {
        assert!(
            compression > 0.0,
            "compression must be positive, got {compression}"
        );
        assert!(
            decay_value > 0.0 && decay_value <= 1.0,
            "decay value must be in (0, 1], got {decay_value}"
        );
        assert!(decay_every > 0, "decay interval must be positive");
        Self::make(
            compression,
            Some(Decay {
                value: decay_value,
                every: decay_every,
            }),
            vec![],
            0.0,
        )
    }

    pub(crate) fn from_parts(
        compression: f64,
        processed: Vec<Centroid>,
        processed_weight: f64,
    ) -> Self {
        Self::make(compression, None, processed, processed_weight)
    }

    fn make(
        compression: f64,
        decay: Option<Decay>,
        processed: Vec<Centroid>,
        processed_weight: f64,
    ) -> Self {
        let max_processed = (2.0 * PI * compression).ceil() as usize;
        let max_unprocessed = max_processed * BUFFER_MULTIPLIER;

        let (min, max) = match (processed.first(), processed.last()) {
            (Some(first), Some(last)) => (first.mean, last.mean),
            _ => (f64::INFINITY, f64::NEG_INFINITY),
        };

        let mut digest = TDigest {
            compression,
            scale: ScaleFunction::default(),
            decay,
            add_count: 0,
            min,
            max,
            processed,
            unprocessed: Vec::new(),
            cumulative: Vec::new(),
            processed_weight,
            unprocessed_weight: 0.0,
            max_processed,
            max_unprocessed,
        };
        digest.update_cumulative();
        digest
    }

    /// Returns the compression parameter this digest was configured with.
    pub fn compression(&self) -> f64 {
        self.compression
    }

    /// Returns the scale function used during compression.
    pub fn scale(&self) -> ScaleFunction {
        self.scale
    }

    /// Replaces the scale function used during compression.
    ///
    /// Swapping mid-stream is legal; it changes how subsequent compressions
    /// bound cluster sizes, not the data already absorbed.
    pub fn set_scale(&mut self, scale: ScaleFunction) {
        self.scale = scale;
    }

    /// Returns true if the digest has not seen any data.
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty() && self.unprocessed.is_empty()
    }

    /// Returns the total weight absorbed by the digest, after any decay.
    pub fn total_weight(&self) -> f64 {
        self.processed_weight + self.unprocessed_weight
    }

    /// Returns the smallest sample seen; `None` if the digest is empty.
    pub fn min_value(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.min)
        }
    }

    /// Returns the largest sample seen; `None` if the digest is empty.
    pub fn max_value(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.max)
        }
    }

    /// Adds a sample with the given weight.
    ///
    /// Non-finite means and non-positive weights are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tdigest::TDigest;
    /// let mut digest = TDigest::new();
    /// digest.add(42.0, 2.0);
    /// assert_eq!(digest.total_weight(), 2.0);
    /// ```
    pub fn add(&mut self, mean: f64, weight: f64) {
        self.add_centroid(Centroid::new(mean, weight));
    }

    /// Adds a pre-aggregated centroid.
    ///
    /// Centroids with non-finite means or non-positive weights are ignored.
    pub fn add_centroid(&mut self, centroid: Centroid) {
        if !centroid.mean.is_finite() || !(centroid.weight > 0.0) {
            return;
        }

        if self.processed.len() > self.max_processed
            || self.unprocessed.len() >= self.max_unprocessed
        {
            self.compress();
        }

        self.unprocessed.push(centroid);
        self.unprocessed_weight += centroid.weight;
        self.min = self.min.min(centroid.mean);
        self.max = self.max.max(centroid.mean);

        if let Some(decay) = self.decay {
            self.add_count += 1;
            if self.add_count % decay.every == 0 {
                self.apply_decay(decay.value);
            }
        }
    }

    /// Merges the centroids of another digest (or any centroid list) into
    /// this one.
    ///
    /// The centroids are copied through the ordinary staging path, so the
    /// insertion order does not affect the final state beyond the documented
    /// accuracy envelope.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tdigest::TDigest;
    /// let mut left = TDigest::new();
    /// let mut right = TDigest::new();
    /// left.add(1.0, 1.0);
    /// right.add(2.0, 1.0);
    /// let foreign = right.centroids().to_vec();
    /// left.add_centroid_list(&foreign);
    /// assert_eq!(left.total_weight(), 2.0);
    /// ```
    pub fn add_centroid_list(&mut self, centroids: &[Centroid]) {
        for &centroid in centroids {
            self.add_centroid(centroid);
        }
    }

    /// Returns the compressed centroid list, sorted by mean.
    ///
    /// Forces any staged samples to be merged first.
    pub fn centroids(&mut self) -> &[Centroid] {
        self.compress();
        &self.processed
    }

    /// Resets the digest to empty, preserving compression, scale function
    /// and decay configuration.
    pub fn clear(&mut self) {
        self.processed.clear();
        self.unprocessed.clear();
        self.cumulative.clear();
        self.processed_weight = 0.0;
        self.unprocessed_weight = 0.0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
        self.add_count = 0;
    }

    /// Estimates the value at the given rank `q` in [0, 1].
    ///
    /// Returns NaN if the digest is empty or `q` is outside [0, 1].
    /// Forces any staged samples to be merged first.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tdigest::TDigest;
    /// let mut digest = TDigest::with_compression(1000.0);
    /// for x in [1.0, 2.0, 3.0, 4.0, 5.0] {
    ///     digest.add(x, 1.0);
    /// }
    /// assert_eq!(digest.quantile(0.5), 3.0);
    /// ```
    pub fn quantile(&mut self, q: f64) -> f64 {
        self.compress();
        if !(0.0..=1.0).contains(&q) || self.processed.is_empty() {
            return f64::NAN;
        }
        if self.processed.len() == 1 {
            return self.processed[0].mean;
        }

        let total_weight = self.processed_weight;
        let index = q * total_weight;

        let first = self.processed[0];
        if index <= first.weight / 2.0 {
            return self.min + 2.0 * index / first.weight * (first.mean - self.min);
        }
        let last = self.processed[self.processed.len() - 1];
        if index >= total_weight - last.weight / 2.0 {
            return self.max - 2.0 * (total_weight - index) / last.weight * (self.max - last.mean);
        }

        // index falls strictly between the half-weights of the extreme
        // centroids, so the straddling pair exists
        let upper = self.cumulative.partition_point(|&w| w < index);
        let z1 = index - self.cumulative[upper - 1];
        let z2 = self.cumulative[upper] - index;
        weighted_average(
            self.processed[upper - 1].mean,
            z2,
            self.processed[upper].mean,
            z1,
        )
    }

    /// Estimates the fraction of the absorbed weight that is `<= x`.
    ///
    /// Returns NaN if the digest is empty or `x` is NaN.
    /// Forces any staged samples to be merged first.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tdigest::TDigest;
    /// let mut digest = TDigest::with_compression(1000.0);
    /// for x in [1.0, 2.0, 3.0, 4.0, 5.0] {
    ///     digest.add(x, 1.0);
    /// }
    /// assert_eq!(digest.cdf(3.0), 0.5);
    /// ```
    pub fn cdf(&mut self, x: f64) -> f64 {
        self.compress();
        if self.processed.is_empty() || x.is_nan() {
            return f64::NAN;
        }
        if x < self.min {
            return 0.0;
        }
        if x > self.max {
            return 1.0;
        }
        if self.processed.len() == 1 {
            return match x.partial_cmp(&self.processed[0].mean) {
                Some(Ordering::Less) => 0.0,
                Some(Ordering::Equal) => 0.5,
                Some(Ordering::Greater) => 1.0,
                None => unreachable!("NaN handled above"),
            };
        }

        let total_weight = self.processed_weight;

        let first = self.processed[0];
        if x <= first.mean {
            if first.mean - self.min > 0.0 {
                return (x - self.min) / (first.mean - self.min) * first.weight / total_weight
                    / 2.0;
            }
            return 0.0;
        }
        let last = self.processed[self.processed.len() - 1];
        if x >= last.mean {
            if self.max - last.mean > 0.0 {
                return 1.0 - (self.max - x) / (self.max - last.mean) * last.weight / total_weight
                    / 2.0;
            }
            return 1.0;
        }

        let upper = self.processed.partition_point(|c| c.mean <= x);
        let z1 = x - self.processed[upper - 1].mean;
        let z2 = self.processed[upper].mean - x;
        weighted_average(self.cumulative[upper - 1], z2, self.cumulative[upper], z1)
            / total_weight
    }

    /// Merges the staged samples into the compressed centroid list.
    ///
    /// No-op when the staging buffer is empty. Afterwards the processed list
    /// is sorted by mean, its weight total matches, and each cluster spans
    /// at most one unit of the scale function's index domain.
    fn compress(&mut self) {
        if self.unprocessed.is_empty() {
            return;
        }

        let mut merged = std::mem::take(&mut self.unprocessed);
        merged.append(&mut self.processed);
        merged.sort_unstable_by(centroid_cmp);

        let total_weight = self.processed_weight + self.unprocessed_weight;
        let normalizer = self.scale.normalizer(self.compression, total_weight);

        self.processed.push(merged[0]);
        let mut so_far = merged[0].weight;
        let mut limit =
            total_weight * self.scale.q(self.scale.k(0.0, normalizer) + 1.0, normalizer);
        for &centroid in &merged[1..] {
            let projected = so_far + centroid.weight;
            if projected <= limit {
                // ties merge, keeping compression deterministic
                so_far = projected;
                let tail = self.processed.len() - 1;
                self.processed[tail].add(centroid);
            } else {
                let k_left = self.scale.k(so_far / total_weight, normalizer);
                limit = total_weight * self.scale.q(k_left + 1.0, normalizer);
                so_far += centroid.weight;
                self.processed.push(centroid);
            }
        }

        self.processed_weight = total_weight;
        self.unprocessed_weight = 0.0;
        merged.clear();
        self.unprocessed = merged;

        self.min = self.min.min(self.processed[0].mean);
        self.max = self.max.max(self.processed[self.processed.len() - 1].mean);
        self.update_cumulative();
    }

    /// Rebuilds the cumulative rank vector: entry i is the weight of all
    /// centroids before i plus half of centroid i's own weight, with the
    /// total weight appended.
    fn update_cumulative(&mut self) {
        self.cumulative.clear();
        self.cumulative.reserve(self.processed.len() + 1);
        let mut so_far = 0.0;
        for centroid in &self.processed {
            self.cumulative.push(so_far + centroid.weight / 2.0);
            so_far += centroid.weight;
        }
        self.cumulative.push(so_far);
    }

    fn apply_decay(&mut self, factor: f64) {
        for centroid in &mut self.processed {
            centroid.weight *= factor;
        }
        for centroid in &mut self.unprocessed {
            centroid.weight *= factor;
        }
        // cumulative ranks scale linearly with the weights
        for rank in &mut self.cumulative {
            *rank *= factor;
        }
        self.processed_weight *= factor;
        self.unprocessed_weight *= factor;
    }
}

/// Equality covers the observable distribution state: compression, scale
/// function, centroid sequences, weight totals and the min/max bounds. The
/// decay configuration is an ingest-time policy and the cumulative vector is
/// derived, so neither participates.
impl PartialEq for TDigest {
    fn eq(&self, other: &Self) -> bool {
        self.compression == other.compression
            && self.scale == other.scale
            && self.processed == other.processed
            && self.unprocessed == other.unprocessed
            && self.processed_weight == other.processed_weight
            && self.unprocessed_weight == other.unprocessed_weight
            && self.min_value() == other.min_value()
            && self.max_value() == other.max_value()
    }
}

fn centroid_cmp(a: &Centroid, b: &Centroid) -> Ordering {
    match a.mean.partial_cmp(&b.mean) {
        Some(order) => order,
        None => unreachable!("NaN values should never be present in centroids"),
    }
}

fn weighted_average(x1: f64, w1: f64, x2: f64, w2: f64) -> f64 {
    if x1 <= x2 {
        weighted_average_sorted(x1, w1, x2, w2)
    } else {
        weighted_average_sorted(x2, w2, x1, w1)
    }
}

fn weighted_average_sorted(x1: f64, w1: f64, x2: f64, w2: f64) -> f64 {
    let x = (x1 * w1 + x2 * w2) / (w1 + w2);
    x.clamp(x1, x2)
}
