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

//! Streaming t-digest sketch for estimating quantiles and cumulative ranks.
//!
//! The implementation in this crate is based on the MergingDigest described
//! in [Computing Extremely Accurate Quantiles Using t-Digests][paper] by Ted
//! Dunning and Otmar Ertl: incoming samples are staged in an unsorted
//! buffer, and once the buffer fills up (or a query arrives) the buffer and
//! the existing centroid list are merged in one sorted pass, bounding each
//! cluster by a [scale function](crate::ScaleFunction). The scale function
//! keeps clusters near the tails small, so extreme quantiles stay accurate
//! while the total memory remains bounded by the compression parameter.
//!
//! Beyond the merging digest of the paper, this crate supports:
//!
//! * weighted samples, and merging of digests built over disjoint streams
//!   via [`TDigest::add_centroid_list`];
//! * the full family of scale functions (K1 through KQuadratic, including
//!   the spliced and approximate-arcsine variants), swappable per digest;
//! * optional exponential decay that periodically down-weights history so
//!   the digest tracks recent data;
//! * a compact little-endian binary encoding with validating decode.
//!
//! t-digest is empirical: it has no closed-form error bound and its accuracy
//! depends on the input data, but for common distributions it produces
//! excellent results, especially near the tails.
//!
//! # Examples
//!
//! ```
//! use tdigest::TDigest;
//!
//! let mut digest = TDigest::with_compression(500.0);
//! for i in 0..1000 {
//!     digest.add(i as f64, 1.0);
//! }
//!
//! let median = digest.quantile(0.5);
//! assert!((median - 500.0).abs() < 20.0);
//! let rank = digest.cdf(250.0);
//! assert!((rank - 0.25).abs() < 0.02);
//! ```
//!
//! A digest is single-threaded; callers that ingest from multiple producers
//! keep one digest per producer and merge them.
//!
//! [paper]: https://arxiv.org/abs/1902.04023

#![deny(missing_docs)]

pub mod error;
mod fast_asin;
mod scale;
mod serialization;
mod sketch;

pub use self::scale::ScaleFunction;
pub use self::sketch::Centroid;
pub use self::sketch::TDigest;
