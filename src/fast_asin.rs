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

use std::f64::consts::FRAC_PI_2;

/// Branch-limited approximation of `asin` for the fast scale-function
/// variants.
///
/// The central region uses the odd Taylor polynomial of `asin`, the region
/// near 1 uses the complement identity `asin(x) = pi/2 - 2 asin(sqrt((1-x)/2))`
/// with the small argument expanded by the same series. The band in between
/// falls back to `f64::asin`, where neither expansion converges quickly
/// enough to keep the merge bound honest.
///
/// Inputs outside [-1, 1] yield NaN.
pub(crate) fn fast_asin(x: f64) -> f64 {
    if x < 0.0 {
        return -fast_asin(-x);
    }
    // also catches NaN
    if !(x <= 1.0) {
        return f64::NAN;
    }
    if x == 1.0 {
        return FRAC_PI_2;
    }
    if x >= 0.975 {
        let s = ((1.0 - x) / 2.0).sqrt();
        let s2 = s * s;
        let series = 1.0 + s2 * (1.0 / 6.0 + s2 * (3.0 / 40.0 + s2 * (15.0 / 336.0)));
        return FRAC_PI_2 - 2.0 * s * series;
    }
    if x >= 0.5 {
        return x.asin();
    }
    let x2 = x * x;
    x * (1.0
        + x2 * (1.0 / 6.0
            + x2 * (3.0 / 40.0
                + x2 * (15.0 / 336.0 + x2 * (105.0 / 3456.0 + x2 * (945.0 / 42240.0))))))
}

#[cfg(test)]
mod tests {
    use super::fast_asin;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_known_values() {
        assert_eq!(fast_asin(-1.0), -1.5707963267948966);
        assert_eq!(fast_asin(1.0), FRAC_PI_2);
        assert_eq!(fast_asin(0.9), 1.1197695149986342);
        assert_eq!(fast_asin(0.0), 0.0);
        assert!(fast_asin(4.0).is_nan());
        assert!(fast_asin(-4.0).is_nan());
        assert!(fast_asin(1.0000000001).is_nan());
        assert!(fast_asin(f64::NAN).is_nan());
    }

    #[test]
    fn test_tracks_asin() {
        let mut x = -1.0;
        while x <= 1.0 {
            let got = fast_asin(x);
            let want = x.asin();
            assert!(
                (got - want).abs() < 1e-5,
                "fast_asin({x}) = {got}, asin = {want}"
            );
            x += 1.0 / 4096.0;
        }
    }

    #[test]
    fn test_monotonic() {
        let mut prev = fast_asin(-1.0);
        let mut x = -1.0 + 1.0 / 8192.0;
        while x <= 1.0 {
            let cur = fast_asin(x);
            assert!(cur >= prev, "fast_asin not monotonic at {x}");
            prev = cur;
            x += 1.0 / 8192.0;
        }
    }
}
