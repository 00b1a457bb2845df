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

use std::io::Cursor;

use byteorder::LE;
use byteorder::ReadBytesExt;

use crate::error::Error;
use crate::sketch::Centroid;
use crate::sketch::TDigest;

/// First two bytes of every encoded digest, `80 0C` on the wire.
const MAGIC: u16 = 0x0c80;
const ENCODING_VERSION: i32 = 1;
/// Upper bound on the decoded centroid count, far above anything a sane
/// compression produces.
const MAX_CENTROIDS: i32 = 1 << 20;

/// magic + version + compression + count
const HEADER_SIZE: usize = 2 + 4 + 8 + 4;
/// weight + mean
const CENTROID_SIZE: usize = 8 + 8;

impl TDigest {
    /// Encodes the digest into its little-endian binary form.
    ///
    /// Staged samples are merged first, so no data is lost; the staging
    /// buffer is not part of the wire format.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tdigest::TDigest;
    /// let mut digest = TDigest::new();
    /// digest.add(1.0, 1.0);
    /// let bytes = digest.serialize();
    /// let decoded = TDigest::deserialize(&bytes).unwrap();
    /// assert_eq!(decoded, digest);
    /// ```
    pub fn serialize(&mut self) -> Vec<u8> {
        let compression = self.compression();
        let centroids = self.centroids();

        let mut bytes = Vec::with_capacity(HEADER_SIZE + centroids.len() * CENTROID_SIZE);
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        bytes.extend_from_slice(&ENCODING_VERSION.to_le_bytes());
        bytes.extend_from_slice(&compression.to_le_bytes());
        bytes.extend_from_slice(&(centroids.len() as i32).to_le_bytes());
        for centroid in centroids {
            bytes.extend_from_slice(&centroid.weight.to_le_bytes());
            bytes.extend_from_slice(&centroid.mean.to_le_bytes());
        }
        bytes
    }

    /// Decodes a digest from its binary form.
    ///
    /// The decoded digest carries the default scale function and no decay
    /// configuration; neither is part of the wire format.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::UnexpectedEndOfInput`] if the input is truncated at any
    /// stage, [`ErrorKind::InvalidData`] for a bad magic value, an
    /// unsupported encoding version, a negative or oversized centroid count,
    /// or non-finite / unordered centroid means. On error no digest is
    /// produced.
    ///
    /// [`ErrorKind::UnexpectedEndOfInput`]: crate::error::ErrorKind::UnexpectedEndOfInput
    /// [`ErrorKind::InvalidData`]: crate::error::ErrorKind::InvalidData
    pub fn deserialize(bytes: &[u8]) -> Result<TDigest, Error> {
        fn eof(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::unexpected_eof(tag)
        }

        let mut cursor = Cursor::new(bytes);

        let magic = cursor.read_u16::<LE>().map_err(eof("header magic"))?;
        if magic != MAGIC {
            return Err(Error::deserial(format!(
                "invalid header magic value 0x{magic:04x}"
            )));
        }
        let version = cursor.read_i32::<LE>().map_err(eof("encoding version"))?;
        if version != ENCODING_VERSION {
            return Err(Error::deserial(format!(
                "invalid encoding version {version}"
            )));
        }
        let compression = cursor.read_f64::<LE>().map_err(eof("compression"))?;
        if !compression.is_finite() || compression <= 0.0 {
            return Err(Error::deserial(format!(
                "compression must be positive, have {compression}"
            )));
        }
        let num_centroids = cursor.read_i32::<LE>().map_err(eof("centroid count"))?;
        if num_centroids < 0 {
            return Err(Error::deserial(format!(
                "number of centroids cannot be negative, have {num_centroids}"
            )));
        }
        if num_centroids > MAX_CENTROIDS {
            return Err(Error::deserial(format!(
                "invalid n, cannot be greater than 2^20: {num_centroids}"
            )));
        }

        let mut centroids: Vec<Centroid> = Vec::with_capacity(num_centroids as usize);
        let mut total_weight = 0.0;
        for i in 0..num_centroids {
            let weight = cursor.read_f64::<LE>().map_err(eof("centroid weight"))?;
            let mean = cursor.read_f64::<LE>().map_err(eof("centroid mean"))?;
            if mean.is_nan() {
                return Err(Error::deserial("NaN mean not permitted"));
            }
            if mean.is_infinite() {
                return Err(Error::deserial("Inf mean not permitted"));
            }
            if let Some(previous) = centroids.last() {
                if mean < previous.mean {
                    return Err(Error::deserial(format!(
                        "centroid {i} has lower mean ({mean}) than preceding centroid {} ({})",
                        i - 1,
                        previous.mean
                    )));
                }
            }
            total_weight += weight;
            centroids.push(Centroid::new(mean, weight));
        }

        Ok(TDigest::from_parts(compression, centroids, total_weight))
    }
}
