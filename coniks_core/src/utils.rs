// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Utility functions

/// Corresponds to the I2OSP() function from RFC8017, prepending the length of
/// a byte array to the byte array (so that it is ready for serialization and hashing)
///
/// Input byte array cannot be > 2^64-1 in length
pub fn i2osp_array(input: &[u8]) -> Vec<u8> {
    [&(input.len() as u64).to_be_bytes(), input].concat()
}

/// Serializes an optional byte array with a presence marker, so that an absent
/// value and an empty one encode differently
pub fn i2osp_option(input: Option<&[u8]>) -> Vec<u8> {
    match input {
        None => vec![0u8],
        Some(bytes) => [&[1u8][..], &i2osp_array(bytes)].concat(),
    }
}

/// Serde serialization helpers
#[cfg(feature = "serde_serialization")]
pub mod serde_helpers {
    use hex::{FromHex, ToHex};
    use serde::Deserialize;

    /// A serde hex serializer for bytes
    pub fn bytes_serialize_hex<S, T>(x: &T, s: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: AsRef<[u8]>,
    {
        let hex_str = &x.as_ref().encode_hex_upper::<String>();
        s.serialize_str(hex_str)
    }

    /// A serde hex deserializer for bytes
    pub fn bytes_deserialize_hex<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: AsRef<[u8]> + FromHex,
        <T as FromHex>::Error: core::fmt::Display,
    {
        let hex_str = String::deserialize(deserializer)?;
        T::from_hex(hex_str).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i2osp_array_prefixes_length() {
        assert_eq!(vec![0, 0, 0, 0, 0, 0, 0, 0], i2osp_array(&[]));
        assert_eq!(
            vec![0, 0, 0, 0, 0, 0, 0, 2, 0xab, 0xcd],
            i2osp_array(&[0xab, 0xcd])
        );
    }

    #[test]
    fn test_i2osp_option_distinguishes_empty_from_absent() {
        assert_eq!(vec![0u8], i2osp_option(None));
        assert_eq!(
            vec![1, 0, 0, 0, 0, 0, 0, 0, 0],
            i2osp_option(Some(&[]))
        );
        assert_ne!(i2osp_option(None), i2osp_option(Some(&[])));
    }
}
