//! CGG1 measurement notification parsing.

use bytes::Buf;

use crate::error::{Error, Result};

/// A decoded temperature/humidity push from the data characteristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

impl Measurement {
    /// Size of the fixed part of the payload.
    pub const MIN_SIZE: usize = 6;

    /// Parse a measurement from notification data.
    ///
    /// Payload layout:
    /// - Bytes 0-1: header, ignored
    /// - Bytes 2-3: temperature (int16 little-endian, 0.1°C)
    /// - Bytes 4-5: relative humidity (uint16 little-endian, 0.1%)
    ///
    /// Trailing bytes are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use mitemp_cgg1_ble::protocol::Measurement;
    ///
    /// let m = Measurement::parse(&[0x08, 0x09, 0xE2, 0x00, 0xF1, 0x01]).unwrap();
    /// assert_eq!(m.temperature, 22.6);
    /// assert_eq!(m.humidity, 49.7);
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(Error::InvalidData {
                context: format!(
                    "Measurement too short: {} bytes (need at least {})",
                    data.len(),
                    Self::MIN_SIZE
                ),
            });
        }

        let mut buf = &data[2..Self::MIN_SIZE];
        let temperature = buf.get_i16_le() as f64 / 10.0;
        let humidity = buf.get_u16_le() as f64 / 10.0;

        Ok(Self {
            temperature,
            humidity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_measurement() {
        let m = Measurement::parse(&[0x00, 0x00, 0xE7, 0x00, 0x5C, 0x02]).unwrap();
        assert_eq!(m.temperature, 23.1);
        assert_eq!(m.humidity, 60.4);
    }

    #[test]
    fn test_parse_negative_temperature() {
        // -5.3°C = -53 = 0xFFCB
        let m = Measurement::parse(&[0x00, 0x00, 0xCB, 0xFF, 0x20, 0x03]).unwrap();
        assert_eq!(m.temperature, -5.3);
        assert_eq!(m.humidity, 80.0);
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let m = Measurement::parse(&[0x08, 0x09, 0xE2, 0x00, 0xF1, 0x01, 0x99, 0x99]).unwrap();
        assert_eq!(m.temperature, 22.6);
        assert_eq!(m.humidity, 49.7);
    }

    #[test]
    fn test_parse_too_short() {
        for len in 0..Measurement::MIN_SIZE {
            let data = vec![0u8; len];
            assert!(matches!(
                Measurement::parse(&data),
                Err(Error::InvalidData { .. })
            ));
        }
    }

    proptest! {
        #[test]
        fn prop_parse_matches_raw_fields(data in proptest::collection::vec(any::<u8>(), 6..32)) {
            let m = Measurement::parse(&data).unwrap();
            let raw_t = i16::from_le_bytes([data[2], data[3]]);
            let raw_h = u16::from_le_bytes([data[4], data[5]]);
            prop_assert_eq!(m.temperature, raw_t as f64 / 10.0);
            prop_assert_eq!(m.humidity, raw_h as f64 / 10.0);
        }
    }
}
