use std::collections::HashMap;

use super::records::{decode_records, encode_records};
use crate::core::{Record, SensorChannel};
use crate::error::DecodeError;
use crate::transport::DataMap;

pub const ACCEL_ASSET: &str = "ACCEL_ASSET";
pub const GYRO_ASSET: &str = "GYRO_ASSET";
pub const USERNAME: &str = "USERNAME";
pub const ACTIVITY_NAME: &str = "ACTIVITY_NAME";

/// Asset key carrying a channel's records
pub fn asset_key(channel: SensorChannel) -> &'static str {
    match channel {
        SensorChannel::Accelerometer => ACCEL_ASSET,
        SensorChannel::Gyroscope => GYRO_ASSET,
    }
}

/// Serialized session batch exchanged across the device boundary.
///
/// Either asset may be absent when the payload comes off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferPayload {
    pub accel: Option<Vec<u8>>,
    pub gyro: Option<Vec<u8>>,
    pub metadata: HashMap<String, String>,
}

/// Records and metadata recovered from a [`TransferPayload`]
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub accel: Vec<Record>,
    pub gyro: Vec<Record>,
    pub metadata: HashMap<String, String>,
}

impl TransferPayload {
    pub fn asset(&self, channel: SensorChannel) -> Option<&[u8]> {
        match channel {
            SensorChannel::Accelerometer => self.accel.as_deref(),
            SensorChannel::Gyroscope => self.gyro.as_deref(),
        }
    }

    /// Decode a single channel, independent of the other asset
    pub fn decode_channel(&self, channel: SensorChannel) -> Result<Vec<Record>, DecodeError> {
        let bytes = self
            .asset(channel)
            .ok_or_else(|| DecodeError::MissingAsset(asset_key(channel).to_string()))?;
        decode_records(bytes)
    }

    pub fn username(&self) -> Option<&str> {
        self.metadata.get(USERNAME).map(String::as_str)
    }

    pub fn activity_name(&self) -> Option<&str> {
        self.metadata.get(ACTIVITY_NAME).map(String::as_str)
    }

    pub fn into_data_map(self) -> DataMap {
        let mut data = DataMap::new();
        if let Some(accel) = self.accel {
            data.put_asset(ACCEL_ASSET, accel);
        }
        if let Some(gyro) = self.gyro {
            data.put_asset(GYRO_ASSET, gyro);
        }
        for (key, value) in self.metadata {
            data.put_string(key, value);
        }
        data
    }

    pub fn from_data_map(mut data: DataMap) -> Self {
        Self {
            accel: data.take_asset(ACCEL_ASSET),
            gyro: data.take_asset(GYRO_ASSET),
            metadata: data.strings().clone(),
        }
    }
}

/// Serialize both buffers independently into one payload
pub fn encode(accel: &[Record], gyro: &[Record], metadata: HashMap<String, String>) -> TransferPayload {
    TransferPayload {
        accel: Some(encode_records(accel)),
        gyro: Some(encode_records(gyro)),
        metadata,
    }
}

/// Decode both buffers; fails if either asset is missing or malformed
pub fn decode(payload: &TransferPayload) -> Result<DecodedPayload, DecodeError> {
    Ok(DecodedPayload {
        accel: payload.decode_channel(SensorChannel::Accelerometer)?,
        gyro: payload.decode_channel(SensorChannel::Gyroscope)?,
        metadata: payload.metadata.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: i64) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new(i * 1_000_000, i as f64 * 0.1, -(i as f64), 9.81))
            .collect()
    }

    fn labels() -> HashMap<String, String> {
        HashMap::from([
            (USERNAME.to_string(), "u1".to_string()),
            (ACTIVITY_NAME.to_string(), "walk".to_string()),
        ])
    }

    #[test]
    fn test_roundtrip_zero_one_many() {
        for (a, g) in [(0, 0), (1, 0), (0, 1), (250, 17)] {
            let payload = encode(&records(a), &records(g), labels());
            let decoded = decode(&payload).unwrap();
            assert_eq!(decoded.accel, records(a));
            assert_eq!(decoded.gyro, records(g));
            assert_eq!(decoded.metadata, labels());
        }
    }

    #[test]
    fn test_roundtrip_through_data_map() {
        let payload = encode(&records(3), &records(2), labels());
        let restored = TransferPayload::from_data_map(payload.clone().into_data_map());
        assert_eq!(restored, payload);
        assert_eq!(restored.username(), Some("u1"));
        assert_eq!(restored.activity_name(), Some("walk"));
    }

    #[test]
    fn test_metadata_is_optional() {
        let payload = encode(&records(1), &records(1), HashMap::new());
        let restored = TransferPayload::from_data_map(payload.into_data_map());
        assert_eq!(restored.username(), None);
        assert!(decode(&restored).is_ok());
    }

    #[test]
    fn test_missing_asset() {
        let mut payload = encode(&records(1), &records(1), HashMap::new());
        payload.gyro = None;

        assert_eq!(
            decode(&payload),
            Err(DecodeError::MissingAsset(GYRO_ASSET.to_string()))
        );
        assert_eq!(payload.decode_channel(SensorChannel::Accelerometer).unwrap().len(), 1);
    }
}
