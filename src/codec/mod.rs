pub mod payload;
pub mod records;

pub use payload::{
    asset_key, decode, encode, DecodedPayload, TransferPayload, ACCEL_ASSET, ACTIVITY_NAME,
    GYRO_ASSET, USERNAME,
};
pub use records::{decode_records, encode_records};
