// serde_json writes non-finite floats as `null`; read `null` back as NaN so a missed ping
// or an `[N/A]` GPU reading survives the line format.

use serde::{Deserialize, Deserializer};

pub(super) fn nan_as_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Default for readings a record may omit.
pub(super) fn missing_reading() -> f64 {
    f64::NAN
}
