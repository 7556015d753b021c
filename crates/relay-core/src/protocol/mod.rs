//! Protocol module containing the envelope model, the JSON codec, and the
//! per-message diagnostics.

pub mod classify;
pub mod codec;
pub mod envelope;
pub mod sensor;

pub use classify::{classify, LogHint, Severity};
pub use codec::{decode, encode, encode_text, DecodeError, EncodeError};
pub use envelope::*;
pub use sensor::{parse_sensor_event, SensorError, SensorEvent};
