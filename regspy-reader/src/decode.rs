//! Turns raw samples back into request shaped values
use std::{error::Error, fmt::Display};

use crate::{
    bits,
    catalog::Location,
    executor::RawSamples,
    plan::{PlannedRequest, Resolution},
};

/// A decoded request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodedResult {
    /// Little-endian value of `raw`, or the field value for bit-field requests.
    pub value: u64,
    /// The bytes the value was decoded from. Always the whole 32 bit register for
    /// bit-fields.
    pub raw: Vec<u8>,
    pub description: String,
}

/// The location behind a request could not be read, e.g. a core register of a
/// running target.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Unreadable {
    pub location: Location,
}

impl Display for Unreadable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Could not read {}", self.location)
    }
}

impl Error for Unreadable {}

/// Decodes one planned request from the samples of its plan.
pub fn decode(
    planned: &PlannedRequest<'_>,
    samples: &RawSamples,
) -> Result<DecodedResult, Unreadable> {
    let location = planned.resolution.location();
    let sample = match &location {
        Location::Address(address) => samples.memory(*address).map(<[u8]>::to_vec),
        Location::Core(selector) => samples.core(selector).map(|bytes| bytes.to_vec()),
    };
    let unreadable = || Unreadable {
        location: location.clone(),
    };
    let sample = sample.ok_or_else(unreadable)?;

    match &planned.resolution {
        Resolution::Register { register, width } => {
            let raw = prefix(&sample, width.bytes()).ok_or_else(unreadable)?;
            let value = bits::decode_whole(&raw, raw.len());
            let description = if width.bytes() == 4 {
                register.describe(value as u32)
            } else {
                describe_whole(register.name(), value, raw.len())
            };
            Ok(DecodedResult {
                value,
                raw,
                description,
            })
        }
        Resolution::Field { register, field } => {
            let raw = prefix(&sample, 4).ok_or_else(unreadable)?;
            let container = bits::container(&raw);
            Ok(DecodedResult {
                value: u64::from(field.value(container)),
                description: format!("{}.{}", register.name(), field.describe(container)),
                raw,
            })
        }
        Resolution::Memory { width, .. } => {
            let raw = prefix(&sample, width.bytes()).ok_or_else(unreadable)?;
            let value = bits::decode_whole(&raw, raw.len());
            Ok(DecodedResult {
                value,
                description: describe_whole(&planned.request.key(), value, raw.len()),
                raw,
            })
        }
    }
}

/// The first `len` bytes, if the sample is long enough.
fn prefix(sample: &[u8], len: usize) -> Option<Vec<u8>> {
    sample.get(..len).map(<[u8]>::to_vec)
}

/// `name = 0x{hex, two digits per byte} = {decimal}u`
fn describe_whole(name: &str, value: u64, bytes: usize) -> String {
    format!(
        "{} = 0x{:0digits$X} = {}u",
        name,
        value,
        value,
        digits = bytes * 2
    )
}
