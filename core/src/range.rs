//! `Range` request header composition.
//!
//! Ranges accumulate on one header: the first call writes `unit=spec`,
//! later calls append `,spec`. A header carries a single unit, so adding a
//! range in another unit is an error and leaves the header untouched.

use std::fmt;

use crate::error::ApiError;
use crate::http::HttpRequest;

pub const DEFAULT_RANGE_UNIT: &str = "bytes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `first-`: from an offset to the end.
    From(u64),
    /// `first-last`, inclusive.
    Between(u64, u64),
    /// `-len`: the final `len` units.
    Suffix(u64),
}

impl RangeSpec {
    fn validate(self) -> Result<Self, ApiError> {
        match self {
            RangeSpec::Between(first, last) if first > last => Err(ApiError::InvalidRange(format!(
                "first position {first} is after last position {last}"
            ))),
            RangeSpec::Suffix(0) => Err(ApiError::InvalidRange("empty suffix range".into())),
            spec => Ok(spec),
        }
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSpec::From(first) => write!(f, "{first}-"),
            RangeSpec::Between(first, last) => write!(f, "{first}-{last}"),
            RangeSpec::Suffix(len) => write!(f, "-{len}"),
        }
    }
}

impl HttpRequest {
    pub fn add_range(&mut self, range: RangeSpec) -> Result<(), ApiError> {
        self.add_range_unit(DEFAULT_RANGE_UNIT, range)
    }

    pub fn add_range_unit(&mut self, unit: &str, range: RangeSpec) -> Result<(), ApiError> {
        let range = range.validate()?;
        if unit.is_empty() || !unit.bytes().all(is_token_byte) {
            return Err(ApiError::InvalidRange(format!("bad range unit {unit:?}")));
        }

        let value = match self.header("range") {
            None => format!("{unit}={range}"),
            Some(existing) => {
                let (existing_unit, _) = existing.split_once('=').ok_or_else(|| {
                    ApiError::InvalidRange(format!("existing Range header {existing:?} has no unit"))
                })?;
                if !existing_unit.trim().eq_ignore_ascii_case(unit) {
                    return Err(ApiError::RangeUnitMismatch {
                        existing: existing_unit.trim().to_string(),
                        requested: unit.to_string(),
                    });
                }
                format!("{existing},{range}")
            }
        };
        self.set_header("Range", value);
        Ok(())
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
