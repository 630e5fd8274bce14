//! Parsed response bodies.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::_prelude::*;

/// Body of a successful response.
///
/// Empty, `null`, and non-JSON bodies resolve to [`Payload::Empty`] rather than an error.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
	/// JSON document returned by the server.
	Json(Value),
	/// No usable body.
	Empty,
}
impl Payload {
	/// Parses a raw response body.
	pub fn from_body(body: &[u8]) -> Self {
		match serde_json::from_slice::<Value>(body) {
			Ok(Value::Null) | Err(_) => Self::Empty,
			Ok(value) => Self::Json(value),
		}
	}

	/// Whether the response carried no usable body.
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}

	/// Borrows the JSON document, if any.
	pub fn as_json(&self) -> Option<&Value> {
		match self {
			Self::Json(value) => Some(value),
			Self::Empty => None,
		}
	}

	/// Takes the JSON document, if any.
	pub fn into_json(self) -> Option<Value> {
		match self {
			Self::Json(value) => Some(value),
			Self::Empty => None,
		}
	}

	/// Decodes the payload into `T`; an empty payload decodes from `null`.
	pub fn deserialize<T>(self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let value = self.into_json().unwrap_or(Value::Null);

		serde_path_to_error::deserialize(value).map_err(|source| Error::Decode { source })
	}
}
