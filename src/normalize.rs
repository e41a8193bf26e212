//! Upstream user records and their normalized directory shape.
//!
//! Normalization is total: any JSON value decodes into a [`RawUserRecord`], and every raw record
//! maps to a [`NormalizedUser`]. Malformed fields degrade to empty or null values instead of
//! failing the surrounding page.

// crates.io
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Fallback display name when no name information exists.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// User record as returned by the upstream API.
///
/// Decodes from any JSON value: a non-object element becomes the default record, and `id` or
/// `status` given as numbers are kept in their textual form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub struct RawUserRecord {
	/// Upstream identifier.
	pub id: String,
	/// Lifecycle status, e.g. `ACTIVE` or `STAGED`.
	pub status: String,
	/// Profile attributes; anything but an object decodes as an empty profile.
	pub profile: RawProfile,
}
impl From<Value> for RawUserRecord {
	fn from(value: Value) -> Self {
		let Value::Object(mut fields) = value else {
			return Self::default();
		};

		Self {
			id: fields.remove("id").and_then(scalar_text).unwrap_or_default(),
			status: fields.remove("status").and_then(scalar_text).unwrap_or_default(),
			profile: fields
				.remove("profile")
				.filter(Value::is_object)
				.and_then(|profile| serde_json::from_value(profile).ok())
				.unwrap_or_default(),
		}
	}
}

/// Profile attribute bag; each attribute is independently optional.
///
/// Attributes that are not JSON strings decode as `None`.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawProfile {
	#[serde(deserialize_with = "lenient_string")]
	pub first_name: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub last_name: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub display_name: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub email: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub second_email: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub mobile_phone: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub department: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub title: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub organization: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub cost_center: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub city: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub state: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub zip_code: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub country_code: Option<String>,
	#[serde(deserialize_with = "lenient_string")]
	pub manager_id: Option<String>,
}

/// Stable internal user shape served to callers.
///
/// `display_name` is never empty; every optional field is either `None` or non-empty after trim.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedUser {
	pub id: String,
	pub status: String,
	pub first_name: String,
	pub last_name: String,
	pub display_name: String,
	pub email: Option<String>,
	pub second_email: Option<String>,
	pub mobile_phone: Option<String>,
	pub department: Option<String>,
	pub title: Option<String>,
	pub organization: Option<String>,
	pub cost_center: Option<String>,
	pub city: Option<String>,
	pub state: Option<String>,
	pub zip_code: Option<String>,
	pub country_code: Option<String>,
	pub manager_id: Option<String>,
	/// `"{city}, {COUNTRY}"`, city alone, country alone, or `None`.
	pub location: Option<String>,
}
impl From<RawUserRecord> for NormalizedUser {
	fn from(raw: RawUserRecord) -> Self {
		normalize_user(&raw)
	}
}

/// Map a raw upstream record into the normalized shape.
pub fn normalize_user(raw: &RawUserRecord) -> NormalizedUser {
	let profile = &raw.profile;
	let first_name = name_part(&profile.first_name);
	let last_name = name_part(&profile.last_name);
	let display_name = derive_display_name(profile);

	NormalizedUser {
		id: raw.id.trim().to_owned(),
		status: raw.status.trim().to_owned(),
		first_name,
		last_name,
		display_name,
		email: clean(&profile.email),
		second_email: clean(&profile.second_email),
		mobile_phone: clean(&profile.mobile_phone),
		department: clean(&profile.department),
		title: clean(&profile.title),
		organization: clean(&profile.organization),
		cost_center: clean(&profile.cost_center),
		city: clean(&profile.city),
		state: clean(&profile.state),
		zip_code: clean(&profile.zip_code),
		country_code: clean(&profile.country_code),
		manager_id: clean(&profile.manager_id),
		location: derive_location(profile),
	}
}

/// Display name fallback chain: explicit, "first last", first, last, then [`UNKNOWN_DISPLAY_NAME`].
pub fn derive_display_name(profile: &RawProfile) -> String {
	if let Some(explicit) = clean(&profile.display_name) {
		return explicit;
	}

	match (clean(&profile.first_name), clean(&profile.last_name)) {
		(Some(first), Some(last)) => format!("{first} {last}"),
		(Some(first), None) => first,
		(None, Some(last)) => last,
		(None, None) => UNKNOWN_DISPLAY_NAME.to_owned(),
	}
}

/// Human-readable location derived from city and country code.
pub fn derive_location(profile: &RawProfile) -> Option<String> {
	let city = clean(&profile.city);
	let country = clean(&profile.country_code).map(|code| code.to_uppercase());

	match (city, country) {
		(Some(city), Some(country)) => Some(format!("{city}, {country}")),
		(Some(city), None) => Some(city),
		(None, Some(country)) => Some(country),
		(None, None) => None,
	}
}

fn clean(value: &Option<String>) -> Option<String> {
	value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

fn name_part(value: &Option<String>) -> String {
	clean(value).unwrap_or_default()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Value::deserialize(deserializer)? {
		Value::String(value) => Some(value),
		_ => None,
	})
}

fn scalar_text(value: Value) -> Option<String> {
	match value {
		Value::String(value) => Some(value),
		Value::Number(value) => Some(value.to_string()),
		_ => None,
	}
}
