//! CSV export of normalized users.

// std
use std::{borrow::Cow, io::Write};
// self
use crate::{_prelude::*, normalize::NormalizedUser};

/// Column order of the export.
pub const CSV_HEADER: [&str; 17] = [
	"id",
	"displayName",
	"firstName",
	"lastName",
	"email",
	"secondEmail",
	"mobilePhone",
	"department",
	"title",
	"organization",
	"costCenter",
	"city",
	"state",
	"zipCode",
	"countryCode",
	"location",
	"status",
];

/// Stream `users` as CSV rows into `writer`, header first.
pub fn write_csv<W>(users: &[NormalizedUser], mut writer: W) -> Result<()>
where
	W: Write,
{
	writeln!(writer, "{}", CSV_HEADER.join(","))?;

	for user in users {
		let cells = row(user).map(|cell| escape(cell.unwrap_or_default()));

		writeln!(writer, "{}", cells.join(","))?;
	}

	writer.flush()?;

	Ok(())
}

/// Render `users` as an in-memory CSV document.
pub fn to_csv_string(users: &[NormalizedUser]) -> Result<String> {
	let mut buffer = Vec::new();

	write_csv(users, &mut buffer)?;

	String::from_utf8(buffer).map_err(|err| Error::Io(std::io::Error::other(err)))
}

fn row(user: &NormalizedUser) -> [Option<&str>; 17] {
	[
		Some(user.id.as_str()),
		Some(user.display_name.as_str()),
		Some(user.first_name.as_str()),
		Some(user.last_name.as_str()),
		user.email.as_deref(),
		user.second_email.as_deref(),
		user.mobile_phone.as_deref(),
		user.department.as_deref(),
		user.title.as_deref(),
		user.organization.as_deref(),
		user.cost_center.as_deref(),
		user.city.as_deref(),
		user.state.as_deref(),
		user.zip_code.as_deref(),
		user.country_code.as_deref(),
		user.location.as_deref(),
		Some(user.status.as_str()),
	]
}

fn escape(value: &str) -> Cow<'_, str> {
	if value.contains(['"', ',', '\n']) {
		Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
	} else {
		Cow::Borrowed(value)
	}
}
