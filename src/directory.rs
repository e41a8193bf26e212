//! Search, filtering, sorting, and offset pagination over a directory snapshot.

// std
use std::{cmp::Ordering, collections::BTreeSet};
// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::{config::MAX_PAGE_SIZE, normalize::NormalizedUser};

/// Page size used when a query does not specify one.
pub const DEFAULT_LISTING_LIMIT: usize = 25;

/// Field used to order a listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
	/// Display name.
	#[default]
	Name,
	/// Department; users without one sort last.
	Department,
	/// Derived location; users without one sort last.
	Location,
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
	/// Ascending.
	#[default]
	Asc,
	/// Descending.
	Desc,
}

/// Listing request over a set of normalized users.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserQuery {
	/// Free-text search; blank matches everyone.
	pub query: Option<String>,
	/// Departments to keep; empty keeps every department.
	pub departments: Vec<String>,
	/// Exact derived location to keep.
	pub location: Option<String>,
	/// Field to order by.
	pub sort: SortKey,
	/// Order direction.
	pub direction: Direction,
	/// Zero-based offset of the first returned user.
	pub offset: usize,
	/// Page size, clamped to 1..=200; defaults to [`DEFAULT_LISTING_LIMIT`].
	pub limit: Option<usize>,
}
impl UserQuery {
	/// Whether `user` passes the search and filter criteria.
	pub fn matches(&self, user: &NormalizedUser) -> bool {
		self.matches_search(user) && self.matches_department(user) && self.matches_location(user)
	}

	/// Filter, sort, and slice `users` into a listing page.
	pub fn apply(&self, users: &[NormalizedUser]) -> UserListing {
		let limit = self.effective_limit();
		let mut matched: Vec<&NormalizedUser> = users.iter().filter(|user| self.matches(user)).collect();

		matched.sort_by(|a, b| compare(a, b, self.sort, self.direction));

		let total = matched.len();
		let page =
			matched.into_iter().skip(self.offset).take(limit).cloned().collect::<Vec<_>>();
		let end = self.offset.saturating_add(limit);
		let next_cursor = (end < total).then_some(end);

		UserListing { total, users: page, next_cursor, limit }
	}

	/// Page size after defaulting and clamping.
	pub fn effective_limit(&self) -> usize {
		self.limit.unwrap_or(DEFAULT_LISTING_LIMIT).clamp(1, MAX_PAGE_SIZE as usize)
	}

	fn matches_search(&self, user: &NormalizedUser) -> bool {
		let Some(needle) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
			return true;
		};
		let needle = needle.to_lowercase();
		let fields = [
			Some(user.display_name.as_str()),
			Some(user.first_name.as_str()),
			Some(user.last_name.as_str()),
			user.email.as_deref(),
			user.title.as_deref(),
			user.department.as_deref(),
			user.location.as_deref(),
		];

		fields.into_iter().flatten().any(|field| field.to_lowercase().contains(&needle))
	}

	fn matches_department(&self, user: &NormalizedUser) -> bool {
		self.departments.is_empty()
			|| user
				.department
				.as_deref()
				.is_some_and(|department| self.departments.iter().any(|d| d == department))
	}

	fn matches_location(&self, user: &NormalizedUser) -> bool {
		match self.location.as_deref().filter(|l| !l.is_empty()) {
			None => true,
			Some(location) => user.location.as_deref() == Some(location),
		}
	}
}

/// One page of a filtered, sorted listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListing {
	/// Number of users matching the query before paging.
	pub total: usize,
	/// Users on this page.
	pub users: Vec<NormalizedUser>,
	/// Offset of the next page when more results remain.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub next_cursor: Option<usize>,
	/// Effective page size.
	pub limit: usize,
}

/// Sorted, de-duplicated departments present in `users`.
pub fn departments(users: &[NormalizedUser]) -> Vec<String> {
	facet(users.iter().filter_map(|user| user.department.as_deref()))
}

/// Sorted, de-duplicated derived locations present in `users`.
pub fn locations(users: &[NormalizedUser]) -> Vec<String> {
	facet(users.iter().filter_map(|user| user.location.as_deref()))
}

fn facet<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
	values
		.map(|value| (value.to_lowercase(), value))
		.collect::<BTreeSet<_>>()
		.into_iter()
		.map(|(_, value)| value.to_owned())
		.collect()
}

fn compare(a: &NormalizedUser, b: &NormalizedUser, key: SortKey, direction: Direction) -> Ordering {
	let primary = match key {
		SortKey::Name => Some(ci_cmp(&a.display_name, &b.display_name)),
		SortKey::Department => optional_cmp(a.department.as_deref(), b.department.as_deref()),
		SortKey::Location => optional_cmp(a.location.as_deref(), b.location.as_deref()),
	};
	let ordered = match primary {
		Some(ordering) if direction == Direction::Desc => ordering.reverse(),
		Some(ordering) => ordering,
		// Missing values stay last in either direction.
		None => missing_last(a, b, key),
	};

	ordered
		.then_with(|| ci_cmp(&a.display_name, &b.display_name))
		.then_with(|| a.id.cmp(&b.id))
}

fn optional_cmp(a: Option<&str>, b: Option<&str>) -> Option<Ordering> {
	match (a, b) {
		(Some(a), Some(b)) => Some(ci_cmp(a, b)),
		(None, None) => Some(Ordering::Equal),
		_ => None,
	}
}

fn missing_last(a: &NormalizedUser, b: &NormalizedUser, key: SortKey) -> Ordering {
	let present = |user: &NormalizedUser| match key {
		SortKey::Name => true,
		SortKey::Department => user.department.is_some(),
		SortKey::Location => user.location.is_some(),
	};

	present(b).cmp(&present(a))
}

fn ci_cmp(a: &str, b: &str) -> Ordering {
	a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}
