//! Field validation for user input.
//!
//! Validators never touch the network. They return `Ok(())` or the full set
//! of failing fields, each with a user-facing message.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::models::PriceRange;

const MIN_OPTION_NAME_CHARS: usize = 2;
const MAX_GROUP_NAME_CHARS: usize = 50;
const MAX_DESCRIPTION_CHARS: usize = 200;

/// Mapping of field name to the first problem found with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.values().map(String::as_str).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn is_http_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validate a restaurant proposal before it is submitted.
pub fn validate_option_input(
    name: &str,
    link: &str,
    image_url: Option<&str>,
    price_range: Option<&str>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = name.trim();
    if name.is_empty() {
        errors.add("name", "Restaurant name is required");
    } else if name.chars().count() < MIN_OPTION_NAME_CHARS {
        errors.add("name", "Restaurant name must be at least 2 characters");
    }

    let link = link.trim();
    if link.is_empty() {
        errors.add("link", "Website link is required");
    } else if !(link.starts_with("http://") || link.starts_with("https://")) {
        errors.add("link", "Link must start with http:// or https://");
    } else if !is_http_url(link) {
        errors.add("link", "Link must be a valid URL");
    }

    if let Some(image_url) = non_blank(image_url) {
        if !is_http_url(image_url) {
            errors.add("imageUrl", "Image URL must be a valid http(s) URL");
        }
    }

    if let Some(price_range) = non_blank(price_range) {
        if PriceRange::parse_label(price_range).is_none() {
            errors.add("priceRange", "Price range must be one of $, $$, $$$");
        }
    }

    errors.into_result()
}

pub fn validate_group_input(
    name: &str,
    description: Option<&str>,
    color_theme: Option<&str>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = name.trim();
    if name.is_empty() {
        errors.add("name", "Group name is required");
    } else if name.chars().count() > MAX_GROUP_NAME_CHARS {
        errors.add("name", "Group name must be less than 50 characters");
    }

    if let Some(description) = description {
        if description.trim().chars().count() > MAX_DESCRIPTION_CHARS {
            errors.add("description", "Description must be less than 200 characters");
        }
    }

    if let Some(color_theme) = non_blank(color_theme) {
        if !is_hex_color(color_theme) {
            errors.add("colorTheme", "Color theme must be a hex color");
        }
    }

    errors.into_result()
}

pub fn validate_session_input(
    title: &str,
    group_id: i64,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if title.trim().is_empty() {
        errors.add("title", "Session title is required");
    }
    if group_id <= 0 {
        errors.add("groupId", "Group ID is required");
    }
    if let Some(deadline) = deadline {
        if deadline <= now {
            errors.add("deadline", "Deadline must be in the future");
        }
    }

    errors.into_result()
}
