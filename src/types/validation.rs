//! Validation functions for project, subscription, dataset and table IDs.

use crate::Result;
use crate::error::ValidationError;

/// Project ID validation (1-128 chars, lowercase letters, digits, `-`, `.` and `:`).
///
/// Domain-scoped projects look like `example.com:my-project`.
pub fn validate_project_id(project_id: &str) -> Result<()> {
    if project_id.is_empty() || project_id.len() > 128 {
        return Err(ValidationError::InvalidProjectId(format!(
            "Project ID must be 1-128 characters, got {}",
            project_id.len()
        ))
        .into());
    }

    for ch in project_id.chars() {
        if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && ch != '-' && ch != '.' && ch != ':' {
            return Err(ValidationError::InvalidProjectId(format!(
                "Project ID contains invalid character: '{}'",
                ch
            ))
            .into());
        }
    }

    Ok(())
}

/// Pub/Sub subscription ID validation (3-255 chars, must start with letter).
pub fn validate_pubsub_subscription_id(subscription_id: &str) -> Result<()> {
    if subscription_id.len() < 3 || subscription_id.len() > 255 {
        return Err(ValidationError::InvalidSubscriptionId(format!(
            "Subscription ID must be 3-255 characters, got {}",
            subscription_id.len()
        ))
        .into());
    }

    if let Some(first) = subscription_id.chars().next() {
        if !first.is_ascii_alphabetic() {
            return Err(ValidationError::InvalidSubscriptionId(
                "Subscription ID must start with a letter".to_string(),
            )
            .into());
        }
    }

    if subscription_id.starts_with("goog") {
        return Err(ValidationError::InvalidSubscriptionId(
            "Subscription ID must not start with \"goog\"".to_string(),
        )
        .into());
    }

    for ch in subscription_id.chars() {
        if !ch.is_ascii_alphanumeric() && !matches!(ch, '-' | '_' | '.' | '~' | '+' | '%') {
            return Err(ValidationError::InvalidSubscriptionId(format!(
                "Subscription ID contains invalid character: '{}'",
                ch
            ))
            .into());
        }
    }

    Ok(())
}

/// BigQuery dataset ID validation (1-1024 chars, letters, digits and `_`).
pub fn validate_dataset_id(dataset_id: &str) -> Result<()> {
    if dataset_id.is_empty() || dataset_id.len() > 1024 {
        return Err(ValidationError::InvalidDatasetId(format!(
            "Dataset ID must be 1-1024 characters, got {}",
            dataset_id.len()
        ))
        .into());
    }

    for ch in dataset_id.chars() {
        if !ch.is_ascii_alphanumeric() && ch != '_' {
            return Err(ValidationError::InvalidDatasetId(format!(
                "Dataset ID contains invalid character: '{}'",
                ch
            ))
            .into());
        }
    }

    Ok(())
}

/// BigQuery table ID validation (1-1024 chars, letters, digits, `_` and `-`).
pub fn validate_table_id(table_id: &str) -> Result<()> {
    if table_id.is_empty() || table_id.len() > 1024 {
        return Err(ValidationError::InvalidTableId(format!(
            "Table ID must be 1-1024 characters, got {}",
            table_id.len()
        ))
        .into());
    }

    for ch in table_id.chars() {
        if !ch.is_ascii_alphanumeric() && ch != '_' && ch != '-' {
            return Err(ValidationError::InvalidTableId(format!(
                "Table ID contains invalid character: '{}'",
                ch
            ))
            .into());
        }
    }

    Ok(())
}

/// Endpoint validation (must be an absolute http or https URL).
pub fn validate_endpoint(name: &str, endpoint: &str) -> Result<()> {
    let rest = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"));

    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(ValidationError::InvalidParameter {
            name: name.to_string(),
            reason: format!("expected an http(s) URL, got '{}'", endpoint),
        }
        .into()),
    }
}
