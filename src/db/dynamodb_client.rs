use std::collections::HashMap;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};

use crate::errors::AppError;

pub fn get_attribute(item: &HashMap<String, AttributeValue>, name: &str) -> Result<String, AppError> {
    get_optional_attribute(item, name)
        .ok_or_else(|| AppError::PersistenceError(format!("field {} is null", name)))
}

pub fn get_optional_attribute(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item
        .get(name)
        .and_then(|attr|
            if attr.is_n() {
                attr.as_n().ok()
            } else {
                attr.as_s().ok()
            }
        )
        .cloned()
}

pub fn get_timestamp_attribute(item: &HashMap<String, AttributeValue>, name: &str) -> Result<DateTime<Utc>, AppError> {
    let value = get_attribute(item, name)?;

    DateTime::parse_from_rfc3339(&value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| AppError::PersistenceError(format!("field {} is not a timestamp: {}", name, err)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use aws_sdk_dynamodb::types::AttributeValue;
    use chrono::{TimeZone, Utc};

    use crate::db::dynamodb_client::{get_attribute, get_optional_attribute, get_timestamp_attribute};

    fn item() -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("team_id".to_string(), AttributeValue::S("T1".to_string())),
            ("install_count".to_string(), AttributeValue::N("3".to_string())),
            ("created_at".to_string(), AttributeValue::S("2024-03-01T10:00:00+00:00".to_string())),
            ("flag".to_string(), AttributeValue::Bool(true)),
        ])
    }

    #[test]
    fn reads_string_and_number_attributes() {
        let item = item();

        assert_eq!(get_attribute(&item, "team_id").expect("team_id"), "T1");
        assert_eq!(get_attribute(&item, "install_count").expect("count"), "3");
        assert_eq!(get_optional_attribute(&item, "flag"), None);
    }

    #[test]
    fn missing_attribute_is_an_error() {
        assert!(get_attribute(&item(), "team_name").is_err());
    }

    #[test]
    fn parses_timestamps() {
        let created_at = get_timestamp_attribute(&item(), "created_at").expect("timestamp");

        assert_eq!(created_at, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        assert!(get_timestamp_attribute(&item(), "team_id").is_err());
    }
}
