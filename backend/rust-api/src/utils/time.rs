use chrono::{DateTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;

/// BSON dates only carry millisecond precision; anything finer is dropped.
pub fn chrono_to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}
