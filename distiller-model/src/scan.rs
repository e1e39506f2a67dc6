use chrono::{DateTime, Utc};

/// A place a scan's raw data has been transferred to. Unique per
/// `(scan, host, path)` in the record store; never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub host: String,
    pub path: String,
}

impl Location {
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
        }
    }
}

/// A logical grouping of raw detector output produced by one acquisition.
///
/// `id` is the record-store surrogate key; `scan_id` is the detector's own
/// scan number. The pair `(scan_id, created)` is unique in the store.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scan {
    pub id: i64,
    pub scan_id: i64,
    pub created: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub log_files: i64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub haadf_path: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub notes: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub locations: Vec<Location>,
}

/// Payload for `POST /scans`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanCreate {
    pub scan_id: i64,
    pub created: DateTime<Utc>,
    pub log_files: i64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub locations: Vec<Location>,
}

/// Partial payload for `PATCH /scans/{id}`.
///
/// The server applies each field under its own guard: `log_files` only when
/// strictly greater than the stored count, `haadf_path` and `notes` only when
/// changed or previously null, locations appended uniquely by `(host, path)`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanUpdate {
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub log_files: Option<i64>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub locations: Option<Vec<Location>>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub haadf_path: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub notes: Option<String>,
}

impl ScanUpdate {
    pub fn log_files(count: i64) -> Self {
        Self {
            log_files: Some(count),
            ..Self::default()
        }
    }

    pub fn append_location(location: Location) -> Self {
        Self {
            locations: Some(vec![location]),
            ..Self::default()
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn scan_update_serializes_only_set_fields() {
        let update = ScanUpdate::log_files(12);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "log_files": 12 }));
    }

    #[test]
    fn scan_deserializes_without_optional_fields() {
        let scan: Scan = serde_json::from_str(
            r#"{"id": 3, "scan_id": 40, "created": "2024-01-02T03:04:05Z"}"#,
        )
        .unwrap();
        assert_eq!(scan.id, 3);
        assert_eq!(scan.log_files, 0);
        assert!(scan.locations.is_empty());
        assert_eq!(
            scan.created,
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
        );
    }
}
