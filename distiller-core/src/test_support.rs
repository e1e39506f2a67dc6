//! Shared fixtures for the crate's test suites.

use std::collections::HashMap;

use distiller_config::Settings;

/// A complete settings fixture; `overrides` replace or add variables.
pub(crate) fn settings_with(overrides: &[(&str, String)]) -> Settings {
    let mut env: HashMap<&str, String> = HashMap::from([
        ("API_URL", "http://localhost:8000/api/v1".to_string()),
        ("API_KEY_NAME", "x-api-key".to_string()),
        ("API_KEY", "secret".to_string()),
        ("KAFKA_URL", "localhost:9092".to_string()),
        ("SFAPI_CLIENT_ID", "client".to_string()),
        ("SFAPI_PRIVATE_KEY", "pem".to_string()),
        ("SFAPI_GRANT_TYPE", "client_credentials".to_string()),
        ("SFAPI_USER", "acct".to_string()),
        ("ACQUISITION_USER", "4dcamera".to_string()),
        ("JOB_COUNT_SCRIPT_PATH", "/global/software/count.py".to_string()),
        ("JOB_NCEMHUB_RAW_DATA_PATH", "/ncemhub/raw".to_string()),
        ("JOB_NCEMHUB_COUNT_DATA_PATH", "/ncemhub/counted".to_string()),
        ("JOB_SCRIPT_DIRECTORY", "/ncemhub/jobs".to_string()),
        ("JOB_BBCP_NUMBER_OF_STREAMS", "16".to_string()),
        ("JOB_QOS", "regular".to_string()),
        ("JOB_QOS_FILTER", "regular".to_string()),
        ("JOB_BBCP_EXECUTABLE_PATH", "/usr/bin/bbcp".to_string()),
        ("HAADF_IMAGE_UPLOAD_DIR", "/tmp/haadf".to_string()),
        ("HAADF_IMAGE_UPLOAD_DIR_EXPIRATION_HOURS", "24".to_string()),
        ("HAADF_NCEMHUB_DM4_DATA_PATH", "/ncemhub/dm4".to_string()),
        ("CUSTODIAN_USER", "custodian".to_string()),
        ("CUSTODIAN_PRIVATE_KEY", "pem".to_string()),
        ("CUSTODIAN_VALID_HOSTS", "dtn01".to_string()),
    ]);
    for (key, value) in overrides {
        env.insert(key, value.clone());
    }
    Settings::from_lookup(|key| env.get(key).cloned())
        .expect("test settings are complete")
}

pub(crate) fn settings() -> Settings {
    settings_with(&[])
}
