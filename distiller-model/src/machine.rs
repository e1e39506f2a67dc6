use std::collections::HashMap;

/// A remote cluster machine the orchestrator can submit to.
///
/// Fetched once per process from `GET /machines`; an optional on-disk
/// override file keyed by machine name can overlay any field at submit time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Machine {
    pub name: String,
    pub bbcp_dest_dir: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub qos: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub qos_filter: Option<String>,
    /// Remaining per-machine environment handed to the script templates.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub env: HashMap<String, String>,
}

impl Machine {
    /// Overlay `key=value` pairs from an override file onto this machine.
    /// Known fields are replaced; anything else lands in the env map.
    pub fn apply_override(&mut self, key: &str, value: &str) {
        match key {
            "bbcp_dest_dir" => self.bbcp_dest_dir = value.to_string(),
            "qos" => self.qos = Some(value.to_string()),
            "qos_filter" => self.qos_filter = Some(value.to_string()),
            _ => {
                self.env.insert(key.to_string(), value.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> Machine {
        Machine {
            name: "perlmutter".to_string(),
            bbcp_dest_dir: "/pscratch/bbcp".to_string(),
            qos: None,
            qos_filter: None,
            env: HashMap::new(),
        }
    }

    #[test]
    fn override_replaces_known_fields() {
        let mut m = machine();
        m.apply_override("qos", "realtime");
        m.apply_override("bbcp_dest_dir", "/tmp/staging");
        assert_eq!(m.qos.as_deref(), Some("realtime"));
        assert_eq!(m.bbcp_dest_dir, "/tmp/staging");
    }

    #[test]
    fn override_keeps_unknown_keys_in_env() {
        let mut m = machine();
        m.apply_override("reservation", "maintenance");
        assert_eq!(m.env["reservation"], "maintenance");
    }
}
