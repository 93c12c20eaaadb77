use std::path::Path;

use serde_derive::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub device: DeviceConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DeviceConfig {
    /// Advertised name of the heart-rate sensor to connect to.
    pub name: String,
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::de::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let config_str = r#"
            [device]
            name = "HRM-Dual:513142"
        "#;
        let config: AppConfig = toml::de::from_str(config_str).unwrap();
        assert!(config.device.name == "HRM-Dual:513142");
    }
}
