// Copyright PingCAP Inc. 2025.
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; version 2 of the License.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP listen address, e.g. "127.0.0.1:3000"
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// gRPC listen address used when `rpc_enabled` is set, e.g. "127.0.0.1:4000"
    #[serde(default = "default_rpc_addr")]
    pub rpc_addr: String,

    /// Expose the store to proxy nodes over gRPC
    #[serde(default)]
    pub rpc_enabled: bool,

    /// Address of the master's gRPC endpoint, e.g. "http://10.0.0.1:4000".
    /// When set this node runs as a caching proxy instead of a master.
    #[serde(default)]
    pub master_addr: Option<String>,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path of the append-only journal file
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Depth of the durability queue; a full queue blocks writers
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            rpc_addr: default_rpc_addr(),
            rpc_enabled: false,
            master_addr: None,
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn from_path(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Load `path`, falling back to defaults when the file doesn't exist.
    pub fn load_or_default(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        match std::fs::read_to_string(path) {
            Ok(s) => Ok(toml::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(e.into()),
        }
    }
}

fn default_http_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_rpc_addr() -> String {
    "127.0.0.1:4000".to_string()
}

fn default_data_file() -> String {
    "./store.journal".to_string()
}

fn default_queue_depth() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.http_addr, "127.0.0.1:3000");
        assert!(!cfg.rpc_enabled);
        assert!(cfg.master_addr.is_none());
        assert_eq!(cfg.storage.queue_depth, 1000);
    }

    #[test]
    fn proxy_role_from_toml() {
        let cfg: Config = toml::from_str(
            r#"
            master_addr = "http://10.0.0.1:4000"
            [storage]
            data_file = "/var/lib/shorty/store.journal"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.master_addr.as_deref(), Some("http://10.0.0.1:4000"));
        assert_eq!(cfg.storage.data_file, "/var/lib/shorty/store.journal");
    }
}
