//! Suites generated from server inventories
//!
//! One test per server group, one check per address, in input order.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{BodyOwner, BuildError, Suite};

pub const DEFAULT_SUITE_NAME: &str = "Testing Connectivity to Servers";
pub const CONNECTION_KEYWORD: &str = "Test Connection To";
pub const DEFAULT_PING_COUNT: u32 = 1;
pub const DEFAULT_PING_TIMEOUT: u32 = 5;

const OS_LIBRARY: &str = "OperatingSystem";

/// A named set of addresses
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerGroup {
    pub name: String,
    pub ips: Vec<String>,
}

impl ServerGroup {
    pub fn new<I, S>(name: impl Into<String>, ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            ips: ips.into_iter().map(Into::into).collect(),
        }
    }
}

/// Server groups loaded from a file
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub servers: Vec<ServerGroup>,
}

impl Inventory {
    /// Load from YAML (`.yaml`/`.yml`) or JSON; a bare list of groups is
    /// accepted as well as a `servers:` mapping
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read inventory {}", path.display()))?;

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let inventory = if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
        .with_context(|| format!("Failed to parse inventory {}", path.display()))?;

        debug!(
            "Loaded {} server groups from {}",
            inventory.servers.len(),
            path.display()
        );
        Ok(inventory)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        if value.is_sequence() {
            Ok(Self {
                servers: serde_yaml::from_value(value)?,
            })
        } else {
            Ok(serde_yaml::from_value(value)?)
        }
    }

    fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        if value.is_array() {
            Ok(Self {
                servers: serde_json::from_value(value)?,
            })
        } else {
            Ok(serde_json::from_value(value)?)
        }
    }
}

/// How each address is checked
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStyle {
    /// Only log the intent
    #[default]
    Log,
    /// Ping inline in the test body
    Inline,
    /// Ping through a suite keyword
    Keyword,
}

impl CheckStyle {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "log" => Some(CheckStyle::Log),
            "inline" => Some(CheckStyle::Inline),
            "keyword" => Some(CheckStyle::Keyword),
            _ => None,
        }
    }

    /// Calls appended per address
    pub fn calls_per_ip(&self) -> usize {
        match self {
            CheckStyle::Inline => 2,
            CheckStyle::Log | CheckStyle::Keyword => 1,
        }
    }
}

/// Builds connectivity suites
#[derive(Clone, Debug)]
pub struct ConnectivitySuite {
    name: String,
    style: CheckStyle,
    ping_count: u32,
    ping_timeout: u32,
}

impl Default for ConnectivitySuite {
    fn default() -> Self {
        Self::new(DEFAULT_SUITE_NAME)
    }
}

impl ConnectivitySuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            style: CheckStyle::default(),
            ping_count: DEFAULT_PING_COUNT,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    pub fn style(mut self, style: CheckStyle) -> Self {
        self.style = style;
        self
    }

    pub fn ping_count(mut self, count: u32) -> Self {
        self.ping_count = count;
        self
    }

    /// Seconds to wait for each reply
    pub fn ping_timeout(mut self, seconds: u32) -> Self {
        self.ping_timeout = seconds;
        self
    }

    fn ping_command(&self, target: &str) -> String {
        format!("ping {target} -c {} -W {}", self.ping_count, self.ping_timeout)
    }

    /// Build the suite: one test per group, checks in input order
    pub fn build(&self, groups: &[ServerGroup]) -> Result<Suite, BuildError> {
        let mut suite = Suite::new(self.name.clone());

        if self.style != CheckStyle::Log {
            suite.add_library_import(OS_LIBRARY)?;
        }

        if self.style == CheckStyle::Keyword {
            let keyword = suite.define_keyword(CONNECTION_KEYWORD, ["${ip}"])?;
            keyword.body.add_keyword_with_assign(
                "Run And Return Rc",
                [self.ping_command("${ip}")],
                ["${rc}"],
            )?;
            keyword
                .body
                .add_keyword("Should Be Equal As Integers", ["${rc}", "0"])?;
        }

        for group in groups {
            let test = suite.add_test(format!("Testing {}", group.name))?;
            let body = test.body_mut();

            for ip in &group.ips {
                match self.style {
                    CheckStyle::Log => {
                        body.add_keyword("Log", [format!("Need to test connectivity to {ip}.")])?;
                    }
                    CheckStyle::Inline => {
                        body.add_keyword_with_assign(
                            "Run And Return Rc",
                            [self.ping_command(ip)],
                            ["${rc}"],
                        )?;
                        body.add_keyword("Should Be Equal As Integers", ["${rc}", "0"])?;
                    }
                    CheckStyle::Keyword => {
                        body.add_keyword(CONNECTION_KEYWORD, [ip.as_str()])?;
                    }
                }
            }
        }

        debug!(
            "Generated suite '{}' with {} tests",
            suite.name(),
            suite.test_count()
        );
        Ok(suite)
    }
}

/// DNS and NTP servers used by the connectivity tutorials
pub fn default_servers() -> Vec<ServerGroup> {
    vec![
        ServerGroup::new("DNS Servers", ["8.8.8.8", "1.1.1.1"]),
        ServerGroup::new("NTP Servers", ["129.6.15.28", "132.163.97.1"]),
    ]
}
