use crate::codec::Charset;

use std::fmt;
use std::fs;
use std::time::Duration;

/// Errors raised while parsing a configuration file
#[derive(Debug)]
pub enum ConfigError {
    /// A `[section]` header this library does not know
    UnknownSection(String),

    /// A key that does not belong to its section
    UnknownKey(String),

    /// A value that could not be parsed for its key
    InvalidValue(String, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownSection(section) => write!(f, "Unknown section: [{}]", section),
            ConfigError::UnknownKey(key) => write!(f, "Unknown key: {}", key),
            ConfigError::InvalidValue(key, value) => {
                write!(f, "Invalid value for {}: '{}'", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct TermConfig {
    pub telnet: TelnetConfig,
    pub signals: SignalConfig,
    pub readline: ReadlineConfig,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone)]
pub struct TelnetConfig {
    /// Request BINARY transmission for the client-to-server direction
    pub in_binary: bool,
    /// Announce BINARY transmission for the server-to-client direction
    pub out_binary: bool,
    /// Charset used once BINARY transmission is active
    pub charset: Charset,
}

/// The inline signal characters scanned out of the input stream
#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub interrupt: char,
    pub eof: char,
    pub suspend: char,
}

#[derive(Debug, Clone)]
pub struct ReadlineConfig {
    /// Entries kept in history before the oldest are evicted
    pub history_limit: usize,
    /// Skip a line when it repeats the most recent history entry
    pub ignore_duplicates: bool,
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Buffers retained by the shared output pool
    pub pool_size: usize,
    /// Capacity of each pooled buffer in bytes
    pub buffer_capacity: usize,
    /// How long an acquire waits for a returned buffer before allocating
    pub acquire_timeout: Duration,
}

impl Default for TermConfig {
    fn default() -> Self {
        Self {
            telnet: TelnetConfig {
                in_binary: true,
                out_binary: true,
                charset: Charset::Utf8,
            },
            signals: SignalConfig {
                interrupt: '\u{3}',  // Ctrl-C
                eof: '\u{4}',        // Ctrl-D
                suspend: '\u{1a}',   // Ctrl-Z
            },
            readline: ReadlineConfig {
                history_limit: 500,
                ignore_duplicates: true,
            },
            pool: PoolConfig {
                pool_size: 16,
                buffer_capacity: 1024,
                acquire_timeout: Duration::from_millis(50),
            },
        }
    }
}

impl TermConfig {
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse_config(&content),
            Err(_) => {
                // Create default config file if it doesn't exist
                let default_config = Self::default();
                let config_content = default_config.to_config_file_format();
                if let Err(e) = fs::write(path, config_content) {
                    eprintln!("Warning: Could not create default config file: {}", e);
                }
                Ok(default_config)
            }
        }
    }

    fn parse_config(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut current_section = String::new();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Handle sections
            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].to_string();
                continue;
            }

            // Handle key-value pairs
            if let Some(eq_pos) = line.find('=') {
                let key = line[..eq_pos].trim();
                let value = line[eq_pos + 1..].trim().trim_matches('"');

                match current_section.as_str() {
                    "telnet" => config.parse_telnet_config(key, value)?,
                    "signals" => config.parse_signal_config(key, value)?,
                    "readline" => config.parse_readline_config(key, value)?,
                    "pool" => config.parse_pool_config(key, value)?,
                    _ => return Err(ConfigError::UnknownSection(current_section.clone())),
                }
            }
        }

        Ok(config)
    }

    fn parse_telnet_config(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "in_binary" => {
                self.telnet.in_binary = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;
            }
            "out_binary" => {
                self.telnet.out_binary = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;
            }
            "charset" => {
                self.telnet.charset = Charset::from_name(value)
                    .ok_or_else(|| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn parse_signal_config(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let code: u32 = value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;
        let ch = char::from_u32(code)
            .ok_or_else(|| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;

        match key {
            "interrupt" => self.signals.interrupt = ch,
            "eof" => self.signals.eof = ch,
            "suspend" => self.signals.suspend = ch,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn parse_readline_config(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "history_limit" => {
                self.readline.history_limit = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;
            }
            "ignore_duplicates" => {
                self.readline.ignore_duplicates = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn parse_pool_config(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "pool_size" => {
                self.pool.pool_size = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;
            }
            "buffer_capacity" => {
                self.pool.buffer_capacity = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;
            }
            "acquire_timeout_ms" => {
                let ms: u64 = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;
                self.pool.acquire_timeout = Duration::from_millis(ms);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn to_config_file_format(&self) -> String {
        format!(
            r#"# Termdock Configuration File
# Lines starting with # are comments

[telnet]
# BINARY transmission is negotiated per direction (RFC 856).
# charset applies once binary mode is active: "utf-8" or "ascii"
in_binary = {}
out_binary = {}
charset = "{}"

[signals]
# Inline signal characters as decimal code points
interrupt = {}
eof = {}
suspend = {}

[readline]
history_limit = {}
ignore_duplicates = {}

[pool]
# Shared output buffer pool
pool_size = {}
buffer_capacity = {}
acquire_timeout_ms = {}
"#,
            self.telnet.in_binary,
            self.telnet.out_binary,
            self.telnet.charset.name(),
            self.signals.interrupt as u32,
            self.signals.eof as u32,
            self.signals.suspend as u32,
            self.readline.history_limit,
            self.readline.ignore_duplicates,
            self.pool.pool_size,
            self.pool.buffer_capacity,
            self.pool.acquire_timeout.as_millis(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TermConfig::default();
        assert!(config.telnet.in_binary);
        assert!(config.telnet.out_binary);
        assert_eq!(config.telnet.charset, Charset::Utf8);
        assert_eq!(config.signals.interrupt, '\u{3}');
        assert_eq!(config.signals.eof, '\u{4}');
        assert_eq!(config.signals.suspend, '\u{1a}');
        assert_eq!(config.readline.history_limit, 500);
        assert_eq!(config.pool.acquire_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_parse_overrides() {
        let content = r#"
# test configuration
[telnet]
in_binary = false
charset = "ascii"

[signals]
interrupt = 28

[readline]
history_limit = 10
ignore_duplicates = false

[pool]
pool_size = 4
acquire_timeout_ms = 100
"#;
        let config = TermConfig::parse_config(content).unwrap();
        assert!(!config.telnet.in_binary);
        assert!(config.telnet.out_binary);
        assert_eq!(config.telnet.charset, Charset::Ascii);
        assert_eq!(config.signals.interrupt, '\u{1c}');
        assert_eq!(config.signals.eof, '\u{4}');
        assert_eq!(config.readline.history_limit, 10);
        assert!(!config.readline.ignore_duplicates);
        assert_eq!(config.pool.pool_size, 4);
        assert_eq!(config.pool.acquire_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result = TermConfig::parse_config("[mystery]\nkey = 1\n");
        assert!(matches!(result, Err(ConfigError::UnknownSection(s)) if s == "mystery"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = TermConfig::parse_config("[telnet]\nturbo = true\n");
        assert!(matches!(result, Err(ConfigError::UnknownKey(k)) if k == "turbo"));
    }

    #[test]
    fn test_invalid_value_rejected() {
        let result = TermConfig::parse_config("[signals]\ninterrupt = ctrl-c\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(k, _)) if k == "interrupt"));

        let result = TermConfig::parse_config("[telnet]\ncharset = \"latin-9\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(k, _)) if k == "charset"));
    }

    #[test]
    fn test_round_trip_through_file_format() {
        let mut config = TermConfig::default();
        config.telnet.charset = Charset::Ascii;
        config.readline.history_limit = 42;

        let reparsed = TermConfig::parse_config(&config.to_config_file_format()).unwrap();
        assert_eq!(reparsed.telnet.charset, Charset::Ascii);
        assert_eq!(reparsed.readline.history_limit, 42);
        assert!(reparsed.readline.ignore_duplicates);
    }
}
