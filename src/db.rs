//! Database connection parameters derived from a client's `[db]` section

use std::fmt;

use serde::Serialize;

use crate::settings::{AccessError, Settings};

const SECTION: &str = "db";

/// Connection parameters for the client database. No connection is
/// opened here.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct DbParams {
    /// Database flavour (`type` key)
    pub kind: String,
    pub host: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Schema name (`name` key)
    pub database: String,
    /// `None` when the port is empty, meaning the driver default
    pub port: Option<u16>,
}

impl DbParams {
    pub fn from_settings(settings: &Settings<'_>) -> Result<Self, AccessError> {
        Ok(Self {
            kind: settings.get_str(SECTION, "type")?.to_string(),
            host: settings.get_str(SECTION, "host")?.to_string(),
            user: settings.get_str(SECTION, "user")?.to_string(),
            password: settings.get_str(SECTION, "pass")?.to_string(),
            database: settings.get_str(SECTION, "name")?.to_string(),
            port: parse_port(settings)?,
        })
    }
}

fn parse_port(settings: &Settings<'_>) -> Result<Option<u16>, AccessError> {
    let raw = match settings.get_str(SECTION, "port") {
        Ok(raw) => raw,
        Err(AccessError::Unset { .. } | AccessError::UnknownKey { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };

    if raw.is_empty() {
        return Ok(None);
    }

    raw.parse::<u16>()
        .map(Some)
        .map_err(|_| AccessError::InvalidValue {
            section: SECTION.to_string(),
            key: "port".to_string(),
            value: raw.to_string(),
        })
}

impl fmt::Debug for DbParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbParams")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("port", &self.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{merge, EffectiveConfig};
    use crate::parser::parse;
    use crate::schema::Schema;
    use crate::validate::{validate, Layer};

    fn client(db: &str) -> EffectiveConfig {
        let schema = Schema::builtin();
        let text = format!("[client]\nname = \"CLIENT_NAME\"\n[db]\n{db}");
        let client = validate(&parse(&text).unwrap(), schema, Layer::Client).unwrap();
        let global = validate(&parse(GLOBAL).unwrap(), schema, Layer::Global).unwrap();
        merge(&global, &client, schema).unwrap()
    }

    const GLOBAL: &str = r#"[server]
http_path = "https://ilias.website.net"
absolute_path = "/srv/www/ilias"
[clients]
datadir = "/srv/www/seminar/data"
"#;

    const DB: &str = r#"type = "innodb"
host = "localhost"
user = "generic_user_123"
pass = "generic_password_123"
name = "generic_db_name_123"
"#;

    #[test]
    fn test_params_with_empty_port() {
        let config = client(&format!("{DB}port = \"\"\n"));
        let params = DbParams::from_settings(&Settings::new(&config)).unwrap();

        assert_eq!(params.kind, "innodb");
        assert_eq!(params.host, "localhost");
        assert_eq!(params.user, "generic_user_123");
        assert_eq!(params.password, "generic_password_123");
        assert_eq!(params.database, "generic_db_name_123");
        assert_eq!(params.port, None);
    }

    #[test]
    fn test_params_with_port() {
        let config = client(&format!("{DB}port = \"3307\"\n"));
        let params = DbParams::from_settings(&Settings::new(&config)).unwrap();
        assert_eq!(params.port, Some(3307));
    }

    #[test]
    fn test_params_without_port_key() {
        let config = client(DB);
        let params = DbParams::from_settings(&Settings::new(&config)).unwrap();
        assert_eq!(params.port, None);
    }

    #[test]
    fn test_params_invalid_port() {
        let config = client(&format!("{DB}port = \"mysql\"\n"));
        let result = DbParams::from_settings(&Settings::new(&config));
        assert!(matches!(result, Err(AccessError::InvalidValue { .. })));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = client(DB);
        let params = DbParams::from_settings(&Settings::new(&config)).unwrap();

        let debug = format!("{params:?}");
        assert!(!debug.contains("generic_password_123"));
        assert!(debug.contains("<redacted>"));
    }
}
