//! Embedded ILIAS schema and template generation for `init-schema`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name looked up by schema discovery
pub const SCHEMA_FILE_NAME: &str = "ilconf.schema.toml";

/// Schema for `ilias.ini.php` and `client.ini.php`, with documentation
pub const SCHEMA_TEMPLATE: &str = r#"# ilconf.schema.toml - Field schema for ILIAS ini.php files
#
# Each [section.key] table describes one field:
#   type     = "bool" | "integer" | "string" | "enum" | "path"
#   required = true | false          (default: false)
#   default  = "raw ini value"       (coerced to `type` when loaded)
#   allowed  = ["A", "B"]            (enum fields only)
#   scope    = "global" | "client"   (default: "client")
#
# Booleans are written "0" / "1". Keys missing from this file are kept
# as extensions and reported as plain strings.

# ---------------------------------------------------------------------
# ilias.ini.php
# ---------------------------------------------------------------------

[server.http_path]
type = "string"
required = true
scope = "global"

[server.absolute_path]
type = "path"
required = true
scope = "global"

[server.presetting]
type = "string"
scope = "global"

[server.timezone]
type = "string"
default = "UTC"
scope = "global"

[clients.path]
type = "path"
required = true
default = "data"
scope = "global"

[clients.inifile]
type = "string"
required = true
default = "client.ini.php"
scope = "global"

[clients.datadir]
type = "path"
required = true
scope = "global"

[clients.default]
type = "string"
scope = "global"

[clients.list]
type = "bool"
default = "0"
scope = "global"

[setup.pass]
type = "string"
scope = "global"

[tools.convert]
type = "path"
scope = "global"

[tools.zip]
type = "path"
scope = "global"

[tools.unzip]
type = "path"
scope = "global"

[tools.java]
type = "path"
scope = "global"

[tools.htmldoc]
type = "path"
scope = "global"

[tools.ffmpeg]
type = "path"
scope = "global"

[tools.ghostscript]
type = "path"
scope = "global"

[tools.latex]
type = "string"
scope = "global"

[tools.vscantype]
type = "enum"
allowed = ["none", "sophos", "antivir", "clamav", "icap"]
default = "none"
scope = "global"

[tools.scancommand]
type = "string"
scope = "global"

[tools.cleancommand]
type = "string"
scope = "global"

[tools.fop]
type = "path"
scope = "global"

[tools.lessc]
type = "path"
scope = "global"

[tools.enable_system_styles_management]
type = "bool"
default = "0"
scope = "global"

[tools.phantomjs]
type = "path"
scope = "global"

[log.path]
type = "path"
scope = "global"

[log.file]
type = "string"
default = "ilias.log"
scope = "global"

[log.enabled]
type = "bool"
default = "0"
scope = "global"

[log.level]
type = "enum"
allowed = ["DEBUG", "INFO", "NOTICE", "WARNING", "ERROR", "CRITICAL", "ALERT", "EMERGENCY"]
default = "WARNING"
scope = "global"

[log.error_path]
type = "path"
scope = "global"

[https.auto_https_detect_enabled]
type = "bool"
default = "0"
scope = "global"

[https.auto_https_detect_header_name]
type = "string"
scope = "global"

[https.auto_https_detect_header_value]
type = "string"
scope = "global"

# ---------------------------------------------------------------------
# client.ini.php
# ---------------------------------------------------------------------

[server.start]
type = "string"
default = "./login.php"

[client.name]
type = "string"
required = true

[client.description]
type = "string"

[client.access]
type = "bool"
default = "0"

[db.type]
type = "enum"
allowed = [
    "innodb",
    "mysql",
    "myisam",
    "postgres",
    "galera",
    "pdo-mysql-innodb",
    "pdo-mysql-myisam",
    "pdo-mysql-galera",
    "pdo-postgres",
]
default = "innodb"

[db.host]
type = "string"
required = true

[db.user]
type = "string"
required = true

[db.pass]
type = "string"
required = true

[db.name]
type = "string"
required = true

# An empty port means "driver default"
[db.port]
type = "string"

[db.structure_reload]
type = "bool"
default = "0"

[auth.table]
type = "string"
default = "usr_data"

[auth.usercol]
type = "string"
default = "login"

[auth.passcol]
type = "string"
default = "passwd"

[auth.password_encoder]
type = "enum"
allowed = ["bcryptphp", "bcrypt", "argon2id", "md5"]
default = "bcryptphp"

[language.default]
type = "string"
default = "en"

[language.path]
type = "path"
default = "./lang"

[layout.skin]
type = "string"
default = "default"

[layout.style]
type = "string"
default = "delos"

[session.expire]
type = "integer"
default = "7200"

[system.ROOT_FOLDER_ID]
type = "integer"

[system.SYSTEM_FOLDER_ID]
type = "integer"

[system.ROLE_FOLDER_ID]
type = "integer"

[system.MAIL_SETTINGS_ID]
type = "integer"

[system.MAXLENGTH_OBJ_TITLE]
type = "integer"

[system.MAXLENGTH_OBJ_DESC]
type = "integer"

[system.DEBUG]
type = "bool"
default = "0"

[system.DEVMODE]
type = "bool"
default = "0"

[cache.activate_global_cache]
type = "bool"
default = "0"

[cache.global_cache_service_type]
type = "integer"
default = "-1"

[cache.log_level]
type = "string"

[cache_activated_components.clng]
type = "bool"

[cache_activated_components.obj_def]
type = "bool"

[cache_activated_components.ilctrl]
type = "bool"

[cache_activated_components.comp]
type = "bool"

[cache_activated_components.tpl]
type = "bool"

[cache_activated_components.tpl_blocks]
type = "bool"

[cache_activated_components.tpl_variables]
type = "bool"

[cache_activated_components.events]
type = "bool"

[cache_activated_components.global_screen]
type = "bool"
"#;

/// Write the schema template into `dir` (or the current directory if None).
///
/// Returns an error if the file already exists.
pub fn write_schema_template_in(dir: Option<&Path>) -> io::Result<PathBuf> {
    let path = dir.map_or_else(|| PathBuf::from(SCHEMA_FILE_NAME), |d| d.join(SCHEMA_FILE_NAME));

    if path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{SCHEMA_FILE_NAME} already exists"),
        ));
    }

    fs::write(&path, SCHEMA_TEMPLATE)?;
    Ok(path)
}

/// Write the schema template into the current directory.
pub fn write_schema_template() -> io::Result<PathBuf> {
    write_schema_template_in(None)
}
