//! Locating ini files of an installation

use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::schema::find_file_upward;
use crate::settings::{AccessError, Settings};

/// Name of the installation-wide file
pub const GLOBAL_INI: &str = "ilias.ini.php";

/// Directory names that hold copies of old installations rather than
/// live clients.
pub const EXCLUDED_FOLDERS: &[&str] = &[
    "Backup",
    "backup",
    "_Examples",
    "Dump",
    "dump",
    "iliasold",
    "ilias5_old",
    "ilias4_old",
    "defekt",
    "ilias5old",
    "ilias4old",
    "iliasOld",
    "ilias4svn",
    "ilias5svn",
];

/// A client ini file and the client id taken from its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIni {
    pub id: String,
    pub path: PathBuf,
}

/// Find `ilias.ini.php` by searching upward from the given directory.
pub fn find_global_ini(start_dir: &Path) -> Option<PathBuf> {
    find_file_upward(start_dir, GLOBAL_INI, false)
}

/// Directory holding the client directories: `<root>/<clients.path>`,
/// where root is the directory of the global file.
pub fn clients_dir(global_ini: &Path, settings: &Settings<'_>) -> Result<PathBuf, AccessError> {
    let root = global_ini.parent().unwrap_or_else(|| Path::new("."));
    Ok(root.join(settings.get_path("clients", "path")?))
}

fn is_excluded(path: &Path, base: &Path) -> bool {
    let names: Vec<_> = path
        .strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str())
        .collect();

    names
        .iter()
        .any(|name| EXCLUDED_FOLDERS.iter().any(|ex| name == ex))
        // Skins and plugins ship their own ini files
        || names
            .windows(2)
            .any(|pair| pair[0] == "Customizing" && pair[1] == "global")
}

fn walker(dir: &Path, max_depth: Option<usize>) -> ignore::Walk {
    let base = dir.to_path_buf();
    WalkBuilder::new(dir)
        .hidden(true) // Skip hidden files
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .max_depth(max_depth)
        .filter_entry(move |entry| !is_excluded(entry.path(), &base))
        .build()
}

fn not_found(what: &str, dir: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{what} {} does not exist", dir.display()),
    )
}

/// Find every `ilias.ini.php` below `start_dir`, at any depth, sorted by
/// path. Excluded folders are not entered.
pub fn find_installations(start_dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !start_dir.is_dir() {
        return Err(not_found("search directory", start_dir));
    }

    let mut found = vec![];
    for entry in walker(start_dir, None) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry under {}: {e}", start_dir.display());
                continue;
            }
        };

        let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
        if is_file && entry.file_name() == GLOBAL_INI {
            debug!(path = %entry.path().display(), "found installation");
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

/// Find `<dir>/<client id>/<inifile>` files, sorted by client id. Only
/// direct client directories are searched.
///
/// Hidden and excluded directories are skipped; unreadable entries are
/// logged and skipped.
pub fn discover_clients(dir: &Path, inifile: &str) -> io::Result<Vec<ClientIni>> {
    if !dir.is_dir() {
        return Err(not_found("clients directory", dir));
    }

    let mut clients = vec![];
    for entry in walker(dir, Some(2)) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry under {}: {e}", dir.display());
                continue;
            }
        };

        let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
        if !is_file || entry.depth() != 2 || entry.file_name() != inifile {
            continue;
        }

        let path = entry.into_path();
        let Some(id) = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
        else {
            continue;
        };
        debug!(client = %id, path = %path.display(), "found client ini");
        clients.push(ClientIni { id, path });
    }

    clients.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(clients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn client_dir(root: &Path, id: &str) -> PathBuf {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("client.ini.php"), "[client]\n").unwrap();
        dir
    }

    #[test]
    fn test_discover_sorted_by_id() {
        let dir = TempDir::new().unwrap();
        client_dir(dir.path(), "zeta");
        client_dir(dir.path(), "alpha");

        let clients = discover_clients(dir.path(), "client.ini.php").unwrap();
        let ids: Vec<_> = clients.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["alpha", "zeta"]);
        assert_eq!(clients[0].path, dir.path().join("alpha/client.ini.php"));
    }

    #[test]
    fn test_skip_excluded_folders() {
        let dir = TempDir::new().unwrap();
        client_dir(dir.path(), "live");
        client_dir(dir.path(), "backup");
        client_dir(dir.path(), "iliasold");

        let clients = discover_clients(dir.path(), "client.ini.php").unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, "live");
    }

    #[test]
    fn test_skip_hidden_directories() {
        let dir = TempDir::new().unwrap();
        client_dir(dir.path(), "visible");
        client_dir(dir.path(), ".trash");

        let clients = discover_clients(dir.path(), "client.ini.php").unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, "visible");
    }

    #[test]
    fn test_only_direct_client_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("client.ini.php"), "").unwrap();
        client_dir(&dir.path().join("nested"), "deep");
        client_dir(dir.path(), "real");

        let clients = discover_clients(dir.path(), "client.ini.php").unwrap();
        let ids: Vec<_> = clients.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["real"]);
    }

    #[test]
    fn test_gitignore_not_applied() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".gitignore"), "ignored/\n").unwrap();
        client_dir(dir.path(), "ignored");

        let clients = discover_clients(dir.path(), "client.ini.php").unwrap();
        assert_eq!(clients.len(), 1);
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = discover_clients(&dir.path().join("absent"), "client.ini.php");
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    fn install(root: &Path) -> PathBuf {
        fs::create_dir_all(root).unwrap();
        let ini = root.join(GLOBAL_INI);
        fs::write(&ini, "[server]\n").unwrap();
        ini
    }

    #[test]
    fn test_find_installations_at_any_depth() {
        let dir = TempDir::new().unwrap();
        let deep = install(&dir.path().join("srv/www/ilias"));
        let shallow = install(&dir.path().join("ilias"));

        let found = find_installations(dir.path()).unwrap();
        assert_eq!(found, [shallow, deep]);
    }

    #[test]
    fn test_find_installations_skips_excluded() {
        let dir = TempDir::new().unwrap();
        let live = install(&dir.path().join("www/ilias"));
        install(&dir.path().join("www/Backup/ilias"));
        install(&dir.path().join("www/ilias5_old"));
        install(&dir.path().join("www/ilias/Customizing/global/skin"));

        let found = find_installations(dir.path()).unwrap();
        assert_eq!(found, [live]);
    }

    #[test]
    fn test_find_installations_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = find_installations(&dir.path().join("absent"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_find_global_ini_in_parent() {
        let dir = TempDir::new().unwrap();
        let ini = dir.path().join(GLOBAL_INI);
        fs::write(&ini, "").unwrap();
        let child = client_dir(&dir.path().join("data"), "default");

        assert_eq!(find_global_ini(&child), Some(ini));
    }
}
