//! Coverage for credential loading and permission checks.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cardsync::credentials::{
    load_credentials, load_optional_credentials, Credentials, NOTION_TOKEN, OPENAI_API_KEY,
};

fn write_env(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join(".env");
    let write = fs::write(&path, contents);
    assert!(write.is_ok());
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::set_permissions(&path, fs::Permissions::from_mode(0o600));
        assert!(perms.is_ok());
    }
    path
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn loads_env_credentials() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let env_path = write_env(
        tmp.path(),
        "OPENAI_API_KEY=sk-test_abcdefghijklmnopqrstuvwxyz\nNOTION_TOKEN=secret_abc\n",
    );

    let credentials = match load_credentials(&env_path) {
        Ok(credentials) => credentials,
        Err(err) => panic!("credentials should load: {err}"),
    };
    assert_eq!(
        credentials.get(OPENAI_API_KEY),
        Some("sk-test_abcdefghijklmnopqrstuvwxyz")
    );
    assert_eq!(credentials.get(NOTION_TOKEN), Some("secret_abc"));
}

#[cfg(unix)]
#[test]
fn rejects_world_readable_env_file() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().expect("should create temp dir");
    let env_path = write_env(tmp.path(), "OPENAI_API_KEY=sk-abc\n");
    let perms = fs::set_permissions(&env_path, fs::Permissions::from_mode(0o644));
    assert!(perms.is_ok());

    assert!(load_credentials(&env_path).is_err());
    assert!(load_optional_credentials(&env_path).is_err());
}

#[test]
fn missing_file_is_an_error_unless_optional() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let env_path = tmp.path().join("absent.env");

    assert!(load_credentials(&env_path).is_err());
    let credentials = match load_optional_credentials(&env_path) {
        Ok(credentials) => credentials,
        Err(err) => panic!("absent file should yield empty credentials: {err}"),
    };
    assert_eq!(credentials.get(OPENAI_API_KEY), None);
}

#[test]
fn environment_wins_over_file() {
    let mut vars = BTreeMap::new();
    vars.insert(OPENAI_API_KEY.to_owned(), "from-file".to_owned());
    vars.insert(NOTION_TOKEN.to_owned(), "   ".to_owned());
    let credentials = Credentials::from_map(vars);

    let env = |key: &str| (key == OPENAI_API_KEY).then(|| "from-env".to_owned());
    assert_eq!(
        credentials.resolve(OPENAI_API_KEY, env).as_deref(),
        Some("from-env")
    );
    assert_eq!(
        credentials.resolve(OPENAI_API_KEY, no_env).as_deref(),
        Some("from-file")
    );
    assert!(credentials.require(NOTION_TOKEN, no_env).is_err());
}

#[test]
fn debug_output_hides_values() {
    let mut vars = BTreeMap::new();
    vars.insert(
        OPENAI_API_KEY.to_owned(),
        "sk-test_abcdefghijklmnopqrstuvwxyz".to_owned(),
    );
    let rendered = format!("{:?}", Credentials::from_map(vars));
    assert!(rendered.contains(OPENAI_API_KEY));
    assert!(!rendered.contains("sk-test_"));
}
