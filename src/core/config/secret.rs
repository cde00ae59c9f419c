use std::{fs, io, path::Path, path::PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use super::parsing::env_optional;

/// Returns the persisted signing key, creating it on first start so tokens
/// survive restarts when `SECRET_KEY` is not configured.
pub(super) fn load_or_create_secret_key() -> String {
    let path = secret_file_path();
    match read_or_create(&path) {
        Ok(key) => key,
        Err(err) => {
            tracing::warn!(
                error = %err,
                path = %path.display(),
                "Failed to persist secret key; tokens will not survive a restart"
            );
            generate_secret_key()
        }
    }
}

fn read_or_create(path: &Path) -> io::Result<String> {
    if let Some(existing) = read_existing(path) {
        return Ok(existing);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let new_key = generate_secret_key();
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(fs::Permissions::from_mode(0o600))?;
            }
            io::Write::write_all(&mut file, new_key.as_bytes())?;
            Ok(new_key)
        }
        // Another process won the race; use its key.
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            read_existing(path).ok_or(err)
        }
        Err(err) => Err(err),
    }
}

fn read_existing(path: &Path) -> Option<String> {
    let value = fs::read_to_string(path).ok()?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn generate_secret_key() -> String {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn secret_file_path() -> PathBuf {
    env_optional("SECRET_KEY_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".secret_key"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_created_once_and_reused() {
        let dir = std::env::temp_dir().join(format!("portal-secret-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join(".secret_key");

        let first = read_or_create(&path).expect("create key");
        let second = read_or_create(&path).expect("read key");

        assert_eq!(first, second);
        assert!(first.len() >= 80);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(generate_secret_key(), generate_secret_key());
    }
}
