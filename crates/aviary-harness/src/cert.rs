//! Self-signed certificate issuance for fixture hostnames.

use std::fs;

use camino::Utf8Path;

use crate::error::FixtureError;

/// Writes a self-signed PEM certificate and key for `hostname` into
/// `certs_dir`, creating the directory if needed.
///
/// The files are named `<hostname>.crt` and `<hostname>.key` so daemons
/// configured to look up certificates by vhost name find them directly.
pub(crate) fn write_self_signed(certs_dir: &Utf8Path, hostname: &str) -> Result<(), FixtureError> {
    let certified = rcgen::generate_simple_self_signed([hostname.to_owned()]).map_err(|source| {
        FixtureError::Certificate {
            hostname: hostname.to_owned(),
            source,
        }
    })?;

    fs::create_dir_all(certs_dir).map_err(|source| FixtureError::WriteFile {
        path: certs_dir.to_path_buf(),
        source,
    })?;

    let cert_path = certs_dir.join(format!("{hostname}.crt"));
    fs::write(&cert_path, certified.cert.pem()).map_err(|source| FixtureError::WriteFile {
        path: cert_path.clone(),
        source,
    })?;

    let key_path = certs_dir.join(format!("{hostname}.key"));
    fs::write(&key_path, certified.key_pair.serialize_pem()).map_err(|source| {
        FixtureError::WriteFile {
            path: key_path.clone(),
            source,
        }
    })?;

    Ok(())
}
