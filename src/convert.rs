//! Converting bundles between PEM file pairs and PKCS#12 files.
//!
//! The container format is picked from the file extension.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::bundle::CertificateBundle;
use crate::error::{CertBundleError, Result};

/// Extensions tried, in order, for the public half of a PEM pair.
const PUBLIC_PEM_EXTENSIONS: [&str; 3] = ["cer", "crt", "pem"];
/// Extension of the private half of a PEM pair.
const KEY_PEM_EXTENSION: &str = "key";

/// On-disk container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// A `.cer`/`.crt`/`.pem` certificate file next to a `.key` file.
    Pem,
    /// A single `.pfx`/`.p12` file.
    Pkcs12,
}

impl ContainerFormat {
    /// Picks the format from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pem" | "cer" | "crt" | "key" => Some(ContainerFormat::Pem),
            "pfx" | "p12" => Some(ContainerFormat::Pkcs12),
            _ => None,
        }
    }

    /// Reads a bundle stored at `path`.
    ///
    /// For PEM, `path` names either half of the pair; the certificate file is
    /// the first existing `<stem>.cer`, `<stem>.crt` or `<stem>.pem`, and the key
    /// is `<stem>.key`. A PEM pair with neither file present, or a PKCS#12 file
    /// that cannot be opened, yields `Ok(None)`.
    pub fn read_bundle(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> Result<Option<CertificateBundle>> {
        match self {
            ContainerFormat::Pem => {
                let public = PUBLIC_PEM_EXTENSIONS
                    .iter()
                    .map(|ext| path.with_extension(ext))
                    .find(|candidate| candidate.exists());
                let private = path.with_extension(KEY_PEM_EXTENSION);
                if public.is_none() && !private.exists() {
                    debug!(path = %path.display(), "no PEM pair on disk");
                    return Ok(None);
                }
                CertificateBundle::load_from_pem_pair(public.as_deref(), Some(&private)).map(Some)
            }
            ContainerFormat::Pkcs12 => CertificateBundle::load_from_pkcs12(path, password),
        }
    }

    /// Writes `bundle` next to `path`, returning the files created.
    ///
    /// PEM produces `<stem>.cer` holding the certificate chain and `<stem>.key`
    /// holding the private key; PKCS#12 produces `path` itself.
    pub fn write_bundle(
        &self,
        path: &Path,
        bundle: &CertificateBundle,
        password: Option<&str>,
    ) -> Result<Vec<PathBuf>> {
        match self {
            ContainerFormat::Pem => {
                let public = path.with_extension(PUBLIC_PEM_EXTENSIONS[0]);
                let private = path.with_extension(KEY_PEM_EXTENSION);
                write_file(&public, &bundle.export_public_chain_pem()?)?;
                write_file(&private, &bundle.export_private_key_pem()?)?;
                Ok(vec![public, private])
            }
            ContainerFormat::Pkcs12 => {
                write_file(path, &bundle.export_pkcs12(password)?)?;
                Ok(vec![path.to_path_buf()])
            }
        }
    }
}

/// Reads the bundle at `input` and writes it to `output`, each in the format
/// named by its extension. The password applies to whichever side is PKCS#12.
pub fn convert_file(input: &Path, output: &Path, password: Option<&str>) -> Result<Vec<PathBuf>> {
    let input_format = format_of(input)?;
    let output_format = format_of(output)?;

    let bundle = input_format.read_bundle(input, password)?.ok_or_else(|| {
        CertBundleError::ValidationError(format!(
            "{} could not be opened as a certificate bundle",
            input.display()
        ))
    })?;
    let written = output_format.write_bundle(output, &bundle, password)?;
    info!(
        input = %input.display(),
        ?input_format,
        ?output_format,
        subject = %bundle.subject_name(),
        "converted certificate bundle"
    );
    Ok(written)
}

fn format_of(path: &Path) -> Result<ContainerFormat> {
    ContainerFormat::from_path(path).ok_or_else(|| {
        CertBundleError::ValidationError(format!(
            "unsupported file extension: {}",
            path.display()
        ))
    })
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).map_err(|e| CertBundleError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}
