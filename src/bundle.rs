use std::fs;
use std::path::Path;

use p12_keystore::{KeyStore, KeyStoreEntry, PrivateKeyChain};
use rand_core::{CryptoRngCore, OsRng};
use sha1::{Digest, Sha1};
use tracing::{debug, info};
use x509_cert::name::Name;

use crate::cert::Certificate;
use crate::cert::params::CertificateRequest;
use crate::chain::build_chain;
use crate::error::{CertBundleError, Result};
use crate::issuer::{Issuer, SelfIssuer};
use crate::key::matching::does_key_match_certificate;
use crate::key::{KeyPair, PublicKey};
use crate::pem_utils::{self, CERTIFICATE_TAG};

/// A certificate, its private key and its issuer chain.
///
/// `chain[0]` is the issuer of `cert` and `chain[i + 1]` the issuer of
/// `chain[i]`. The chain stops early when an issuer is unknown.
#[derive(Debug, Clone)]
pub struct CertificateBundle {
    pub cert: Certificate,
    pub private_key: Option<KeyPair>,
    pub chain: Vec<Certificate>,
}

impl CertificateBundle {
    /// Generates a key pair and a self-signed certificate for it, using the OS
    /// random source.
    pub fn generate_self_signed(request: &CertificateRequest) -> Result<Self> {
        Self::generate_self_signed_with_rng(&mut OsRng, request)
    }

    /// Generates a key pair and a self-signed certificate for it.
    ///
    /// The issuer is the subject itself and no Authority Key Identifier is
    /// written. The resulting chain is empty.
    pub fn generate_self_signed_with_rng<R: CryptoRngCore + ?Sized>(
        rng: &mut R,
        request: &CertificateRequest,
    ) -> Result<Self> {
        request.validate()?;
        let key = KeyPair::generate(rng, request.key_spec)?;
        let cert = SelfIssuer::new(request, &key)?.issue(rng, request, &key.public_key())?;
        info!(subject = %cert.subject_dn(), "generated self-signed certificate");
        Ok(Self {
            cert,
            private_key: Some(key),
            chain: Vec::new(),
        })
    }

    /// Generates a key pair and a certificate signed by `ca`, using the OS
    /// random source.
    pub fn generate_signed_by_ca(request: &CertificateRequest, ca: &CertificateBundle) -> Result<Self> {
        Self::generate_signed_by_ca_with_rng(&mut OsRng, request, ca)
    }

    /// Generates a key pair and a certificate signed by `ca`.
    ///
    /// The chain of the new bundle is `ca.cert` followed by `ca.chain`.
    pub fn generate_signed_by_ca_with_rng<R: CryptoRngCore + ?Sized>(
        rng: &mut R,
        request: &CertificateRequest,
        ca: &CertificateBundle,
    ) -> Result<Self> {
        request.validate()?;
        ca.signing_key()?;
        let key = KeyPair::generate(rng, request.key_spec)?;
        let cert = ca.issue(rng, request, &key.public_key())?;
        info!(
            subject = %cert.subject_dn(),
            issuer = %cert.issuer_name(),
            "generated CA-signed certificate"
        );
        let mut bundle = Self {
            cert,
            private_key: Some(key),
            chain: Vec::new(),
        };
        bundle.set_issuer_bundle(ca);
        Ok(bundle)
    }

    /// Sets the chain to the issuer's certificate followed by its chain.
    pub fn set_issuer_bundle(&mut self, issuer: &CertificateBundle) {
        self.chain = std::iter::once(issuer.cert.clone())
            .chain(issuer.chain.iter().cloned())
            .collect();
    }

    /// The leaf's common name, or its subject DN without a leading `CN=`.
    pub fn subject_name(&self) -> String {
        self.cert.subject_name()
    }

    /// The leaf followed by every chain certificate, as concatenated PEM blocks.
    pub fn export_public_chain_pem(&self) -> Result<Vec<u8>> {
        let mut out = String::new();
        for cert in std::iter::once(&self.cert).chain(self.chain.iter()) {
            out.push_str(&cert.to_pem()?);
        }
        Ok(out.into_bytes())
    }

    /// The private key as a single PKCS#8 `PRIVATE KEY` PEM block.
    pub fn export_private_key_pem(&self) -> Result<Vec<u8>> {
        let key = self
            .private_key
            .as_ref()
            .ok_or(CertBundleError::NoPrivateKeyError)?;
        Ok(key.to_pkcs8_pem()?.into_bytes())
    }

    /// Builds a PKCS#12 container holding one private-key entry, aliased by
    /// [`subject_name`](Self::subject_name), whose certificate path is the leaf
    /// followed by the chain.
    ///
    /// Without a password the container is protected with the empty password.
    pub fn export_pkcs12(&self, password: Option<&str>) -> Result<Vec<u8>> {
        let key = self
            .private_key
            .as_ref()
            .ok_or(CertBundleError::NoPrivateKeyError)?;
        let key_der = key.to_pkcs8_der()?;

        let leaf_der = self.cert.to_der()?;
        let local_key_id = Sha1::digest(&leaf_der);
        let mut certificates = vec![to_keystore_certificate(&leaf_der)?];
        for cert in &self.chain {
            certificates.push(to_keystore_certificate(&cert.to_der()?)?);
        }

        let alias = self.subject_name();
        let mut keystore = KeyStore::new();
        keystore.add_entry(
            &alias,
            KeyStoreEntry::PrivateKeyChain(PrivateKeyChain::new(
                &key_der,
                &local_key_id[..],
                certificates,
            )),
        );

        let data = keystore
            .writer(password.unwrap_or(""))
            .write()
            .map_err(|e| CertBundleError::EncodingError(format!("PKCS#12: {e}")))?;
        debug!(%alias, chain_len = self.chain.len(), "exported PKCS#12 container");
        Ok(data)
    }

    /// Loads a bundle from a public PEM file and a private-key PEM file.
    ///
    /// Either path may be absent or point at a missing file; the inputs that
    /// exist are scanned together. Certificates and the key may sit in either
    /// file, and the first private key found is used.
    pub fn load_from_pem_pair(public: Option<&Path>, private: Option<&Path>) -> Result<Self> {
        let mut names = Vec::new();
        let mut contents = Vec::new();
        for path in [public, private].into_iter().flatten() {
            if !path.exists() {
                debug!(path = %path.display(), "PEM input does not exist, skipping");
                continue;
            }
            let data = fs::read(path).map_err(|e| CertBundleError::ReadFile {
                path: path.to_path_buf(),
                source: e,
            })?;
            names.push(path.display().to_string());
            contents.push(data);
        }
        let sources = if names.is_empty() {
            "(no existing file)".to_string()
        } else {
            names.join(", ")
        };
        let inputs: Vec<&[u8]> = contents.iter().map(Vec::as_slice).collect();
        Self::from_pem_inputs(&inputs, &sources)
    }

    /// Loads a bundle from in-memory PEM streams, like
    /// [`load_from_pem_pair`](Self::load_from_pem_pair).
    pub fn load_from_pem_sources(sources: &[&[u8]]) -> Result<Self> {
        Self::from_pem_inputs(sources, &format!("{} PEM buffer(s)", sources.len()))
    }

    fn from_pem_inputs(inputs: &[&[u8]], sources: &str) -> Result<Self> {
        let mut certs = Vec::new();
        let mut private_key: Option<KeyPair> = None;
        for input in inputs {
            for block in pem_utils::parse_blocks(input)? {
                if block.tag() == CERTIFICATE_TAG {
                    certs.push(Certificate::from_der(block.contents())?);
                } else if private_key.is_none() {
                    private_key = KeyPair::from_pem_block(&block)?;
                }
            }
        }

        let key = private_key.ok_or_else(|| CertBundleError::MissingPrivateKeyError {
            sources: sources.to_string(),
        })?;
        let primary = certs
            .iter()
            .position(|cert| does_key_match_certificate(cert, &key))
            .ok_or_else(|| CertBundleError::NoMatchingCertificateError {
                sources: sources.to_string(),
            })?;
        let cert = certs.remove(primary);
        let chain = build_chain(&cert, &certs).into_iter().skip(1).collect::<Vec<_>>();

        info!(
            subject = %cert.subject_dn(),
            certificates = certs.len() + 1,
            chain_len = chain.len(),
            %sources,
            "loaded PEM bundle"
        );
        Ok(Self {
            cert,
            private_key: Some(key),
            chain,
        })
    }

    /// Loads a bundle from a PKCS#12 file.
    ///
    /// Returns `Ok(None)` when the file cannot be read or opened as a
    /// container (missing file, wrong password, corrupt data) and when no
    /// entry holds both a certificate and a private key. Malformed keys or
    /// certificates inside a container that did open are reported as errors.
    pub fn load_from_pkcs12(path: &Path, password: Option<&str>) -> Result<Option<Self>> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "PKCS#12 file not readable");
                return Ok(None);
            }
        };
        Self::from_pkcs12_der(&data, password)
    }

    /// Loads a bundle from PKCS#12 bytes, like
    /// [`load_from_pkcs12`](Self::load_from_pkcs12).
    pub fn from_pkcs12_der(data: &[u8], password: Option<&str>) -> Result<Option<Self>> {
        let keystore = match open_pkcs12(data, password) {
            Ok(keystore) => keystore,
            Err(CertBundleError::UnreadableContainerError(reason)) => {
                debug!(%reason, "PKCS#12 container not opened");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        for (alias, entry) in keystore.entries() {
            let KeyStoreEntry::PrivateKeyChain(key_chain) = entry else {
                continue;
            };
            let mut certs = key_chain
                .chain()
                .iter()
                .map(|cert| Certificate::from_der(cert.as_der()))
                .collect::<Result<Vec<_>>>()?;
            if certs.is_empty() {
                debug!(%alias, "PKCS#12 entry has no certificate");
                continue;
            }
            let key = KeyPair::from_pkcs8_der(key_chain.key())?;
            let primary = certs
                .iter()
                .position(|cert| does_key_match_certificate(cert, &key))
                .unwrap_or(0);
            let cert = certs.remove(primary);
            let chain = build_chain(&cert, &certs).into_iter().skip(1).collect::<Vec<_>>();

            info!(%alias, chain_len = chain.len(), "loaded PKCS#12 bundle");
            return Ok(Some(Self {
                cert,
                private_key: Some(key),
                chain,
            }));
        }

        debug!("no PKCS#12 entry holds both a certificate and a private key");
        Ok(None)
    }
}

impl Issuer for CertificateBundle {
    fn issuer_name(&self) -> Result<Name> {
        Ok(self.cert.subject().clone())
    }

    fn issuer_public_key(&self) -> Option<PublicKey> {
        self.cert.public_key().ok()
    }

    fn signing_key(&self) -> Result<&KeyPair> {
        self.private_key
            .as_ref()
            .ok_or(CertBundleError::NoPrivateKeyError)
    }
}

/// The single boundary where container failures become "absent".
fn open_pkcs12(data: &[u8], password: Option<&str>) -> Result<KeyStore> {
    KeyStore::from_pkcs12(data, password.unwrap_or(""))
        .map_err(|e| CertBundleError::UnreadableContainerError(e.to_string()))
}

fn to_keystore_certificate(der: &[u8]) -> Result<p12_keystore::Certificate> {
    p12_keystore::Certificate::from_der(der)
        .map_err(|e| CertBundleError::EncodingError(format!("PKCS#12 certificate: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{EcCurve, KeySpec};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ec_request(domains: &[&str]) -> CertificateRequest {
        CertificateRequest::builder()
            .domains(domains.iter().map(|d| d.to_string()).collect())
            .key_spec(KeySpec::Ec(EcCurve::P256))
            .build()
    }

    fn ca(rng: &mut StdRng, name: &str) -> CertificateBundle {
        let mut request = ec_request(&[name]);
        request.key_usage = CertificateRequest::ca_key_usage();
        CertificateBundle::generate_self_signed_with_rng(rng, &request).unwrap()
    }

    #[test]
    fn test_signed_by_ca_chain_is_issuer_then_its_chain() {
        let mut rng = StdRng::seed_from_u64(60);
        let root = ca(&mut rng, "Root CA");
        let mut intermediate_request = ec_request(&["Intermediate CA"]);
        intermediate_request.key_usage = CertificateRequest::ca_key_usage();
        let intermediate =
            CertificateBundle::generate_signed_by_ca_with_rng(&mut rng, &intermediate_request, &root)
                .unwrap();
        let leaf = CertificateBundle::generate_signed_by_ca_with_rng(
            &mut rng,
            &ec_request(&["leaf.example"]),
            &intermediate,
        )
        .unwrap();

        assert_eq!(leaf.chain, vec![intermediate.cert.clone(), root.cert.clone()]);
        assert_eq!(leaf.cert.issuer(), intermediate.cert.subject());
        assert!(
            leaf.cert
                .verify_signature(&intermediate.cert.public_key().unwrap())
                .unwrap()
        );
    }

    #[test]
    fn test_ca_without_key_cannot_sign() {
        let mut rng = StdRng::seed_from_u64(61);
        let mut root = ca(&mut rng, "Root CA");
        root.private_key = None;
        assert!(matches!(
            CertificateBundle::generate_signed_by_ca_with_rng(
                &mut rng,
                &ec_request(&["leaf.example"]),
                &root
            ),
            Err(CertBundleError::NoPrivateKeyError)
        ));
        assert!(matches!(
            root.export_private_key_pem(),
            Err(CertBundleError::NoPrivateKeyError)
        ));
        assert!(matches!(
            root.export_pkcs12(None),
            Err(CertBundleError::NoPrivateKeyError)
        ));
    }

    #[test]
    fn test_pem_sources_pick_the_matching_certificate() {
        let mut rng = StdRng::seed_from_u64(62);
        let root = ca(&mut rng, "Root CA");
        let leaf = CertificateBundle::generate_signed_by_ca_with_rng(
            &mut rng,
            &ec_request(&["leaf.example"]),
            &root,
        )
        .unwrap();

        // Root first, so the leaf has to be found through its key.
        let mut certs = root.cert.to_pem().unwrap();
        certs.push_str(&leaf.cert.to_pem().unwrap());
        let key = leaf.export_private_key_pem().unwrap();

        let loaded =
            CertificateBundle::load_from_pem_sources(&[certs.as_bytes(), key.as_slice()]).unwrap();
        assert_eq!(loaded.cert, leaf.cert);
        assert_eq!(loaded.chain, vec![root.cert]);
    }

    #[test]
    fn test_pem_sources_without_key_or_match() {
        let mut rng = StdRng::seed_from_u64(63);
        let first = ca(&mut rng, "First");
        let second = ca(&mut rng, "Second");
        let certs = first.export_public_chain_pem().unwrap();

        assert!(matches!(
            CertificateBundle::load_from_pem_sources(&[certs.as_slice()]),
            Err(CertBundleError::MissingPrivateKeyError { .. })
        ));

        let other_key = second.export_private_key_pem().unwrap();
        assert!(matches!(
            CertificateBundle::load_from_pem_sources(&[certs.as_slice(), other_key.as_slice()]),
            Err(CertBundleError::NoMatchingCertificateError { .. })
        ));
    }

    #[test]
    fn test_garbage_pkcs12_is_absent() {
        assert!(
            CertificateBundle::from_pkcs12_der(b"not a pkcs12 container", Some("pw"))
                .unwrap()
                .is_none()
        );
    }
}
