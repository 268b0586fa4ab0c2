use crate::error::Result;

/// Tag of a PEM block holding an X.509 certificate.
pub const CERTIFICATE_TAG: &str = "CERTIFICATE";
/// Tag of a PEM block holding a PKCS#8 private key.
pub const PRIVATE_KEY_TAG: &str = "PRIVATE KEY";
/// Tag of a PEM block holding a PKCS#1 RSA private key.
pub const RSA_PRIVATE_KEY_TAG: &str = "RSA PRIVATE KEY";
/// Tag of a PEM block holding a SEC1 EC private key.
pub const EC_PRIVATE_KEY_TAG: &str = "EC PRIVATE KEY";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Split a text stream into its concatenated PEM blocks, in order.
///
/// Text outside the armour lines is ignored.
pub fn parse_blocks(input: &[u8]) -> Result<Vec<pem::Pem>> {
    Ok(pem::parse_many(input)?)
}
