#![allow(dead_code)]

use certbundle::bundle::CertificateBundle;
use certbundle::cert::params::{CertificateRequest, ExtendedKeyUsageOption};
use certbundle::key::{EcCurve, KeySpec};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Small RSA keys keep the suite fast; the concrete 2048-bit case is tested separately.
pub const TEST_RSA: KeySpec = KeySpec::Rsa { bits: 1024 };
pub const TEST_EC: KeySpec = KeySpec::Ec(EcCurve::P256);

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn request(domains: &[&str], key_spec: KeySpec) -> CertificateRequest {
    CertificateRequest::builder()
        .domains(domains.iter().map(|d| d.to_string()).collect())
        .key_spec(key_spec)
        .build()
}

pub fn ca_request(name: &str, key_spec: KeySpec) -> CertificateRequest {
    CertificateRequest::builder()
        .domains(vec![name.to_string()])
        .key_spec(key_spec)
        .key_usage(CertificateRequest::ca_key_usage())
        .build()
}

pub fn generate_root_ca(rng: &mut StdRng, key_spec: KeySpec) -> CertificateBundle {
    CertificateBundle::generate_self_signed_with_rng(rng, &ca_request("myca.local", key_spec))
        .unwrap()
}

pub fn generate_intermediate_ca(
    rng: &mut StdRng,
    key_spec: KeySpec,
    root: &CertificateBundle,
) -> CertificateBundle {
    CertificateBundle::generate_signed_by_ca_with_rng(
        rng,
        &ca_request("intermediate.myca.local", key_spec),
        root,
    )
    .unwrap()
}

pub fn generate_server(
    rng: &mut StdRng,
    key_spec: KeySpec,
    issuer: &CertificateBundle,
) -> CertificateBundle {
    let mut request = request(&["server.myca.local", "www.myca.local"], key_spec);
    request.extended_key_usage = vec![ExtendedKeyUsageOption::ServerAuth.into()];
    CertificateBundle::generate_signed_by_ca_with_rng(rng, &request, issuer).unwrap()
}

/// Root, intermediate and server bundles, each signed by the previous one.
pub fn generate_three_level(
    rng: &mut StdRng,
    key_spec: KeySpec,
) -> (CertificateBundle, CertificateBundle, CertificateBundle) {
    let root = generate_root_ca(rng, key_spec);
    let intermediate = generate_intermediate_ca(rng, key_spec, &root);
    let server = generate_server(rng, key_spec, &intermediate);
    (root, intermediate, server)
}
