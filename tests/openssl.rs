mod util;

use certbundle::key::{EcCurve, KeySpec};
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509, X509StoreContext};

fn common_name(name: &openssl::x509::X509NameRef) -> String {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap()
        .to_string()
}

#[test]
fn test_openssl_crate_validate_cert() {
    let mut rng = util::rng(100);
    let root = util::generate_root_ca(&mut rng, util::TEST_EC);
    let server = util::generate_server(&mut rng, util::TEST_RSA, &root);

    let x509 = X509::from_pem(server.cert.to_pem().unwrap().as_bytes()).expect("Failed to parse PEM");
    let ca = X509::from_pem(root.cert.to_pem().unwrap().as_bytes()).expect("Failed to parse PEM");

    assert_eq!(common_name(x509.subject_name()), "server.myca.local");
    assert_eq!(common_name(x509.issuer_name()), "myca.local");
    assert_eq!(x509.version(), 2, "X509 version should be 3 (0-based index)");

    let serial = x509.serial_number().to_bn().unwrap().to_vec();
    assert_eq!(serial, server.cert.serial_number());

    assert_eq!(
        x509.signature_algorithm().object().nid(),
        Nid::ECDSA_WITH_SHA256,
        "Signature algorithm follows the EC issuer"
    );
    assert!(x509.verify(&ca.public_key().unwrap()).unwrap());
    assert!(ca.verify(&ca.public_key().unwrap()).unwrap());

    let dns_names: Vec<String> = x509
        .subject_alt_names()
        .expect("SAN present")
        .iter()
        .filter_map(|name| name.dnsname().map(str::to_string))
        .collect();
    assert_eq!(dns_names, vec!["server.myca.local", "www.myca.local"]);
    assert!(ca.subject_alt_names().is_none());
}

#[test]
fn test_openssl_rsa_signature() {
    let mut rng = util::rng(101);
    let root = util::generate_root_ca(&mut rng, util::TEST_RSA);
    let server = util::generate_server(&mut rng, util::TEST_EC, &root);

    let x509 = X509::from_der(&server.cert.to_der().unwrap()).unwrap();
    let ca = X509::from_der(&root.cert.to_der().unwrap()).unwrap();
    assert_eq!(
        x509.signature_algorithm().object().nid(),
        Nid::SHA256WITHRSAENCRYPTION
    );
    assert!(x509.verify(&ca.public_key().unwrap()).unwrap());
}

#[test]
fn test_openssl_verifies_p521_signature() {
    let mut rng = util::rng(105);
    let root = util::generate_root_ca(&mut rng, KeySpec::Ec(EcCurve::P521));
    let server = util::generate_server(&mut rng, util::TEST_RSA, &root);

    let x509 = X509::from_der(&server.cert.to_der().unwrap()).unwrap();
    let ca = X509::from_der(&root.cert.to_der().unwrap()).unwrap();
    assert_eq!(x509.signature_algorithm().object().nid(), Nid::ECDSA_WITH_SHA256);
    assert!(x509.verify(&ca.public_key().unwrap()).unwrap());
    assert!(ca.verify(&ca.public_key().unwrap()).unwrap());
}

#[test]
fn test_openssl_verifies_chain() {
    let mut rng = util::rng(102);
    let (root, intermediate, server) = util::generate_three_level(&mut rng, util::TEST_EC);

    let root = X509::from_der(&root.cert.to_der().unwrap()).unwrap();
    let intermediate = X509::from_der(&intermediate.cert.to_der().unwrap()).unwrap();
    let leaf = X509::from_der(&server.cert.to_der().unwrap()).unwrap();

    let mut store = X509StoreBuilder::new().unwrap();
    store.add_cert(root).unwrap();
    let store = store.build();

    let mut untrusted = Stack::new().unwrap();
    untrusted.push(intermediate).unwrap();

    let mut context = X509StoreContext::new().unwrap();
    let verified = context
        .init(&store, &leaf, &untrusted, |ctx| {
            let ok = ctx.verify_cert()?;
            assert_eq!(ctx.error(), openssl::x509::X509VerifyResult::OK);
            Ok(ok)
        })
        .unwrap();
    assert!(verified);
}

#[test]
fn test_openssl_reads_private_key_pem() {
    let mut rng = util::rng(103);
    let bundle = util::generate_root_ca(&mut rng, util::TEST_RSA);

    let key = PKey::private_key_from_pem(&bundle.export_private_key_pem().unwrap()).unwrap();
    let cert = X509::from_pem(&bundle.export_public_chain_pem().unwrap()).unwrap();
    assert_eq!(
        key.public_key_to_der().unwrap(),
        cert.public_key().unwrap().public_key_to_der().unwrap()
    );
}

#[test]
fn test_openssl_parses_pkcs12() {
    let mut rng = util::rng(104);
    let (_root, _intermediate, server) = util::generate_three_level(&mut rng, util::TEST_EC);

    let der = server.export_pkcs12(Some("secret")).unwrap();
    let parsed = Pkcs12::from_der(&der).unwrap().parse2("secret").unwrap();

    let cert = parsed.cert.expect("leaf certificate");
    assert_eq!(common_name(cert.subject_name()), "server.myca.local");

    let key = parsed.pkey.expect("private key");
    assert_eq!(
        key.public_key_to_der().unwrap(),
        cert.public_key().unwrap().public_key_to_der().unwrap()
    );

    let ca = parsed.ca.expect("issuer certificates");
    assert_eq!(ca.len(), 2);
}
