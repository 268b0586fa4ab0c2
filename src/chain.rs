//! Rebuilding an ordered issuer chain from an unordered set of certificates.
//!
//! Certificates are linked by comparing each issuer DN with the subject DNs of
//! the working set. Links are indices into a single arena, so the walk can keep
//! a visited set and never loop.

use std::collections::HashMap;

use tracing::debug;

use crate::cert::Certificate;

/// A certificate of the working set and the index of its resolved issuer.
struct ChainLink<'a> {
    cert: &'a Certificate,
    issuer: Option<usize>,
}

/// Returns `[primary, issuer of primary, issuer of that, ...]`.
///
/// The walk stops at a self-issued certificate (included once) or at the first
/// certificate whose issuer is not among `additional`; the result is then
/// shorter than the input rather than an error. When several certificates share
/// a subject DN, the one appearing last wins, with `primary` counted after all
/// of `additional`.
pub fn build_chain(primary: &Certificate, additional: &[Certificate]) -> Vec<Certificate> {
    let mut links: Vec<ChainLink<'_>> = additional
        .iter()
        .chain(std::iter::once(primary))
        .map(|cert| ChainLink { cert, issuer: None })
        .collect();
    let primary_index = links.len() - 1;

    let mut by_subject: HashMap<String, usize> = HashMap::with_capacity(links.len());
    for (index, link) in links.iter().enumerate() {
        if let Some(previous) = by_subject.insert(link.cert.subject_dn(), index) {
            debug!(
                subject = %link.cert.subject_dn(),
                replaced = previous,
                by = index,
                "duplicate subject in chain input"
            );
        }
    }

    for link in links.iter_mut() {
        link.issuer = by_subject.get(&link.cert.issuer_name()).copied();
    }

    let mut chain = Vec::new();
    let mut visited = vec![false; links.len()];
    let mut current = Some(primary_index);
    while let Some(index) = current {
        if visited[index] {
            debug!(
                subject = %links[index].cert.subject_dn(),
                "issuer cycle in chain input, truncating"
            );
            break;
        }
        visited[index] = true;
        let link = &links[index];
        chain.push(link.cert.clone());
        current = match link.issuer {
            Some(issuer) if issuer == index => None,
            other => other,
        };
    }

    debug!(
        subject = %primary.subject_dn(),
        candidates = additional.len(),
        chain_len = chain.len(),
        "built certificate chain"
    );
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::{CertificateRequest, common_name};
    use crate::issuer::build_certificate;
    use crate::key::{EcCurve, KeyPair};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Node {
        cert: Certificate,
        key: KeyPair,
    }

    fn issue(rng: &mut StdRng, subject: &str, issuer: Option<(&str, &KeyPair)>) -> Node {
        let key = KeyPair::generate_ec(rng, EcCurve::P256);
        let mut request = CertificateRequest::builder()
            .domains(vec![subject.to_string()])
            .build();
        request.key_usage = CertificateRequest::ca_key_usage();
        let cert = match issuer {
            Some((issuer_subject, issuer_key)) => build_certificate(
                rng,
                &request,
                &key.public_key(),
                &common_name(issuer_subject).unwrap(),
                Some(&issuer_key.public_key()),
                issuer_key,
            ),
            None => build_certificate(
                rng,
                &request,
                &key.public_key(),
                &common_name(subject).unwrap(),
                None,
                &key,
            ),
        }
        .unwrap();
        Node { cert, key }
    }

    fn subjects(chain: &[Certificate]) -> Vec<String> {
        chain.iter().map(Certificate::subject_name).collect()
    }

    fn three_level(rng: &mut StdRng) -> (Node, Node, Node) {
        let root = issue(rng, "Root", None);
        let intermediate = issue(rng, "Intermediate", Some(("Root", &root.key)));
        let leaf = issue(rng, "Leaf", Some(("Intermediate", &intermediate.key)));
        (root, intermediate, leaf)
    }

    #[test]
    fn test_shuffled_input_is_reordered() {
        let mut rng = StdRng::seed_from_u64(50);
        let (root, intermediate, leaf) = three_level(&mut rng);

        let chain = build_chain(&leaf.cert, &[root.cert.clone(), intermediate.cert.clone()]);
        assert_eq!(subjects(&chain), vec!["Leaf", "Intermediate", "Root"]);

        let chain = build_chain(&leaf.cert, &[intermediate.cert, root.cert]);
        assert_eq!(subjects(&chain), vec!["Leaf", "Intermediate", "Root"]);
    }

    #[test]
    fn test_missing_intermediate_truncates() {
        let mut rng = StdRng::seed_from_u64(51);
        let (root, _intermediate, leaf) = three_level(&mut rng);

        let chain = build_chain(&leaf.cert, &[root.cert]);
        assert_eq!(subjects(&chain), vec!["Leaf"]);
    }

    #[test]
    fn test_self_signed_alone_is_single_entry() {
        let mut rng = StdRng::seed_from_u64(52);
        let root = issue(&mut rng, "Root", None);
        let chain = build_chain(&root.cert, &[]);
        assert_eq!(chain, vec![root.cert]);
    }

    #[test]
    fn test_unrelated_certificates_are_ignored() {
        let mut rng = StdRng::seed_from_u64(53);
        let (root, intermediate, leaf) = three_level(&mut rng);
        let stranger = issue(&mut rng, "Stranger", None);

        let chain = build_chain(&leaf.cert, &[stranger.cert, intermediate.cert, root.cert]);
        assert_eq!(subjects(&chain), vec!["Leaf", "Intermediate", "Root"]);
    }

    #[test]
    fn test_duplicate_subject_last_one_wins() {
        let mut rng = StdRng::seed_from_u64(54);
        let (root, intermediate, leaf) = three_level(&mut rng);
        let other_root = issue(&mut rng, "Root", None);

        let chain = build_chain(
            &leaf.cert,
            &[root.cert.clone(), intermediate.cert.clone(), other_root.cert.clone()],
        );
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[2], other_root.cert);

        let chain = build_chain(&leaf.cert, &[other_root.cert, intermediate.cert, root.cert.clone()]);
        assert_eq!(chain[2], root.cert);
    }

    #[test]
    fn test_issuer_cycle_terminates() {
        let mut rng = StdRng::seed_from_u64(55);
        let a_key = KeyPair::generate_ec(&mut rng, EcCurve::P256);
        let b_key = KeyPair::generate_ec(&mut rng, EcCurve::P256);
        // A is issued by B and B by A.
        let a = issue(&mut rng, "A", Some(("B", &b_key)));
        let b = issue(&mut rng, "B", Some(("A", &a_key)));

        let chain = build_chain(&a.cert, &[b.cert]);
        assert_eq!(subjects(&chain), vec!["A", "B"]);
    }
}
