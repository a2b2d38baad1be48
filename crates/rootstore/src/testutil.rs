//! Throwaway CAs, leaves and CRLs for unit tests.

use std::path::{Path, PathBuf};

use rcgen::{
    BasicConstraints, CertificateParams, CertificateRevocationListParams, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyIdMethod, KeyPair, KeyUsagePurpose, RevokedCertParams,
    SerialNumber,
};
use rustls_pki_types::{
    CertificateDer, CertificateRevocationListDer, PrivateKeyDer, PrivatePkcs8KeyDer,
};
use time::{Duration, OffsetDateTime};

use crate::store::TrustStore;
use crate::tls::TlsIdentity;

pub(crate) struct TestCa {
    cert: rcgen::Certificate,
    key: KeyPair,
}

impl TestCa {
    pub(crate) fn new(name: &str) -> Self {
        let mut params = CertificateParams::new(Vec::<String>::new()).expect("ca params");
        params
            .distinguished_name
            .push(DnType::CommonName, format!("{name} test root"));
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let key = KeyPair::generate().expect("ca key");
        let cert = params.self_signed(&key).expect("ca cert");
        Self { cert, key }
    }

    pub(crate) fn cert_der(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }

    pub(crate) fn cert_pem(&self) -> String {
        self.cert.pem()
    }

    /// A store holding only this CA.
    pub(crate) fn store(&self) -> TrustStore {
        let mut builder = TrustStore::builder();
        builder.add_der(self.cert_der());
        builder.build().expect("single-anchor store")
    }

    /// A leaf for `dns`, usable for both server and client auth.
    pub(crate) fn issue(&self, dns: &str, serial: u64) -> TlsIdentity {
        let mut params = CertificateParams::new(vec![dns.to_string()]).expect("leaf params");
        params.serial_number = Some(SerialNumber::from(serial));
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        let key = KeyPair::generate().expect("leaf key");
        let cert = params
            .signed_by(&key, &self.cert, &self.key)
            .expect("leaf cert");
        TlsIdentity::from_der(
            vec![cert.der().clone()],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der())),
        )
    }

    pub(crate) fn empty_crl(&self) -> CertificateRevocationListDer<'static> {
        self.crl(&[])
    }

    /// A CRL revoking the given serial numbers.
    pub(crate) fn crl(&self, revoked: &[u64]) -> CertificateRevocationListDer<'static> {
        self.signed_crl(revoked).der().clone()
    }

    pub(crate) fn crl_pem(&self, revoked: &[u64]) -> String {
        self.signed_crl(revoked).pem().expect("crl pem")
    }

    fn signed_crl(&self, revoked: &[u64]) -> rcgen::CertificateRevocationList {
        let now = OffsetDateTime::now_utc();
        let params = CertificateRevocationListParams {
            this_update: now - Duration::days(1),
            next_update: now + Duration::days(30),
            crl_number: SerialNumber::from(1u64),
            issuing_distribution_point: None,
            revoked_certs: revoked
                .iter()
                .map(|serial| RevokedCertParams {
                    serial_number: SerialNumber::from(*serial),
                    revocation_time: now - Duration::hours(1),
                    reason_code: None,
                    invalidity_date: None,
                })
                .collect(),
            key_identifier_method: KeyIdMethod::Sha256,
        };
        params.signed_by(&self.cert, &self.key).expect("crl")
    }
}

/// Write the given CAs to `dir/name` as one PEM bundle.
pub(crate) fn write_bundle(dir: &Path, name: &str, cas: &[&TestCa]) -> PathBuf {
    let pem: String = cas.iter().map(|ca| ca.cert_pem()).collect();
    let path = dir.join(name);
    std::fs::write(&path, pem).expect("write bundle");
    path
}
