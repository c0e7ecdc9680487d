//! Key fixtures shared by the unit tests
//!
//! Keys are generated once per test run.

#![allow(dead_code)]

use once_cell::sync::Lazy;
use openssl::pkey::{PKey, Private};

pub struct KeyPair {
    pub private_pem: String,
    pub public_pem: String,
}

impl KeyPair {
    fn from_pkey(pkey: &PKey<Private>) -> Self {
        Self {
            private_pem: String::from_utf8(pkey.private_key_to_pem_pkcs8().expect("pkcs8 pem"))
                .expect("utf-8 pem"),
            public_pem: String::from_utf8(pkey.public_key_to_pem().expect("spki pem"))
                .expect("utf-8 pem"),
        }
    }
}

pub static X25519: Lazy<KeyPair> =
    Lazy::new(|| KeyPair::from_pkey(&PKey::generate_x25519().expect("x25519 key")));

pub mod rsa {
    use der::{
        asn1::{AnyRef, ObjectIdentifier},
        Decode, Encode,
    };
    use openssl::{pkey::PKey, rsa::Rsa};
    use pkcs8::PrivateKeyInfo;
    use spki::AlgorithmIdentifierRef;

    use super::{KeyPair, Lazy};
    use crate::key::RsaPssParams;

    const RSASSA_PSS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.10");
    const MGF1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.8");
    const SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");

    fn generate(bits: u32) -> KeyPair {
        let rsa = Rsa::generate(bits).expect("rsa key");
        KeyPair::from_pkey(&PKey::from_rsa(rsa).expect("rsa pkey"))
    }

    /// Relabels a fresh RSA key as an RSASSA-PSS key
    fn pss(params: Option<AnyRef<'_>>) -> KeyPair {
        let rsa = PKey::from_rsa(Rsa::generate(2048).expect("rsa key")).expect("rsa pkey");
        let der = rsa.private_key_to_pkcs8().expect("pkcs8 der");

        let mut info = PrivateKeyInfo::from_der(&der).expect("pkcs8 info");
        info.algorithm = AlgorithmIdentifierRef {
            oid: RSASSA_PSS,
            parameters: params,
        };
        let pss_der = info.to_der().expect("pss der");

        let pkey = PKey::private_key_from_pkcs8(&pss_der).expect("pss pkey");
        KeyPair {
            private_pem: pem::encode(&pem::Pem::new("PRIVATE KEY", pss_der)),
            public_pem: String::from_utf8(pkey.public_key_to_pem().expect("spki pem"))
                .expect("utf-8 pem"),
        }
    }

    fn pss_sha384() -> KeyPair {
        let sha384 = AlgorithmIdentifierRef {
            oid: SHA384,
            parameters: None,
        };
        let sha384_der = sha384.to_der().expect("hash der");

        let params = RsaPssParams {
            hash_algorithm: Some(sha384),
            mask_gen_algorithm: Some(AlgorithmIdentifierRef {
                oid: MGF1,
                parameters: Some(AnyRef::from_der(&sha384_der).expect("hash any")),
            }),
            salt_length: Some(48),
            trailer_field: None,
        };
        let params_der = params.to_der().expect("params der");

        pss(Some(AnyRef::from_der(&params_der).expect("params any")))
    }

    pub static PAIR_2048: Lazy<KeyPair> = Lazy::new(|| generate(2048));
    pub static PAIR_1024: Lazy<KeyPair> = Lazy::new(|| generate(1024));
    pub static PSS_UNRESTRICTED: Lazy<KeyPair> = Lazy::new(|| pss(None));
    pub static PSS_SHA384: Lazy<KeyPair> = Lazy::new(pss_sha384);
}

pub mod ec {
    use openssl::{
        ec::{EcGroup, EcKey},
        nid::Nid,
        pkey::PKey,
    };

    use super::{KeyPair, Lazy};

    fn generate(curve: Nid) -> KeyPair {
        let group = EcGroup::from_curve_name(curve).expect("curve");
        let ec = EcKey::generate(&group).expect("ec key");
        KeyPair::from_pkey(&PKey::from_ec_key(ec).expect("ec pkey"))
    }

    pub static P256: Lazy<KeyPair> = Lazy::new(|| generate(Nid::X9_62_PRIME256V1));
    pub static P384: Lazy<KeyPair> = Lazy::new(|| generate(Nid::SECP384R1));
    pub static P521: Lazy<KeyPair> = Lazy::new(|| generate(Nid::SECP521R1));
    pub static SECP256K1: Lazy<KeyPair> = Lazy::new(|| generate(Nid::SECP256K1));
    pub static SECP224R1: Lazy<KeyPair> = Lazy::new(|| generate(Nid::SECP224R1));
}

pub mod eddsa {
    use openssl::pkey::PKey;

    use super::{KeyPair, Lazy};

    pub static ED25519: Lazy<KeyPair> =
        Lazy::new(|| KeyPair::from_pkey(&PKey::generate_ed25519().expect("ed25519 key")));
    pub static ED448: Lazy<KeyPair> =
        Lazy::new(|| KeyPair::from_pkey(&PKey::generate_ed448().expect("ed448 key")));
}

pub mod ml_dsa {
    use der::{
        asn1::{BitStringRef, OctetStringRef},
        Encode,
    };
    use pkcs8::PrivateKeyInfo;
    use pqcrypto_traits::sign::{PublicKey as _, SecretKey as _};
    use spki::{AlgorithmIdentifierRef, SubjectPublicKeyInfoRef};

    use super::Lazy;
    use crate::jwa::ml_dsa::ParameterSet;

    pub struct MlDsaPair {
        pub public: Vec<u8>,
        pub secret: Vec<u8>,
        pub private_pem: String,
        pub public_pem: String,
    }

    fn encode(params: ParameterSet, public: Vec<u8>, secret: Vec<u8>) -> MlDsaPair {
        let algorithm = AlgorithmIdentifierRef {
            oid: params.oid(),
            parameters: None,
        };

        let expanded = OctetStringRef::new(&secret)
            .and_then(|k| k.to_der())
            .expect("expanded key der");
        let private_der = PrivateKeyInfo {
            algorithm,
            private_key: &expanded,
            public_key: Some(&public),
        }
        .to_der()
        .expect("pkcs8 der");

        let public_der = SubjectPublicKeyInfoRef {
            algorithm,
            subject_public_key: BitStringRef::from_bytes(&public).expect("bit string"),
        }
        .to_der()
        .expect("spki der");

        MlDsaPair {
            private_pem: pem::encode(&pem::Pem::new("PRIVATE KEY", private_der)),
            public_pem: pem::encode(&pem::Pem::new("PUBLIC KEY", public_der)),
            public,
            secret,
        }
    }

    macro_rules! generate {
        ($params:expr, $m:ident) => {{
            let (pk, sk) = pqcrypto_mldsa::$m::keypair();
            encode($params, pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
        }};
    }

    pub static ML_DSA_44: Lazy<MlDsaPair> =
        Lazy::new(|| generate!(ParameterSet::MlDsa44, mldsa44));
    pub static ML_DSA_65: Lazy<MlDsaPair> =
        Lazy::new(|| generate!(ParameterSet::MlDsa65, mldsa65));
    pub static ML_DSA_87: Lazy<MlDsaPair> =
        Lazy::new(|| generate!(ParameterSet::MlDsa87, mldsa87));
}
