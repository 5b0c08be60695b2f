//! Named key templates.
//!
//! Names follow the convention shared by the cross-language test suite,
//! e.g. `AES128_GCM`, `ED25519_RAW` or
//! `DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_AES_128_GCM`.

use crate::aead::{
    AES_GCM_TYPE_URL, CHACHA20_POLY1305_TYPE_URL, KMS_AEAD_TYPE_URL, KMS_ENVELOPE_AEAD_TYPE_URL,
    XCHACHA20_POLY1305_TYPE_URL,
};
use crate::daead::AES_SIV_TYPE_URL;
use crate::hybrid::HPKE_PRIVATE_KEY_TYPE_URL;
use crate::keyderivation::PRF_BASED_DERIVER_TYPE_URL;
use crate::mac::{AES_CMAC_TYPE_URL, HMAC_TYPE_URL};
use crate::prf::{AES_CMAC_PRF_TYPE_URL, HKDF_PRF_TYPE_URL, HMAC_PRF_TYPE_URL};
use crate::proto::*;
use crate::signature::{ECDSA_PRIVATE_KEY_TYPE_URL, ED25519_PRIVATE_KEY_TYPE_URL};
use prost::Message;

fn template<M: Message>(type_url: &str, format: &M, prefix: OutputPrefixType) -> KeyTemplate {
    KeyTemplate {
        type_url: type_url.to_string(),
        value: format.encode_to_vec(),
        output_prefix_type: prefix as i32,
    }
}

fn aes_gcm(key_size: u32, prefix: OutputPrefixType) -> KeyTemplate {
    template(
        AES_GCM_TYPE_URL,
        &AesGcmKeyFormat {
            key_size,
            version: 0,
        },
        prefix,
    )
}

fn aes_siv(prefix: OutputPrefixType) -> KeyTemplate {
    template(
        AES_SIV_TYPE_URL,
        &AesSivKeyFormat {
            key_size: 64,
            version: 0,
        },
        prefix,
    )
}

fn hmac(key_size: u32, tag_size: u32, hash: HashType) -> KeyTemplate {
    template(
        HMAC_TYPE_URL,
        &HmacKeyFormat {
            params: Some(HmacParams {
                hash: hash as i32,
                tag_size,
            }),
            key_size,
            version: 0,
        },
        OutputPrefixType::Tink,
    )
}

fn hmac_prf(key_size: u32, hash: HashType) -> KeyTemplate {
    template(
        HMAC_PRF_TYPE_URL,
        &HmacPrfKeyFormat {
            params: Some(HmacPrfParams { hash: hash as i32 }),
            key_size,
            version: 0,
        },
        OutputPrefixType::Raw,
    )
}

fn ed25519(prefix: OutputPrefixType) -> KeyTemplate {
    template(ED25519_PRIVATE_KEY_TYPE_URL, &Ed25519KeyFormat { version: 0 }, prefix)
}

fn ecdsa_p256(encoding: EcdsaSignatureEncoding, prefix: OutputPrefixType) -> KeyTemplate {
    template(
        ECDSA_PRIVATE_KEY_TYPE_URL,
        &EcdsaKeyFormat {
            params: Some(EcdsaParams {
                hash_type: HashType::Sha256 as i32,
                curve: EllipticCurveType::NistP256 as i32,
                encoding: encoding as i32,
            }),
            version: 0,
        },
        prefix,
    )
}

fn hpke(aead: HpkeAead, prefix: OutputPrefixType) -> KeyTemplate {
    template(
        HPKE_PRIVATE_KEY_TYPE_URL,
        &HpkeKeyFormat {
            params: Some(HpkeParams {
                kem: HpkeKem::DhkemX25519HkdfSha256 as i32,
                kdf: HpkeKdf::HkdfSha256 as i32,
                aead: aead as i32,
            }),
        },
        prefix,
    )
}

/// Every name accepted by [`named_template`].
pub const TEMPLATE_NAMES: &[&str] = &[
    "AES128_GCM",
    "AES128_GCM_RAW",
    "AES256_GCM",
    "AES256_GCM_RAW",
    "CHACHA20_POLY1305",
    "CHACHA20_POLY1305_RAW",
    "XCHACHA20_POLY1305",
    "XCHACHA20_POLY1305_RAW",
    "AES256_SIV",
    "AES256_SIV_RAW",
    "HMAC_SHA256_128BITTAG",
    "HMAC_SHA256_256BITTAG",
    "HMAC_SHA512_256BITTAG",
    "HMAC_SHA512_512BITTAG",
    "AES_CMAC",
    "HMAC_SHA256_PRF",
    "HMAC_SHA512_PRF",
    "HKDF_SHA256",
    "AES_CMAC_PRF",
    "ED25519",
    "ED25519_RAW",
    "ECDSA_P256",
    "ECDSA_P256_RAW",
    "ECDSA_P256_IEEE_P1363",
    "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_AES_128_GCM",
    "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_AES_128_GCM_RAW",
    "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_AES_256_GCM",
    "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_AES_256_GCM_RAW",
    "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_CHACHA20_POLY1305",
    "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_CHACHA20_POLY1305_RAW",
];

pub fn named_template(name: &str) -> Option<KeyTemplate> {
    use OutputPrefixType::{Raw, Tink};

    let template = match name {
        "AES128_GCM" => aes_gcm(16, Tink),
        "AES128_GCM_RAW" => aes_gcm(16, Raw),
        "AES256_GCM" => aes_gcm(32, Tink),
        "AES256_GCM_RAW" => aes_gcm(32, Raw),
        "CHACHA20_POLY1305" => template(CHACHA20_POLY1305_TYPE_URL, &ChaCha20Poly1305KeyFormat {}, Tink),
        "CHACHA20_POLY1305_RAW" => template(CHACHA20_POLY1305_TYPE_URL, &ChaCha20Poly1305KeyFormat {}, Raw),
        "XCHACHA20_POLY1305" => template(
            XCHACHA20_POLY1305_TYPE_URL,
            &XChaCha20Poly1305KeyFormat { version: 0 },
            Tink,
        ),
        "XCHACHA20_POLY1305_RAW" => template(
            XCHACHA20_POLY1305_TYPE_URL,
            &XChaCha20Poly1305KeyFormat { version: 0 },
            Raw,
        ),
        "AES256_SIV" => aes_siv(Tink),
        "AES256_SIV_RAW" => aes_siv(Raw),
        "HMAC_SHA256_128BITTAG" => hmac(32, 16, HashType::Sha256),
        "HMAC_SHA256_256BITTAG" => hmac(32, 32, HashType::Sha256),
        "HMAC_SHA512_256BITTAG" => hmac(64, 32, HashType::Sha512),
        "HMAC_SHA512_512BITTAG" => hmac(64, 64, HashType::Sha512),
        "AES_CMAC" => template(
            AES_CMAC_TYPE_URL,
            &AesCmacKeyFormat {
                key_size: 32,
                params: Some(AesCmacParams { tag_size: 16 }),
            },
            Tink,
        ),
        "HMAC_SHA256_PRF" => hmac_prf(32, HashType::Sha256),
        "HMAC_SHA512_PRF" => hmac_prf(64, HashType::Sha512),
        "HKDF_SHA256" => template(
            HKDF_PRF_TYPE_URL,
            &HkdfPrfKeyFormat {
                params: Some(HkdfPrfParams {
                    hash: HashType::Sha256 as i32,
                    salt: Vec::new(),
                }),
                key_size: 32,
                version: 0,
            },
            Raw,
        ),
        "AES_CMAC_PRF" => template(
            AES_CMAC_PRF_TYPE_URL,
            &AesCmacPrfKeyFormat {
                version: 0,
                key_size: 32,
            },
            Raw,
        ),
        "ED25519" => ed25519(Tink),
        "ED25519_RAW" => ed25519(Raw),
        "ECDSA_P256" => ecdsa_p256(EcdsaSignatureEncoding::Der, Tink),
        "ECDSA_P256_RAW" => ecdsa_p256(EcdsaSignatureEncoding::IeeeP1363, Raw),
        "ECDSA_P256_IEEE_P1363" => ecdsa_p256(EcdsaSignatureEncoding::IeeeP1363, Tink),
        "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_AES_128_GCM" => hpke(HpkeAead::Aes128Gcm, Tink),
        "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_AES_128_GCM_RAW" => hpke(HpkeAead::Aes128Gcm, Raw),
        "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_AES_256_GCM" => hpke(HpkeAead::Aes256Gcm, Tink),
        "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_AES_256_GCM_RAW" => hpke(HpkeAead::Aes256Gcm, Raw),
        "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_CHACHA20_POLY1305" => {
            hpke(HpkeAead::Chacha20Poly1305, Tink)
        }
        "DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_CHACHA20_POLY1305_RAW" => {
            hpke(HpkeAead::Chacha20Poly1305, Raw)
        }
        _ => return None,
    };
    Some(template)
}

/// Remote AEAD key held entirely in the KMS. RAW, so its ciphertexts are
/// exactly what the KMS produces.
pub fn kms_aead_template(key_uri: &str) -> KeyTemplate {
    template(
        KMS_AEAD_TYPE_URL,
        &KmsAeadKeyFormat {
            key_uri: key_uri.to_string(),
        },
        OutputPrefixType::Raw,
    )
}

/// Envelope encryption with per-message data keys wrapped by `kek_uri`.
pub fn kms_envelope_aead_template(kek_uri: &str, dek_template: KeyTemplate) -> KeyTemplate {
    template(
        KMS_ENVELOPE_AEAD_TYPE_URL,
        &KmsEnvelopeAeadKeyFormat {
            kek_uri: kek_uri.to_string(),
            dek_template: Some(dek_template),
        },
        OutputPrefixType::Raw,
    )
}

/// Deriver that expands `prf_template` keys into keys of `derived_template`.
/// The deriver key takes the derived template's output prefix.
pub fn prf_based_deriver_template(
    prf_template: KeyTemplate,
    derived_template: KeyTemplate,
) -> KeyTemplate {
    let prefix = OutputPrefixType::try_from(derived_template.output_prefix_type)
        .unwrap_or(OutputPrefixType::UnknownPrefix);
    template(
        PRF_BASED_DERIVER_TYPE_URL,
        &PrfBasedDeriverKeyFormat {
            prf_key_template: Some(prf_template),
            params: Some(PrfBasedDeriverParams {
                derived_key_template: Some(derived_template),
            }),
        },
        prefix,
    )
}
