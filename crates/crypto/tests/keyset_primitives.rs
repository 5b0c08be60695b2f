//! Keyset-level behaviour: key rotation, output prefixes and family checks.

use crosscheck_crypto::keyset::templates::{
    kms_envelope_aead_template, named_template, prf_based_deriver_template,
};
use crosscheck_crypto::aead::AES_GCM_TYPE_URL;
use crosscheck_crypto::daead::AES_SIV_TYPE_URL;
use crosscheck_crypto::keyderivation::PRF_BASED_DERIVER_TYPE_URL;
use crosscheck_crypto::prf::HKDF_PRF_TYPE_URL;
use crosscheck_crypto::proto::key_data::KeyMaterialType;
use crosscheck_crypto::proto::{
    keyset, AesGcmKey, AesSivKey, HashType, HkdfPrfKey, HkdfPrfParams, KeyData, KeyStatusType,
    Keyset, OutputPrefixType, PrfBasedDeriverKey, PrfBasedDeriverParams,
};
use crosscheck_crypto::{
    FakeKmsClient, KeyManagerRegistry, KeysetHandle, KmsClientRegistry, Primitive, PrimitiveKind,
};
use prost::Message;
use std::sync::Arc;

fn generate(name: &str) -> KeysetHandle {
    KeysetHandle::generate(&named_template(name).unwrap(), &KeyManagerRegistry::local()).unwrap()
}

/// Merges the single-key keysets into one, primary taken from `primary`.
fn merge(handles: &[&KeysetHandle], primary: usize) -> KeysetHandle {
    let keys: Vec<keyset::Key> = handles
        .iter()
        .flat_map(|h| h.keys().iter().cloned())
        .collect();
    KeysetHandle::from_keyset(Keyset {
        primary_key_id: handles[primary].primary_key_id(),
        key: keys,
    })
    .unwrap()
}

fn with_prefix(handle: &KeysetHandle, prefix: OutputPrefixType) -> KeysetHandle {
    let mut keyset = handle.keyset().clone();
    keyset.key[0].output_prefix_type = prefix as i32;
    KeysetHandle::from_keyset(keyset).unwrap()
}

fn aead(handle: &KeysetHandle) -> Box<dyn crosscheck_crypto::Aead> {
    match handle
        .primitive(PrimitiveKind::Aead, &KeyManagerRegistry::local())
        .unwrap()
    {
        Primitive::Aead(aead) => aead,
        other => panic!("unexpected {:?}", other),
    }
}

fn mac(handle: &KeysetHandle) -> Box<dyn crosscheck_crypto::Mac> {
    match handle
        .primitive(PrimitiveKind::Mac, &KeyManagerRegistry::local())
        .unwrap()
    {
        Primitive::Mac(mac) => mac,
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_tink_prefix_carries_primary_key_id() {
    let handle = generate("AES128_GCM");
    let ciphertext = aead(&handle).encrypt(b"msg", b"").unwrap();
    assert_eq!(ciphertext[0], 0x01);
    assert_eq!(&ciphertext[1..5], &handle.primary_key_id().to_be_bytes());
}

#[test]
fn test_raw_keys_have_no_prefix() {
    let handle = generate("AES128_GCM_RAW");
    let ciphertext = aead(&handle).encrypt(b"msg", b"").unwrap();
    assert_eq!(ciphertext.len(), 12 + 3 + 16);
}

#[test]
fn test_rotation_old_ciphertexts_still_decrypt() {
    let old = generate("AES128_GCM");
    let new = generate("AES256_GCM");
    let old_ciphertext = aead(&old).encrypt(b"before rotation", b"ad").unwrap();

    let rotated = merge(&[&old, &new], 1);
    let rotated_aead = aead(&rotated);
    assert_eq!(
        rotated_aead.decrypt(&old_ciphertext, b"ad").unwrap(),
        b"before rotation"
    );
    let new_ciphertext = rotated_aead.encrypt(b"after", b"ad").unwrap();
    assert_eq!(&new_ciphertext[1..5], &new.primary_key_id().to_be_bytes());
    assert!(aead(&old).decrypt(&new_ciphertext, b"ad").is_err());
}

#[test]
fn test_raw_key_decrypts_after_prefixed_keys_fail() {
    let raw = generate("AES128_GCM_RAW");
    let tink = generate("AES128_GCM");
    let raw_ciphertext = aead(&raw).encrypt(b"raw", b"").unwrap();
    let combined = merge(&[&tink, &raw], 0);
    assert_eq!(aead(&combined).decrypt(&raw_ciphertext, b"").unwrap(), b"raw");
}

#[test]
fn test_disabled_keys_are_not_used_for_decryption() {
    let old = generate("AES128_GCM");
    let new = generate("AES128_GCM");
    let old_ciphertext = aead(&old).encrypt(b"x", b"").unwrap();

    let mut keyset = merge(&[&old, &new], 1).keyset().clone();
    keyset.key[0].status = KeyStatusType::Disabled as i32;
    let handle = KeysetHandle::from_keyset(keyset).unwrap();
    assert!(aead(&handle).decrypt(&old_ciphertext, b"").is_err());
}

#[test]
fn test_legacy_mac_authenticates_suffixed_data() {
    let tink = generate("HMAC_SHA256_128BITTAG");
    let legacy = with_prefix(&tink, OutputPrefixType::Legacy);
    let raw = with_prefix(&tink, OutputPrefixType::Raw);

    let legacy_tag = mac(&legacy).compute_mac(b"data").unwrap();
    assert_eq!(legacy_tag[0], 0x00);
    let mut suffixed = b"data".to_vec();
    suffixed.push(0);
    assert_eq!(&legacy_tag[5..], mac(&raw).compute_mac(&suffixed).unwrap().as_slice());
    assert!(mac(&legacy).verify_mac(&legacy_tag, b"data").is_ok());
}

#[test]
fn test_crunchy_uses_legacy_start_byte_without_suffix() {
    let tink = generate("HMAC_SHA256_128BITTAG");
    let crunchy = with_prefix(&tink, OutputPrefixType::Crunchy);
    let raw = with_prefix(&tink, OutputPrefixType::Raw);
    let tag = mac(&crunchy).compute_mac(b"data").unwrap();
    assert_eq!(tag[0], 0x00);
    assert_eq!(&tag[5..], mac(&raw).compute_mac(b"data").unwrap().as_slice());
}

#[test]
fn test_mixed_family_keyset_fails_to_build() {
    let combined = merge(&[&generate("AES128_GCM"), &generate("HMAC_SHA256_128BITTAG")], 0);
    let registry = KeyManagerRegistry::local();
    assert!(combined.primitive(PrimitiveKind::Aead, &registry).is_err());
    assert!(combined.primitive(PrimitiveKind::Mac, &registry).is_err());
}

#[test]
fn test_wrong_family_fails_to_build() {
    let registry = KeyManagerRegistry::local();
    assert!(generate("AES256_SIV")
        .primitive(PrimitiveKind::Aead, &registry)
        .is_err());
    assert!(generate("ED25519")
        .primitive(PrimitiveKind::Verifier, &registry)
        .is_err());
}

#[test]
fn test_signature_keyset_roundtrip_through_public_handle() {
    let registry = KeyManagerRegistry::local();
    for name in ["ED25519", "ECDSA_P256", "ECDSA_P256_RAW"] {
        let private = generate(name);
        let public = private.public_handle(&registry).unwrap();
        let Primitive::Signer(signer) = private.primitive(PrimitiveKind::Signer, &registry).unwrap() else {
            panic!("expected signer");
        };
        let Primitive::Verifier(verifier) = public.primitive(PrimitiveKind::Verifier, &registry).unwrap() else {
            panic!("expected verifier");
        };
        let signature = signer.sign(b"message").unwrap();
        assert!(verifier.verify(&signature, b"message").is_ok(), "{}", name);
        assert!(verifier.verify(&signature, b"massage").is_err(), "{}", name);
    }
}

#[test]
fn test_hybrid_keyset_roundtrip() {
    let registry = KeyManagerRegistry::local();
    let private = generate("DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_AES_128_GCM");
    let public = private.public_handle(&registry).unwrap();
    let Primitive::HybridEncrypt(encrypt) = public.primitive(PrimitiveKind::HybridEncrypt, &registry).unwrap() else {
        panic!("expected hybrid encrypt");
    };
    let Primitive::HybridDecrypt(decrypt) = private.primitive(PrimitiveKind::HybridDecrypt, &registry).unwrap() else {
        panic!("expected hybrid decrypt");
    };
    let ciphertext = encrypt.encrypt(b"plaintext", b"info").unwrap();
    assert_eq!(decrypt.decrypt(&ciphertext, b"info").unwrap(), b"plaintext");
}

#[test]
fn test_prf_set_exposes_every_enabled_key() {
    let registry = KeyManagerRegistry::local();
    let first = generate("HMAC_SHA256_PRF");
    let second = generate("HKDF_SHA256");
    let combined = merge(&[&first, &second], 1);
    let Primitive::PrfSet(prf_set) = combined.primitive(PrimitiveKind::PrfSet, &registry).unwrap() else {
        panic!("expected PRF set");
    };
    assert_eq!(prf_set.primary_id(), second.primary_key_id());
    assert_eq!(
        prf_set.key_ids(),
        vec![first.primary_key_id(), second.primary_key_id()]
    );
    let output = prf_set
        .get(first.primary_key_id())
        .unwrap()
        .compute(b"input", 16)
        .unwrap();
    assert_eq!(output.len(), 16);
    let unknown = first.primary_key_id() ^ second.primary_key_id() ^ 1;
    if unknown != first.primary_key_id() && unknown != second.primary_key_id() {
        assert!(prf_set.get(unknown).is_none());
    }
}

#[test]
fn test_prf_set_rejects_prefixed_keys() {
    let registry = KeyManagerRegistry::local();
    let tink = with_prefix(&generate("HMAC_SHA256_PRF"), OutputPrefixType::Tink);
    assert!(tink.primitive(PrimitiveKind::PrfSet, &registry).is_err());
}

#[test]
fn test_derived_keysets_are_reproducible_and_keep_ids() {
    let registry = KeyManagerRegistry::local();
    let template = prf_based_deriver_template(
        named_template("HKDF_SHA256").unwrap(),
        named_template("AES128_GCM").unwrap(),
    );
    let deriver_handle = KeysetHandle::generate(&template, &registry).unwrap();
    let Primitive::KeysetDeriver(deriver) = deriver_handle
        .primitive(PrimitiveKind::KeysetDeriver, &registry)
        .unwrap()
    else {
        panic!("expected keyset deriver");
    };

    let first = deriver.derive_keyset(b"salt").unwrap();
    let second = deriver.derive_keyset(b"salt").unwrap();
    let other = deriver.derive_keyset(b"pepper").unwrap();
    assert_eq!(first.serialize(), second.serialize());
    assert_ne!(first.serialize(), other.serialize());
    assert_eq!(first.primary_key_id(), deriver_handle.primary_key_id());
    assert_eq!(first.keys()[0].output_prefix_type(), OutputPrefixType::Tink);

    let derived_aead = aead(&first);
    let ciphertext = derived_aead.encrypt(b"x", b"").unwrap();
    assert_eq!(aead(&second).decrypt(&ciphertext, b"").unwrap(), b"x");
}

/// Deriver keyset with a fixed HKDF-SHA256 PRF key: ikm `00..1f`, salt
/// parameter `salt-param`.
fn fixed_deriver(derived_template: &str) -> KeysetHandle {
    let prf_key = HkdfPrfKey {
        version: 0,
        params: Some(HkdfPrfParams {
            hash: HashType::Sha256 as i32,
            salt: b"salt-param".to_vec(),
        }),
        key_value: (0u8..32).collect(),
    };
    let deriver_key = PrfBasedDeriverKey {
        version: 0,
        prf_key: Some(KeyData {
            type_url: HKDF_PRF_TYPE_URL.to_string(),
            value: prf_key.encode_to_vec(),
            key_material_type: KeyMaterialType::Symmetric as i32,
        }),
        params: Some(PrfBasedDeriverParams {
            derived_key_template: Some(named_template(derived_template).unwrap()),
        }),
    };
    KeysetHandle::from_keyset(Keyset {
        primary_key_id: 42,
        key: vec![keyset::Key {
            key_data: Some(KeyData {
                type_url: PRF_BASED_DERIVER_TYPE_URL.to_string(),
                value: deriver_key.encode_to_vec(),
                key_material_type: KeyMaterialType::Symmetric as i32,
            }),
            status: KeyStatusType::Enabled as i32,
            key_id: 42,
            output_prefix_type: OutputPrefixType::Tink as i32,
        }],
    })
    .unwrap()
}

fn derive(deriver_handle: &KeysetHandle, salt: &[u8]) -> KeysetHandle {
    let Primitive::KeysetDeriver(deriver) = deriver_handle
        .primitive(PrimitiveKind::KeysetDeriver, &KeyManagerRegistry::local())
        .unwrap()
    else {
        panic!("expected keyset deriver");
    };
    deriver.derive_keyset(salt).unwrap()
}

// Expected key bytes are HKDF-SHA256(ikm, salt = "salt-param", info = <salt>)
// truncated to the derived key size, from an independent HKDF implementation.
#[test]
fn test_derived_aes128_gcm_key_matches_hkdf_output() {
    let derived = derive(&fixed_deriver("AES128_GCM"), b"salt");
    let key = &derived.keys()[0];
    assert_eq!(key.key_id, 42);
    let key_data = key.key_data.as_ref().unwrap();
    assert_eq!(key_data.type_url, AES_GCM_TYPE_URL);
    let aes_key = AesGcmKey::decode(key_data.value.as_slice()).unwrap();
    assert_eq!(hex::encode(aes_key.key_value), "dccef9abdcb765394d7d62abb5ea2d0f");

    let other = derive(&fixed_deriver("AES128_GCM"), b"other salt");
    let other_key =
        AesGcmKey::decode(other.keys()[0].key_data.as_ref().unwrap().value.as_slice()).unwrap();
    assert_eq!(hex::encode(other_key.key_value), "9ea1dc333fbdc1e05debac4ada7dcaea");
}

#[test]
fn test_derived_aes_siv_key_matches_hkdf_output() {
    let derived = derive(&fixed_deriver("AES256_SIV"), b"salt");
    let key_data = derived.keys()[0].key_data.as_ref().unwrap();
    assert_eq!(key_data.type_url, AES_SIV_TYPE_URL);
    let siv_key = AesSivKey::decode(key_data.value.as_slice()).unwrap();
    assert_eq!(
        hex::encode(siv_key.key_value),
        "dccef9abdcb765394d7d62abb5ea2d0f50739d0e05c1a082174172668b1da8c3\
         41b37d19eb45662bcebe0946a86508392fe3df60aae68a27f0ad0c15578d5a42"
    );
}

#[test]
fn test_deriver_rejects_non_derivable_template() {
    let registry = KeyManagerRegistry::local();
    let template = prf_based_deriver_template(
        named_template("HKDF_SHA256").unwrap(),
        named_template("ECDSA_P256").unwrap(),
    );
    assert!(KeysetHandle::generate(&template, &registry).is_err());
}

#[test]
fn test_envelope_aead_through_fake_kms() {
    let mut kms = KmsClientRegistry::new();
    kms.register(FakeKmsClient::new());
    let registry = KeyManagerRegistry::new(Arc::new(kms));

    let kek_uri = FakeKmsClient::new_key_uri().unwrap();
    let template = kms_envelope_aead_template(&kek_uri, named_template("AES128_GCM").unwrap());
    let handle = KeysetHandle::generate(&template, &registry).unwrap();
    let Primitive::Aead(envelope) = handle.primitive(PrimitiveKind::Aead, &registry).unwrap() else {
        panic!("expected AEAD");
    };
    let ciphertext = envelope.encrypt(b"secret", b"ad").unwrap();
    assert_eq!(envelope.decrypt(&ciphertext, b"ad").unwrap(), b"secret");

    // The same keyset without a KMS client cannot be used.
    assert!(handle
        .primitive(PrimitiveKind::Aead, &KeyManagerRegistry::local())
        .is_err());
}
