//! Outputs of one server instance must be accepted by, or identical to,
//! those of another.

use crate::test_utils::{annotated, TestServer};
use crosscheck_crypto::keyset::templates::{named_template, prf_based_deriver_template};
use crosscheck_testing_server::proto::aead_client::AeadClient;
use crosscheck_testing_server::proto::deterministic_aead_client::DeterministicAeadClient;
use crosscheck_testing_server::proto::hybrid_client::HybridClient;
use crosscheck_testing_server::proto::keyset_client::KeysetClient;
use crosscheck_testing_server::proto::keyset_deriver_client::KeysetDeriverClient;
use crosscheck_testing_server::proto::mac_client::MacClient;
use crosscheck_testing_server::proto::prf_set_client::PrfSetClient;
use crosscheck_testing_server::proto::signature_client::SignatureClient;
use crosscheck_testing_server::proto::*;
use prost::Message;

#[tokio::test]
async fn test_aead_ciphertext_decrypts_on_other_instance() {
    let a = TestServer::start().await;
    let b = TestServer::start().await;

    for name in ["AES128_GCM", "AES256_GCM_RAW", "CHACHA20_POLY1305", "XCHACHA20_POLY1305"] {
        let keyset = a.generate(name).await;
        let mut client_a = AeadClient::connect(a.url.clone()).await.unwrap();
        let mut client_b = AeadClient::connect(b.url.clone()).await.unwrap();

        let ciphertext = match client_a
            .encrypt(AeadEncryptRequest {
                annotated_keyset: annotated(&keyset),
                plaintext: b"cross instance".to_vec(),
                associated_data: b"aad".to_vec(),
            })
            .await
            .unwrap()
            .into_inner()
            .result
        {
            Some(aead_encrypt_response::Result::Ciphertext(ct)) => ct,
            other => panic!("{}: encrypt failed: {:?}", name, other),
        };

        let decrypted = client_b
            .decrypt(AeadDecryptRequest {
                annotated_keyset: annotated(&keyset),
                ciphertext,
                associated_data: b"aad".to_vec(),
            })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(
            decrypted.result,
            Some(aead_decrypt_response::Result::Plaintext(
                b"cross instance".to_vec()
            )),
            "{}",
            name
        );
    }
}

#[tokio::test]
async fn test_deterministic_ciphertexts_match() {
    let a = TestServer::start().await;
    let b = TestServer::start().await;
    let keyset = a.generate("AES256_SIV").await;

    let mut ciphertexts = Vec::new();
    for server in [&a, &b] {
        let mut client = DeterministicAeadClient::connect(server.url.clone())
            .await
            .unwrap();
        let response = client
            .encrypt_deterministically(DeterministicAeadEncryptRequest {
                annotated_keyset: annotated(&keyset),
                plaintext: b"same input".to_vec(),
                associated_data: b"same ad".to_vec(),
            })
            .await
            .unwrap()
            .into_inner();
        match response.result {
            Some(deterministic_aead_encrypt_response::Result::Ciphertext(ct)) => {
                ciphertexts.push(ct)
            }
            other => panic!("encrypt failed: {:?}", other),
        }
    }
    assert_eq!(hex::encode(&ciphertexts[0]), hex::encode(&ciphertexts[1]));
}

#[tokio::test]
async fn test_derived_keysets_are_identical() {
    let a = TestServer::start().await;
    let b = TestServer::start().await;

    let template = prf_based_deriver_template(
        named_template("HKDF_SHA256").unwrap(),
        named_template("AES128_GCM").unwrap(),
    );
    let mut keysets = KeysetClient::connect(a.url.clone()).await.unwrap();
    let deriver_keyset = match keysets
        .generate(KeysetGenerateRequest {
            template: template.encode_to_vec(),
        })
        .await
        .unwrap()
        .into_inner()
        .result
    {
        Some(keyset_generate_response::Result::Keyset(keyset)) => keyset,
        other => panic!("generate failed: {:?}", other),
    };

    let mut derived = Vec::new();
    for server in [&a, &b] {
        let mut client = KeysetDeriverClient::connect(server.url.clone()).await.unwrap();
        let response = client
            .derive_keyset(DeriveKeysetRequest {
                annotated_keyset: annotated(&deriver_keyset),
                salt: b"shared salt".to_vec(),
            })
            .await
            .unwrap()
            .into_inner();
        match response.result {
            Some(derive_keyset_response::Result::DerivedKeyset(keyset)) => derived.push(keyset),
            other => panic!("derive failed: {:?}", other),
        }
    }
    assert_eq!(derived[0], derived[1]);

    // A keyset derived on one instance encrypts for the other.
    let mut aead_a = AeadClient::connect(a.url.clone()).await.unwrap();
    let mut aead_b = AeadClient::connect(b.url.clone()).await.unwrap();
    let Some(aead_encrypt_response::Result::Ciphertext(ciphertext)) = aead_a
        .encrypt(AeadEncryptRequest {
            annotated_keyset: annotated(&derived[0]),
            plaintext: b"derived".to_vec(),
            associated_data: Vec::new(),
        })
        .await
        .unwrap()
        .into_inner()
        .result
    else {
        panic!("encrypt with derived keyset failed");
    };
    let decrypted = aead_b
        .decrypt(AeadDecryptRequest {
            annotated_keyset: annotated(&derived[1]),
            ciphertext,
            associated_data: Vec::new(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(
        decrypted.result,
        Some(aead_decrypt_response::Result::Plaintext(b"derived".to_vec()))
    );
}

#[tokio::test]
async fn test_signatures_and_macs_verify_across_instances() {
    let a = TestServer::start().await;
    let b = TestServer::start().await;

    let private = a.generate("ED25519").await;
    let public = b.public(private.clone()).await;
    let mut signer = SignatureClient::connect(a.url.clone()).await.unwrap();
    let mut verifier = SignatureClient::connect(b.url.clone()).await.unwrap();
    let Some(signature_sign_response::Result::Signature(signature)) = signer
        .sign(SignatureSignRequest {
            private_annotated_keyset: annotated(&private),
            data: b"message".to_vec(),
        })
        .await
        .unwrap()
        .into_inner()
        .result
    else {
        panic!("sign failed");
    };
    let verified = verifier
        .verify(SignatureVerifyRequest {
            public_annotated_keyset: annotated(&public),
            signature,
            data: b"message".to_vec(),
        })
        .await
        .unwrap()
        .into_inner();
    assert!(verified.err.is_empty(), "{}", verified.err);

    let mac_keyset = b.generate("HMAC_SHA256_256BITTAG").await;
    let mut mac_a = MacClient::connect(a.url.clone()).await.unwrap();
    let mut mac_b = MacClient::connect(b.url.clone()).await.unwrap();
    let Some(compute_mac_response::Result::MacValue(mac_value)) = mac_b
        .compute_mac(ComputeMacRequest {
            annotated_keyset: annotated(&mac_keyset),
            data: b"data".to_vec(),
        })
        .await
        .unwrap()
        .into_inner()
        .result
    else {
        panic!("compute_mac failed");
    };
    let verified = mac_a
        .verify_mac(VerifyMacRequest {
            annotated_keyset: annotated(&mac_keyset),
            mac_value,
            data: b"data".to_vec(),
        })
        .await
        .unwrap()
        .into_inner();
    assert!(verified.err.is_empty(), "{}", verified.err);
}

#[tokio::test]
async fn test_hybrid_and_prf_agree_across_instances() {
    let a = TestServer::start().await;
    let b = TestServer::start().await;

    let private = a.generate("DHKEM_X25519_HKDF_SHA256_HKDF_SHA256_AES_256_GCM").await;
    let public = a.public(private.clone()).await;
    let mut encrypter = HybridClient::connect(b.url.clone()).await.unwrap();
    let mut decrypter = HybridClient::connect(a.url.clone()).await.unwrap();
    let Some(hybrid_encrypt_response::Result::Ciphertext(ciphertext)) = encrypter
        .encrypt(HybridEncryptRequest {
            public_annotated_keyset: annotated(&public),
            plaintext: b"hpke".to_vec(),
            context_info: b"ctx".to_vec(),
        })
        .await
        .unwrap()
        .into_inner()
        .result
    else {
        panic!("hybrid encrypt failed");
    };
    let decrypted = decrypter
        .decrypt(HybridDecryptRequest {
            private_annotated_keyset: annotated(&private),
            ciphertext,
            context_info: b"ctx".to_vec(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(
        decrypted.result,
        Some(hybrid_decrypt_response::Result::Plaintext(b"hpke".to_vec()))
    );

    let prf_keyset = a.generate("HMAC_SHA512_PRF").await;
    let mut outputs = Vec::new();
    for server in [&a, &b] {
        let mut client = PrfSetClient::connect(server.url.clone()).await.unwrap();
        let Some(prf_set_key_ids_response::Result::Output(ids)) = client
            .key_ids(PrfSetKeyIdsRequest {
                annotated_keyset: annotated(&prf_keyset),
            })
            .await
            .unwrap()
            .into_inner()
            .result
        else {
            panic!("key_ids failed");
        };
        let response = client
            .compute(PrfSetComputeRequest {
                annotated_keyset: annotated(&prf_keyset),
                key_id: ids.primary_key_id,
                input_data: b"input".to_vec(),
                output_length: 48,
            })
            .await
            .unwrap()
            .into_inner();
        match response.result {
            Some(prf_set_compute_response::Result::Output(output)) => outputs.push(output),
            other => panic!("compute failed: {:?}", other),
        }
    }
    assert_eq!(outputs[0].len(), 48);
    assert_eq!(outputs[0], outputs[1]);
}
