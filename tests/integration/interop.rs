//! Format interop and sign, encrypt round trips over every algorithm and format.

use sigil::crypto::{
    CryptoError,
    extension::CryptoExtension,
    jose::{
        DecryptOptions, EncryptOptions, Header, JWE, JWEEncryption, JWK, JWS, JwsBuilder,
        SignOptions, TokenFormat,
    },
    keystore::{KeyStore, MemoryKeyStore},
    provider::AlgorithmParams,
};

const FORMATS: [TokenFormat; 3] = [TokenFormat::Compact, TokenFormat::Flat, TokenFormat::General];

fn extension() -> CryptoExtension<MemoryKeyStore> {
    CryptoExtension::with_default_factory(MemoryKeyStore::new())
}

/// Generates a key for the algorithm and returns the key to verify with
async fn verification_key(
    extension: &CryptoExtension<MemoryKeyStore>,
    algorithm: &str,
    reference: &str,
) -> JWK {
    match algorithm {
        "HS256" | "HS384" | "HS512" => {
            extension
                .generate_key(algorithm, &AlgorithmParams::SecretKeyGen { length: 64 }, reference)
                .await
                .unwrap();
            extension.key_store().get(reference, true).await.unwrap()
        }
        "RS256" | "PS256" | "PS512" => extension
            .generate_key_pair(
                algorithm,
                &AlgorithmParams::RsaKeyGen { modulus_length: 2048 },
                reference,
            )
            .await
            .unwrap(),
        _ => extension
            .generate_key_pair(algorithm, &AlgorithmParams::None, reference)
            .await
            .unwrap(),
    }
}

#[tokio::test]
async fn sign_verify_every_algorithm_and_format() {
    let extension = extension();
    for algorithm in ["ES256", "ES256K", "RS256", "PS256", "PS512", "HS256", "HS512"] {
        let key = verification_key(&extension, algorithm, algorithm).await;
        for format in FORMATS {
            let token = JWS::sign(
                &extension,
                algorithm,
                b"round trip".as_slice(),
                &SignOptions::new().with_format(format),
            )
            .await
            .unwrap()
            .serialize()
            .unwrap();

            let jws = JWS::parse(&token).unwrap();
            assert_eq!(jws.format(), format, "{algorithm} {format}");
            assert_eq!(jws.payload(), b"round trip");
            assert_eq!(jws.alg(), Some(algorithm));
            assert_eq!(jws.kid(), key.kid());
            assert!(jws.verify(&extension, &[key.clone()]).unwrap(), "{algorithm} {format}");
        }
    }
}

#[tokio::test]
async fn general_to_compact_keeps_payload_and_signature() {
    let extension = extension();
    let key = verification_key(&extension, "ES256", "signer").await;

    let general = JwsBuilder::new(b"interop".as_slice())
        .sign(
            &extension,
            "signer",
            &SignOptions::new()
                .with_algorithm("ES256".to_owned())
                .with_protected(Header::new().with_typ("JWT".to_owned())),
        )
        .await
        .unwrap()
        .build(TokenFormat::General)
        .unwrap()
        .serialize()
        .unwrap();
    assert!(general.contains("\"signatures\""));

    let parsed = JWS::parse(&general).unwrap();
    let compact = parsed.serialize_as(TokenFormat::Compact).unwrap();
    assert_eq!(compact.split('.').count(), 3);

    let reparsed = JWS::parse(&compact).unwrap();
    assert_eq!(reparsed.format(), TokenFormat::Compact);
    assert_eq!(reparsed.payload(), parsed.payload());
    assert_eq!(
        reparsed.signatures()[0].signature(),
        parsed.signatures()[0].signature()
    );
    assert_eq!(reparsed.signatures()[0].protected().typ(), Some("JWT"));
    assert!(reparsed.verify(&extension, &[key]).unwrap());
}

#[tokio::test]
async fn multi_signature_tokens_only_serialize_as_general() {
    let extension = extension();
    let first = verification_key(&extension, "ES256", "first").await;
    let second = verification_key(&extension, "ES256K", "second").await;

    let jws = JwsBuilder::new(b"two signers".as_slice())
        .sign(&extension, "first", &SignOptions::new())
        .await
        .unwrap()
        .sign(&extension, "second", &SignOptions::new())
        .await
        .unwrap()
        .build(TokenFormat::General)
        .unwrap();
    assert_eq!(jws.signatures().len(), 2);

    for format in [TokenFormat::Compact, TokenFormat::Flat] {
        assert!(matches!(jws.serialize_as(format), Err(CryptoError::Other(_))));
    }

    let parsed = JWS::parse(&jws.serialize().unwrap()).unwrap();
    assert!(parsed.verify(&extension, std::slice::from_ref(&first)).unwrap());
    assert!(parsed.verify(&extension, std::slice::from_ref(&second)).unwrap());
}

#[tokio::test]
async fn encrypt_decrypt_every_content_algorithm_and_format() {
    let extension = extension();
    let oaep = extension
        .generate_key_pair(
            "RSA-OAEP",
            &AlgorithmParams::RsaKeyGen { modulus_length: 2048 },
            "oaep",
        )
        .await
        .unwrap();
    let oaep256 = extension
        .generate_key_pair(
            "RSA-OAEP-256",
            &AlgorithmParams::RsaKeyGen { modulus_length: 2048 },
            "oaep256",
        )
        .await
        .unwrap();

    for (reference, key) in [("oaep", &oaep), ("oaep256", &oaep256)] {
        for enc in [JWEEncryption::A128GCM, JWEEncryption::A192GCM, JWEEncryption::A256GCM] {
            for format in FORMATS {
                let token = JWE::encrypt(
                    &extension,
                    std::slice::from_ref(key),
                    b"secret payload",
                    &EncryptOptions::new()
                        .with_content_algorithm(enc)
                        .with_format(format),
                )
                .unwrap()
                .serialize()
                .unwrap();

                let jwe = JWE::parse(&token).unwrap();
                assert_eq!(jwe.format(), format);
                assert_eq!(jwe.enc(), Some(enc.as_str()));
                assert_eq!(jwe.alg(), key.alg());
                let plaintext = jwe
                    .decrypt(&extension, reference, &DecryptOptions::default())
                    .await
                    .unwrap();
                assert_eq!(plaintext.as_slice(), b"secret payload", "{reference} {enc} {format}");
            }
        }
    }
}

#[tokio::test]
async fn modified_tag_fails_decryption() {
    let extension = extension();
    let key = extension
        .generate_key_pair(
            "RSA-OAEP-256",
            &AlgorithmParams::RsaKeyGen { modulus_length: 2048 },
            "inbox",
        )
        .await
        .unwrap();
    let token = JWE::encrypt(
        &extension,
        &[key],
        b"do not touch",
        &EncryptOptions::new().with_format(TokenFormat::Flat),
    )
    .unwrap()
    .serialize()
    .unwrap();

    let mut value: serde_json::Value = serde_json::from_str(&token).unwrap();
    value["tag"] = serde_json::Value::String("AAAAAAAAAAAAAAAAAAAAAA".to_owned());
    let forged = JWE::parse(&value.to_string()).unwrap();
    assert!(matches!(
        forged
            .decrypt(&extension, "inbox", &DecryptOptions::default())
            .await,
        Err(CryptoError::DecryptionFailure(_))
    ));

    let mut value: serde_json::Value = serde_json::from_str(&token).unwrap();
    value["protected"] = serde_json::Value::String(
        // {"alg":"RSA-OAEP-256","enc":"A256GCM","typ":"x"}
        "eyJhbGciOiJSU0EtT0FFUC0yNTYiLCJlbmMiOiJBMjU2R0NNIiwidHlwIjoieCJ9".to_owned(),
    );
    let forged = JWE::parse(&value.to_string()).unwrap();
    assert!(matches!(
        forged
            .decrypt(&extension, "inbox", &DecryptOptions::default())
            .await,
        Err(CryptoError::DecryptionFailure(_))
    ));
}
