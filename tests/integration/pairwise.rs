use std::collections::HashSet;

use sigil::crypto::{
    extension::CryptoExtension,
    jose::{JWS, SignOptions, TokenFormat},
    keystore::{KeyStore, MemoryKeyStore},
    pairwise::PairwiseKeyGenerator,
    provider::AlgorithmParams,
};

async fn generator() -> PairwiseKeyGenerator<MemoryKeyStore> {
    let extension = CryptoExtension::with_default_factory(MemoryKeyStore::new());
    extension
        .generate_key("HS512", &AlgorithmParams::SecretKeyGen { length: 64 }, "seed")
        .await
        .unwrap();
    PairwiseKeyGenerator::new(extension)
}

#[tokio::test]
async fn pairwise_key_signs_for_its_peer() {
    let generator = generator().await;
    let pair = generator
        .generate("seed", "did:example:alice", "https://rp.example.com", "ES256K")
        .await
        .unwrap();

    let extension = generator.extension();
    extension
        .key_store()
        .save("alice@rp", pair.private.clone())
        .await
        .unwrap();
    let token = JWS::sign(
        extension,
        "alice@rp",
        b"{\"sub\":\"alice\"}".as_slice(),
        &SignOptions::new().with_format(TokenFormat::Flat),
    )
    .await
    .unwrap()
    .serialize()
    .unwrap();

    let jws = JWS::parse(&token).unwrap();
    assert_eq!(jws.kid(), pair.public.kid());
    assert!(jws.verify(extension, &[pair.public.clone()]).unwrap());

    let other = generator
        .generate("seed", "did:example:alice", "https://other.example.com", "ES256K")
        .await
        .unwrap();
    assert!(!jws.verify_with_key(extension, &other.public).unwrap());
}

#[tokio::test]
async fn one_persona_many_peers() {
    let generator = generator().await;
    let mut kids = HashSet::new();
    for peer in 0..1000 {
        let pair = generator
            .generate("seed", "did:example:alice", &format!("https://rp{peer}.example.com"), "ES256")
            .await
            .unwrap();
        assert!(kids.insert(pair.public.kid().unwrap().to_owned()));
    }
    assert_eq!(kids.len(), 1000);

    let again = generator
        .generate("seed", "did:example:alice", "https://rp42.example.com", "ES256")
        .await
        .unwrap();
    assert!(kids.contains(again.public.kid().unwrap()));
}
