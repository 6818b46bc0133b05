use sigil::{
    crypto::{
        extension::CryptoExtension,
        jose::{JWS, SignOptions},
        keystore::MemoryKeyStore,
        provider::AlgorithmParams,
    },
    telemetry::tracing::{
        self,
        subscriber::{EnvFilter, fmt, util::SubscriberInitExt},
    },
};
use tracing_test::traced_test;

#[tokio::test]
async fn crypto_events_reach_a_facade_subscriber() {
    let subscriber = fmt()
        .with_env_filter(EnvFilter::new("sigil_crypto=trace"))
        .with_test_writer()
        .finish();
    let _guard = subscriber.set_default();

    let extension = CryptoExtension::with_default_factory(MemoryKeyStore::new());
    let public = extension
        .generate_key_pair("ES256", &AlgorithmParams::None, "signing")
        .await
        .unwrap();
    let jws = JWS::sign(&extension, "signing", b"traced".as_slice(), &SignOptions::new())
        .await
        .unwrap();
    assert!(jws.verify(&extension, &[public]).unwrap());
}

#[tokio::test]
#[traced_test]
async fn facade_reexports_tracing_macros() {
    let extension = CryptoExtension::with_default_factory(MemoryKeyStore::new());
    let public = extension
        .generate_key_pair("ES256K", &AlgorithmParams::None, "signing")
        .await
        .unwrap();
    tracing::info!(kid = public.kid(), "generated signing key");
    assert!(logs_contain("generated signing key"));
    assert!(!logs_contain("\"d\""));
}
