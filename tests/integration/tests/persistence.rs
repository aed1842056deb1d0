//! Integration test: agents backed by RocksDB across restarts, and key
//! custody under the wrong KMS secret.

use std::sync::Arc;

use serde_json::json;
use tessera_core::CredentialPayload;
use tessera_credentials::{CredentialError, EthereumEip712Signature2021, DEFAULT_ALIAS};
use tessera_crypto::SecretBox;
use tessera_identity::IdentityError;
use tessera_integration_tests::{agent_with_secret, mock_chain};
use tessera_store::{migrations, RocksStore};

fn payload() -> CredentialPayload {
    CredentialPayload {
        credential_type: Vec::new(),
        credential_subject: json!({"id": "did:web:example.com", "you": "Rock"})
            .as_object()
            .cloned()
            .unwrap(),
        credential_status: None,
    }
}

#[tokio::test]
async fn test_identifiers_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let chain = mock_chain().await;
    let secret = SecretBox::generate_secret();

    let (did, first_vc) = {
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        assert_eq!(store.schema_version().unwrap(), migrations::latest_version());
        let agent = agent_with_secret(&chain, store, &secret);
        let identifier = agent.ensure_default_identifier().await.unwrap();
        agent
            .create_identifier(Some("ed"), Some("did:key"))
            .await
            .unwrap();
        let vc = agent
            .issue_credential(payload(), DEFAULT_ALIAS, EthereumEip712Signature2021::TYPE)
            .await
            .unwrap();
        (identifier.did, vc)
    };

    let store = Arc::new(RocksStore::open(dir.path()).unwrap());
    let agent = agent_with_secret(&chain, store, &secret);
    let identifier = agent.ensure_default_identifier().await.unwrap();
    assert_eq!(identifier.did, did);

    let all = agent.identifiers().await.unwrap();
    let aliases: Vec<_> = all.iter().filter_map(|i| i.alias.as_deref()).collect();
    assert_eq!(aliases, vec![DEFAULT_ALIAS, "ed"]);

    // The reopened agent still signs with the persisted key.
    let vc = agent
        .issue_credential(payload(), DEFAULT_ALIAS, EthereumEip712Signature2021::TYPE)
        .await
        .unwrap();
    assert_eq!(vc.proof().unwrap().verification_method, first_vc.proof().unwrap().verification_method);
    assert!(agent.verify_credential(&first_vc).await.unwrap().signature_valid);
    assert!(agent.verify_credential(&vc).await.unwrap().signature_valid);
}

#[tokio::test]
async fn test_wrong_secret_cannot_sign() {
    let dir = tempfile::tempdir().unwrap();
    let chain = mock_chain().await;

    {
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let agent = agent_with_secret(&chain, store, &SecretBox::generate_secret());
        agent.ensure_default_identifier().await.unwrap();
    }

    let store = Arc::new(RocksStore::open(dir.path()).unwrap());
    let agent = agent_with_secret(&chain, store, &SecretBox::generate_secret());
    // Lookups need no private key.
    agent.ensure_default_identifier().await.unwrap();
    let err = agent
        .issue_credential(payload(), DEFAULT_ALIAS, EthereumEip712Signature2021::TYPE)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            CredentialError::Identity(IdentityError::DecryptionFailed { .. })
        ),
        "{}",
        err
    );
}
