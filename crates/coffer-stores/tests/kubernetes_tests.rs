//! Kubernetes adapter and replication over the in-memory Secrets API

mod common;

use common::{kube_data, kube_manager, props};
use coffer_core::{ErrorKind, SecretManager, SecretValue, REPLICATE_TO_ANNOTATION};
use coffer_stores::kubernetes::{SecretObject, SecretObjectApi};

async fn seed(manager: &common::KubeManager, namespace: &str, name: &str, pairs: &[(&str, &str)]) {
    let mut object = SecretObject::new(namespace, name);
    for (k, v) in pairs {
        object.data.insert(k.to_string(), v.as_bytes().to_vec());
    }
    manager.api().create(namespace, &object).await.unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Writes
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn sequential_writes_overlay_data() {
    let manager = kube_manager();
    manager
        .set_secret("ns-a", "app", &SecretValue::from_properties([("a", "1"), ("b", "1")]))
        .await
        .unwrap();
    manager
        .set_secret("ns-a", "app", &SecretValue::from_properties([("b", "2"), ("c", "3")]))
        .await
        .unwrap();

    assert_eq!(
        kube_data(&manager, "ns-a", "app").await.unwrap(),
        props(&[("a", "1"), ("b", "2"), ("c", "3")])
    );
}

#[tokio::test]
async fn metadata_is_overlaid_and_type_defaults_to_opaque() {
    let manager = kube_manager();
    let first = SecretValue::from_properties([("k", "v")])
        .with_label("team", "payments")
        .with_annotation("owner", "alice");
    manager.set_secret("ns-a", "app", &first).await.unwrap();

    let second = SecretValue::from_properties([("k2", "v2")]).with_label("tier", "backend");
    manager.set_secret("ns-a", "app", &second).await.unwrap();

    let object = manager.api().object("ns-a", "app").await.unwrap();
    assert_eq!(object.secret_type.as_deref(), Some("Opaque"));
    assert_eq!(
        object.metadata.labels,
        props(&[("team", "payments"), ("tier", "backend")])
    );
    assert_eq!(object.metadata.annotations, props(&[("owner", "alice")]));
}

#[tokio::test]
async fn read_whole_secret_and_single_key() {
    let manager = kube_manager();
    manager
        .set_secret("ns-a", "db", &SecretValue::from_properties([("user", "admin")]))
        .await
        .unwrap();

    assert_eq!(manager.get_secret("ns-a", "db", Some("user")).await.unwrap(), "admin");
    assert_eq!(
        manager.get_secret("ns-a", "db", None).await.unwrap(),
        r#"{"user":"admin"}"#
    );
    let err = manager.get_secret("ns-a", "db", Some("port")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn label_only_write_keeps_data() {
    let manager = kube_manager();
    seed(&manager, "ns-a", "cfg", &[("y", "keep")]).await;

    let value = SecretValue::default().with_label("team", "a");
    manager.set_secret("ns-a", "cfg", &value).await.unwrap();

    let object = manager.api().object("ns-a", "cfg").await.unwrap();
    assert_eq!(object.property_map().unwrap(), props(&[("y", "keep")]));
    assert_eq!(object.metadata.labels, props(&[("team", "a")]));
}

#[tokio::test]
async fn flat_json_write_overlays_existing_keys() {
    let manager = kube_manager();
    seed(&manager, "ns-a", "cfg", &[("y", "keep")]).await;

    manager
        .set_secret("ns-a", "cfg", &SecretValue::flat(r#"{"x":"1"}"#))
        .await
        .unwrap();
    assert_eq!(
        kube_data(&manager, "ns-a", "cfg").await.unwrap(),
        props(&[("x", "1"), ("y", "keep")])
    );

    let replace = SecretValue::flat(r#"{"z":"2"}"#).with_overwrite(true);
    manager.set_secret("ns-a", "cfg", &replace).await.unwrap();
    assert_eq!(kube_data(&manager, "ns-a", "cfg").await.unwrap(), props(&[("z", "2")]));
}

#[tokio::test]
async fn whole_read_of_binary_data_is_malformed() {
    let manager = kube_manager();
    let mut object = SecretObject::new("ns-a", "bin");
    object.data.insert("blob".to_string(), vec![0xff, 0x00, 0xfe]);
    manager.api().create("ns-a", &object).await.unwrap();

    let err = manager.get_secret("ns-a", "bin", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Replication
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn replication_copies_to_every_target() {
    let manager = kube_manager();
    seed(&manager, "ns-b", "cfg", &[("y", "kept")]).await;

    let value = SecretValue::from_properties([("x", "1")])
        .with_annotation(REPLICATE_TO_ANNOTATION, "ns-b,ns-c");
    manager.set_secret("ns-a", "cfg", &value).await.unwrap();

    for ns in ["ns-b", "ns-c"] {
        assert_eq!(manager.get_secret(ns, "cfg", Some("x")).await.unwrap(), "1", "{}", ns);
    }
    assert_eq!(manager.get_secret("ns-b", "cfg", Some("y")).await.unwrap(), "kept");

    let replica = manager.api().object("ns-c", "cfg").await.unwrap();
    assert_eq!(replica.metadata.namespace.as_deref(), Some("ns-c"));
    assert_eq!(replica.secret_type.as_deref(), Some("Opaque"));
    assert_eq!(
        replica.metadata.annotations.get(REPLICATE_TO_ANNOTATION).map(String::as_str),
        Some("ns-b,ns-c")
    );
}

#[tokio::test]
async fn replication_skips_source_and_blank_entries() {
    let manager = kube_manager();

    let value = SecretValue::from_properties([("x", "1")])
        .with_annotation(REPLICATE_TO_ANNOTATION, " ns-a , , ns-b ");
    manager.set_secret("ns-a", "cfg", &value).await.unwrap();

    assert_eq!(kube_data(&manager, "ns-b", "cfg").await.unwrap(), props(&[("x", "1")]));
}

#[tokio::test]
async fn replication_failure_keeps_earlier_targets() {
    let manager = kube_manager();
    manager.api().deny_namespace("ns-c").await;

    let value = SecretValue::from_properties([("x", "1")])
        .with_annotation(REPLICATE_TO_ANNOTATION, "ns-b,ns-c,ns-d");
    let err = manager.set_secret("ns-a", "cfg", &value).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);

    // The source write and the first replica stand
    assert_eq!(kube_data(&manager, "ns-a", "cfg").await.unwrap(), props(&[("x", "1")]));
    assert_eq!(kube_data(&manager, "ns-b", "cfg").await.unwrap(), props(&[("x", "1")]));
    assert!(kube_data(&manager, "ns-d", "cfg").await.is_none());
}

#[tokio::test]
async fn without_annotation_nothing_is_replicated() {
    let manager = kube_manager();
    manager
        .set_secret("ns-a", "cfg", &SecretValue::from_properties([("x", "1")]))
        .await
        .unwrap();
    assert!(kube_data(&manager, "ns-b", "cfg").await.is_none());
}

#[tokio::test]
async fn annotation_only_write_replicates_existing_data() {
    let manager = kube_manager();
    seed(&manager, "ns-a", "cfg", &[("x", "1")]).await;

    let value = SecretValue::default().with_annotation(REPLICATE_TO_ANNOTATION, "ns-b");
    manager.set_secret("ns-a", "cfg", &value).await.unwrap();

    assert_eq!(kube_data(&manager, "ns-a", "cfg").await.unwrap(), props(&[("x", "1")]));
    assert_eq!(kube_data(&manager, "ns-b", "cfg").await.unwrap(), props(&[("x", "1")]));
}
