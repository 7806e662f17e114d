//! Service registry integration tests
//!
//! Provider-type precedence, teardown unpublication, and the pinned
//! multi-version selection behavior.

mod common;

use std::sync::Arc;

use common::*;
use modhost::{Provider, PluginIdentity};

#[tokio::test]
async fn plugin_provider_beats_higher_priority_container_provider() {
    let fixture = HostFixture::new();

    // Container registration with the numerically best priority.
    fixture
        .host
        .publish_service::<dyn Echo>("greeter", Arc::new(FixedEcho("container")), 0);

    fixture
        .host
        .register_plugin_with_activator(
            plugin_descriptor("pluginA", &[], &[]),
            Arc::new(PluginPublisher {
                unique_id: "greeter",
                value: "plugin",
            }),
        )
        .await
        .unwrap();

    let best = fixture.host.lookup_service::<dyn Echo>(Some("greeter")).unwrap();
    assert_eq!(best.echo(), "plugin");

    let all = fixture.host.lookup_all_services::<dyn Echo>(Some("greeter"));
    assert_eq!(all.len(), 2);
    assert!(matches!(all[0].provider(), Provider::Plugin(_)));
    assert!(matches!(all[1].provider(), Provider::Container));
}

#[tokio::test]
async fn module_services_become_visible_on_activation() {
    let fixture = HostFixture::new();

    let module = fixture
        .host
        .install_with_activator(
            module_descriptor("m1", "1.0.0", &[]),
            Arc::new(PublishingActivator {
                unique_id: "greeter",
                value: "from-m1",
                priority: 50,
            }),
        )
        .unwrap();

    assert!(fixture.host.lookup_service::<dyn Echo>(Some("greeter")).is_none());
    fixture.host.activate(&module).await.unwrap();

    let svc = fixture.host.lookup_service::<dyn Echo>(Some("greeter")).unwrap();
    assert_eq!(svc.echo(), "from-m1");
}

#[tokio::test]
async fn deactivation_removes_every_registration_of_the_module() {
    let fixture = HostFixture::new();

    fixture
        .host
        .publish_service::<dyn Echo>("greeter", Arc::new(FixedEcho("container")), 10);

    let module = fixture
        .host
        .install_with_activator(
            module_descriptor("m1", "1.0.0", &[]),
            Arc::new(PublishingActivator {
                unique_id: "greeter",
                value: "from-m1",
                priority: 0,
            }),
        )
        .unwrap();
    fixture.host.activate(&module).await.unwrap();
    assert_eq!(fixture.host.lookup_all_services::<dyn Echo>(Some("greeter")).len(), 2);

    fixture.host.uninstall(&module).await.unwrap();

    let remaining = fixture.host.lookup_all_services::<dyn Echo>(Some("greeter"));
    assert_eq!(remaining.len(), 1);
    assert!(remaining
        .iter()
        .all(|r| !matches!(r.provider(), Provider::Module(id) if id == module.identity())));
}

#[tokio::test]
async fn coexisting_versions_tie_break_by_publication_order() {
    // Two versions of one module publish the same capability; the pinned
    // behavior is that provider rank and priority decide, and on full
    // ties the earlier publication wins.
    let fixture = HostFixture::with_config(|c| c.multi_version = true);

    let v1 = fixture
        .host
        .install_with_activator(
            module_descriptor("m1", "1.0.0", &[]),
            Arc::new(PublishingActivator {
                unique_id: "greeter",
                value: "v1",
                priority: 100,
            }),
        )
        .unwrap();
    let v2 = fixture
        .host
        .install_with_activator(
            module_descriptor("m1", "2.0.0", &[]),
            Arc::new(PublishingActivator {
                unique_id: "greeter",
                value: "v2",
                priority: 100,
            }),
        )
        .unwrap();

    fixture.host.activate(&v1).await.unwrap();
    fixture.host.activate(&v2).await.unwrap();

    assert_eq!(
        fixture.host.lookup_service::<dyn Echo>(Some("greeter")).unwrap().echo(),
        "v1"
    );

    // Uninstalling the earlier version promotes the later one.
    fixture.host.uninstall(&v1).await.unwrap();
    assert_eq!(
        fixture.host.lookup_service::<dyn Echo>(Some("greeter")).unwrap().echo(),
        "v2"
    );
}

#[tokio::test]
async fn unpublish_matching_removes_by_predicate() {
    let fixture = HostFixture::new();
    let services = fixture.host.services();

    services.publish::<dyn Echo>(
        "a",
        Arc::new(FixedEcho("a")),
        Provider::Plugin(PluginIdentity::new("p", "1.0.0")),
        0,
    );
    services.publish::<dyn Echo>("b", Arc::new(FixedEcho("b")), Provider::Container, 0);
    services.publish::<dyn Echo>("c", Arc::new(FixedEcho("c")), Provider::Container, 0);

    let removed = services.unpublish_matching(|r| matches!(r.provider(), Provider::Container));
    assert_eq!(removed, 2);
    assert_eq!(services.len(), 1);
    assert!(fixture.host.lookup_service::<dyn Echo>(Some("a")).is_some());
}
