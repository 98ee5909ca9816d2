use chronicle_core::AttributeChange;
use chronicle_core::Chronicle;
use chronicle_core::Event;
use chronicle_core::InMemoryVersionStore;
use chronicle_core::Registry;
use chronicle_core::SnapshotCodec;
use chronicle_core::Trackable;
use chronicle_core::TrackingConfig;
use chronicle_core::TrailOptions;
use chronicle_core::changes_between;
use chronicle_core::is_live;
use chronicle_test_support::WIDGET;
use chronicle_test_support::Widget;
use chronicle_test_support::ctx;
use pretty_assertions::assert_eq;
use serde_json::json;

fn chronicle(config: TrackingConfig) -> Chronicle<InMemoryVersionStore> {
    let mut registry = Registry::new();
    registry.register(WIDGET, config).unwrap();
    Chronicle::new(registry, InMemoryVersionStore::new())
}

/// Runs `before_update` and appends whatever was staged.
fn update(
    chronicle: &Chronicle<InMemoryVersionStore>,
    widget: &mut Widget,
    actor: &str,
    secs: i64,
    mutate: impl FnOnce(&mut Widget),
) -> bool {
    let changes = widget.change(mutate);
    match chronicle
        .before_update(widget, &changes, &ctx(actor, secs))
        .unwrap()
    {
        Some(staged) => {
            chronicle.append_staged(staged).unwrap();
            true
        }
        None => false,
    }
}

#[test]
fn create_sets_originator_and_liveness() {
    let chronicle = chronicle(TrackingConfig::default());
    let widget = Widget::new(1, "A");

    chronicle.after_create(&widget, &ctx("alice", 10)).unwrap();

    assert_eq!(chronicle.originator(&widget).unwrap(), Some("alice".to_string()));
    assert!(is_live(&widget));

    let reified = chronicle.previous_version(&widget).unwrap().unwrap();
    assert!(!is_live(&reified));
}

#[test]
fn rename_shows_up_in_audit_trail() {
    let chronicle = chronicle(TrackingConfig::default());
    let mut widget = Widget::new(1, "A");
    chronicle.after_create(&widget, &ctx("alice", 10)).unwrap();

    assert!(update(&chronicle, &mut widget, "bob", 20, |w| {
        w.name = "B".to_string();
    }));

    let trail = chronicle
        .audit_trail(&widget, &TrailOptions::default())
        .unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].event, Event::Update);
    assert_eq!(trail[0].changed_by, Some("bob".to_string()));
    assert_eq!(
        trail[0].changes,
        vec![AttributeChange {
            attribute: "name".to_string(),
            before: Some(json!("A")),
            after: Some(json!("B")),
        }]
    );
    assert_eq!(trail[1].event, Event::Create);
    assert_eq!(trail[1].changed_by, Some("alice".to_string()));
}

#[test]
fn rename_of_untracked_creation_yields_single_entry() {
    let chronicle = chronicle(TrackingConfig::default());
    let mut widget = Widget::new(1, "A");

    chronicle.disable_type(WIDGET);
    chronicle.after_create(&widget, &ctx("alice", 10)).unwrap();
    chronicle.enable_type(WIDGET);

    update(&chronicle, &mut widget, "bob", 20, |w| {
        w.name = "B".to_string();
    });

    let trail = chronicle
        .audit_trail(&widget, &TrailOptions::all_attributes())
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].changes.len(), 1);
    assert_eq!(trail[0].changes[0].attribute, "name");
}

#[test]
fn change_to_ignored_attribute_records_nothing() {
    let chronicle = chronicle(TrackingConfig::builder().ignore("updated_at").build());
    let mut widget = Widget::new(1, "A");
    chronicle.after_create(&widget, &ctx("alice", 10)).unwrap();

    let recorded = update(&chronicle, &mut widget, "bob", 20, |w| w.updated_at = 20);

    assert!(!recorded);
    assert_eq!(chronicle.versions(&widget).unwrap().len(), 1);
}

#[test]
fn destroy_records_pre_destroy_state() {
    let chronicle = chronicle(TrackingConfig::default());
    let mut widget = Widget::new(1, "A");
    chronicle.after_create(&widget, &ctx("alice", 10)).unwrap();
    update(&chronicle, &mut widget, "bob", 20, |w| w.price = 250);

    chronicle.after_destroy(&widget, &ctx("carol", 30)).unwrap();

    let versions = chronicle.versions(&widget).unwrap();
    let destroys: Vec<_> = versions
        .iter()
        .filter(|v| v.event == Event::Destroy)
        .collect();
    assert_eq!(destroys.len(), 1);
    assert_eq!(
        SnapshotCodec::default().decode(destroys[0].snapshot.as_deref()),
        widget.attributes()
    );
    assert_eq!(chronicle.originator(&widget).unwrap(), Some("carol".to_string()));
}

#[test]
fn per_type_switch_suppresses_every_event() {
    let chronicle = chronicle(TrackingConfig::default());
    let mut widget = Widget::new(1, "A");
    chronicle.disable_type(WIDGET);

    for global_on in [true, false] {
        if global_on {
            chronicle.enable();
        } else {
            chronicle.disable();
        }

        chronicle.after_create(&widget, &ctx("alice", 10)).unwrap();
        assert!(!update(&chronicle, &mut widget, "bob", 20, |w| {
            w.name.push('!');
        }));
        chronicle.after_destroy(&widget, &ctx("carol", 30)).unwrap();
    }

    assert!(chronicle.versions(&widget).unwrap().is_empty());
}

#[test]
fn reified_states_never_record_versions() {
    let chronicle = chronicle(TrackingConfig::default());
    let widget = Widget::new(1, "A");
    chronicle.after_create(&widget, &ctx("alice", 10)).unwrap();

    let reified = chronicle.previous_version(&widget).unwrap().unwrap();
    assert!(chronicle.after_create(&reified, &ctx("mallory", 20)).unwrap().is_none());
    assert!(chronicle.after_destroy(&reified, &ctx("mallory", 20)).unwrap().is_none());

    let mut edited = reified.clone();
    edited.attributes.insert("name".to_string(), json!("Z"));
    let changes = changes_between(&reified.attributes, &edited.attributes);
    assert!(!changes.is_empty());
    assert!(
        chronicle
            .before_update(&edited, &changes, &ctx("mallory", 20))
            .unwrap()
            .is_none()
    );

    assert_eq!(chronicle.versions(&widget).unwrap().len(), 1);
}

#[test]
fn computed_metadata_sees_the_entity() {
    let config = TrackingConfig::builder()
        .meta_fn("label", |entity| {
            json!(format!("{}:{}", entity.item_type(), entity.item_id()))
        })
        .build();
    let chronicle = chronicle(config);
    let widget = Widget::new(7, "A");

    let version = chronicle
        .after_create(&widget, &ctx("alice", 10).with_metadata("ip", "10.0.0.1"))
        .unwrap()
        .unwrap();

    assert_eq!(version.metadata.get("label"), Some(&json!("Widget:7")));
    assert_eq!(version.metadata.get("ip"), Some(&json!("10.0.0.1")));
}
