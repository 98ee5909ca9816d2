use chronicle_core::Chronicle;
use chronicle_core::Event;
use chronicle_core::InMemoryVersionStore;
use chronicle_core::Origin;
use chronicle_core::Registry;
use chronicle_core::TrackingConfig;
use chronicle_core::TrailOptions;
use chronicle_test_support::WIDGET;
use chronicle_test_support::Widget;
use chronicle_test_support::at;
use chronicle_test_support::ctx;
use pretty_assertions::assert_eq;

/// Widget 1: created at 10 as "A", renamed to "B" at 20, repriced at 30.
fn recorded() -> (Chronicle<InMemoryVersionStore>, Widget) {
    let mut registry = Registry::new();
    registry
        .register(WIDGET, TrackingConfig::builder().ignore("updated_at").build())
        .unwrap();
    let chronicle = Chronicle::new(registry, InMemoryVersionStore::new());

    let mut widget = Widget::new(1, "A");
    chronicle.after_create(&widget, &ctx("alice", 10)).unwrap();

    let steps: [(&str, i64, fn(&mut Widget)); 2] = [
        ("bob", 20, |w| w.name = "B".to_string()),
        ("carol", 30, |w| w.price = 250),
    ];
    for (actor, secs, mutate) in steps {
        let changes = widget.change(|w| {
            mutate(w);
            w.updated_at = secs;
        });
        let staged = chronicle
            .before_update(&widget, &changes, &ctx(actor, secs))
            .unwrap()
            .unwrap();
        chronicle.append_staged(staged).unwrap();
    }

    (chronicle, widget)
}

#[test]
fn state_at_reconstructs_typed_entity() {
    let (chronicle, live) = recorded();

    let at_15: Widget = chronicle.state_at(&live, at(15)).unwrap().reify().unwrap();
    assert_eq!(at_15.name, "A");
    assert_eq!(at_15.price, 100);

    let at_25: Widget = chronicle.state_at(&live, at(25)).unwrap().reify().unwrap();
    assert_eq!(at_25.name, "B");
    assert_eq!(at_25.price, 100);
    assert_eq!(at_25.updated_at, 20);

    let now = chronicle.state_at(&live, at(30)).unwrap();
    assert_eq!(now.origin, Origin::Live);
    assert_eq!(now.reify::<Widget>().unwrap().price, 250);
}

#[test]
fn stepping_back_and_forth() {
    let (chronicle, live) = recorded();

    let before_reprice = chronicle.previous_version(&live).unwrap().unwrap();
    assert_eq!(
        before_reprice.origin,
        Origin::Reified {
            sequence_index: 2,
            event: Event::Update,
        }
    );
    assert_eq!(before_reprice.reify::<Widget>().unwrap().name, "B");

    let before_rename = chronicle.previous_version(&before_reprice).unwrap().unwrap();
    assert_eq!(before_rename.reify::<Widget>().unwrap().name, "A");

    let back = chronicle.next_version(&before_rename).unwrap().unwrap();
    assert_eq!(back, before_reprice);
    assert!(chronicle.next_version(&back).unwrap().is_none());
    assert!(chronicle.next_version(&live).unwrap().is_none());
}

#[test]
fn versions_are_ordered_and_attributed() {
    let (chronicle, live) = recorded();

    let versions = chronicle.versions(&live).unwrap();
    let summary: Vec<(u64, Event, Option<&str>)> = versions
        .iter()
        .map(|v| (v.sequence_index, v.event, v.whodunnit.as_deref()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (0, Event::Create, Some("alice")),
            (1, Event::Update, Some("bob")),
            (2, Event::Update, Some("carol")),
        ]
    );

    let rename = chronicle.version_at_index(&live, 1).unwrap().unwrap();
    assert_eq!(rename.whodunnit.as_deref(), Some("bob"));
    assert!(chronicle.version_at_index(&live, 9).unwrap().is_none());

    let window = chronicle
        .navigator()
        .versions_between(&live, at(20), at(30))
        .unwrap();
    assert_eq!(window.len(), 2);
}

#[test]
fn audit_trail_hides_updated_at_by_default() {
    let (chronicle, live) = recorded();

    let trail = chronicle
        .audit_trail(&live, &TrailOptions::default())
        .unwrap();
    let rendered: Vec<String> = trail.iter().map(ToString::to_string).collect();
    assert_eq!(trail.len(), 3);
    assert!(rendered[0].contains("by carol"), "{rendered:?}");
    assert!(rendered[0].contains("price: 100 -> 250"), "{rendered:?}");
    assert!(!rendered[0].contains("updated_at"), "{rendered:?}");

    let everything = chronicle
        .audit_trail(&live, &TrailOptions::all_attributes())
        .unwrap();
    assert!(
        everything[0]
            .changes
            .iter()
            .any(|c| c.attribute == "updated_at")
    );
}

#[test]
fn trail_with_custom_actor_resolver() {
    let (chronicle, live) = recorded();

    let trail = chronicle
        .audit_trail_with(&live, &TrailOptions::default(), &|who: Option<&str>| {
            who.map(str::to_uppercase).unwrap_or_default()
        })
        .unwrap();
    let actors: Vec<&str> = trail.iter().map(|e| e.changed_by.as_str()).collect();
    assert_eq!(actors, vec!["CAROL", "BOB", "ALICE"]);
}
