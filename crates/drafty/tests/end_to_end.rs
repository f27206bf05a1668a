//! End-to-end flows through the facade: a form editor with drafts,
//! persistence, extensions, middleware logging and a render-loop watch.

use std::cell::RefCell;
use std::rc::Rc;

use drafty::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Form {
    name: String,
    email: String,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn form_with_extensions(store: MemoryStore) -> Extended<Form> {
    let form = Container::with_config(Form::default(), ContainerConfig::default().with_label("form"));
    form.use_middleware(Persist::new(
        PersistConfig::new("form").with_draft(true),
        store,
    ))
    .unwrap();
    form.extend(
        Extensions::new()
            .with(
                "rename",
                extension_fn(|c: &Container<Form>, name: String| {
                    c.sketch_with(move |mut f| {
                        f.name = name;
                        f
                    })?;
                    Ok(())
                }),
            )
            .with(
                "is_valid",
                extension_fn(|c: &Container<Form>, (): ()| {
                    Ok(c.with_draft(|d| d.is_some_and(|f| f.email.contains('@'))))
                }),
            ),
    )
}

#[test]
fn edit_validate_publish_restore() {
    init_tracing();
    let store = MemoryStore::new();
    let form = form_with_extensions(store.clone());
    let watch = Watch::attach(&form, WatchTarget::Both);

    form.call::<String, ()>("rename", "Ada".into()).unwrap();
    assert!(watch.take_dirty());
    assert!(!form.call::<(), bool>("is_valid", ()).unwrap());

    form.sketch_with(|mut f| {
        f.email = "ada@example.com".into();
        f
    })
    .unwrap();
    assert!(form.call::<(), bool>("is_valid", ()).unwrap());
    assert_eq!(form.now(), Form::default());

    form.publish().unwrap();
    assert_eq!(watch.now().name, "Ada");
    assert_eq!(watch.draft(), None);
    assert!(!store.contains("form__draft"));

    let restored = form_with_extensions(store);
    assert_eq!(restored.now().email, "ada@example.com");
    assert_eq!(restored.draft(), None);
}

#[test]
fn middleware_sees_exact_event_names() {
    let count = Container::new(0);
    let names = Rc::new(RefCell::new(Vec::new()));
    let n = Rc::clone(&names);
    count
        .use_middleware(
            middleware_fn(move |event: EventType, _: &Container<i32>| {
                n.borrow_mut().push(event.as_str());
                Ok(())
            })
            .named("recorder"),
        )
        .unwrap();

    count.sketch(1).unwrap().discard().unwrap();
    assert_eq!(
        *names.borrow(),
        vec![
            "init",
            "before:sketch",
            "after:sketch",
            "before:broadcast:draft",
            "after:broadcast:draft",
            "before:discard",
            "after:discard",
            "before:broadcast:draft",
            "after:broadcast:draft",
        ]
    );
}

#[test]
fn guard_scoped_subscription() {
    let count = Container::new(0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let s = Rc::clone(&seen);
        let _guard = count.subscribe(move |v: &i32| s.borrow_mut().push(*v)).into_guard();
        count.set(1).unwrap();
        assert_eq!(count.subscriber_count(Target::Now), 1);
    }
    count.set(2).unwrap();
    assert_eq!(*seen.borrow(), vec![1]);
    assert_eq!(count.subscriber_count(Target::Now), 0);
}
