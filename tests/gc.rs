mod util;

mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use jlmarshal::{
        memory::{
            frame::{root, unroot},
            gc::{
                enable_gc, gc_collect, gc_stats, protect_from_gc, set_gc_stress, unprotect_from_gc,
            },
        },
        prelude::*,
        runtime::builder::RuntimeBuilder,
    };

    use super::util::{init, Tracker, Widget};

    #[derive(Clone)]
    struct Exploding;

    impl Drop for Exploding {
        fn drop(&mut self) {
            panic!("exploding drop");
        }
    }

    wrapped_type!(Exploding);

    fn register_exploding() {
        scope(|frame| -> MarshalResult<()> {
            let base = frame.root(DataType::new_abstract("Exploding", DataType::any_type())?);
            let allocated =
                frame.root(DataType::new_handle_type("ExplodingAllocated", base, true)?);
            Module::main().set_global("Exploding", base);
            Module::main().set_global("ExplodingAllocated", allocated);
            register_type::<Exploding>(allocated)
        })
        .unwrap();
    }

    fn owned_widget(id: u32, tracker: &Tracker) -> MarshalResult<Value> {
        transfer_ownership(Box::new(Widget::new(id, tracker)))
    }

    fn runtime_starts_once() {
        let err = RuntimeBuilder::new().start().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Runtime error: the runtime can only be initialized once"
        );
    }

    fn owners_survive_collection_between_allocations() {
        let tracker = Tracker::new();
        set_gc_stress(true);

        scope(|frame| -> MarshalResult<()> {
            let first = frame.root(transfer_ownership(Box::new(Widget::new(1, &tracker)))?);
            let second = frame.root(transfer_ownership(Box::new(Widget::new(2, &tracker)))?);
            assert_eq!(tracker.alive(), 2);

            unsafe {
                assert_eq!(unbox::<&Widget>(first)?.id, 1);
                assert_eq!(unbox::<&Widget>(second)?.id, 2);
            }
            Ok(())
        })
        .unwrap();

        set_gc_stress(false);
        gc_collect(GcCollection::Full);
        assert_eq!(tracker.alive(), 0);
    }

    fn rooted_values_survive_stress() {
        set_gc_stress(true);

        scope(|frame| -> MarshalResult<()> {
            let values = (0..64i64)
                .map(|i| box_value(i * 3).map(|v| frame.root(v)))
                .collect::<MarshalResult<Vec<_>>>()?;

            for (i, v) in values.into_iter().enumerate() {
                assert_eq!(unsafe { unbox::<i64>(v)? }, i as i64 * 3);
            }
            Ok(())
        })
        .unwrap();

        set_gc_stress(false);
    }

    fn frames_and_guards() {
        scope(|frame| -> MarshalResult<()> {
            assert_eq!(frame.n_roots(), 0);
            frame.root(box_value(1u32)?);
            assert_eq!(frame.n_roots(), 1);

            let guard = unsafe { root(box_value(2u32)?) };
            frame.gc_collect(GcCollection::Full);
            assert_eq!(unsafe { unbox::<u32>(guard.value())? }, 2);
            unroot(guard);

            let inner_roots = frame.scope(|inner| -> MarshalResult<usize> {
                inner.root(box_value(3u32)?);
                inner.root(box_value(4u32)?);
                Ok(inner.n_roots())
            })?;
            assert_eq!(inner_roots, 2);
            assert_eq!(frame.n_roots(), 1);
            Ok(())
        })
        .unwrap();
    }

    fn guards_released_out_of_order() {
        let tracker = Tracker::new();

        let (a, b) = scope(|_| -> MarshalResult<_> {
            let a = unsafe { root(owned_widget(1, &tracker)?) };
            let b = unsafe { root(owned_widget(2, &tracker)?) };
            Ok((a, b))
        })
        .unwrap();

        unroot(a);
        gc_collect(GcCollection::Full);
        assert_eq!(tracker.alive(), 1);
        assert_eq!(unsafe { unbox::<&Widget>(b.value()) }.unwrap().id, 2);

        unroot(b);
        gc_collect(GcCollection::Full);
        assert_eq!(tracker.alive(), 0);
    }

    fn guards_mixed_with_frame_roots() {
        let tracker = Tracker::new();

        scope(|frame| -> MarshalResult<()> {
            let first = frame.root(owned_widget(1, &tracker)?);
            let guard = unsafe { root(owned_widget(2, &tracker)?) };
            let third = frame.root(owned_widget(3, &tracker)?);

            unroot(guard);
            frame.gc_collect(GcCollection::Full);
            assert_eq!(tracker.alive(), 2);
            assert_eq!(frame.n_roots(), 2);

            unsafe {
                assert_eq!(unbox::<&Widget>(first)?.id, 1);
                assert_eq!(unbox::<&Widget>(third)?.id, 3);
            }

            let inner = frame.scope(|inner| -> MarshalResult<_> {
                inner.root(owned_widget(4, &tracker)?);
                Ok(unsafe { root(owned_widget(5, &tracker)?) })
            })?;

            frame.gc_collect(GcCollection::Full);
            assert_eq!(tracker.alive(), 3);
            assert_eq!(unsafe { unbox::<&Widget>(inner.value())? }.id, 5);
            unroot(inner);
            Ok(())
        })
        .unwrap();

        gc_collect(GcCollection::Full);
        assert_eq!(tracker.alive(), 0);
    }

    fn guards_outlive_their_scope() {
        let tracker = Tracker::new();

        let guard = scope(|_| -> MarshalResult<_> {
            Ok(unsafe { root(owned_widget(6, &tracker)?) })
        })
        .unwrap();

        gc_collect(GcCollection::Full);
        assert_eq!(tracker.alive(), 1);
        assert_eq!(unsafe { unbox::<&Widget>(guard.value()) }.unwrap().id, 6);

        drop(guard);
        gc_collect(GcCollection::Full);
        assert_eq!(tracker.alive(), 0);
    }

    fn panicking_finalizers_dont_stop_the_collector() {
        register_exploding();
        let tracker = Tracker::new();

        scope(|frame| -> MarshalResult<()> {
            frame.root(transfer_ownership(Box::new(Exploding))?);
            frame.root(owned_widget(9, &tracker)?);
            Ok(())
        })
        .unwrap();

        let before = gc_stats();
        let collected = catch_unwind(AssertUnwindSafe(|| gc_collect(GcCollection::Full)));
        assert!(collected.is_err());
        assert_eq!(tracker.alive(), 0);
        assert!(gc_stats().finalizers_run >= before.finalizers_run + 2);

        scope(|_| owned_widget(10, &tracker)).unwrap();
        assert_eq!(tracker.alive(), 1);
        assert!(gc_collect(GcCollection::Full) > 0);
        assert_eq!(tracker.alive(), 0);
    }

    fn protected_values_survive() {
        let tracker = Tracker::new();

        let owner = scope(|_| -> MarshalResult<Value> {
            let owner = transfer_ownership(Box::new(Widget::new(7, &tracker)))?;
            protect_from_gc(owner);
            Ok(owner)
        })
        .unwrap();

        gc_collect(GcCollection::Full);
        assert_eq!(tracker.alive(), 1);
        assert_eq!(unsafe { unbox::<&Widget>(owner) }.unwrap().id, 7);

        assert!(unprotect_from_gc(owner));
        gc_collect(GcCollection::Full);
        assert_eq!(tracker.alive(), 0);
    }

    fn unprotected_values_report_false() {
        scope(|frame| -> MarshalResult<()> {
            let v = frame.root(box_value(5u8)?);
            assert!(!unprotect_from_gc(v));
            Ok(())
        })
        .unwrap();
    }

    fn disabled_gc_frees_nothing() {
        let tracker = Tracker::new();
        let previous = enable_gc(false);
        assert!(previous);

        scope(|_| transfer_ownership(Box::new(Widget::new(8, &tracker))))
            .unwrap();
        assert_eq!(gc_collect(GcCollection::Full), 0);
        assert_eq!(tracker.alive(), 1);

        enable_gc(previous);
        gc_collect(GcCollection::Full);
        assert_eq!(tracker.alive(), 0);
    }

    fn stats_are_updated() {
        let before = gc_stats();
        scope(|_| box_value(1.0f64)).unwrap();
        gc_collect(GcCollection::Full);
        let after = gc_stats();

        assert!(after.collections > before.collections);
        assert!(after.freed_objects > before.freed_objects);
    }

    #[test]
    fn gc_tests() {
        RuntimeBuilder::new()
            .collect_interval(Some(32))
            .start()
            .unwrap();
        init();

        runtime_starts_once();
        owners_survive_collection_between_allocations();
        rooted_values_survive_stress();
        frames_and_guards();
        guards_released_out_of_order();
        guards_mixed_with_frame_roots();
        guards_outlive_their_scope();
        panicking_finalizers_dont_stop_the_collector();
        protected_values_survive();
        unprotected_values_report_false();
        disabled_gc_frees_nothing();
        stats_are_updated();
    }
}
