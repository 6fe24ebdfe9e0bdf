mod util;

mod tests {
    use jlmarshal::{
        convert::ownership::boxed_cpp_pointer,
        memory::gc::{finalize, gc_collect},
        prelude::*,
    };

    use super::util::{init, Gadget, Point, Tracker, Widget};

    #[derive(Clone)]
    struct Orphan(Tracker);

    wrapped_type!(Orphan);

    fn finalizing_deletes_the_object() {
        let tracker = Tracker::new();

        scope(|frame| -> MarshalResult<()> {
            let owner = frame.root(transfer_ownership(Box::new(Widget::new(1, &tracker)))?);
            assert_eq!(tracker.alive(), 1);
            assert_eq!(unsafe { unbox::<&Widget>(owner)? }.id, 1);

            assert_eq!(unsafe { finalize(owner) }, 1);
            assert_eq!(tracker.alive(), 0);
            assert!(unbox_wrapped(owner)?.is_null());

            let err = unsafe { unbox::<&Widget>(owner) }.unwrap_err();
            assert!(err.is_object_deleted());
            let err = unsafe { unbox::<Widget>(owner) }.unwrap_err();
            assert!(err.is_object_deleted());

            assert_eq!(unsafe { finalize(owner) }, 0);
            Ok(())
        })
        .unwrap();
    }

    fn borrowed_objects_have_no_finalizer() {
        let tracker = Tracker::new();
        let widget = Widget::new(2, &tracker);

        scope(|frame| -> MarshalResult<()> {
            let handle = frame.root(box_value(&widget)?);
            assert_eq!(unsafe { finalize(handle) }, 0);
            Ok(())
        })
        .unwrap();

        gc_collect(GcCollection::Full);
        assert_eq!(tracker.alive(), 1);
        assert_eq!(widget.id, 2);
    }

    fn collection_drops_unreachable_owners() {
        let tracker = Tracker::new();

        scope(|frame| -> MarshalResult<()> {
            let widget = Widget::new(3, &tracker);
            let gadget = Gadget { id: 4, widget };
            let owner = frame.root(julia_owned(Box::new(gadget))?);
            assert_eq!(owner.datatype(), julia_type::<Gadget>()?);

            frame.gc_collect(GcCollection::Full);
            assert_eq!(tracker.alive(), 1);
            assert_eq!(unsafe { unbox::<&Gadget>(owner)? }.widget.id, 3);
            Ok(())
        })
        .unwrap();

        gc_collect(GcCollection::Full);
        assert_eq!(tracker.alive(), 0);
    }

    fn by_value_returns_are_owned() {
        let tracker = Tracker::new();

        scope(|frame| -> MarshalResult<()> {
            let owner = frame.root(box_value(Widget::new(5, &tracker))?);
            assert_eq!(unsafe { unbox::<Widget>(owner)? }.id, 5);
            assert_eq!(unsafe { finalize(owner) }, 1);
            Ok(())
        })
        .unwrap();

        assert_eq!(tracker.alive(), 0);
    }

    fn failed_transfer_drops_the_object() {
        let tracker = Tracker::new();

        let err = transfer_ownership(Box::new(Orphan(tracker.clone()))).unwrap_err();
        assert!(err.is_not_registered());
        assert_eq!(tracker.alive(), 0);
    }

    fn immutable_handles_cannot_own() {
        let ty = julia_type::<*mut Point>().unwrap();
        assert!(!ty.is_mutable());

        let ptr = Box::into_raw(Box::new(Point { x: 0.0, y: 0.0 }));
        let err = unsafe { boxed_cpp_pointer(ptr, ty, true) }.unwrap_err();
        assert_eq!(
            err.to_string(),
            "GC error: cannot add a finalizer to an instance of the immutable type CxxPtr{Point}"
        );

        scope(|frame| -> MarshalResult<()> {
            let handle = frame.root(unsafe { boxed_cpp_pointer(ptr, ty, false)? });
            assert_eq!(unsafe { unbox::<*mut Point>(handle)? }, ptr);
            Ok(())
        })
        .unwrap();

        unsafe { drop(Box::from_raw(ptr)) };

        let err = unsafe { boxed_cpp_pointer(ptr, DataType::int64_type(), false) }.unwrap_err();
        assert!(err.to_string().contains("is not a wrapper type"));
    }

    #[test]
    fn ownership_tests() {
        init();
        finalizing_deletes_the_object();
        borrowed_objects_have_no_finalizer();
        collection_drops_unreachable_owners();
        by_value_returns_are_owned();
        failed_transfer_drops_the_object();
        immutable_handles_cannot_own();
    }
}
