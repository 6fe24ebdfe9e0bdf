mod util;

mod tests {
    use std::ptr::{null, null_mut};

    use jlmarshal::{prelude::*, sys::jl_value_t};
    use proptest::prelude::*;

    use super::util::{init, Point, Tracker, Widget};

    proptest! {
        #[test]
        fn direct_i32_round_trip(x in any::<i32>()) {
            let wire = convert_to_julia(x).unwrap();
            prop_assert_eq!(unsafe { convert_to_cpp::<i32>(wire) }.unwrap(), x);
        }

        #[test]
        fn direct_u64_round_trip(x in any::<u64>()) {
            let wire = convert_to_julia(x).unwrap();
            prop_assert_eq!(unsafe { convert_to_cpp::<u64>(wire) }.unwrap(), x);
        }

        #[test]
        fn direct_f64_round_trip(x in any::<f64>()) {
            let wire = convert_to_julia(x).unwrap();
            let back = unsafe { convert_to_cpp::<f64>(wire) }.unwrap();
            prop_assert_eq!(back.to_bits(), x.to_bits());
        }

        #[test]
        fn mirrored_round_trip(x in any::<f64>(), y in any::<f64>()) {
            let p = Point { x, y };
            let wire = convert_to_julia(p).unwrap();
            let back = unsafe { convert_to_cpp::<Point>(wire) }.unwrap();
            prop_assert_eq!(back.x.to_bits(), x.to_bits());
            prop_assert_eq!(back.y.to_bits(), y.to_bits());
        }
    }

    fn references_round_trip() {
        let tracker = Tracker::new();
        let mut widget = Widget::new(3, &tracker);
        let address = &mut widget as *mut Widget;

        unsafe {
            let wire = convert_to_julia(&widget).unwrap();
            assert_eq!(wire.extract_pointer::<Widget>(), address);
            assert_eq!(convert_to_cpp::<&Widget>(wire).unwrap().id, 3);

            let wire = convert_to_julia(&mut widget).unwrap();
            convert_to_cpp::<&mut Widget>(wire).unwrap().id = 4;

            let wire = convert_to_julia(address as *const Widget).unwrap();
            assert_eq!(convert_to_cpp::<*const Widget>(wire).unwrap(), address as *const _);

            let wire = convert_to_julia(address).unwrap();
            assert_eq!(convert_to_cpp::<*mut Widget>(wire).unwrap(), address);
        }

        assert_eq!(widget.id, 4);
        assert_eq!(tracker.alive(), 1);
    }

    fn null_handles() {
        unsafe {
            let err = convert_to_cpp::<&Widget>(WrappedCppPtr::null()).unwrap_err();
            assert!(err.is_object_deleted());
            assert!(err.to_string().contains("Widget was deleted"));

            let err = convert_to_cpp::<Widget>(WrappedCppPtr::null()).unwrap_err();
            assert!(err.is_object_deleted());

            assert!(convert_to_cpp::<*mut Widget>(WrappedCppPtr::null())
                .unwrap()
                .is_null());

            let wire = convert_to_julia(null::<Point>()).unwrap();
            assert!(wire.is_null());
        }
    }

    fn values_pass_through() {
        scope(|frame| {
            let v = frame.root(box_value(7i64).unwrap());
            let wire = convert_to_julia(v).unwrap();
            assert_eq!(wire, v);
            assert_eq!(unsafe { convert_to_cpp::<Value>(wire) }.unwrap(), v);

            let raw = convert_to_julia(v.as_ptr()).unwrap();
            assert_eq!(raw, v.as_ptr());
            assert_eq!(
                unsafe { convert_to_cpp::<*mut jl_value_t>(raw) }.unwrap(),
                v.as_ptr()
            );

            let null = null_mut::<jl_value_t>();
            assert!(unsafe { convert_to_cpp::<*mut jl_value_t>(null) }
                .unwrap()
                .is_null());
        })
    }

    fn class_by_value_is_owned_by_julia() {
        let tracker = Tracker::new();

        scope(|frame| -> MarshalResult<()> {
            let owner = frame.root(convert_to_julia(Widget::new(11, &tracker))?);
            assert_eq!(owner.datatype(), julia_type::<Widget>()?);
            assert_eq!(tracker.alive(), 1);

            let wire = unbox_wrapped(owner)?;
            let copy = unsafe { convert_to_cpp::<Widget>(wire)? };
            assert_eq!(copy.id, 11);
            assert_eq!(tracker.alive(), 2);
            drop(copy);

            let borrowed = unsafe { convert_to_cpp::<&Widget>(wire)? };
            assert_eq!(borrowed.id, 11);
            Ok(())
        })
        .unwrap();
    }

    fn strictly_typed_numbers() {
        let n = StrictlyTypedNumber::new(-5i8);
        let wire = convert_to_julia(n).unwrap();
        assert_eq!(unsafe { convert_to_cpp::<StrictlyTypedNumber<i8>>(wire) }.unwrap(), n);
        assert_eq!(
            julia_type::<StrictlyTypedNumber<i8>>().unwrap().to_string(),
            "StrictlyTypedNumber{Int8}"
        );
    }

    #[test]
    fn conversion_tests() {
        init();
        references_round_trip();
        null_handles();
        values_pass_through();
        class_by_value_is_owned_by_julia();
        strictly_typed_numbers();
    }
}
