mod util;

mod tests {
    use std::{ffi::c_void, ptr::null_mut};

    use jlmarshal::prelude::*;
    use proptest::prelude::*;

    use super::util::{init, Point};

    proptest! {
        #[test]
        fn box_unbox_i64(x in any::<i64>()) {
            let back = scope(|frame| {
                let v = frame.root(box_value(x).unwrap());
                unsafe { unbox::<i64>(v) }.unwrap()
            });
            prop_assert_eq!(back, x);
        }

        #[test]
        fn box_unbox_u16(x in any::<u16>()) {
            let back = scope(|frame| {
                let v = frame.root(box_value(x).unwrap());
                unsafe { unbox::<u16>(v) }.unwrap()
            });
            prop_assert_eq!(back, x);
        }

        #[test]
        fn box_unbox_f32(x in any::<f32>()) {
            let back = scope(|frame| {
                let v = frame.root(box_value(x).unwrap());
                unsafe { unbox::<f32>(v) }.unwrap()
            });
            prop_assert_eq!(back.to_bits(), x.to_bits());
        }
    }

    fn scalars_keep_their_type() {
        scope(|frame| -> MarshalResult<()> {
            let v = frame.root(box_value(-1i32)?);
            assert_eq!(v.datatype(), DataType::int32_type());
            assert_eq!(unsafe { unbox::<i32>(v)? }, -1);

            let v = frame.root(box_value(u64::MAX)?);
            assert_eq!(v.datatype_name(), "UInt64");
            assert_eq!(unsafe { unbox::<u64>(v)? }, u64::MAX);

            let v = frame.root(box_value(isize::MIN)?);
            assert_eq!(v.datatype(), julia_type::<isize>()?);
            assert_eq!(unsafe { unbox::<isize>(v)? }, isize::MIN);

            let v = frame.root(box_value(usize::MAX)?);
            assert_eq!(unsafe { unbox::<usize>(v)? }, usize::MAX);
            Ok(())
        })
        .unwrap();
    }

    fn bools_are_singletons() {
        scope(|_| -> MarshalResult<()> {
            assert_eq!(box_value(true)?, Value::true_v());
            assert_eq!(box_value(false)?, Value::false_v());
            assert!(unsafe { unbox::<bool>(box_value(true)?)? });
            Ok(())
        })
        .unwrap();
    }

    fn mirrored_structs() {
        scope(|frame| -> MarshalResult<()> {
            let p = Point { x: 1.5, y: -2.0 };
            let v = frame.root(box_value(p)?);
            assert_eq!(v.datatype(), julia_type::<Point>()?);
            assert_eq!(v.datatype_name(), "Point");
            assert_eq!(unsafe { unbox::<Point>(v)? }, p);
            Ok(())
        })
        .unwrap();
    }

    fn references_are_not_owned() {
        let mut p = Point { x: 0.0, y: 1.0 };

        scope(|frame| -> MarshalResult<()> {
            let v = frame.root(box_value(&p)?);
            assert_eq!(v.datatype().to_string(), "ConstCxxRef{Point}");
            assert_eq!(unbox_wrapped(v)?.extract_pointer::<Point>(), &mut p as *mut Point);

            let v = frame.root(box_value(&mut p as *mut Point)?);
            assert_eq!(v.datatype().to_string(), "CxxPtr{Point}");
            unsafe { unbox::<&mut Point>(v)?.x = 3.0 };
            Ok(())
        })
        .unwrap();

        assert_eq!(p.x, 3.0);
    }

    fn values_box_to_themselves() {
        scope(|frame| -> MarshalResult<()> {
            let v = frame.root(box_value(2u8)?);
            assert_eq!(box_value(v)?, v);
            assert_eq!(box_value(v.as_ptr())?, v);

            let err = box_value(null_mut::<jlmarshal::sys::jl_value_t>()).unwrap_err();
            assert!(err.to_string().contains("null pointer"));
            Ok(())
        })
        .unwrap();
    }

    fn void_pointers() {
        let mut x = 0u32;
        let address = &mut x as *mut u32 as *mut c_void;

        scope(|frame| -> MarshalResult<()> {
            let v = frame.root(box_value(address)?);
            assert_eq!(v.datatype().to_string(), "Ptr{Nothing}");
            assert_eq!(unsafe { unbox::<*mut c_void>(v)? }, address);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn boxing_tests() {
        init();
        scalars_keep_their_type();
        bools_are_singletons();
        mirrored_structs();
        references_are_not_owned();
        values_box_to_themselves();
        void_pointers();
    }
}
