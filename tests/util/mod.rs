#![allow(dead_code)]

use std::sync::{Arc, Once};

use jlmarshal::prelude::*;

/// A struct whose layout matches the `Point` type in `Main`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

mirrored_type!(Point);

/// Counts the live objects created with it.
#[derive(Clone, Debug, Default)]
pub struct Tracker(Arc<()>);

impl Tracker {
    pub fn new() -> Self {
        Tracker::default()
    }

    pub fn alive(&self) -> usize {
        Arc::strong_count(&self.0) - 1
    }
}

/// A class that is passed by value, registered as `WidgetAllocated <: Widget`.
#[derive(Clone, Debug)]
pub struct Widget {
    pub id: u32,
    tracker: Tracker,
}

impl Widget {
    pub fn new(id: u32, tracker: &Tracker) -> Self {
        Widget {
            id,
            tracker: tracker.clone(),
        }
    }
}

/// A class whose abstract type is a subtype of `Widget`.
#[derive(Clone, Debug)]
pub struct Gadget {
    pub id: u32,
    pub widget: Widget,
}

wrapped_type!(Widget, Gadget);

static INIT: Once = Once::new();

/// Create and register the test types. Must not be called while the runtime lock is held.
pub fn init() {
    INIT.call_once(|| {
        scope(|frame| -> MarshalResult<()> {
            let main = Module::main();
            let f64_ty = DataType::float64_type();

            let point = frame.root(DataType::new_struct_type(
                "Point",
                DataType::any_type(),
                &[("x", f64_ty, 0), ("y", f64_ty, 8)],
                16,
                false,
            )?);
            main.set_global("Point", point);
            register_type::<Point>(point)?;

            let widget = frame.root(DataType::new_abstract("Widget", DataType::any_type())?);
            let widget_allocated =
                frame.root(DataType::new_handle_type("WidgetAllocated", widget, true)?);
            main.set_global("Widget", widget);
            main.set_global("WidgetAllocated", widget_allocated);
            register_type::<Widget>(widget_allocated)?;

            let gadget = frame.root(DataType::new_abstract("Gadget", widget)?);
            let gadget_allocated =
                frame.root(DataType::new_handle_type("GadgetAllocated", gadget, true)?);
            main.set_global("Gadget", gadget);
            main.set_global("GadgetAllocated", gadget_allocated);
            register_type::<Gadget>(gadget_allocated)?;

            Ok(())
        })
        .unwrap()
    })
}
