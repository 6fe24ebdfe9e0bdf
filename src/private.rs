#[derive(Clone, Copy)]
pub struct Private;
