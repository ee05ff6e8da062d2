mod stage;

pub use stage::*;
