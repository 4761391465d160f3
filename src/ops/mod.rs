pub mod check;
pub mod drag;
pub mod move_ops;
pub mod schedule;
pub mod sequence;
