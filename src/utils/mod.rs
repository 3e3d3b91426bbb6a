pub mod naming;
pub mod parallel;
