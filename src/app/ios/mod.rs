pub mod control;
pub mod discovery;
pub mod parse;
