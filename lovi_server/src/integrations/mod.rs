pub mod redsys;
