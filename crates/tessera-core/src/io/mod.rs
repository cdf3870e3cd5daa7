pub mod acquisition;
pub mod coordinates;
