pub mod error;
pub mod consts;
pub mod tile;
pub mod grid;
pub mod align;
pub mod io;
pub mod source;
pub mod cache;
pub mod pyramid;
pub mod viewport;
