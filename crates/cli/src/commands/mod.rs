pub mod albums;
pub mod photo;
pub mod search;
pub mod status;
pub mod sync;
