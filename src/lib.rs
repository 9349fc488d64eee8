pub mod constants;
pub mod coordinates;
pub mod ephemeris;
pub mod frames;
pub mod geometry;
pub mod observers;
pub mod selene;
pub mod selene_errors;
pub mod time;
