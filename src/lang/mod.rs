pub mod coerce;
pub mod object;
pub mod value;
