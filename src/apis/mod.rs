pub mod hillsborough;

pub use hillsborough::HillsboroughApi;
