pub mod generate;
pub mod score;
pub mod slices;
