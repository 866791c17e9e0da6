pub mod bathroom;
