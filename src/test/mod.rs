pub mod store;
pub mod utils;

pub use utils::test_utils;
