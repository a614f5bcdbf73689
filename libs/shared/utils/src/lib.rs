pub mod extractor;
pub mod phone;
pub mod signature;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
