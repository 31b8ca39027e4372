pub mod helpers;
pub mod mock_backend;
pub mod mock_verifier;

pub use helpers::*;
pub use mock_backend::MockWalletBackend;
pub use mock_verifier::MockVerifier;
