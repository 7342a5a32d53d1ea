pub mod accounts;
pub mod password;
pub mod policy;
pub mod session;
pub mod signer;
pub mod validation;

pub use accounts::{AuthError, SignupCompletion};
pub use policy::Forbidden;
pub use session::{ActingUser, SessionManager};
pub use signer::{CookieSigner, SigningSecret};
