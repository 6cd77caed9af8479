pub mod api;
pub mod auth;
pub mod company;
pub mod contact;
pub mod error;
pub mod geo;
pub mod lenient;
pub mod notary;
pub mod search;
pub mod territory;
pub mod time_format;

pub use api::ClientConfig;
pub use auth::{AuthBackend, AuthController, AuthSession, AuthState, CredentialStore, RememberedUser};
pub use company::CompanyProfile;
pub use error::{ApiError, ApiResult, ConflictDetails};
pub use self::geo::{Bounds, Geometry, LatLng};
pub use territory::*;
