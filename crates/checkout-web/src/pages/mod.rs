//! Page Components

mod auth;
mod home;
mod pricing;

pub use auth::AuthPage;
pub use home::HomePage;
pub use pricing::PricingPage;
